use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;

use speechset_core::pipeline::progress_reporter::ProgressReporter;
use speechset_core::pipeline::transcribe_use_case::TranscribeUseCase;
use speechset_core::queue::domain::task::TaskId;
use speechset_core::queue::domain::task_queue::TaskQueue;
use speechset_core::queue::domain::task_request::{
    manifest_file_name, ValidationError, DEFAULT_TRANSCRIPT_NAME,
};
use speechset_core::queue::infrastructure::file_task_queue::FileTaskQueue;
use speechset_core::relay::progress_relay::ProgressRelay;
use speechset_core::shared::settings::Settings;
use speechset_core::shared::storage_layout::StorageLayout;
use speechset_core::submission::task_submission::TaskSubmission;
use speechset_core::worker::collaborators::Collaborators;
use speechset_core::worker::infrastructure::default_collaborators::DefaultCollaborators;
use speechset_core::worker::pipeline_handler::PipelineHandler;
use speechset_core::worker::worker_loop::WorkerLoop;

/// Speech dataset pipeline: scrape, split and transcribe audio through a
/// durable task queue.
#[derive(Parser)]
#[command(name = "speechset")]
struct Cli {
    /// Storage root shared with the server and the worker.
    #[arg(long, global = true, env = "SPEECHSET_STORAGE")]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the background worker until killed.
    Worker,

    /// Queue a task and print its id.
    Submit {
        /// Task type: scrape, split or transcribe.
        kind: String,

        /// Task payload as a JSON object.
        #[arg(long, default_value = "{}")]
        payload: String,

        /// Wait up to this many seconds for the result and print it.
        #[arg(long)]
        wait: Option<u64>,
    },

    /// Print the queue status of a task: pending, completed or unknown.
    Status { task_id: String },

    /// Follow a task, printing one JSON message per update until it ends.
    Wait { task_id: String },

    /// List the manifests in the datasets directory.
    Manifests,

    /// Transcribe a folder directly, without going through the queue.
    Transcribe {
        /// Recognizer: local (whisper) or remote (hosted API).
        #[arg(long, default_value = "local")]
        method: String,

        /// Credential for the remote recognizer.
        #[arg(long, env = "SPEECHSET_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Folder of audio files, relative to the storage root unless
        /// absolute (default: the exported clips folder).
        #[arg(long)]
        input_folder: Option<String>,

        /// Manifest file name inside the transcription datasets directory.
        #[arg(long, default_value = DEFAULT_TRANSCRIPT_NAME)]
        output_csv: String,
    },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let root = match cli.storage {
        Some(root) => root,
        None => StorageLayout::default_root()
            .ok_or("Could not determine a storage directory; pass --storage")?,
    };
    let layout = StorageLayout::new(root);
    let settings = Settings::load(&layout.settings_path());

    match cli.command {
        Command::Worker => run_worker(layout, settings),
        Command::Submit {
            kind,
            payload,
            wait,
        } => run_submit(layout, &settings, &kind, &payload, wait),
        Command::Status { task_id } => {
            let submission = TaskSubmission::new(open_queue(&layout, &settings)?, layout);
            println!("{}", submission.task_status(task_id.parse()?)?);
            Ok(())
        }
        Command::Wait { task_id } => run_wait(layout, &settings, task_id.parse()?),
        Command::Manifests => {
            let submission = TaskSubmission::new(open_queue(&layout, &settings)?, layout);
            for name in submission.list_manifests()? {
                println!("{name}");
            }
            Ok(())
        }
        Command::Transcribe {
            method,
            api_key,
            input_folder,
            output_csv,
        } => run_transcribe(
            layout,
            settings,
            &method,
            api_key.as_deref(),
            input_folder,
            &output_csv,
        ),
    }
}

fn open_queue(
    layout: &StorageLayout,
    settings: &Settings,
) -> Result<Arc<dyn TaskQueue>, Box<dyn std::error::Error>> {
    let queue = FileTaskQueue::open(layout.clone())?
        .with_policy(settings.publish)
        .with_await_interval(settings.await_tick());
    Ok(Arc::new(queue))
}

fn run_worker(layout: StorageLayout, settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let queue = open_queue(&layout, &settings)?;
    let scan_interval = settings.scan_interval();
    let collaborators = DefaultCollaborators::from_settings(settings.clone())?;
    let handler = PipelineHandler::new(layout.clone(), settings, Box::new(collaborators));

    // The sender lives for the whole process, so the loop only ends on a
    // fatal queue error or when the process is killed.
    let (_stop, shutdown) = crossbeam_channel::bounded::<()>(1);
    log::info!("Worker watching {}", layout.jobs_dir().display());
    WorkerLoop::new(queue, Box::new(handler))
        .with_scan_interval(scan_interval)
        .run(&shutdown)?;
    Ok(())
}

fn run_submit(
    layout: StorageLayout,
    settings: &Settings,
    kind: &str,
    payload: &str,
    wait: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let payload: Value =
        serde_json::from_str(payload).map_err(|e| format!("Payload is not valid JSON: {e}"))?;
    let submission = TaskSubmission::new(open_queue(&layout, settings)?, layout);
    let task_id = submission.create_task(kind, payload)?;
    println!("{task_id}");

    let Some(secs) = wait else {
        return Ok(());
    };
    let result = submission
        .queue()
        .await_result(task_id, Duration::from_secs(secs))?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    match result.error_message() {
        Some(message) => Err(message.to_string().into()),
        None => Ok(()),
    }
}

fn run_wait(
    layout: StorageLayout,
    settings: &Settings,
    task_id: TaskId,
) -> Result<(), Box<dyn std::error::Error>> {
    let queue = open_queue(&layout, settings)?;
    let mut relay = ProgressRelay::new(queue, task_id).with_tick(settings.relay_tick());
    let stdout = io::stdout();
    relay.stream(|message| match serde_json::to_string(message) {
        Ok(line) => {
            let mut out = stdout.lock();
            writeln!(out, "{line}").and_then(|_| out.flush()).is_ok()
        }
        Err(e) => {
            log::error!("Failed to encode relay message: {e}");
            false
        }
    });
    Ok(())
}

fn run_transcribe(
    layout: StorageLayout,
    settings: Settings,
    method: &str,
    api_key: Option<&str>,
    input_folder: Option<String>,
    output_csv: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let folder = match input_folder {
        Some(folder) => layout.resolve(&folder),
        None => layout.clips_dir(),
    };
    if !folder.is_dir() {
        return Err(format!("Input folder not found: {}", folder.display()).into());
    }
    let manifest_path = transcript_path(&layout, output_csv)?;

    eprintln!("Input folder: {}", folder.display());
    eprintln!("Output CSV:   {}", manifest_path.display());
    eprintln!("Method:       {method}");

    let collaborators = DefaultCollaborators::from_settings(settings)?;
    let recognizer = match api_key {
        Some(key) if method == "remote" => collaborators.remote_recognizer(key)?,
        _ => collaborators.local_recognizer()?,
    };
    let mut use_case = TranscribeUseCase::new(collaborators.audio_reader(), recognizer);
    let outcome = use_case.run(&folder, &manifest_path, &mut ConsoleProgress)?;
    eprintln!(
        "Done: {} transcribed, {} skipped, {} failed",
        outcome.transcribed, outcome.skipped, outcome.failed
    );
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Command::Transcribe {
        method, api_key, ..
    } = &cli.command
    {
        if method != "local" && method != "remote" {
            return Err(format!("Method must be 'local' or 'remote', got '{method}'").into());
        }
        let has_key = api_key.as_deref().is_some_and(|k| !k.trim().is_empty());
        if method == "remote" && !has_key {
            return Err("--api-key is required for the remote method".into());
        }
    }
    if let Command::Submit {
        wait: Some(0), ..
    } = &cli.command
    {
        return Err("--wait must be at least 1 second".into());
    }
    Ok(())
}

/// Manifest location for `--output-csv`, kept inside the transcription
/// datasets directory.
fn transcript_path(layout: &StorageLayout, output_csv: &str) -> Result<PathBuf, ValidationError> {
    Ok(layout.text_datasets_dir().join(manifest_file_name(output_csv)?))
}

/// Prints `[ 42%] message` lines to stderr.
struct ConsoleProgress;

impl ProgressReporter for ConsoleProgress {
    fn report(&mut self, message: &str, percent: Option<u8>) {
        match percent {
            Some(p) => eprintln!("[{p:3}%] {message}"),
            None => eprintln!("       {message}"),
        }
    }
}
