use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use crossbeam_channel::Sender;

use speechset_core::queue::domain::task_queue::TaskQueue;
use speechset_core::queue::infrastructure::file_task_queue::FileTaskQueue;
use speechset_core::shared::settings::Settings;
use speechset_core::shared::storage_layout::StorageLayout;
use speechset_core::submission::task_submission::TaskSubmission;
use speechset_core::worker::infrastructure::default_collaborators::DefaultCollaborators;
use speechset_core::worker::pipeline_handler::PipelineHandler;
use speechset_core::worker::worker_loop::WorkerLoop;
use speechset_server::server::{self, AppState};

/// HTTP and WebSocket front end for the speech dataset task queue.
#[derive(Parser)]
#[command(name = "speechset-server")]
struct Cli {
    /// Storage root shared with the worker.
    #[arg(long, env = "SPEECHSET_STORAGE")]
    storage: Option<PathBuf>,

    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port to listen on.
    #[arg(long, default_value = "8000")]
    port: u16,

    /// Also run the worker in this process.
    #[arg(long)]
    embedded_worker: bool,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let root = match cli.storage {
        Some(root) => root,
        None => StorageLayout::default_root()
            .ok_or("Could not determine a storage directory; pass --storage")?,
    };
    let layout = StorageLayout::new(root);
    let settings = Settings::load(&layout.settings_path());

    let queue = FileTaskQueue::open(layout.clone())?
        .with_policy(settings.publish)
        .with_await_interval(settings.await_tick());
    let worker = if cli.embedded_worker {
        Some(spawn_worker(&queue, &layout, &settings)?)
    } else {
        None
    };

    let queue: Arc<dyn TaskQueue> = Arc::new(queue);
    let state = Arc::new(AppState::new(
        TaskSubmission::new(queue, layout),
        settings.relay_tick(),
    ));
    let addr = SocketAddr::new(cli.host, cli.port);
    server::serve(addr, state, shutdown_signal()).await?;

    if let Some((stop, handle)) = worker {
        log::info!("Waiting for the worker to finish its current task");
        drop(stop);
        if handle.join().is_err() {
            return Err("worker thread panicked".into());
        }
    }
    Ok(())
}

type WorkerHandle = (Sender<()>, thread::JoinHandle<()>);

/// Start a worker thread on a second queue handle sharing `queue`'s signal,
/// so submissions from the server wake it without waiting for a scan.
fn spawn_worker(
    queue: &FileTaskQueue,
    layout: &StorageLayout,
    settings: &Settings,
) -> Result<WorkerHandle, Box<dyn std::error::Error>> {
    let worker_queue = FileTaskQueue::with_signal(layout.clone(), queue.shared_signal())?
        .with_policy(settings.publish)
        .with_await_interval(settings.await_tick());
    let collaborators = DefaultCollaborators::from_settings(settings.clone())?;
    let handler = PipelineHandler::new(layout.clone(), settings.clone(), Box::new(collaborators));
    let mut worker = WorkerLoop::new(Arc::new(worker_queue), Box::new(handler))
        .with_scan_interval(settings.scan_interval());

    let (stop, shutdown) = crossbeam_channel::bounded::<()>(1);
    let handle = thread::Builder::new()
        .name("worker".to_string())
        .spawn(move || {
            if let Err(e) = worker.run(&shutdown) {
                log::error!("Worker stopped: {e}");
            }
        })?;
    Ok((stop, handle))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}
