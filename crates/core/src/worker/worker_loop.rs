use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, TryRecvError};

use crate::queue::domain::queue_error::QueueError;
use crate::queue::domain::records::ResultRecord;
use crate::queue::domain::task::Task;
use crate::queue::domain::task_queue::TaskQueue;
use crate::worker::queue_progress::QueueProgress;
use crate::worker::task_handler::TaskHandler;

const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Descriptors dropped by startup recovery.
    pub discarded: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Single consumer of the task queue.
///
/// Tasks run strictly one at a time in claim order. Every claimed task ends
/// with exactly one result record and its descriptor removed, whether the
/// handler returns, fails or panics.
pub struct WorkerLoop {
    queue: Arc<dyn TaskQueue>,
    handler: Box<dyn TaskHandler>,
    scan_interval: Duration,
    stats: WorkerStats,
}

impl WorkerLoop {
    pub fn new(queue: Arc<dyn TaskQueue>, handler: Box<dyn TaskHandler>) -> Self {
        Self {
            queue,
            handler,
            scan_interval: DEFAULT_SCAN_INTERVAL,
            stats: WorkerStats::default(),
        }
    }

    pub fn with_scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats
    }

    /// Recover, then serve until `shutdown` fires or its sender is dropped.
    pub fn run(&mut self, shutdown: &Receiver<()>) -> Result<WorkerStats, QueueError> {
        self.recover()?;
        self.serve(shutdown)
    }

    /// Drop every descriptor left from a previous run. Those tasks never get
    /// a result.
    pub fn recover(&mut self) -> Result<usize, QueueError> {
        let discarded = self.queue.discard_pending()?;
        if discarded > 0 {
            log::warn!("Discarded {discarded} task(s) left from a previous run");
        }
        self.stats.discarded += discarded;
        Ok(discarded)
    }

    pub fn serve(&mut self, shutdown: &Receiver<()>) -> Result<WorkerStats, QueueError> {
        log::info!("Worker started");
        while !shutdown_requested(shutdown) {
            let seen = self.queue.signal().generation();
            match self.queue.claim_next() {
                Ok(Some(task)) => {
                    self.complete(&task)?;
                    continue;
                }
                Ok(None) => {}
                Err(e) => log::error!("Scanning the queue failed: {e}"),
            }
            self.queue.signal().wait_for_change(seen, self.scan_interval);
        }
        log::info!(
            "Worker stopped: {} succeeded, {} failed",
            self.stats.succeeded,
            self.stats.failed
        );
        Ok(self.stats)
    }

    /// Claim and process the next task. `Ok(false)` when the queue is empty.
    pub fn run_once(&mut self) -> Result<bool, QueueError> {
        match self.queue.claim_next()? {
            Some(task) => {
                self.complete(&task)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn complete(&mut self, task: &Task) -> Result<(), QueueError> {
        let record = self.process(task);
        self.queue.acknowledge(&record)
    }

    fn process(&mut self, task: &Task) -> ResultRecord {
        log::info!("Processing {} task {}", task.request.kind(), task.task_id);
        let queue = Arc::clone(&self.queue);
        let mut progress = QueueProgress::new(queue.as_ref(), task.task_id);
        let handler = &mut self.handler;
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| handler.handle(task, &mut progress)));

        let record = match outcome {
            Ok(Ok(payload)) => ResultRecord::success(task.task_id, payload),
            Ok(Err(e)) => ResultRecord::error(task.task_id, e.to_string()),
            Err(panic) => ResultRecord::error(
                task.task_id,
                format!("Task panicked: {}", panic_message(panic.as_ref())),
            ),
        };
        if record.is_success() {
            self.stats.succeeded += 1;
            log::info!("Task {} completed", task.task_id);
        } else {
            self.stats.failed += 1;
            log::error!(
                "Task {} failed: {}",
                task.task_id,
                record.error_message().unwrap_or_default()
            );
        }
        record
    }
}

fn shutdown_requested(shutdown: &Receiver<()>) -> bool {
    matches!(
        shutdown.try_recv(),
        Ok(()) | Err(TryRecvError::Disconnected)
    )
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::progress_reporter::ProgressReporter;
    use crate::pipeline::task_error::TaskError;
    use crate::queue::domain::records::ResultStatus;
    use crate::queue::domain::task::TaskStatus;
    use crate::queue::domain::task_request::{ScrapeRequest, TaskRequest};
    use crate::queue::infrastructure::file_task_queue::FileTaskQueue;
    use crate::shared::storage_layout::StorageLayout;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::thread;
    use tempfile::TempDir;

    /// Behaves according to the label of a scrape request.
    struct ScriptedHandler {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl TaskHandler for ScriptedHandler {
        fn handle(
            &mut self,
            task: &Task,
            progress: &mut dyn ProgressReporter,
        ) -> Result<Value, TaskError> {
            let TaskRequest::Scrape(request) = &task.request else {
                return Err(TaskError::collaborator("unexpected task"));
            };
            let label = request.label.clone().unwrap_or_default();
            self.seen.lock().unwrap().push(label.clone());
            progress.report("halfway", Some(50));
            match label.as_str() {
                "fail" => Err(TaskError::collaborator("listing failed")),
                "panic" => panic!("boom"),
                _ => Ok(json!({ "csv_filename": format!("{label}.csv") })),
            }
        }
    }

    fn scrape(label: &str) -> TaskRequest {
        TaskRequest::Scrape(ScrapeRequest {
            source_url: "https://example.com/list".to_string(),
            label: Some(label.to_string()),
        })
    }

    fn setup() -> (TempDir, Arc<FileTaskQueue>, WorkerLoop, Arc<Mutex<Vec<String>>>) {
        let tmp = TempDir::new().unwrap();
        let queue = Arc::new(FileTaskQueue::open(StorageLayout::new(tmp.path())).unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let worker = WorkerLoop::new(
            queue.clone(),
            Box::new(ScriptedHandler { seen: seen.clone() }),
        )
        .with_scan_interval(Duration::from_millis(20));
        (tmp, queue, worker, seen)
    }

    #[test]
    fn test_recover_discards_without_results() {
        let (_tmp, queue, mut worker, seen) = setup();
        let stale = queue.enqueue(scrape("stale")).unwrap();

        assert_eq!(worker.recover().unwrap(), 1);

        assert_eq!(queue.task_status(stale).unwrap(), TaskStatus::Unknown);
        assert!(!worker.run_once().unwrap());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_success_writes_result_and_removes_descriptor() {
        let (_tmp, queue, mut worker, _seen) = setup();
        let id = queue.enqueue(scrape("ok")).unwrap();

        assert!(worker.run_once().unwrap());

        let result = queue.read_result(id).unwrap();
        assert_eq!(result.status, ResultStatus::Success);
        assert_eq!(result.payload, json!({"csv_filename": "ok.csv"}));
        assert_eq!(queue.task_status(id).unwrap(), TaskStatus::Completed);
        assert!(!queue.layout().jobs_dir().join(format!("{id}.json")).exists());
        assert_eq!(queue.read_progress(id).unwrap().percent, Some(50));
    }

    #[test]
    fn test_handler_error_becomes_error_result() {
        let (_tmp, queue, mut worker, _seen) = setup();
        let id = queue.enqueue(scrape("fail")).unwrap();

        worker.run_once().unwrap();

        let result = queue.read_result(id).unwrap();
        assert_eq!(result.error_message(), Some("listing failed"));
        assert_eq!(worker.stats().failed, 1);
    }

    #[test]
    fn test_panic_becomes_error_result_and_worker_continues() {
        let (_tmp, queue, mut worker, seen) = setup();
        let first = queue.enqueue(scrape("panic")).unwrap();
        thread::sleep(Duration::from_millis(5));
        let second = queue.enqueue(scrape("after")).unwrap();

        assert!(worker.run_once().unwrap());
        assert!(worker.run_once().unwrap());

        assert_eq!(
            queue.read_result(first).unwrap().error_message(),
            Some("Task panicked: boom")
        );
        assert!(queue.read_result(second).unwrap().is_success());
        assert_eq!(*seen.lock().unwrap(), vec!["panic", "after"]);
    }

    #[test]
    fn test_tasks_run_in_creation_order() {
        let (_tmp, queue, mut worker, seen) = setup();
        for label in ["a", "b", "c"] {
            queue.enqueue(scrape(label)).unwrap();
            thread::sleep(Duration::from_millis(5));
        }
        while worker.run_once().unwrap() {}
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_serve_processes_until_shutdown() {
        let (_tmp, queue, mut worker, _seen) = setup();
        worker.recover().unwrap();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let handle = thread::spawn(move || worker.serve(&stop_rx));

        let id = queue.enqueue(scrape("ok")).unwrap();
        let result = queue.await_result(id, Duration::from_secs(10)).unwrap();
        assert!(result.is_success());

        stop_tx.send(()).unwrap();
        let stats = handle.join().unwrap().unwrap();
        assert_eq!(stats.succeeded, 1);
    }

    #[test]
    fn test_dropped_sender_stops_worker() {
        let (_tmp, _queue, mut worker, _seen) = setup();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        drop(stop_tx);
        let stats = worker.run(&stop_rx).unwrap();
        assert_eq!(stats, WorkerStats::default());
    }
}
