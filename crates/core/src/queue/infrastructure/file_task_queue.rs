use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::queue::domain::publish_policy::{OnExhausted, PublishPolicy};
use crate::queue::domain::queue_error::QueueError;
use crate::queue::domain::queue_signal::QueueSignal;
use crate::queue::domain::records::{ProgressRecord, ResultRecord};
use crate::queue::domain::task::{Task, TaskId, TaskStatus};
use crate::queue::domain::task_queue::TaskQueue;
use crate::queue::domain::task_request::TaskRequest;
use crate::shared::storage_layout::StorageLayout;

use super::atomic_json::{read_json, write_atomic};

const DEFAULT_AWAIT_INTERVAL: Duration = Duration::from_millis(500);

/// Task queue backed by three directories under a storage root:
/// `jobs/<id>.json`, `progress/<id>.json` and `results/<id>_result.json`.
pub struct FileTaskQueue {
    layout: StorageLayout,
    policy: PublishPolicy,
    await_interval: Duration,
    signal: Arc<QueueSignal>,
}

impl FileTaskQueue {
    /// Open the queue, creating the storage directories if needed.
    pub fn open(layout: StorageLayout) -> Result<Self, QueueError> {
        Self::with_signal(layout, Arc::new(QueueSignal::new()))
    }

    /// Open the queue sharing a change signal with other queue handles in
    /// this process.
    pub fn with_signal(layout: StorageLayout, signal: Arc<QueueSignal>) -> Result<Self, QueueError> {
        layout
            .ensure()
            .map_err(|e| QueueError::storage(layout.root(), e))?;
        Ok(Self {
            layout,
            policy: PublishPolicy::default(),
            await_interval: DEFAULT_AWAIT_INTERVAL,
            signal,
        })
    }

    pub fn with_policy(mut self, policy: PublishPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_await_interval(mut self, interval: Duration) -> Self {
        self.await_interval = interval;
        self
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub fn shared_signal(&self) -> Arc<QueueSignal> {
        self.signal.clone()
    }

    fn descriptor_path(&self, task_id: TaskId) -> PathBuf {
        self.layout.jobs_dir().join(format!("{task_id}.json"))
    }

    fn progress_path(&self, task_id: TaskId) -> PathBuf {
        self.layout.progress_dir().join(format!("{task_id}.json"))
    }

    fn result_path(&self, task_id: TaskId) -> PathBuf {
        self.layout.results_dir().join(format!("{task_id}_result.json"))
    }

    fn descriptor_files(&self) -> Result<Vec<PathBuf>, QueueError> {
        let dir = self.layout.jobs_dir();
        let entries = fs::read_dir(&dir).map_err(|e| QueueError::storage(&dir, e))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| QueueError::storage(&dir, e))?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        Ok(files)
    }

    fn remove_descriptor(&self, path: &Path) -> Result<(), QueueError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(QueueError::storage(path, e)),
        }
    }

    /// A descriptor that no longer parses still terminates its task.
    fn reject_corrupt(&self, path: &Path) -> Result<(), QueueError> {
        let task_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<TaskId>().ok());
        match task_id {
            Some(task_id) => {
                log::warn!("Rejecting unreadable task descriptor {}", path.display());
                self.acknowledge(&ResultRecord::error(
                    task_id,
                    "Task descriptor could not be read",
                ))
            }
            None => {
                log::warn!("Removing stray file {} from the job queue", path.display());
                self.remove_descriptor(path)
            }
        }
    }
}

impl TaskQueue for FileTaskQueue {
    fn enqueue(&self, request: TaskRequest) -> Result<TaskId, QueueError> {
        let task = Task::new(request);
        write_atomic(&self.descriptor_path(task.task_id), &task)?;
        log::info!("Enqueued {} task {}", task.request.kind(), task.task_id);
        self.signal.notify();
        Ok(task.task_id)
    }

    fn claim_next(&self) -> Result<Option<Task>, QueueError> {
        let mut earliest: Option<Task> = None;
        for path in self.descriptor_files()? {
            let Ok(bytes) = fs::read(&path) else {
                // Removed between listing and reading.
                continue;
            };
            match serde_json::from_slice::<Task>(&bytes) {
                Ok(task) => {
                    let is_earlier = earliest.as_ref().map_or(true, |current| {
                        (task.created_at, task.task_id) < (current.created_at, current.task_id)
                    });
                    if is_earlier {
                        earliest = Some(task);
                    }
                }
                Err(_) => self.reject_corrupt(&path)?,
            }
        }
        Ok(earliest)
    }

    fn acknowledge(&self, result: &ResultRecord) -> Result<(), QueueError> {
        let path = self.result_path(result.task_id);
        if path.exists() {
            log::warn!("Task {} already has a result, keeping it", result.task_id);
        } else {
            write_atomic(&path, result)?;
        }
        self.remove_descriptor(&self.descriptor_path(result.task_id))?;
        self.signal.notify();
        Ok(())
    }

    fn publish_progress(
        &self,
        task_id: TaskId,
        message: &str,
        percent: Option<u8>,
    ) -> Result<(), QueueError> {
        let record = ProgressRecord::new(task_id, message, percent);
        let path = self.progress_path(task_id);
        let attempts = self.policy.attempts();
        let mut attempt = 0;
        loop {
            match write_atomic(&path, &record) {
                Ok(()) => {
                    self.signal.notify();
                    return Ok(());
                }
                Err(e) if attempt + 1 >= attempts => {
                    return match self.policy.on_exhausted {
                        OnExhausted::Drop => {
                            log::debug!("Dropping progress update for {task_id}: {e}");
                            Ok(())
                        }
                        OnExhausted::Propagate => Err(e),
                    };
                }
                Err(e) => {
                    log::debug!("Progress write for {task_id} failed (attempt {}): {e}", attempt + 1);
                    thread::sleep(self.policy.delay_after(attempt));
                    attempt += 1;
                }
            }
        }
    }

    fn read_progress(&self, task_id: TaskId) -> Option<ProgressRecord> {
        read_json(&self.progress_path(task_id))
    }

    fn read_result(&self, task_id: TaskId) -> Option<ResultRecord> {
        read_json(&self.result_path(task_id))
    }

    fn task_status(&self, task_id: TaskId) -> Result<TaskStatus, QueueError> {
        let result = self.result_path(task_id);
        let descriptor = self.descriptor_path(task_id);
        let exists = |path: &Path| path.try_exists().map_err(|e| QueueError::storage(path, e));
        if exists(&result)? {
            Ok(TaskStatus::Completed)
        } else if exists(&descriptor)? {
            Ok(TaskStatus::Pending)
        } else {
            Ok(TaskStatus::Unknown)
        }
    }

    fn discard_pending(&self) -> Result<usize, QueueError> {
        let files = self.descriptor_files()?;
        for path in &files {
            self.remove_descriptor(path)?;
        }
        if !files.is_empty() {
            log::info!("Discarded {} stale task descriptor(s)", files.len());
            self.signal.notify();
        }
        Ok(files.len())
    }

    fn signal(&self) -> &QueueSignal {
        &self.signal
    }

    fn await_interval(&self) -> Duration {
        self.await_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::domain::records::ResultStatus;
    use crate::queue::domain::task_request::ScrapeRequest;
    use serde_json::json;
    use std::time::Instant;
    use tempfile::TempDir;

    fn scrape(url: &str) -> TaskRequest {
        TaskRequest::Scrape(ScrapeRequest {
            source_url: url.to_string(),
            label: None,
        })
    }

    fn queue(tmp: &TempDir) -> FileTaskQueue {
        FileTaskQueue::open(StorageLayout::new(tmp.path()))
            .unwrap()
            .with_await_interval(Duration::from_millis(20))
    }

    #[test]
    fn test_enqueue_persists_descriptor() {
        let tmp = TempDir::new().unwrap();
        let q = queue(&tmp);
        let id = q.enqueue(scrape("https://x.test/a")).unwrap();

        assert!(tmp.path().join("jobs").join(format!("{id}.json")).exists());
        assert_eq!(q.task_status(id).unwrap(), TaskStatus::Pending);
    }

    #[test]
    fn test_enqueue_ids_are_unique() {
        let tmp = TempDir::new().unwrap();
        let q = queue(&tmp);
        let a = q.enqueue(scrape("https://x.test/a")).unwrap();
        let b = q.enqueue(scrape("https://x.test/a")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_enqueue_storage_failure() {
        let tmp = TempDir::new().unwrap();
        let q = queue(&tmp);
        fs::remove_dir_all(tmp.path().join("jobs")).unwrap();

        let err = q.enqueue(scrape("https://x.test/a")).unwrap_err();
        assert!(matches!(err, QueueError::Storage { .. }));
    }

    #[test]
    fn test_claim_next_returns_earliest_created() {
        let tmp = TempDir::new().unwrap();
        let q = queue(&tmp);
        let first = q.enqueue(scrape("https://x.test/1")).unwrap();
        thread::sleep(Duration::from_millis(5));
        q.enqueue(scrape("https://x.test/2")).unwrap();

        let claimed = q.claim_next().unwrap().unwrap();
        assert_eq!(claimed.task_id, first);
    }

    #[test]
    fn test_claim_next_on_empty_queue() {
        let tmp = TempDir::new().unwrap();
        assert!(queue(&tmp).claim_next().unwrap().is_none());
    }

    #[test]
    fn test_claim_ignores_staging_files() {
        let tmp = TempDir::new().unwrap();
        let q = queue(&tmp);
        fs::write(tmp.path().join("jobs").join("x.json.tmp"), b"{").unwrap();
        assert!(q.claim_next().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_descriptor_becomes_error_result() {
        let tmp = TempDir::new().unwrap();
        let q = queue(&tmp);
        let id = TaskId::new();
        fs::write(tmp.path().join("jobs").join(format!("{id}.json")), b"not json").unwrap();

        assert!(q.claim_next().unwrap().is_none());
        assert_eq!(q.task_status(id).unwrap(), TaskStatus::Completed);
        assert_eq!(q.read_result(id).unwrap().status, ResultStatus::Error);
    }

    #[test]
    fn test_acknowledge_writes_result_then_removes_descriptor() {
        let tmp = TempDir::new().unwrap();
        let q = queue(&tmp);
        let id = q.enqueue(scrape("https://x.test/a")).unwrap();

        q.acknowledge(&ResultRecord::success(id, json!({"rows": 3}))).unwrap();

        assert!(!tmp.path().join("jobs").join(format!("{id}.json")).exists());
        assert_eq!(q.task_status(id).unwrap(), TaskStatus::Completed);
        assert_eq!(q.read_result(id).unwrap().payload["rows"], 3);
    }

    #[test]
    fn test_first_result_is_kept() {
        let tmp = TempDir::new().unwrap();
        let q = queue(&tmp);
        let id = q.enqueue(scrape("https://x.test/a")).unwrap();

        q.acknowledge(&ResultRecord::success(id, json!({"rows": 3}))).unwrap();
        q.acknowledge(&ResultRecord::error(id, "late failure")).unwrap();

        let result = q.read_result(id).unwrap();
        assert_eq!(result.status, ResultStatus::Success);
        assert_eq!(result.payload["rows"], 3);
    }

    #[test]
    fn test_unknown_task_status() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(queue(&tmp).task_status(TaskId::new()).unwrap(), TaskStatus::Unknown);
    }

    #[test]
    fn test_progress_overwrites_in_place() {
        let tmp = TempDir::new().unwrap();
        let q = queue(&tmp);
        let id = TaskId::new();
        q.publish_progress(id, "Processing source 1/2: a", Some(10)).unwrap();
        q.publish_progress(id, "Processing source 2/2: b", Some(55)).unwrap();

        let progress = q.read_progress(id).unwrap();
        assert_eq!(progress.message, "Processing source 2/2: b");
        assert_eq!(progress.percent, Some(55));
        assert_eq!(fs::read_dir(tmp.path().join("progress")).unwrap().count(), 1);
    }

    #[test]
    fn test_read_progress_missing_or_corrupt() {
        let tmp = TempDir::new().unwrap();
        let q = queue(&tmp);
        let id = TaskId::new();
        assert!(q.read_progress(id).is_none());

        fs::write(tmp.path().join("progress").join(format!("{id}.json")), b"{").unwrap();
        assert!(q.read_progress(id).is_none());
    }

    fn break_progress_dir(tmp: &TempDir) {
        let dir = tmp.path().join("progress");
        fs::remove_dir_all(&dir).unwrap();
        fs::write(&dir, b"not a directory").unwrap();
    }

    #[test]
    fn test_progress_failure_dropped_by_default() {
        let tmp = TempDir::new().unwrap();
        let q = queue(&tmp).with_policy(PublishPolicy {
            delay_ms: 1,
            ..PublishPolicy::default()
        });
        break_progress_dir(&tmp);

        assert!(q.publish_progress(TaskId::new(), "x", None).is_ok());
    }

    #[test]
    fn test_progress_failure_propagated_when_configured() {
        let tmp = TempDir::new().unwrap();
        let q = queue(&tmp).with_policy(PublishPolicy {
            max_attempts: 3,
            delay_ms: 1,
            on_exhausted: OnExhausted::Propagate,
            ..PublishPolicy::default()
        });
        break_progress_dir(&tmp);

        let err = q.publish_progress(TaskId::new(), "x", None).unwrap_err();
        assert!(matches!(err, QueueError::Storage { .. }));
    }

    #[test]
    fn test_discard_pending_removes_all_descriptors() {
        let tmp = TempDir::new().unwrap();
        let q = queue(&tmp);
        let a = q.enqueue(scrape("https://x.test/a")).unwrap();
        q.enqueue(scrape("https://x.test/b")).unwrap();

        assert_eq!(q.discard_pending().unwrap(), 2);
        assert!(q.claim_next().unwrap().is_none());
        assert_eq!(q.task_status(a).unwrap(), TaskStatus::Unknown);
        assert!(q.read_result(a).is_none());
    }

    #[test]
    fn test_await_result_returns_existing_result() {
        let tmp = TempDir::new().unwrap();
        let q = queue(&tmp);
        let id = q.enqueue(scrape("https://x.test/a")).unwrap();
        q.acknowledge(&ResultRecord::error(id, "boom")).unwrap();

        let result = q.await_result(id, Duration::from_secs(1)).unwrap();
        assert_eq!(result.error_message(), Some("boom"));
    }

    #[test]
    fn test_await_result_times_out() {
        let tmp = TempDir::new().unwrap();
        let q = queue(&tmp);
        let start = Instant::now();
        let err = q
            .await_result(TaskId::new(), Duration::from_millis(60))
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn test_await_result_sees_result_written_later() {
        let tmp = TempDir::new().unwrap();
        let q = Arc::new(queue(&tmp));
        let id = q.enqueue(scrape("https://x.test/a")).unwrap();

        let writer = q.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            writer
                .acknowledge(&ResultRecord::success(id, json!({})))
                .unwrap();
        });

        let result = q.await_result(id, Duration::from_secs(5)).unwrap();
        handle.join().unwrap();
        assert!(result.is_success());
    }

    #[test]
    fn test_await_result_retries_partial_result() {
        let tmp = TempDir::new().unwrap();
        let q = queue(&tmp);
        let id = TaskId::new();
        let path = tmp.path().join("results").join(format!("{id}_result.json"));
        fs::write(&path, b"{\"task_id\":").unwrap();

        let complete = serde_json::to_vec(&ResultRecord::success(id, json!({}))).unwrap();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            fs::write(&path, complete).unwrap();
        });

        let result = q.await_result(id, Duration::from_secs(5)).unwrap();
        handle.join().unwrap();
        assert!(result.is_success());
    }
}
