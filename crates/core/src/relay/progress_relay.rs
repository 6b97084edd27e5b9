use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::queue::domain::records::ResultStatus;
use crate::queue::domain::task::TaskId;
use crate::queue::domain::task_queue::TaskQueue;

const DEFAULT_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayStatus {
    Processing,
    Completed,
    Error,
}

/// One message pushed to a caller watching a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayMessage {
    pub status: RelayStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl RelayMessage {
    pub fn is_terminal(&self) -> bool {
        self.status != RelayStatus::Processing
    }
}

/// Caller-facing view of one task's queue state.
///
/// Each tick checks the result record first and emits a single terminal
/// message for it; otherwise it emits `processing`, with the progress
/// record as detail when there is one. After a terminal message every tick
/// yields `None`, so a transport can never send two terminal messages.
pub struct ProgressRelay {
    queue: Arc<dyn TaskQueue>,
    task_id: TaskId,
    tick: Duration,
    seen: u64,
    finished: bool,
}

impl ProgressRelay {
    pub fn new(queue: Arc<dyn TaskQueue>, task_id: TaskId) -> Self {
        let seen = queue.signal().generation();
        Self {
            queue,
            task_id,
            tick: DEFAULT_TICK,
            seen,
            finished: false,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Message for the current queue state, `None` once finished.
    pub fn tick(&mut self) -> Option<RelayMessage> {
        if self.finished {
            return None;
        }
        self.seen = self.queue.signal().generation();

        if let Some(result) = self.queue.read_result(self.task_id) {
            self.finished = true;
            let status = match result.status {
                ResultStatus::Success => RelayStatus::Completed,
                ResultStatus::Error => RelayStatus::Error,
            };
            return Some(RelayMessage {
                status,
                detail: Some(result.payload),
            });
        }

        let detail = self
            .queue
            .read_progress(self.task_id)
            .and_then(|p| serde_json::to_value(p).ok());
        Some(RelayMessage {
            status: RelayStatus::Processing,
            detail,
        })
    }

    /// Terminal `error` message for an internal fault, `None` if a terminal
    /// message was already produced.
    pub fn fail(&mut self, message: impl Into<String>) -> Option<RelayMessage> {
        if self.finished {
            return None;
        }
        self.finished = true;
        Some(RelayMessage {
            status: RelayStatus::Error,
            detail: Some(serde_json::json!({ "message": message.into() })),
        })
    }

    /// Block until the queue changes or one tick interval passes.
    pub fn wait_next_tick(&mut self) {
        self.seen = self.queue.signal().wait_for_change(self.seen, self.tick);
    }

    /// Drive the relay until a terminal message is sent or `send` reports
    /// that the caller went away (returns `false`).
    pub fn stream<F>(&mut self, mut send: F)
    where
        F: FnMut(&RelayMessage) -> bool,
    {
        while let Some(message) = self.tick() {
            if !send(&message) {
                log::debug!("Caller for {} went away", self.task_id);
                return;
            }
            if message.is_terminal() {
                return;
            }
            self.wait_next_tick();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::domain::records::ResultRecord;
    use crate::queue::domain::task_request::{ScrapeRequest, TaskRequest};
    use crate::queue::infrastructure::file_task_queue::FileTaskQueue;
    use crate::shared::storage_layout::StorageLayout;
    use serde_json::json;
    use std::thread;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<FileTaskQueue>, TaskId) {
        let tmp = TempDir::new().unwrap();
        let queue = Arc::new(FileTaskQueue::open(StorageLayout::new(tmp.path())).unwrap());
        let id = queue
            .enqueue(TaskRequest::Scrape(ScrapeRequest {
                source_url: "https://example.com".to_string(),
                label: None,
            }))
            .unwrap();
        (tmp, queue, id)
    }

    #[test]
    fn test_bare_processing_without_progress() {
        let (_tmp, queue, id) = setup();
        let mut relay = ProgressRelay::new(queue, id);
        let message = relay.tick().unwrap();
        assert_eq!(message.status, RelayStatus::Processing);
        assert_eq!(message.detail, None);
        assert_eq!(serde_json::to_value(&message).unwrap(), json!({"status": "processing"}));
    }

    #[test]
    fn test_processing_carries_progress_detail() {
        let (_tmp, queue, id) = setup();
        queue.publish_progress(id, "Processing source 1/3: a", Some(0)).unwrap();
        let mut relay = ProgressRelay::new(queue, id);

        let message = relay.tick().unwrap();

        let detail = message.detail.unwrap();
        assert_eq!(detail["message"], "Processing source 1/3: a");
        assert_eq!(detail["percent"], 0);
    }

    #[test]
    fn test_result_wins_over_progress_and_is_sent_once() {
        let (_tmp, queue, id) = setup();
        queue.publish_progress(id, "Finalizing...", Some(100)).unwrap();
        queue
            .acknowledge(&ResultRecord::success(id, json!({"output_csv": "a.csv"})))
            .unwrap();
        let mut relay = ProgressRelay::new(queue, id);

        let message = relay.tick().unwrap();
        assert_eq!(message.status, RelayStatus::Completed);
        assert_eq!(message.detail, Some(json!({"output_csv": "a.csv"})));
        assert!(relay.tick().is_none());
        assert!(relay.fail("late fault").is_none());
    }

    #[test]
    fn test_error_result_maps_to_error_status() {
        let (_tmp, queue, id) = setup();
        queue.acknowledge(&ResultRecord::error(id, "No audio files found in x")).unwrap();
        let mut relay = ProgressRelay::new(queue, id);
        let message = relay.tick().unwrap();
        assert_eq!(message.status, RelayStatus::Error);
        assert_eq!(message.detail.unwrap()["message"], "No audio files found in x");
    }

    #[test]
    fn test_fault_is_terminal() {
        let (_tmp, queue, id) = setup();
        let mut relay = ProgressRelay::new(queue, id);
        let message = relay.fail("storage unavailable").unwrap();
        assert!(message.is_terminal());
        assert!(relay.tick().is_none());
    }

    #[test]
    fn test_stream_ends_with_single_terminal_message() {
        let (_tmp, queue, id) = setup();
        let writer = queue.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            writer.publish_progress(id, "halfway", Some(50)).unwrap();
            thread::sleep(Duration::from_millis(30));
            writer.acknowledge(&ResultRecord::success(id, json!({}))).unwrap();
        });
        let mut relay = ProgressRelay::new(queue, id).with_tick(Duration::from_millis(10));
        let mut sent = Vec::new();

        relay.stream(|m| {
            sent.push(m.clone());
            true
        });
        handle.join().unwrap();

        let terminal: Vec<_> = sent.iter().filter(|m| m.is_terminal()).collect();
        assert_eq!(terminal.len(), 1);
        assert!(sent.last().unwrap().is_terminal());
        assert!(sent.len() >= 2);
    }

    #[test]
    fn test_stream_stops_when_caller_leaves() {
        let (_tmp, queue, id) = setup();
        let mut relay = ProgressRelay::new(queue, id).with_tick(Duration::from_millis(5));
        let mut sent = 0;
        relay.stream(|_| {
            sent += 1;
            sent < 3
        });
        assert_eq!(sent, 3);
        assert!(!relay.is_finished());
    }
}
