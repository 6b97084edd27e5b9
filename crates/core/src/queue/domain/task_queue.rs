use std::time::{Duration, Instant};

use super::queue_error::QueueError;
use super::queue_signal::QueueSignal;
use super::records::{ProgressRecord, ResultRecord};
use super::task::{Task, TaskId, TaskStatus};
use super::task_request::TaskRequest;

/// Durable hand-off between submitters and a single consuming worker.
///
/// Submitters only `enqueue`; the worker alone claims and acknowledges.
/// A task is observed either as a pending descriptor or as a result, never
/// both: `acknowledge` writes the result before removing the descriptor.
pub trait TaskQueue: Send + Sync {
    fn enqueue(&self, request: TaskRequest) -> Result<TaskId, QueueError>;

    /// Earliest pending task by creation time, ties broken by id.
    fn claim_next(&self) -> Result<Option<Task>, QueueError>;

    /// Results are write-once: acknowledging a task that already has a
    /// result keeps the first one and only removes the descriptor.
    fn acknowledge(&self, result: &ResultRecord) -> Result<(), QueueError>;

    fn publish_progress(
        &self,
        task_id: TaskId,
        message: &str,
        percent: Option<u8>,
    ) -> Result<(), QueueError>;

    /// `None` when missing or unreadable.
    fn read_progress(&self, task_id: TaskId) -> Option<ProgressRecord>;

    /// `None` when missing or not yet fully readable.
    fn read_result(&self, task_id: TaskId) -> Option<ResultRecord>;

    fn task_status(&self, task_id: TaskId) -> Result<TaskStatus, QueueError>;

    /// Remove every pending descriptor without producing results.
    fn discard_pending(&self) -> Result<usize, QueueError>;

    fn signal(&self) -> &QueueSignal;

    /// Polling interval used by `await_result`.
    fn await_interval(&self) -> Duration;

    /// Block until a result exists or `timeout` elapses.
    fn await_result(&self, task_id: TaskId, timeout: Duration) -> Result<ResultRecord, QueueError> {
        let start = Instant::now();
        let mut seen = self.signal().generation();
        loop {
            if let Some(result) = self.read_result(task_id) {
                return Ok(result);
            }
            let waited = start.elapsed();
            if waited >= timeout {
                return Err(QueueError::Timeout { task_id, waited });
            }
            let tick = self.await_interval().min(timeout - waited);
            seen = self.signal().wait_for_change(seen, tick);
        }
    }
}
