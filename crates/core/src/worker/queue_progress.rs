use crate::pipeline::progress_reporter::ProgressReporter;
use crate::queue::domain::task::TaskId;
use crate::queue::domain::task_queue::TaskQueue;

/// Publishes a task's progress as its queue progress record.
///
/// Progress is advisory: a publish that still fails after the queue's
/// retry policy is logged and the task carries on.
pub struct QueueProgress<'a> {
    queue: &'a dyn TaskQueue,
    task_id: TaskId,
}

impl<'a> QueueProgress<'a> {
    pub fn new(queue: &'a dyn TaskQueue, task_id: TaskId) -> Self {
        Self { queue, task_id }
    }
}

impl ProgressReporter for QueueProgress<'_> {
    fn report(&mut self, message: &str, percent: Option<u8>) {
        log::debug!("[{}] {message}", self.task_id);
        if let Err(e) = self.queue.publish_progress(self.task_id, message, percent) {
            log::warn!("Progress update for {} lost: {e}", self.task_id);
        }
    }
}
