use serde_json::Value;

use crate::pipeline::progress_reporter::ProgressReporter;
use crate::pipeline::task_error::TaskError;
use crate::queue::domain::task::Task;

/// Executes one claimed task.
///
/// Returns the success payload stored in the task's result record; an
/// error's display text becomes the terminal error message.
pub trait TaskHandler: Send {
    fn handle(
        &mut self,
        task: &Task,
        progress: &mut dyn ProgressReporter,
    ) -> Result<Value, TaskError>;
}
