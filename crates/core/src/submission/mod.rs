pub mod task_submission;
