pub mod publish_policy;
pub mod queue_error;
pub mod queue_signal;
pub mod records;
pub mod task;
pub mod task_queue;
pub mod task_request;
