pub mod collaborators;
pub mod infrastructure;
pub mod pipeline_handler;
pub mod queue_progress;
pub mod task_handler;
pub mod worker_loop;
