pub mod atomic_json;
pub mod file_task_queue;
