use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::manifest::domain::manifest_error::ManifestError;
use crate::manifest::infrastructure::csv_manifest::list_manifests;
use crate::queue::domain::queue_error::QueueError;
use crate::queue::domain::task::{TaskId, TaskStatus};
use crate::queue::domain::task_queue::TaskQueue;
use crate::queue::domain::task_request::{TaskKind, TaskRequest, ValidationError};
use crate::shared::storage_layout::StorageLayout;

#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Front-end side of the queue: validates and enqueues requests, answers
/// status and manifest listing queries. Never removes anything.
#[derive(Clone)]
pub struct TaskSubmission {
    queue: Arc<dyn TaskQueue>,
    layout: StorageLayout,
}

impl TaskSubmission {
    pub fn new(queue: Arc<dyn TaskQueue>, layout: StorageLayout) -> Self {
        Self { queue, layout }
    }

    pub fn queue(&self) -> &Arc<dyn TaskQueue> {
        &self.queue
    }

    /// Validate a loose `(type, payload)` pair and enqueue it.
    pub fn create_task(&self, kind: &str, payload: Value) -> Result<TaskId, SubmissionError> {
        let request = TaskRequest::parse(kind, payload)?;
        self.submit(request)
    }

    pub fn create_typed(&self, kind: TaskKind, payload: Value) -> Result<TaskId, SubmissionError> {
        let request = TaskRequest::parse_kind(kind, payload)?;
        self.submit(request)
    }

    pub fn submit(&self, request: TaskRequest) -> Result<TaskId, SubmissionError> {
        Ok(self.queue.enqueue(request)?)
    }

    pub fn task_status(&self, task_id: TaskId) -> Result<TaskStatus, SubmissionError> {
        Ok(self.queue.task_status(task_id)?)
    }

    /// Scrape manifests available as split inputs.
    pub fn list_manifests(&self) -> Result<Vec<String>, SubmissionError> {
        Ok(list_manifests(&self.layout.datasets_dir())?)
    }
}
