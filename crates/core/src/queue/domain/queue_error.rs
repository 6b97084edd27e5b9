use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::task::TaskId;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("storage failure at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode record for {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("timed out after {waited:?} waiting for task {task_id}")]
    Timeout { task_id: TaskId, waited: Duration },
}

impl QueueError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
