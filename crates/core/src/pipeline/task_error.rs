use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::audio::domain::speech_recognizer::RecognizeError;
use crate::manifest::domain::manifest_error::ManifestError;
use crate::queue::domain::task_request::ValidationError;
use crate::shared::model_resolver::ModelResolveError;

/// Failure of a task handler. Its display text becomes the task's terminal
/// error message.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Recognize(#[from] RecognizeError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Model(#[from] ModelResolveError),
    #[error("{0}")]
    Collaborator(String),
    #[error("I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TaskError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn collaborator(err: impl std::fmt::Display) -> Self {
        Self::Collaborator(err.to_string())
    }
}
