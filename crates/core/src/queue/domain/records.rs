use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::task::TaskId;

/// Latest human-readable progress of a running task. Advisory only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub task_id: TaskId,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressRecord {
    pub fn new(task_id: TaskId, message: impl Into<String>, percent: Option<u8>) -> Self {
        Self {
            task_id,
            message: message.into(),
            percent: percent.map(|p| p.min(100)),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Error,
}

/// Terminal outcome of a task. Written once, never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub task_id: TaskId,
    pub status: ResultStatus,
    #[serde(default)]
    pub payload: Value,
}

impl ResultRecord {
    pub fn success(task_id: TaskId, payload: Value) -> Self {
        Self {
            task_id,
            status: ResultStatus::Success,
            payload,
        }
    }

    pub fn error(task_id: TaskId, message: impl Into<String>) -> Self {
        Self {
            task_id,
            status: ResultStatus::Error,
            payload: json!({ "message": message.into() }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }

    /// Error message of a failed task, if any.
    pub fn error_message(&self) -> Option<&str> {
        match self.status {
            ResultStatus::Error => self.payload.get("message").and_then(Value::as_str),
            ResultStatus::Success => None,
        }
    }
}
