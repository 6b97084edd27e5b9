use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task_request::TaskRequest;

/// Globally unique task identifier (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A persisted job descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub request: TaskRequest,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(request: TaskRequest) -> Self {
        Self {
            task_id: TaskId::new(),
            request,
            created_at: Utc::now(),
        }
    }
}

/// Externally observable queue state of a task.
///
/// `Completed` covers both success and error outcomes: it only says a
/// result record exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Completed,
    Pending,
    Unknown,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Unknown => write!(f, "unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::domain::task_request::{ScrapeRequest, TaskRequest};

    #[test]
    fn test_task_ids_are_unique() {
        let a = TaskId::new();
        let b = TaskId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_task_id_round_trips_through_display() {
        let id = TaskId::new();
        let parsed: TaskId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_task_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<TaskId>().is_err());
    }

    #[test]
    fn test_task_serializes_request_with_type_tag() {
        let task = Task::new(TaskRequest::Scrape(ScrapeRequest {
            source_url: "https://www.youtube.com/@someone".to_string(),
            label: None,
        }));
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["request"]["type"], "scrape");
        assert_eq!(
            json["request"]["payload"]["source_url"],
            "https://www.youtube.com/@someone"
        );
    }
}
