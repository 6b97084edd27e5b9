//! Task creation and status endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use speechset_core::queue::domain::task::{TaskId, TaskStatus};
use speechset_core::queue::domain::task_request::TaskKind;

use crate::server::AppState;

use super::api_error::{run_blocking, ApiError};

/// Generic create-task body.
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TaskCreated {
    pub task_id: TaskId,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TaskStatusResponse {
    pub task_id: TaskId,
    pub status: TaskStatus,
}

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateTaskRequest>,
) -> Result<Json<TaskCreated>, ApiError> {
    let submission = state.submission.clone();
    let task_id =
        run_blocking(move || submission.create_task(&request.kind, request.payload)).await?;
    log::info!("Queued task {task_id}");
    Ok(Json(TaskCreated { task_id }))
}

pub async fn create_scrape(
    state: State<Arc<AppState>>,
    payload: Json<Value>,
) -> Result<Json<TaskCreated>, ApiError> {
    create_typed(state, TaskKind::Scrape, payload).await
}

pub async fn create_split(
    state: State<Arc<AppState>>,
    payload: Json<Value>,
) -> Result<Json<TaskCreated>, ApiError> {
    create_typed(state, TaskKind::Split, payload).await
}

pub async fn create_transcribe(
    state: State<Arc<AppState>>,
    payload: Json<Value>,
) -> Result<Json<TaskCreated>, ApiError> {
    create_typed(state, TaskKind::Transcribe, payload).await
}

async fn create_typed(
    State(state): State<Arc<AppState>>,
    kind: TaskKind,
    Json(payload): Json<Value>,
) -> Result<Json<TaskCreated>, ApiError> {
    let submission = state.submission.clone();
    let task_id = run_blocking(move || submission.create_typed(kind, payload)).await?;
    log::info!("Queued {} task {task_id}", kind.as_str());
    Ok(Json(TaskCreated { task_id }))
}

pub async fn task_status(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskStatusResponse>, ApiError> {
    let task_id = parse_task_id(&task_id)?;
    let submission = state.submission.clone();
    let status = run_blocking(move || submission.task_status(task_id)).await?;
    Ok(Json(TaskStatusResponse { task_id, status }))
}

pub fn parse_task_id(raw: &str) -> Result<TaskId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("invalid task id: '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use speechset_core::queue::infrastructure::file_task_queue::FileTaskQueue;
    use speechset_core::shared::storage_layout::StorageLayout;
    use speechset_core::submission::task_submission::TaskSubmission;
    use std::time::Duration;
    use tempfile::TempDir;

    fn state(tmp: &TempDir) -> Arc<AppState> {
        let layout = StorageLayout::new(tmp.path());
        let queue = Arc::new(FileTaskQueue::open(layout.clone()).unwrap());
        Arc::new(AppState::new(
            TaskSubmission::new(queue, layout),
            Duration::from_millis(10),
        ))
    }

    #[tokio::test]
    async fn test_create_scrape_then_status_is_pending() {
        let tmp = TempDir::new().unwrap();
        let state = state(&tmp);
        let payload = json!({"channel_url": "https://www.youtube.com/@talks", "voice_name": "amy"});

        let Json(created) = create_scrape(State(state.clone()), Json(payload))
            .await
            .unwrap();
        let Json(status) = task_status(State(state), Path(created.task_id.to_string()))
            .await
            .unwrap();

        assert_eq!(status.task_id, created.task_id);
        assert_eq!(status.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn test_generic_create_task() {
        let tmp = TempDir::new().unwrap();
        let request = CreateTaskRequest {
            kind: "split".to_string(),
            payload: json!({"csv_filename": "talks_metadata.csv"}),
        };
        let Json(created) = create_task(State(state(&tmp)), Json(request)).await.unwrap();
        assert!(tmp
            .path()
            .join("jobs")
            .join(format!("{}.json", created.task_id))
            .exists());
    }

    #[tokio::test]
    async fn test_unknown_type_is_bad_request() {
        let tmp = TempDir::new().unwrap();
        let request = CreateTaskRequest {
            kind: "bake".to_string(),
            payload: Value::Null,
        };
        let err = create_task(State(state(&tmp)), Json(request)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_payload_is_bad_request_and_not_queued() {
        let tmp = TempDir::new().unwrap();
        let err = create_split(State(state(&tmp)), Json(json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(std::fs::read_dir(tmp.path().join("jobs")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_status_of_unknown_and_malformed_ids() {
        let tmp = TempDir::new().unwrap();
        let state = state(&tmp);
        let id = TaskId::new();

        let Json(status) = task_status(State(state.clone()), Path(id.to_string()))
            .await
            .unwrap();
        assert_eq!(status.status, TaskStatus::Unknown);

        let err = task_status(State(state), Path("not-a-uuid".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
