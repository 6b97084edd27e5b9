use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::server::AppState;

use super::api_error::{run_blocking, ApiError};

/// Scrape manifests available as split inputs, as a bare JSON array.
pub async fn list_csvs(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, ApiError> {
    let submission = state.submission.clone();
    let names = run_blocking(move || submission.list_manifests()).await?;
    Ok(Json(names))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use speechset_core::queue::infrastructure::file_task_queue::FileTaskQueue;
    use speechset_core::shared::storage_layout::StorageLayout;
    use speechset_core::submission::task_submission::TaskSubmission;
    use std::fs;
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
    async fn test_list_csvs_returns_manifest_names() {
        let tmp = TempDir::new().unwrap();
        let state = state(&tmp);
        let datasets = tmp.path().join("datasets_csv");
        fs::write(datasets.join("talks_metadata.csv"), "a\n").unwrap();
        fs::write(datasets.join("readme.txt"), "").unwrap();

        let Json(names) = list_csvs(State(state)).await.unwrap();
        assert_eq!(names, vec!["talks_metadata.csv"]);
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
    }
}
