use super::super::dto::{ErrorResponse, TaskListResponse, TaskStatusResponse, TaskSummary};
use super::super::state::ServerState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::debug;

#[utoipa::path(
    get,
    path = "/status/{task_id}",
    tag = "tasks",
    params(("task_id" = String, Path, description = "Identifier returned by /trigger")),
    responses(
        (status = 200, description = "Tracked run", body = TaskStatusResponse),
        (status = 404, description = "Unknown task id", body = ErrorResponse)
    )
)]
pub async fn status_handler(
    State(state): State<Arc<ServerState>>,
    Path(task_id): Path<String>,
) -> Response {
    match state.tracker().get(&task_id).await {
        Some(record) => Json(TaskStatusResponse {
            success: true,
            record,
        })
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Task not found")),
        )
            .into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/tasks",
    tag = "tasks",
    responses(
        (status = 200, description = "Tracked runs, newest first", body = TaskListResponse)
    )
)]
pub async fn tasks_handler(State(state): State<Arc<ServerState>>) -> Json<TaskListResponse> {
    let records = state.tracker().list().await;
    debug!(count = records.len(), "Serving /tasks request");
    let tasks: Vec<TaskSummary> = records.iter().map(TaskSummary::from).collect();
    Json(TaskListResponse {
        success: true,
        total: tasks.len(),
        tasks,
    })
}
