use super::super::dto::{ErrorResponse, TriggerQuery, TriggerRequest, TriggerResponse};
use super::super::state::ServerState;
use crate::application::{RunOptions, RunReport};
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/trigger",
    tag = "trigger",
    params(TriggerQuery),
    responses(
        (status = 200, description = "Run finished", body = TriggerResponse),
        (status = 202, description = "Run accepted (async)", body = TriggerResponse),
        (status = 500, description = "Run failed", body = ErrorResponse)
    )
)]
pub async fn trigger_get_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<TriggerQuery>,
) -> Response {
    trigger(state, query.into()).await
}

#[utoipa::path(
    post,
    path = "/trigger",
    tag = "trigger",
    request_body = TriggerRequest,
    responses(
        (status = 200, description = "Run finished", body = TriggerResponse),
        (status = 202, description = "Run accepted (async)", body = TriggerResponse),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 500, description = "Run failed", body = ErrorResponse)
    )
)]
pub async fn trigger_post_handler(State(state): State<Arc<ServerState>>, body: Bytes) -> Response {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        TriggerRequest::default()
    } else {
        match serde_json::from_slice::<TriggerRequest>(&body) {
            Ok(request) => request,
            Err(err) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse::new(format!("invalid request body: {err}"))),
                )
                    .into_response();
            }
        }
    };
    trigger(state, request).await
}

async fn trigger(state: Arc<ServerState>, request: TriggerRequest) -> Response {
    let pipeline = state.pipeline();
    let config = pipeline.config();
    let needs_mcp = !config.workflow.is_empty() || !config.queries.is_empty();
    if needs_mcp {
        if let Err(err) = config.require_mcp_servers() {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(err.user_message())),
            )
                .into_response();
        }
    }

    let options = RunOptions {
        summary: request.summary.unwrap_or(false),
        notify: request.notify.unwrap_or(false) || request.key.is_some(),
        notify_key: request.key,
        trigger_data: request.data,
    };
    let task_id = Uuid::new_v4().to_string();
    state.tracker().start(&task_id).await;
    info!(task_id = %task_id, run_async = request.run_async.unwrap_or(false), "Run triggered");

    let handle = {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move { pipeline.run(options).await })
    };

    if request.run_async.unwrap_or(false) {
        let state = Arc::clone(&state);
        let id = task_id.clone();
        tokio::spawn(async move {
            record_outcome(&state, &id, handle.await).await;
        });
        return (
            StatusCode::ACCEPTED,
            Json(TriggerResponse {
                success: true,
                task_id,
                message: "Run started; poll /status/{task_id} for the result".to_string(),
                output: None,
                report: None,
            }),
        )
            .into_response();
    }

    match record_outcome(&state, &task_id, handle.await).await {
        Some(report) => Json(TriggerResponse {
            success: true,
            task_id,
            message: "Run completed".to_string(),
            output: Some(report.output.clone()),
            report: Some(report),
        })
        .into_response(),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("run aborted unexpectedly")),
        )
            .into_response(),
    }
}

async fn record_outcome(
    state: &ServerState,
    task_id: &str,
    outcome: Result<RunReport, tokio::task::JoinError>,
) -> Option<RunReport> {
    match outcome {
        Ok(report) => {
            info!(task_id, success = report.is_success(), "Run finished");
            state.tracker().complete(task_id, report.clone()).await;
            Some(report)
        }
        Err(err) => {
            error!(task_id, error = %err, "Run aborted");
            state.tracker().fail(task_id, err.to_string()).await;
            None
        }
    }
}
