use super::dto::{
    ErrorResponse, HealthResponse, TaskListResponse, TaskRecord, TaskStatusResponse, TaskSummary,
    TrackedStatus, TriggerRequest, TriggerResponse,
};
use super::routes;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health_handler,
        routes::trigger::trigger_get_handler,
        routes::trigger::trigger_post_handler,
        routes::tasks::status_handler,
        routes::tasks::tasks_handler
    ),
    components(
        schemas(
            HealthResponse,
            TriggerRequest,
            TriggerResponse,
            TaskRecord,
            TaskStatusResponse,
            TaskSummary,
            TaskListResponse,
            TrackedStatus,
            ErrorResponse
        )
    ),
    tags(
        (name = "health", description = "Liveness check"),
        (name = "trigger", description = "Start a configured check run"),
        (name = "tasks", description = "Status of tracked runs")
    )
)]
pub(super) struct ApiDoc;
