use crate::application::RunReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: String,
}

/// Body of `POST /trigger`. Every field is optional.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TriggerRequest {
    /// Payload analysed by the LLM; a `service_<name>` key adds that service's monitoring data.
    #[schema(value_type = Object)]
    #[serde(default)]
    pub data: Option<Value>,
    /// Webhook key; its presence also enables notification.
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub summary: Option<bool>,
    #[serde(default)]
    pub notify: Option<bool>,
    #[serde(default, rename = "async")]
    pub run_async: Option<bool>,
}

/// Query string of `GET /trigger`; `data` may be JSON text.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TriggerQuery {
    pub data: Option<String>,
    pub key: Option<String>,
    pub summary: Option<bool>,
    pub notify: Option<bool>,
    #[serde(rename = "async")]
    pub run_async: Option<bool>,
}

impl From<TriggerQuery> for TriggerRequest {
    fn from(query: TriggerQuery) -> Self {
        Self {
            data: query.data.map(|raw| {
                serde_json::from_str(&raw).unwrap_or(Value::String(raw))
            }),
            key: query.key,
            summary: query.summary,
            notify: query.notify,
            run_async: query.run_async,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TriggerResponse {
    pub success: bool,
    pub task_id: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[schema(value_type = Option<Object>)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<RunReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TrackedStatus {
    Running,
    Completed,
    Failed,
}

/// A run as seen by `/status` and `/tasks`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TaskRecord {
    pub task_id: String,
    pub status: TrackedStatus,
    #[schema(value_type = String)]
    pub start_time: DateTime<Utc>,
    #[schema(value_type = Option<String>)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[schema(value_type = Option<Object>)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<RunReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskStatusResponse {
    pub success: bool,
    #[serde(flatten)]
    pub record: TaskRecord,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskSummary {
    pub task_id: String,
    pub status: TrackedStatus,
    #[schema(value_type = String)]
    pub start_time: DateTime<Utc>,
    #[schema(value_type = Option<String>)]
    pub end_time: Option<DateTime<Utc>>,
}

impl From<&TaskRecord> for TaskSummary {
    fn from(record: &TaskRecord) -> Self {
        Self {
            task_id: record.task_id.clone(),
            status: record.status,
            start_time: record.start_time,
            end_time: record.end_time,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskListResponse {
    pub success: bool,
    pub tasks: Vec<TaskSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}
