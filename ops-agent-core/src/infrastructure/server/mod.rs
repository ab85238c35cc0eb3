//! REST surface: `/health`, `/trigger`, `/status/{task_id}` and `/tasks`.

mod docs;
mod dto;
mod error;
mod router;
mod routes;
mod state;

pub use dto::{TaskRecord, TrackedStatus, TriggerRequest, TriggerResponse};
pub use error::ServerError;

use crate::application::CheckPipeline;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Build the router without binding, e.g. for embedding.
pub fn router(pipeline: CheckPipeline) -> Router {
    router::build_router(pipeline)
}

pub async fn serve(pipeline: CheckPipeline, addr: SocketAddr) -> Result<(), ServerError> {
    router::serve(pipeline, addr).await
}

/// Serve on an already bound listener (port 0 in tests).
pub async fn serve_with_listener(
    pipeline: CheckPipeline,
    listener: TcpListener,
) -> Result<(), ServerError> {
    router::serve_with_listener(pipeline, listener).await
}
