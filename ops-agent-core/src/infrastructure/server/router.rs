use super::docs::ApiDoc;
use super::error::ServerError;
use super::routes;
use super::state::ServerState;
use crate::application::CheckPipeline;
use axum::Router;
use axum::http::Method;
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub(super) fn build_router(pipeline: CheckPipeline) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let state = Arc::new(ServerState::new(pipeline));
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .route("/health", get(routes::health::health_handler))
        .route(
            "/trigger",
            get(routes::trigger::trigger_get_handler).post(routes::trigger::trigger_post_handler),
        )
        .route("/status/{task_id}", get(routes::tasks::status_handler))
        .route("/tasks", get(routes::tasks::tasks_handler))
        .layer(cors)
        .with_state(state)
}

pub(super) async fn serve_with_listener(
    pipeline: CheckPipeline,
    listener: TcpListener,
) -> Result<(), ServerError> {
    let app = build_router(pipeline);
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "REST server ready to accept connections");
    }
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    } else {
        std::future::pending::<()>().await;
    }
}

pub(super) async fn serve(pipeline: CheckPipeline, addr: SocketAddr) -> Result<(), ServerError> {
    info!(%addr, "Binding REST server");
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    serve_with_listener(pipeline, listener).await
}
