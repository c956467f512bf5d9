mod env;
mod error;
mod invoke;
mod state;

use std::future::ready;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::get,
};
pub use env::request_environment;
pub use state::AppState;
use tower_http::trace::TraceLayer;

pub fn router(state: &AppState) -> Router {
    Router::new()
        .route("/debug/healthz", get(|| ready(StatusCode::NO_CONTENT)))
        .route("/debug/metrics", get(render_metrics))
        .route("/", get(invoke::invoke))
        .route("/{*path}", get(invoke::invoke))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone())
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
