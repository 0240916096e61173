pub mod routes;
pub mod ws;

use crate::feeds::quote_api::QuoteSource;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// HTTP + WS surface. Unknown paths fall through to the static form page.
pub fn router<Q: QuoteSource + 'static>(state: Arc<AppState<Q>>, static_dir: &str) -> Router {
    Router::new()
        .route("/api/form", get(routes::get_form::<Q>))
        .route("/api/fields", post(routes::update_fields::<Q>))
        .route("/api/calculate", post(routes::calculate::<Q>))
        .route("/api/counters", get(routes::get_counters::<Q>))
        .route("/ws", get(ws::ws_handler::<Q>))
        .fallback_service(
            tower_http::services::ServeDir::new(static_dir)
                .fallback(tower_http::services::ServeFile::new(format!("{static_dir}/index.html"))),
        )
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(state)
}
