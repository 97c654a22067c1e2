//! HTTP surface: session extraction, routes, and error mapping.

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::drafts::DraftOrchestrator;

pub use error::ApiError;
pub use routes::{AppState, Session, api_routes};

/// Full application router: routes plus request tracing and CORS for the
/// web client at `cors_origin`.
pub fn app(orchestrator: Arc<DraftOrchestrator>, cors_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(routes::REFRESH_TOKEN_HEADER),
            HeaderName::from_static(routes::USER_ID_HEADER),
        ])
        .allow_credentials(true);
    let cors = match HeaderValue::from_str(cors_origin) {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin = %cors_origin, "Invalid CORS origin, cross-origin requests disabled");
            cors
        }
    };

    api_routes(orchestrator).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    )
}
