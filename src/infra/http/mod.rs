mod error;
mod handlers;
mod middleware;
mod state;

pub use error::ServiceError;
pub use middleware::RequestContext;
pub use state::{CorsPolicy, ServiceState};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use lpi_render_types::{GENERATE_PDF_ALIAS_PATH, GENERATE_PDF_PATH, HEALTH_PATH};

use middleware::{apply_cors, log_responses, set_request_context};

/// Router of the render service: health check plus the PDF endpoint and its
/// legacy alias.
pub fn build_router(state: ServiceState, cors: CorsPolicy, max_body_bytes: usize) -> Router {
    let generate = post(handlers::generate_pdf)
        .options(handlers::preflight)
        .fallback(handlers::method_not_allowed);

    Router::new()
        .route(HEALTH_PATH, get(handlers::health))
        .route(GENERATE_PDF_PATH, generate.clone())
        .route(GENERATE_PDF_ALIAS_PATH, generate)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(axum_middleware::from_fn_with_state(cors, apply_cors))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
