//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection, JWT validator, local-user resolution
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and query parameters
//! - `extract.rs`: JSON/query extractors with JSON error rejections
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use masjedi_auth::JwtValidator;
use masjedi_infra::AppConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod extract;
pub mod routes;
pub mod services;

/// Build the full HTTP router from explicit parts.
///
/// `/health` is public; everything under `/api` requires a bearer token.
pub fn build_app(services: services::AppServices, jwt: Arc<dyn JwtValidator>) -> Router {
    let auth_state = middleware::AuthState { jwt };

    let protected = routes::router()
        .layer(Extension(Arc::new(services)))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", protected)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Build the router from process configuration (used by `main.rs`).
pub async fn build_app_from_config(config: &AppConfig) -> anyhow::Result<Router> {
    let jwt = services::build_jwt_validator(&config.jwt)?;
    let services = services::build_services(config).await?;
    Ok(build_app(services, jwt))
}
