//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and the shared ledger service
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses
//! - `extract.rs`: JSON body extractor with the same error shape

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use gymdesk_infra::StoreConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod extract;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the black-box tests).
pub async fn build_app(jwt_secret: String, store: &StoreConfig) -> anyhow::Result<Router> {
    let services = services::build_services(store).await?;
    Ok(router(services, jwt_secret))
}

/// Router over already-built services.
pub fn router(services: services::AppServices, jwt_secret: String) -> Router {
    let jwt = Arc::new(gymdesk_auth::Hs256JwtValidator::new(jwt_secret.into_bytes()));
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require a valid bearer token.
    let protected = routes::router()
        .layer(Extension(Arc::new(services.clone())))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .layer(Extension(Arc::new(services)))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
