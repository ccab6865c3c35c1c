//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and shared services
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::any::Any;
use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer};

use dinehub_infra::BillingStore;

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(config: AppConfig, store: Arc<dyn BillingStore>) -> Router {
    let jwt = Arc::new(dinehub_auth::Hs256JwtValidator::new(config.jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState { jwt };

    let services = Arc::new(services::AppServices::new(store));
    let expose_panic_detail = !config.is_production();

    // Owner routes: require a valid business-owner token.
    let protected = routes::router()
        .route_layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ))
        .layer(Extension(services));

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/r/:data", get(routes::system::frontend_redirect))
        .nest("/api", protected)
        .fallback(routes::system::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| {
                    errors::panic_response(panic, expose_panic_detail)
                }))
                .layer(CorsLayer::permissive())
                .layer(Extension(Arc::new(config))),
        )
}
