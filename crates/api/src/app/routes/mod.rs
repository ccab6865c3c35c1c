use axum::Router;

pub mod bills;
pub mod common;
pub mod orders;
pub mod system;

/// Router for all authenticated (business-scoped) endpoints.
pub fn router() -> Router {
    Router::new().merge(bills::router()).merge(orders::router())
}
