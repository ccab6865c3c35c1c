//! Orders & bills persistence boundary.
//!
//! Handlers talk to `BillingStore`; the in-memory implementation backs tests
//! and local development, the Postgres one backs deployments.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryBillingStore;
pub use postgres::PostgresBillingStore;
pub use r#trait::{BillingStore, StoreError, Upserted};
