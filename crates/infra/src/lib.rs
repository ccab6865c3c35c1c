//! Infrastructure layer: persistence adapters.

pub mod billing_store;

pub use billing_store::{BillingStore, InMemoryBillingStore, PostgresBillingStore, StoreError, Upserted};
