//! `dinehub-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod ownership;

pub use error::{DomainError, DomainResult};
pub use id::{BillId, BusinessId, OrderId, OrderItemId, OwnerId};
pub use ownership::BusinessOwned;
