//! Orders & bills domain module.
//!
//! This crate contains the business rules for orders and their bills,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod bill;
pub mod order;

pub use bill::{
    Bill, BillLink, NewBill, STORE_LINK_TTL_HOURS, StampedStoreLink, StoreLink, StoreLinkUpsert, TaxRates,
};
pub use order::{Order, OrderItem, OrderStatus};
