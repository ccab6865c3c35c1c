use async_trait::async_trait;
use thiserror::Error;

use dinehub_billing::{Bill, BillLink, NewBill, Order, OrderStatus, StoreLinkUpsert, TaxRates};
use dinehub_core::{BusinessId, OrderId};
use std::sync::Arc;

/// Persistence failure.
///
/// These are **infrastructure errors**; ownership decisions are made by the
/// caller before a write is attempted.
///
/// - **Constraint**: a relational constraint rejected the write (duplicate
///   bill for an order, unknown order)
/// - **NotFound**: an update targeted a row that does not exist
/// - **Backend**: connection, driver or decoding failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Outcome of an insert-or-update keyed write.
#[derive(Debug, Clone, PartialEq)]
pub enum Upserted<T> {
    Created(T),
    Updated(T),
}

impl<T> Upserted<T> {
    pub fn was_created(&self) -> bool {
        matches!(self, Upserted::Created(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Upserted::Created(v) | Upserted::Updated(v) => v,
        }
    }
}

/// Orders & bills persistence.
///
/// Every method is a single atomic operation. Orders returned by this trait
/// carry their items and bill.
#[async_trait]
pub trait BillingStore: Send + Sync {
    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>, StoreError>;

    /// All orders of a business, newest first.
    async fn list_orders(&self, business_id: BusinessId) -> Result<Vec<Order>, StoreError>;

    /// Overwrite the order status (`NotFound` if the order does not exist).
    async fn update_order_status(&self, order_id: OrderId, status: &OrderStatus) -> Result<Order, StoreError>;

    /// Insert a bill. At most one bill per order: a second insert is a `Constraint` error.
    async fn create_bill(&self, bill: NewBill) -> Result<Bill, StoreError>;

    async fn find_bill(&self, order_id: OrderId) -> Result<Option<Bill>, StoreError>;

    /// Overwrite the four rates (`NotFound` if the order has no bill).
    async fn update_bill_charges(&self, order_id: OrderId, rates: TaxRates) -> Result<Bill, StoreError>;

    /// Create the order's bill with only the store link, or update the link in place.
    async fn upsert_store_link(&self, upsert: StoreLinkUpsert) -> Result<Upserted<Bill>, StoreError>;

    /// The bill's store link together with its order's business, in one read.
    async fn find_bill_link(&self, order_id: OrderId) -> Result<Option<BillLink>, StoreError>;
}

#[async_trait]
impl<S> BillingStore for Arc<S>
where
    S: BillingStore + ?Sized,
{
    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        (**self).find_order(order_id).await
    }

    async fn list_orders(&self, business_id: BusinessId) -> Result<Vec<Order>, StoreError> {
        (**self).list_orders(business_id).await
    }

    async fn update_order_status(&self, order_id: OrderId, status: &OrderStatus) -> Result<Order, StoreError> {
        (**self).update_order_status(order_id, status).await
    }

    async fn create_bill(&self, bill: NewBill) -> Result<Bill, StoreError> {
        (**self).create_bill(bill).await
    }

    async fn find_bill(&self, order_id: OrderId) -> Result<Option<Bill>, StoreError> {
        (**self).find_bill(order_id).await
    }

    async fn update_bill_charges(&self, order_id: OrderId, rates: TaxRates) -> Result<Bill, StoreError> {
        (**self).update_bill_charges(order_id, rates).await
    }

    async fn upsert_store_link(&self, upsert: StoreLinkUpsert) -> Result<Upserted<Bill>, StoreError> {
        (**self).upsert_store_link(upsert).await
    }

    async fn find_bill_link(&self, order_id: OrderId) -> Result<Option<BillLink>, StoreError> {
        (**self).find_bill_link(order_id).await
    }
}
