use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dinehub_core::{BusinessId, BusinessOwned, OrderId, OrderItemId};

use crate::bill::Bill;

/// Order status.
///
/// Free-form: any string is accepted and stored verbatim. The values used by
/// the order-taking flow are exposed as constructors, but they are not a
/// closed set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderStatus(String);

impl OrderStatus {
    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    pub fn pending() -> Self {
        Self::new("pending")
    }

    pub fn completed() -> Self {
        Self::new("completed")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::pending()
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Order line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub name: String,
    pub quantity: i32,
    pub unit_price: f64,
}

/// An order placed with a business, with its line items and (at most one) bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub business_id: BusinessId,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub bill: Option<Bill>,
}

impl Order {
    /// A freshly placed order: pending, no items, no bill.
    pub fn new(id: OrderId, business_id: BusinessId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            business_id,
            status: OrderStatus::default(),
            created_at,
            items: Vec::new(),
            bill: None,
        }
    }

    pub fn with_item(mut self, id: OrderItemId, name: impl Into<String>, quantity: i32, unit_price: f64) -> Self {
        self.items.push(OrderItem {
            id,
            order_id: self.id,
            name: name.into(),
            quantity,
            unit_price,
        });
        self
    }

    /// Overwrite the status. No transition rules apply.
    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
    }

    /// Sort newest first; ties (same timestamp) fall back to the higher id.
    pub fn sort_newest_first(orders: &mut [Order]) {
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    }
}

impl BusinessOwned for Order {
    fn owner_business_id(&self) -> BusinessId {
        self.business_id
    }
}
