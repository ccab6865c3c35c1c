use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use dinehub_billing::{Bill, BillLink, NewBill, Order, OrderStatus, StoreLinkUpsert, TaxRates};
use dinehub_core::{BillId, BusinessId, OrderId};

use super::r#trait::{BillingStore, StoreError, Upserted};

#[derive(Debug, Default)]
struct Tables {
    /// Orders without their bill; bills live in `bills`.
    orders: BTreeMap<OrderId, Order>,
    /// Keyed by order: the 1:1 relation is the map key.
    bills: HashMap<OrderId, Bill>,
    last_bill_id: i64,
}

impl Tables {
    fn assemble(&self, order: &Order) -> Order {
        let mut order = order.clone();
        order.bill = self.bills.get(&order.id).cloned();
        order
    }

    fn insert_bill(&mut self, new_bill: NewBill) -> Result<Bill, StoreError> {
        let order_id = new_bill.order_id();
        let order = self.orders.get(&order_id).ok_or_else(|| {
            StoreError::Constraint(format!("foreign key violated: order {order_id} does not exist"))
        })?;

        if self.bills.contains_key(&order_id) {
            return Err(StoreError::Constraint(format!(
                "unique constraint violated: order {order_id} already has a bill"
            )));
        }

        let bill = new_bill.into_bill(BillId::new(self.last_bill_id + 1), Utc::now());
        bill.ensure_matches_order(order)
            .map_err(|e| StoreError::Constraint(e.to_string()))?;

        self.last_bill_id = bill.id.get();
        self.bills.insert(order_id, bill.clone());
        Ok(bill)
    }
}

/// In-memory orders & bills store.
///
/// Intended for tests/dev. A single lock guards all tables, so every
/// operation (including the store-link upsert) is atomic.
#[derive(Debug, Default)]
pub struct InMemoryBillingStore {
    tables: RwLock<Tables>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an order (orders are created by another flow).
    ///
    /// A bill attached to `order` is stored as its bill.
    pub async fn insert_order(&self, mut order: Order) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.orders.contains_key(&order.id) {
            return Err(StoreError::Constraint(format!(
                "unique constraint violated: order {} already exists",
                order.id
            )));
        }

        if let Some(bill) = order.bill.take() {
            bill.ensure_matches_order(&order)
                .map_err(|e| StoreError::Constraint(e.to_string()))?;
            tables.last_bill_id = tables.last_bill_id.max(bill.id.get());
            tables.bills.insert(order.id, bill);
        }

        tables.orders.insert(order.id, order);
        Ok(())
    }

    /// Number of bills across all orders.
    pub async fn bill_count(&self) -> usize {
        self.tables.read().await.bills.len()
    }
}

#[async_trait]
impl BillingStore for InMemoryBillingStore {
    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.orders.get(&order_id).map(|o| tables.assemble(o)))
    }

    async fn list_orders(&self, business_id: BusinessId) -> Result<Vec<Order>, StoreError> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| o.business_id == business_id)
            .map(|o| tables.assemble(o))
            .collect();

        Order::sort_newest_first(&mut orders);
        Ok(orders)
    }

    async fn update_order_status(&self, order_id: OrderId, status: &OrderStatus) -> Result<Order, StoreError> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| StoreError::NotFound(format!("order {order_id}")))?;

        order.set_status(status.clone());
        let order = order.clone();
        Ok(tables.assemble(&order))
    }

    async fn create_bill(&self, bill: NewBill) -> Result<Bill, StoreError> {
        self.tables.write().await.insert_bill(bill)
    }

    async fn find_bill(&self, order_id: OrderId) -> Result<Option<Bill>, StoreError> {
        Ok(self.tables.read().await.bills.get(&order_id).cloned())
    }

    async fn update_bill_charges(&self, order_id: OrderId, rates: TaxRates) -> Result<Bill, StoreError> {
        let mut tables = self.tables.write().await;
        let bill = tables
            .bills
            .get_mut(&order_id)
            .ok_or_else(|| StoreError::NotFound(format!("no bill for order {order_id}")))?;

        bill.apply_rates(rates);
        Ok(bill.clone())
    }

    async fn upsert_store_link(&self, upsert: StoreLinkUpsert) -> Result<Upserted<Bill>, StoreError> {
        let mut tables = self.tables.write().await;

        if let Some(bill) = tables.bills.get_mut(&upsert.order_id()) {
            bill.apply_store_link(upsert.link());
            return Ok(Upserted::Updated(bill.clone()));
        }

        tables.insert_bill(upsert.into_new_bill()).map(Upserted::Created)
    }

    async fn find_bill_link(&self, order_id: OrderId) -> Result<Option<BillLink>, StoreError> {
        let tables = self.tables.read().await;
        let Some(bill) = tables.bills.get(&order_id) else {
            return Ok(None);
        };
        let order = tables
            .orders
            .get(&order_id)
            .ok_or_else(|| StoreError::Backend(format!("bill {} has no order {order_id}", bill.id)))?;

        Ok(Some(BillLink {
            bill_store_link: bill.bill_store_link.clone(),
            order_business_id: order.business_id,
        }))
    }
}
