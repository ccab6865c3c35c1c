//! Postgres-backed orders & bills store.
//!
//! Expected tables (managed outside this crate):
//!
//! | Table | Columns |
//! |-------|---------|
//! | `orders` | `id BIGINT PK`, `business_id BIGINT`, `status TEXT`, `created_at TIMESTAMPTZ` |
//! | `order_items` | `id BIGINT PK`, `order_id BIGINT FK`, `name TEXT`, `quantity INT`, `unit_price DOUBLE PRECISION` |
//! | `bills` | `id BIGSERIAL PK`, `order_id BIGINT UNIQUE FK`, `business_id BIGINT`, `vat_low`/`vat_high`/`service_tax`/`service_charge DOUBLE PRECISION NULL`, `bill_store_link TEXT NULL`, `bill_store_public_id TEXT NULL`, `expires_at TIMESTAMPTZ NULL`, `created_at TIMESTAMPTZ DEFAULT NOW()` |
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Constraint` |
//! | Database (foreign key violation) | `23503` | `Constraint` |
//! | Database (other) | Any other | `Backend` |
//! | RowNotFound | N/A | `NotFound` |
//! | Other | N/A | `Backend` |

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::instrument;

use dinehub_billing::{Bill, BillLink, NewBill, Order, OrderItem, OrderStatus, StoreLinkUpsert, TaxRates};
use dinehub_core::{BillId, BusinessId, OrderId, OrderItemId};

use super::r#trait::{BillingStore, StoreError, Upserted};

const BILL_COLUMNS: &str = "id, order_id, business_id, vat_low, vat_high, service_tax, service_charge, \
     bill_store_link, bill_store_public_id, expires_at, created_at";

/// Postgres-backed orders & bills store.
///
/// Single-statement operations only; the 1:1 order/bill relation is the
/// unique index on `bills.order_id`.
#[derive(Debug, Clone)]
pub struct PostgresBillingStore {
    pool: Arc<PgPool>,
}

impl PostgresBillingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Attach items and bills to freshly loaded order rows.
    async fn hydrate(&self, mut orders: Vec<Order>) -> Result<Vec<Order>, StoreError> {
        if orders.is_empty() {
            return Ok(orders);
        }
        let ids: Vec<i64> = orders.iter().map(|o| o.id.get()).collect();

        let item_rows = sqlx::query(
            r#"
            SELECT id, order_id, name, quantity, unit_price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY id ASC
            "#,
        )
        .bind(ids.as_slice())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_order_items", e))?;

        let mut items: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in &item_rows {
            let item = item_from_row(row).map_err(|e| map_sqlx_error("decode_order_item", e))?;
            items.entry(item.order_id).or_default().push(item);
        }

        let bill_rows = sqlx::query(&format!("SELECT {BILL_COLUMNS} FROM bills WHERE order_id = ANY($1)"))
            .bind(ids.as_slice())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_bills", e))?;

        let mut bills: HashMap<OrderId, Bill> = HashMap::new();
        for row in &bill_rows {
            let bill = bill_from_row(row).map_err(|e| map_sqlx_error("decode_bill", e))?;
            bills.insert(bill.order_id, bill);
        }

        for order in &mut orders {
            order.items = items.remove(&order.id).unwrap_or_default();
            order.bill = bills.remove(&order.id);
        }
        Ok(orders)
    }

    async fn hydrate_one(&self, order: Order) -> Result<Order, StoreError> {
        let mut orders = self.hydrate(vec![order]).await?;
        orders
            .pop()
            .ok_or_else(|| StoreError::Backend("hydrate returned no order".to_string()))
    }
}

#[async_trait]
impl BillingStore for PostgresBillingStore {
    #[instrument(skip(self))]
    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query("SELECT id, business_id, status, created_at FROM orders WHERE id = $1")
            .bind(order_id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_order", e))?;

        match row {
            Some(row) => {
                let order = order_from_row(&row).map_err(|e| map_sqlx_error("decode_order", e))?;
                Ok(Some(self.hydrate_one(order).await?))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn list_orders(&self, business_id: BusinessId) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, business_id, status, created_at
            FROM orders
            WHERE business_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(business_id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_orders", e))?;

        let orders = rows
            .iter()
            .map(order_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_order", e))?;

        self.hydrate(orders).await
    }

    #[instrument(skip(self))]
    async fn update_order_status(&self, order_id: OrderId, status: &OrderStatus) -> Result<Order, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE orders SET status = $2
            WHERE id = $1
            RETURNING id, business_id, status, created_at
            "#,
        )
        .bind(order_id.get())
        .bind(status.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_order_status", e))?
        .ok_or_else(|| StoreError::NotFound(format!("order {order_id}")))?;

        let order = order_from_row(&row).map_err(|e| map_sqlx_error("decode_order", e))?;
        self.hydrate_one(order).await
    }

    #[instrument(skip(self, bill), fields(order_id = %bill.order_id()))]
    async fn create_bill(&self, bill: NewBill) -> Result<Bill, StoreError> {
        let rates = bill.rates();
        let link = bill.store_link();

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO bills (
                order_id, business_id,
                vat_low, vat_high, service_tax, service_charge,
                bill_store_link, bill_store_public_id, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {BILL_COLUMNS}
            "#
        ))
        .bind(bill.order_id().get())
        .bind(bill.business_id().get())
        .bind(rates.map(|r| r.vat_low))
        .bind(rates.map(|r| r.vat_high))
        .bind(rates.map(|r| r.service_tax))
        .bind(rates.map(|r| r.service_charge))
        .bind(link.map(|l| l.link.as_str()))
        .bind(link.map(|l| l.public_id.as_str()))
        .bind(link.map(|l| l.expires_at))
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_bill", e))?;

        bill_from_row(&row).map_err(|e| map_sqlx_error("decode_bill", e))
    }

    #[instrument(skip(self))]
    async fn find_bill(&self, order_id: OrderId) -> Result<Option<Bill>, StoreError> {
        let row = sqlx::query(&format!("SELECT {BILL_COLUMNS} FROM bills WHERE order_id = $1"))
            .bind(order_id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_bill", e))?;

        row.map(|r| bill_from_row(&r))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_bill", e))
    }

    #[instrument(skip(self))]
    async fn update_bill_charges(&self, order_id: OrderId, rates: TaxRates) -> Result<Bill, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE bills
            SET vat_low = $2, vat_high = $3, service_tax = $4, service_charge = $5
            WHERE order_id = $1
            RETURNING {BILL_COLUMNS}
            "#
        ))
        .bind(order_id.get())
        .bind(rates.vat_low)
        .bind(rates.vat_high)
        .bind(rates.service_tax)
        .bind(rates.service_charge)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_bill_charges", e))?
        .ok_or_else(|| StoreError::NotFound(format!("no bill for order {order_id}")))?;

        bill_from_row(&row).map_err(|e| map_sqlx_error("decode_bill", e))
    }

    #[instrument(skip(self, upsert), fields(order_id = %upsert.order_id()))]
    async fn upsert_store_link(&self, upsert: StoreLinkUpsert) -> Result<Upserted<Bill>, StoreError> {
        let link = upsert.link();

        // `xmax = 0` only holds for a row inserted by this statement.
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO bills (order_id, business_id, bill_store_link, bill_store_public_id, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (order_id)
            DO UPDATE SET
                bill_store_link = EXCLUDED.bill_store_link,
                bill_store_public_id = EXCLUDED.bill_store_public_id,
                expires_at = EXCLUDED.expires_at
            RETURNING {BILL_COLUMNS}, (xmax = 0) AS inserted
            "#
        ))
        .bind(upsert.order_id().get())
        .bind(upsert.business_id().get())
        .bind(&link.link)
        .bind(&link.public_id)
        .bind(link.expires_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_store_link", e))?;

        let inserted: bool = row
            .try_get("inserted")
            .map_err(|e| map_sqlx_error("decode_upsert", e))?;
        let bill = bill_from_row(&row).map_err(|e| map_sqlx_error("decode_bill", e))?;

        Ok(if inserted {
            Upserted::Created(bill)
        } else {
            Upserted::Updated(bill)
        })
    }

    #[instrument(skip(self))]
    async fn find_bill_link(&self, order_id: OrderId) -> Result<Option<BillLink>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT b.bill_store_link, o.business_id
            FROM bills b
            JOIN orders o ON o.id = b.order_id
            WHERE b.order_id = $1
            "#,
        )
        .bind(order_id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_bill_link", e))?;

        row.as_ref()
            .map(bill_link_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_bill_link", e))
    }
}

fn order_from_row(row: &PgRow) -> Result<Order, sqlx::Error> {
    Ok(Order {
        id: OrderId::new(row.try_get("id")?),
        business_id: BusinessId::new(row.try_get("business_id")?),
        status: OrderStatus::new(row.try_get::<String, _>("status")?),
        created_at: row.try_get("created_at")?,
        items: Vec::new(),
        bill: None,
    })
}

fn item_from_row(row: &PgRow) -> Result<OrderItem, sqlx::Error> {
    Ok(OrderItem {
        id: OrderItemId::new(row.try_get("id")?),
        order_id: OrderId::new(row.try_get("order_id")?),
        name: row.try_get("name")?,
        quantity: row.try_get("quantity")?,
        unit_price: row.try_get("unit_price")?,
    })
}

fn bill_from_row(row: &PgRow) -> Result<Bill, sqlx::Error> {
    Ok(Bill {
        id: BillId::new(row.try_get("id")?),
        order_id: OrderId::new(row.try_get("order_id")?),
        business_id: BusinessId::new(row.try_get("business_id")?),
        vat_low: row.try_get("vat_low")?,
        vat_high: row.try_get("vat_high")?,
        service_tax: row.try_get("service_tax")?,
        service_charge: row.try_get("service_charge")?,
        bill_store_link: row.try_get("bill_store_link")?,
        bill_store_public_id: row.try_get("bill_store_public_id")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn bill_link_from_row(row: &PgRow) -> Result<BillLink, sqlx::Error> {
    Ok(BillLink {
        bill_store_link: row.try_get("bill_store_link")?,
        order_business_id: BusinessId::new(row.try_get("business_id")?),
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") => StoreError::Constraint(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound(format!("no row in {}", operation)),
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
