use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use dinehub_core::{BillId, BusinessId, BusinessOwned, DomainError, DomainResult, OrderId};

use crate::order::Order;

/// How long an uploaded receipt stays linked before it is considered expired.
pub const STORE_LINK_TTL_HOURS: i64 = 24;

/// The four tax/charge rates carried by a bill, stored verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxRates {
    pub vat_low: f64,
    pub vat_high: f64,
    pub service_tax: f64,
    pub service_charge: f64,
}

/// Reference to an externally hosted receipt (image/document).
///
/// Both values are opaque to this system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreLink {
    pub link: String,
    pub public_id: String,
}

impl StoreLink {
    pub fn new(link: impl Into<String>, public_id: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            public_id: public_id.into(),
        }
    }

    /// Attach the expiry for a link written at `now`.
    pub fn stamp(self, now: DateTime<Utc>) -> StampedStoreLink {
        StampedStoreLink {
            link: self.link,
            public_id: self.public_id,
            expires_at: now + Duration::hours(STORE_LINK_TTL_HOURS),
        }
    }
}

/// A store link with its computed expiry, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampedStoreLink {
    pub link: String,
    pub public_id: String,
    pub expires_at: DateTime<Utc>,
}

/// A bill: the 1:1 billing record of an order.
///
/// Rates are unset when the bill was first created by a store-link write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: BillId,
    pub order_id: OrderId,
    pub business_id: BusinessId,
    pub vat_low: Option<f64>,
    pub vat_high: Option<f64>,
    pub service_tax: Option<f64>,
    pub service_charge: Option<f64>,
    pub bill_store_link: Option<String>,
    pub bill_store_public_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Bill {
    /// Overwrite all four rates.
    pub fn apply_rates(&mut self, rates: TaxRates) {
        self.vat_low = Some(rates.vat_low);
        self.vat_high = Some(rates.vat_high);
        self.service_tax = Some(rates.service_tax);
        self.service_charge = Some(rates.service_charge);
    }

    /// Overwrite the store-link fields and expiry; rates are left untouched.
    pub fn apply_store_link(&mut self, link: &StampedStoreLink) {
        self.bill_store_link = Some(link.link.clone());
        self.bill_store_public_id = Some(link.public_id.clone());
        self.expires_at = Some(link.expires_at);
    }

    /// The rates, if all four are set.
    pub fn rates(&self) -> Option<TaxRates> {
        Some(TaxRates {
            vat_low: self.vat_low?,
            vat_high: self.vat_high?,
            service_tax: self.service_tax?,
            service_charge: self.service_charge?,
        })
    }

    /// A bill must belong to the same business as its order.
    pub fn ensure_matches_order(&self, order: &Order) -> DomainResult<()> {
        if self.order_id != order.id {
            return Err(DomainError::invariant(format!(
                "bill {} is linked to order {}, not {}",
                self.id, self.order_id, order.id
            )));
        }
        if self.business_id != order.business_id {
            return Err(DomainError::invariant(format!(
                "bill {} business {} differs from order {} business {}",
                self.id, self.business_id, order.id, order.business_id
            )));
        }
        Ok(())
    }
}

impl BusinessOwned for Bill {
    fn owner_business_id(&self) -> BusinessId {
        self.business_id
    }
}

/// A bill about to be inserted.
///
/// Only constructible from the owning [`Order`], so the business id is always
/// the order's.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBill {
    order_id: OrderId,
    business_id: BusinessId,
    rates: Option<TaxRates>,
    store_link: Option<StampedStoreLink>,
}

impl NewBill {
    pub fn with_rates(order: &Order, rates: TaxRates) -> Self {
        Self {
            order_id: order.id,
            business_id: order.business_id,
            rates: Some(rates),
            store_link: None,
        }
    }

    pub fn with_store_link(order: &Order, link: StampedStoreLink) -> Self {
        Self {
            order_id: order.id,
            business_id: order.business_id,
            rates: None,
            store_link: Some(link),
        }
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn business_id(&self) -> BusinessId {
        self.business_id
    }

    pub fn rates(&self) -> Option<TaxRates> {
        self.rates
    }

    pub fn store_link(&self) -> Option<&StampedStoreLink> {
        self.store_link.as_ref()
    }

    /// Materialize once the store has assigned an id.
    pub fn into_bill(self, id: BillId, created_at: DateTime<Utc>) -> Bill {
        let mut bill = Bill {
            id,
            order_id: self.order_id,
            business_id: self.business_id,
            vat_low: None,
            vat_high: None,
            service_tax: None,
            service_charge: None,
            bill_store_link: None,
            bill_store_public_id: None,
            expires_at: None,
            created_at,
        };
        if let Some(rates) = self.rates {
            bill.apply_rates(rates);
        }
        if let Some(link) = &self.store_link {
            bill.apply_store_link(link);
        }
        bill
    }
}

/// Store-link write keyed by order: creates the bill or updates it in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLinkUpsert {
    order_id: OrderId,
    business_id: BusinessId,
    link: StampedStoreLink,
}

impl StoreLinkUpsert {
    pub fn for_order(order: &Order, link: StampedStoreLink) -> Self {
        Self {
            order_id: order.id,
            business_id: order.business_id,
            link,
        }
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn business_id(&self) -> BusinessId {
        self.business_id
    }

    pub fn link(&self) -> &StampedStoreLink {
        &self.link
    }

    /// The bill to insert when none exists yet.
    pub fn into_new_bill(self) -> NewBill {
        NewBill {
            order_id: self.order_id,
            business_id: self.business_id,
            rates: None,
            store_link: Some(self.link),
        }
    }
}

/// The store link of a bill, read together with its order's business.
///
/// Deliberately carries nothing else (in particular not the public id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillLink {
    pub bill_store_link: Option<String>,
    pub order_business_id: BusinessId,
}

impl BusinessOwned for BillLink {
    fn owner_business_id(&self) -> BusinessId {
        self.order_business_id
    }
}
