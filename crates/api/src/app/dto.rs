use serde::{Deserialize, Serialize};

use dinehub_billing::{BillLink, StoreLink, TaxRates};
use dinehub_core::OrderId;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillRequest {
    pub order_id: OrderId,
    pub tax_rates: TaxRates,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreLinkRequest {
    pub bill_store_link: String,
    pub cloudinary_public_id: String,
}

impl From<StoreLinkRequest> for StoreLink {
    fn from(req: StoreLinkRequest) -> Self {
        StoreLink::new(req.bill_store_link, req.cloudinary_public_id)
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Only the link; the public id and other bill fields stay private.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillLinkResponse {
    pub bill_store_link: Option<String>,
}

impl From<BillLink> for BillLinkResponse {
    fn from(link: BillLink) -> Self {
        Self {
            bill_store_link: link.bill_store_link,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}
