use dinehub_core::OrderId;

use crate::app::errors::ApiError;

/// Parse an order id taken from the path.
pub fn parse_order_id(raw: &str) -> Result<OrderId, ApiError> {
    raw.parse().map_err(|_| ApiError::invalid_order_id())
}
