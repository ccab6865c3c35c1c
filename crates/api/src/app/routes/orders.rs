use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};

use dinehub_billing::OrderStatus;

use crate::app::errors::ApiError;
use crate::app::routes::common::parse_order_id;
use crate::app::{dto, services::AppServices};
use crate::authz::load_owned;
use crate::context::BusinessContext;

pub fn router() -> Router {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:order_id/status", put(update_order_status))
}

/// Overwrite an order's status. Any string is accepted.
pub async fn update_order_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<BusinessContext>,
    Path(order_id): Path<String>,
    payload: Result<Json<dto::UpdateStatusRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let order_id = parse_order_id(&order_id)?;
    let Json(body) = payload?;

    let store = &services.store;
    load_owned(&ctx, "Unauthorized to update this order", || store.find_order(order_id)).await?;

    let order = store
        .update_order_status(order_id, &OrderStatus::new(body.status))
        .await?;

    tracing::info!(%order_id, status = %order.status, "order status updated");
    Ok(Json(order).into_response())
}

/// All orders of the caller's business, newest first, with items and bill.
pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<BusinessContext>,
) -> Result<Response, ApiError> {
    let orders = services.store.list_orders(ctx.business_id()).await?;
    Ok(Json(orders).into_response())
}
