use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;

use dinehub_billing::{NewBill, StoreLink, StoreLinkUpsert, TaxRates};
use dinehub_infra::Upserted;

use crate::app::errors::ApiError;
use crate::app::routes::common::parse_order_id;
use crate::app::{dto, services::AppServices};
use crate::authz::load_owned;
use crate::context::BusinessContext;

pub fn router() -> Router {
    Router::new()
        .route("/bill", post(create_bill))
        .route("/bill/:order_id", get(get_bill))
        .route("/bill/:order_id/update-charges", put(update_charges))
        .route("/bill/:order_id/store-link", put(upsert_store_link))
        .route("/bill/:order_id/link", get(get_store_link))
}

pub async fn create_bill(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<BusinessContext>,
    payload: Result<Json<dto::CreateBillRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload?;
    let store = &services.store;

    let order = load_owned(&ctx, "Unauthorized to create bill for this order", || {
        store.find_order(body.order_id)
    })
    .await?;

    let bill = store.create_bill(NewBill::with_rates(&order, body.tax_rates)).await?;

    tracing::info!(order_id = %bill.order_id, bill_id = %bill.id, "bill created");
    Ok((StatusCode::CREATED, Json(bill)).into_response())
}

/// The order's bill, or `null` when it has none.
pub async fn get_bill(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<BusinessContext>,
    Path(order_id): Path<String>,
) -> Result<Response, ApiError> {
    let order_id = parse_order_id(&order_id)?;
    let store = &services.store;

    load_owned(&ctx, "Unauthorized access", || store.find_order(order_id)).await?;

    let bill = store.find_bill(order_id).await?;
    Ok(Json(bill).into_response())
}

pub async fn update_charges(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<BusinessContext>,
    Path(order_id): Path<String>,
    payload: Result<Json<TaxRates>, JsonRejection>,
) -> Result<Response, ApiError> {
    let order_id = parse_order_id(&order_id)?;
    let Json(rates) = payload?;
    let store = &services.store;

    load_owned(&ctx, "Unauthorized to update charges", || store.find_order(order_id)).await?;

    let bill = store.update_bill_charges(order_id, rates).await?;
    Ok(Json(bill).into_response())
}

/// Record where the receipt for an order is hosted; creates the bill if needed.
pub async fn upsert_store_link(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<BusinessContext>,
    Path(order_id): Path<String>,
    payload: Result<Json<dto::StoreLinkRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let order_id = parse_order_id(&order_id)?;
    let Json(body) = payload?;
    let store = &services.store;

    let order = load_owned(&ctx, "Unauthorized or order not found", || store.find_order(order_id)).await?;

    let link = StoreLink::from(body).stamp(Utc::now());
    let outcome = store
        .upsert_store_link(StoreLinkUpsert::for_order(&order, link))
        .await?;

    let response = match outcome {
        Upserted::Created(bill) => {
            tracing::info!(%order_id, bill_id = %bill.id, "bill created with store link");
            (
                StatusCode::CREATED,
                Json(dto::MessageResponse {
                    message: "Bill created with store link",
                }),
            )
        }
        Upserted::Updated(_) => (
            StatusCode::OK,
            Json(dto::MessageResponse {
                message: "Bill store link updated successfully",
            }),
        ),
    };
    Ok(response.into_response())
}

pub async fn get_store_link(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<BusinessContext>,
    Path(order_id): Path<String>,
) -> Result<Response, ApiError> {
    let order_id = parse_order_id(&order_id)?;
    let store = &services.store;

    let link = load_owned(&ctx, "Unauthorized or bill not found", || store.find_bill_link(order_id)).await?;

    Ok(Json(dto::BillLinkResponse::from(link)).into_response())
}
