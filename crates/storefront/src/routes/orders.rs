//! Order and payment route handlers.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cakeshop_core::OrderId;

use crate::error::{AppError, add_breadcrumb};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::{AdminOrder, CardOnFile, Order, Payment};
use crate::services::orders::OrderService;
use crate::services::payments::{CardDetails, PaymentService};
use crate::state::AppState;

/// Checkout request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PlaceOrderRequest {
    pub payment_method: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub message: &'static str,
    pub order_id: OrderId,
    pub order: Order,
}

/// Admin status change body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Payment request body. Card fields are required for `card` and ignored
/// for `cash`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecordPaymentRequest {
    pub payment_method: String,
    pub card_number: Option<String>,
    pub expiry_date: Option<String>,
}

/// Card-on-file body.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SaveCardRequest {
    pub card_number: String,
    pub expiry_date: String,
}

/// Place an order from the caller's cart.
#[instrument(skip(state, claims), fields(user_id = %claims.sub))]
pub async fn place(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ApiJson(body): ApiJson<PlaceOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let order = OrderService::new(state.pool())
        .place(claims.user_id(), &body.payment_method)
        .await?;

    let order_id = order.id.to_string();
    add_breadcrumb("order", "Order placed", Some(&[("order_id", order_id.as_str())]));

    Ok((
        StatusCode::CREATED,
        Json(PlaceOrderResponse {
            message: "Order placed successfully",
            order_id: order.id,
            order,
        }),
    ))
}

/// The caller's orders, newest first.
pub async fn list_mine(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = OrderService::new(state.pool())
        .list_for_user(claims.user_id())
        .await?;
    Ok(Json(orders))
}

/// Record the payment for an order.
#[instrument(skip(state, claims, body), fields(user_id = %claims.sub))]
pub async fn pay(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ApiPath(order_id): ApiPath<OrderId>,
    ApiJson(body): ApiJson<RecordPaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let card = CardDetails {
        number: body.card_number.as_deref(),
        expiry: body.expiry_date.as_deref(),
    };
    let payment = PaymentService::new(state.pool())
        .record(order_id, &body.payment_method, card, &claims)
        .await?;

    Ok((StatusCode::CREATED, Json(payment)))
}

/// The payment of an order; `null` while unpaid.
pub async fn payment(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ApiPath(order_id): ApiPath<OrderId>,
) -> Result<Json<Option<Payment>>, AppError> {
    let payment = PaymentService::new(state.pool())
        .get(order_id, &claims)
        .await?;
    Ok(Json(payment))
}

/// Save the caller's card on file.
#[instrument(skip(state, claims, body), fields(user_id = %claims.sub))]
pub async fn save_card(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ApiJson(body): ApiJson<SaveCardRequest>,
) -> Result<Json<CardOnFile>, AppError> {
    let card = CardDetails {
        number: Some(&body.card_number),
        expiry: Some(&body.expiry_date),
    };
    let saved = PaymentService::new(state.pool())
        .save_card(&claims, card)
        .await?;
    Ok(Json(saved))
}

/// Every order with customer and payment.
pub async fn admin_list(
    State(state): State<AppState>,
    RequireAdmin(claims): RequireAdmin,
) -> Result<Json<Vec<AdminOrder>>, AppError> {
    let orders = OrderService::new(state.pool()).list_all(&claims).await?;
    Ok(Json(orders))
}

/// Change an order's status.
#[instrument(skip(state, claims), fields(admin_id = %claims.sub))]
pub async fn admin_update_status(
    State(state): State<AppState>,
    RequireAdmin(claims): RequireAdmin,
    ApiPath(order_id): ApiPath<OrderId>,
    ApiJson(body): ApiJson<UpdateStatusRequest>,
) -> Result<Json<AdminOrder>, AppError> {
    let order = OrderService::new(state.pool())
        .update_status(order_id, &body.status, &claims)
        .await?;
    Ok(Json(order))
}

/// Every payment.
pub async fn admin_payments(
    State(state): State<AppState>,
    RequireAdmin(claims): RequireAdmin,
) -> Result<Json<Vec<Payment>>, AppError> {
    Ok(Json(PaymentService::new(state.pool()).list(&claims).await?))
}

/// Every card on file.
pub async fn admin_cards(
    State(state): State<AppState>,
    RequireAdmin(claims): RequireAdmin,
) -> Result<Json<Vec<CardOnFile>>, AppError> {
    Ok(Json(PaymentService::new(state.pool()).list_cards(&claims).await?))
}
