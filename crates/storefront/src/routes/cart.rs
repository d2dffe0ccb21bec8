//! Cart route handlers.
//!
//! Every handler answers with the full cart so clients never compute totals.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use cakeshop_core::ProductId;

use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireAuth;
use crate::models::CartView;
use crate::services::cart::CartService;
use crate::state::AppState;

const fn default_quantity() -> i64 {
    1
}

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

/// Quantity update body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

/// Show the cart.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<Json<CartView>, AppError> {
    let cart = CartService::new(state.pool())
        .snapshot(claims.user_id())
        .await?;
    Ok(Json(cart))
}

/// Add a product to the cart.
#[instrument(skip(state, claims), fields(user_id = %claims.sub))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ApiJson(body): ApiJson<AddToCartRequest>,
) -> Result<Json<CartView>, AppError> {
    let cart = CartService::new(state.pool())
        .add(claims.user_id(), body.product_id, body.quantity)
        .await?;
    Ok(Json(cart))
}

/// Change a line's quantity; zero or less removes it.
#[instrument(skip(state, claims), fields(user_id = %claims.sub))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ApiPath(product_id): ApiPath<ProductId>,
    ApiJson(body): ApiJson<UpdateQuantityRequest>,
) -> Result<Json<CartView>, AppError> {
    let cart = CartService::new(state.pool())
        .set_quantity(claims.user_id(), product_id, body.quantity)
        .await?;
    Ok(Json(cart))
}

/// Remove a line.
#[instrument(skip(state, claims), fields(user_id = %claims.sub))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Json<CartView>, AppError> {
    let cart = CartService::new(state.pool())
        .remove(claims.user_id(), product_id)
        .await?;
    Ok(Json(cart))
}
