//! Catalog route handlers: public reads and admin CRUD.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cakeshop_core::{Price, ProductId};

use crate::db::ProductRepository;
use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::RequireAdmin;
use crate::models::{NewProduct, Product};
use crate::state::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Product create/replace body. A negative price is rejected while parsing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProductRequest {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub image: String,
    pub category: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl ProductRequest {
    /// Trim fields and require them to be non-empty.
    fn validate(self) -> Result<NewProduct, AppError> {
        let field = |name: &str, value: String| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Err(AppError::BadRequest(format!("{name} is required")))
            } else {
                Ok(trimmed.to_owned())
            }
        };

        Ok(NewProduct {
            name: field("name", self.name)?,
            description: field("description", self.description)?,
            price: self.price,
            image: field("image", self.image)?,
            category: field("category", self.category)?,
        })
    }
}

/// The whole catalog.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(ProductRepository::new(state.pool()).list().await?))
}

/// One product.
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<Product>, AppError> {
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

/// Substring search on name/description with an optional category filter.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<Product>>, AppError> {
    let text = query.query.as_deref().map(str::trim).filter(|q| !q.is_empty());
    let category = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let products = ProductRepository::new(state.pool())
        .search(text, category)
        .await?;
    Ok(Json(products))
}

/// Create a product.
#[instrument(skip(state, claims), fields(admin_id = %claims.sub))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(claims): RequireAdmin,
    ApiJson(body): ApiJson<ProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    let product = body.validate()?;
    let created = ProductRepository::new(state.pool()).create(&product).await?;
    tracing::info!(product_id = %created.id, "Product created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Replace a product's fields.
#[instrument(skip(state, claims), fields(admin_id = %claims.sub))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(claims): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(body): ApiJson<ProductRequest>,
) -> Result<Json<Product>, AppError> {
    let product = body.validate()?;
    ProductRepository::new(state.pool())
        .update(id, &product)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

/// Delete a product.
#[instrument(skip(state, claims), fields(admin_id = %claims.sub))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(claims): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<MessageResponse>, AppError> {
    if !ProductRepository::new(state.pool()).delete(id).await? {
        return Err(AppError::NotFound("Product not found".to_string()));
    }
    Ok(Json(MessageResponse {
        message: "Product deleted successfully",
    }))
}

/// Admin view of one product.
pub async fn admin_show(
    state: State<AppState>,
    RequireAdmin(_): RequireAdmin,
    id: ApiPath<ProductId>,
) -> Result<Json<Product>, AppError> {
    show(state, id).await
}

/// Admin view of the catalog.
pub async fn admin_list(
    state: State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<Product>>, AppError> {
    list(state).await
}
