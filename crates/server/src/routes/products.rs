//! Product route handlers.
//!
//! CRUD over the user's own products plus the two ERP sync operations
//! (import a page from Bling, export one product to Bling). Every query is
//! scoped to the logged-in user; another user's product ids answer 404.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use productgen_core::ProductId;

use crate::db::ProductRepository;
use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::models::product::{Product, ProductInput};
use crate::services::erp::ErpService;
use crate::state::AppState;

/// First page when the import request does not pick one.
const DEFAULT_IMPORT_PAGE: u32 = 1;
/// Bling caps page size at 100.
const MAX_IMPORT_LIMIT: u32 = 100;

/// Request body for `POST /api/products/import`.
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// List the user's products, newest first.
///
/// `GET /api/products`
///
/// # Errors
///
/// Returns 500 on database failure.
pub async fn list(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<Json<Vec<Product>>, AppError> {
    let repo = ProductRepository::new(state.pool());
    let products = repo.list_for_user(current.id).await?;

    Ok(Json(products))
}

/// Create a product.
///
/// `POST /api/products`
///
/// # Errors
///
/// Returns 400 when the title is blank.
#[instrument(skip(state, current, input), fields(user_id = %current.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    validate_input(&input)?;

    let repo = ProductRepository::new(state.pool());
    let product = repo.create(current.id, &input).await?;

    Ok((StatusCode::CREATED, Json(product)))
}

/// Get one product.
///
/// `GET /api/products/{id}`
///
/// # Errors
///
/// Returns 404 when the product does not exist or belongs to another user.
pub async fn get(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, AppError> {
    let repo = ProductRepository::new(state.pool());
    let product = repo
        .get(current.id, id)
        .await?
        .ok_or_else(|| AppError::NotFound("product".to_string()))?;

    Ok(Json(product))
}

/// Replace a product.
///
/// `PUT /api/products/{id}`
///
/// # Errors
///
/// Returns 400 when the title is blank, 404 when the product is not the
/// caller's.
#[instrument(skip(state, current, input), fields(user_id = %current.id, product_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>, AppError> {
    validate_input(&input)?;

    let repo = ProductRepository::new(state.pool());
    let product = repo
        .update(current.id, id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound("product".to_string()))?;

    Ok(Json(product))
}

/// Delete a product.
///
/// `DELETE /api/products/{id}`
///
/// # Errors
///
/// Returns 404 when the product is not the caller's.
#[instrument(skip(state, current), fields(user_id = %current.id, product_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<ProductId>,
) -> Result<Json<Value>, AppError> {
    let repo = ProductRepository::new(state.pool());
    if !repo.delete(current.id, id).await? {
        return Err(AppError::NotFound("product".to_string()));
    }

    Ok(Json(json!({ "success": true })))
}

/// Import a page of products from Bling.
///
/// `POST /api/products/import`
///
/// # Errors
///
/// Returns 409 when the Bling account is not connected or needs
/// reconnecting, 502 when Bling answers with an error.
#[instrument(skip(state, current), fields(user_id = %current.id))]
pub async fn import(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Json(request): Json<ImportRequest>,
) -> Result<Json<Value>, AppError> {
    let page = request.page.unwrap_or(DEFAULT_IMPORT_PAGE).max(1);
    let limit = request
        .limit
        .unwrap_or(MAX_IMPORT_LIMIT)
        .clamp(1, MAX_IMPORT_LIMIT);

    let erp = ErpService::new(state.pool(), state.bling(), state.cipher());
    let imported = erp.import_products(current.id, page, limit).await?;

    Ok(Json(json!({ "imported": imported })))
}

/// Export a product to Bling.
///
/// `POST /api/products/{id}/export`
///
/// # Errors
///
/// Returns 404 for someone else's product, 409 when the account is not
/// connected, 502 when Bling rejects the payload.
#[instrument(skip(state, current), fields(user_id = %current.id, product_id = %id))]
pub async fn export(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, AppError> {
    let erp = ErpService::new(state.pool(), state.bling(), state.cipher());
    let product = erp.export_product(current.id, id).await?;

    Ok(Json(product))
}

fn validate_input(input: &ProductInput) -> Result<(), AppError> {
    if input.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_input() -> ProductInput {
        ProductInput {
            title: "  ".to_string(),
            description: None,
            image_url: None,
            gallery_images: Vec::new(),
            supplier: None,
            mercado_livre_category: None,
            magalu_category: None,
            bling_category: None,
            mercado_livre_attributes: json!({}),
            magalu_attributes: json!({}),
            suggested_price: None,
            status: None,
            group_id: None,
            group_name: None,
            bling_sku: None,
            linked_marketplaces: Vec::new(),
            ncm: None,
            weight_kg: None,
            width_cm: None,
            height_cm: None,
            depth_cm: None,
        }
    }

    #[test]
    fn test_blank_title_rejected() {
        let result = validate_input(&blank_input());
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_titled_input_accepted() {
        let mut input = blank_input();
        input.title = "Fone Bluetooth".to_string();
        assert!(validate_input(&input).is_ok());
    }
}
