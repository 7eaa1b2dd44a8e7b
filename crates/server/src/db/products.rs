//! Product repository for database operations.
//!
//! All reads and writes are scoped by `user_id`; a row belonging to another
//! user behaves exactly like a missing row.

use rust_decimal::Decimal;
use sqlx::PgPool;

use productgen_core::{ProductId, ProductStatus, UserId};

use super::RepositoryError;
use crate::models::product::{Product, ProductInput};

/// Product fields pulled from an ERP listing during import.
#[derive(Debug, Clone)]
pub struct ImportedProduct {
    pub bling_product_id: String,
    pub title: String,
    pub sku: Option<String>,
    pub price: Option<Decimal>,
    pub payload: serde_json::Value,
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a user's products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Get one of the user's products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        user_id: UserId,
        id: ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        let product =
            sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .fetch_optional(self.pool)
                .await?;

        Ok(product)
    }

    /// Create a product for a user.
    ///
    /// Status comes from the input when given, otherwise `draft`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        user_id: UserId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            INSERT INTO products (
                user_id, title, description, image_url, gallery_images, supplier,
                mercado_livre_category, magalu_category, bling_category,
                mercado_livre_attributes, magalu_attributes, suggested_price, status,
                group_id, group_name, bling_sku, linked_marketplaces, ncm,
                weight_kg, width_cm, height_cm, depth_cm
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21, $22)
            RETURNING *
            ",
        )
        .bind(user_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.image_url)
        .bind(&input.gallery_images)
        .bind(&input.supplier)
        .bind(&input.mercado_livre_category)
        .bind(&input.magalu_category)
        .bind(&input.bling_category)
        .bind(&input.mercado_livre_attributes)
        .bind(&input.magalu_attributes)
        .bind(input.suggested_price)
        .bind(input.status.unwrap_or_default())
        .bind(&input.group_id)
        .bind(&input.group_name)
        .bind(&input.bling_sku)
        .bind(&input.linked_marketplaces)
        .bind(&input.ncm)
        .bind(input.weight_kg)
        .bind(input.width_cm)
        .bind(input.height_cm)
        .bind(input.depth_cm)
        .fetch_one(self.pool)
        .await?;

        Ok(product)
    }

    /// Replace one of the user's products with new field values.
    ///
    /// Returns `None` when the product does not exist or belongs to someone
    /// else. A `None` status in the input keeps the current one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(
        &self,
        user_id: UserId,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            UPDATE products
            SET title = $3, description = $4, image_url = $5, gallery_images = $6,
                supplier = $7, mercado_livre_category = $8, magalu_category = $9,
                bling_category = $10, mercado_livre_attributes = $11,
                magalu_attributes = $12, suggested_price = $13,
                status = COALESCE($14, status), group_id = $15, group_name = $16,
                bling_sku = $17, linked_marketplaces = $18, ncm = $19,
                weight_kg = $20, width_cm = $21, height_cm = $22, depth_cm = $23,
                updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            ",
        )
        .bind(id)
        .bind(user_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.image_url)
        .bind(&input.gallery_images)
        .bind(&input.supplier)
        .bind(&input.mercado_livre_category)
        .bind(&input.magalu_category)
        .bind(&input.bling_category)
        .bind(&input.mercado_livre_attributes)
        .bind(&input.magalu_attributes)
        .bind(input.suggested_price)
        .bind(input.status)
        .bind(&input.group_id)
        .bind(&input.group_name)
        .bind(&input.bling_sku)
        .bind(&input.linked_marketplaces)
        .bind(&input.ncm)
        .bind(input.weight_kg)
        .bind(input.width_cm)
        .bind(input.height_cm)
        .bind(input.depth_cm)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Delete one of the user's products.
    ///
    /// Returns `false` when the product does not exist or belongs to someone
    /// else.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, user_id: UserId, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert or refresh a product imported from the ERP.
    ///
    /// Rows are keyed by `(user_id, bling_product_id)`; re-importing the same
    /// listing updates title, sku, price, and the raw payload in place.
    /// Imported rows always carry status `active`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_imported(
        &self,
        user_id: UserId,
        imported: &ImportedProduct,
    ) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            INSERT INTO products (
                user_id, title, bling_product_id, bling_sku, suggested_price,
                bling_payload, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, bling_product_id) WHERE bling_product_id IS NOT NULL
            DO UPDATE SET
                title = EXCLUDED.title,
                bling_sku = EXCLUDED.bling_sku,
                suggested_price = EXCLUDED.suggested_price,
                bling_payload = EXCLUDED.bling_payload,
                status = EXCLUDED.status,
                updated_at = now()
            RETURNING *
            ",
        )
        .bind(user_id)
        .bind(&imported.title)
        .bind(&imported.bling_product_id)
        .bind(&imported.sku)
        .bind(imported.price)
        .bind(&imported.payload)
        .bind(ProductStatus::Active)
        .fetch_one(self.pool)
        .await?;

        Ok(product)
    }

    /// Record a successful export: store the ERP ids and flip the status.
    ///
    /// Returns `None` when the product does not exist or belongs to someone
    /// else.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_exported(
        &self,
        user_id: UserId,
        id: ProductId,
        bling_product_id: &str,
        bling_sku: Option<&str>,
        payload: &serde_json::Value,
    ) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            UPDATE products
            SET bling_product_id = $3,
                bling_sku = COALESCE($4, bling_sku),
                bling_payload = $5,
                status = $6,
                updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            ",
        )
        .bind(id)
        .bind(user_id)
        .bind(bling_product_id)
        .bind(bling_sku)
        .bind(payload)
        .bind(ProductStatus::Exported)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }
}
