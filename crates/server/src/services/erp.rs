//! Server-side Bling flows on behalf of a logged-in user.
//!
//! This service owns the token freshness policy: before any ERP call the
//! stored access token is checked against its expiry timestamp and refreshed
//! through the OAuth refresh grant when it is about to lapse. The proxy
//! endpoint deliberately bypasses this layer; browser-held tokens are the
//! caller's problem.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde_json::Value;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use productgen_core::{ProductId, UserId};

use crate::bling::types::{
    CreatedProduct, Dimensions, ListedProduct, ProductPayload, Taxation, TokenResponse,
};
use crate::bling::{BlingClient, BlingError, types};
use crate::db::products::ImportedProduct;
use crate::db::{ProductRepository, RepositoryError};
use crate::models::product::Product;
use crate::services::credentials::{CredentialCipher, CredentialError, CredentialStore};

/// Refresh the access token when it expires within this many seconds.
const TOKEN_EXPIRY_SKEW_SECONDS: i64 = 60;

/// Errors that can occur in the ERP service.
#[derive(Debug, thiserror::Error)]
pub enum ErpError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] RepositoryError),

    /// Credential sealing or storage error.
    #[error("credential error: {0}")]
    Credentials(#[from] CredentialError),

    /// Bling API error.
    #[error("Bling API error: {0}")]
    Bling(#[from] BlingError),

    /// Export payload could not be encoded.
    #[error("payload encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// The account has never completed the OAuth flow.
    #[error("Bling account not connected")]
    NotConnected,

    /// Token refresh failed; the account must redo the OAuth flow.
    #[error("Bling connection expired, reconnect in settings")]
    ReconnectRequired,

    /// Product not found (or owned by someone else).
    #[error("product not found")]
    ProductNotFound,
}

/// Service for ERP product sync using stored credentials.
pub struct ErpService<'a> {
    pool: &'a PgPool,
    bling: &'a BlingClient,
    cipher: &'a CredentialCipher,
}

impl<'a> ErpService<'a> {
    /// Create a new ERP service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, bling: &'a BlingClient, cipher: &'a CredentialCipher) -> Self {
        Self {
            pool,
            bling,
            cipher,
        }
    }

    /// Pull a page of products from Bling and upsert them locally.
    ///
    /// Rows are keyed by the Bling product id, so re-importing the same page
    /// updates rather than duplicates. Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is not connected, the token cannot be
    /// refreshed, or the API call or a database write fails.
    #[instrument(skip(self))]
    pub async fn import_products(
        &self,
        user_id: UserId,
        page: u32,
        limit: u32,
    ) -> Result<u64, ErpError> {
        let access_token = self.fresh_access_token(user_id).await?;
        let raw = self.bling.list_products(&access_token, page, limit).await?;

        let items = raw
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let repo = ProductRepository::new(self.pool);
        let mut imported = 0u64;

        for item in items {
            let Some(row) = imported_product_from_value(&item) else {
                warn!(user_id = %user_id, "Skipping Bling product without an id");
                continue;
            };
            repo.upsert_imported(user_id, &row).await?;
            imported += 1;
        }

        info!(user_id = %user_id, page, imported, "Imported products from Bling");
        Ok(imported)
    }

    /// Push a local product to Bling and mark it exported.
    ///
    /// Creates the product in Bling on first export; later exports update the
    /// existing Bling product instead of creating a duplicate.
    ///
    /// # Errors
    ///
    /// Returns `ErpError::ProductNotFound` when the product does not exist or
    /// belongs to another user, plus the same failure modes as imports.
    #[instrument(skip(self))]
    pub async fn export_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Product, ErpError> {
        let repo = ProductRepository::new(self.pool);
        let product = repo
            .get(user_id, product_id)
            .await?
            .ok_or(ErpError::ProductNotFound)?;

        let access_token = self.fresh_access_token(user_id).await?;

        let payload = export_payload(&product);
        let payload_json = serde_json::to_value(&payload)?;

        let bling_product_id = match &product.bling_product_id {
            Some(existing) => {
                self.bling
                    .update_product(&access_token, existing, &payload_json)
                    .await?;
                existing.clone()
            }
            None => {
                let raw = self.bling.create_product(&access_token, &payload_json).await?;
                let created: CreatedProduct = types::from_value(raw)?;
                created.data.id.to_string()
            }
        };

        let exported = repo
            .mark_exported(
                user_id,
                product_id,
                &bling_product_id,
                payload.code.as_deref(),
                &payload_json,
            )
            .await?
            .ok_or(ErpError::ProductNotFound)?;

        info!(
            user_id = %user_id,
            product_id = %product_id,
            bling_product_id,
            "Exported product to Bling"
        );
        Ok(exported)
    }

    /// Return an access token that is valid for at least the skew window.
    ///
    /// Refreshes through the OAuth refresh grant when the stored token is
    /// stale. A failed refresh drops the connected flag so the UI prompts
    /// the user to reconnect instead of silently retrying forever.
    async fn fresh_access_token(&self, user_id: UserId) -> Result<String, ErpError> {
        let store = CredentialStore::new(self.pool, self.cipher);
        let creds = store.load(user_id).await?.ok_or(ErpError::NotConnected)?;

        if !creds.connected || !creds.has_token_material() {
            return Err(ErpError::NotConnected);
        }

        let now = Utc::now();
        if !creds.token_stale_at(now, Duration::seconds(TOKEN_EXPIRY_SKEW_SECONDS))
            && let Some(access_token) = creds.access_token
        {
            return Ok(access_token);
        }

        let Some(refresh_token) = creds.refresh_token else {
            store.mark_disconnected(user_id).await?;
            return Err(ErpError::ReconnectRequired);
        };

        let refreshed: Result<TokenResponse, BlingError> = self
            .bling
            .refresh_token(&creds.client_id, &creds.client_secret, &refresh_token)
            .await
            .and_then(types::from_value);

        let token = match refreshed {
            Ok(token) => token,
            Err(err) => {
                warn!(
                    user_id = %user_id,
                    error = %err,
                    "Token refresh failed, marking Bling account disconnected"
                );
                store.mark_disconnected(user_id).await?;
                return Err(ErpError::ReconnectRequired);
            }
        };

        let expires_at = now + Duration::seconds(token.expires_in);
        store
            .save_tokens(
                user_id,
                &token.access_token,
                token.refresh_token.as_deref(),
                expires_at,
            )
            .await?;

        info!(user_id = %user_id, "Refreshed Bling access token");
        Ok(token.access_token)
    }
}

/// Map one entry of a Bling product listing to an upsert row.
///
/// Returns `None` when the entry has no usable id, which would make the row
/// impossible to key.
fn imported_product_from_value(item: &Value) -> Option<ImportedProduct> {
    let listed: ListedProduct = serde_json::from_value(item.clone()).ok()?;

    Some(ImportedProduct {
        bling_product_id: listed.id.to_string(),
        title: listed.name,
        sku: listed.code.filter(|code| !code.is_empty()),
        price: listed.price.and_then(Decimal::from_f64),
        payload: item.clone(),
    })
}

/// Build the Bling product payload from a local product.
fn export_payload(product: &Product) -> ProductPayload {
    ProductPayload {
        name: product.title.clone(),
        code: product.bling_sku.clone(),
        kind: "P".to_string(),
        situation: "A".to_string(),
        format: "S".to_string(),
        price: product.suggested_price.as_ref().and_then(Decimal::to_f64),
        short_description: product.description.clone(),
        net_weight: product.weight_kg.as_ref().and_then(Decimal::to_f64),
        dimensions: dimensions_payload(product),
        taxation: product
            .ncm
            .clone()
            .map(|ncm| Taxation { ncm: Some(ncm) }),
    }
}

fn dimensions_payload(product: &Product) -> Option<Dimensions> {
    if product.width_cm.is_none() && product.height_cm.is_none() && product.depth_cm.is_none() {
        return None;
    }

    Some(Dimensions {
        width: product.width_cm.as_ref().and_then(Decimal::to_f64),
        height: product.height_cm.as_ref().and_then(Decimal::to_f64),
        depth: product.depth_cm.as_ref().and_then(Decimal::to_f64),
    })
}
