//! Product domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use productgen_core::{ProductId, ProductStatus, UserId};

/// A product listing owned by a user.
///
/// Serialized directly in API responses; field names match the table columns.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Owning user.
    pub user_id: UserId,
    /// Listing title.
    pub title: String,
    /// Long-form description.
    pub description: Option<String>,
    /// Primary image URL.
    pub image_url: Option<String>,
    /// Additional image URLs.
    pub gallery_images: Vec<String>,
    /// Supplier name.
    pub supplier: Option<String>,
    /// Mercado Livre category path.
    pub mercado_livre_category: Option<String>,
    /// Magalu category path.
    pub magalu_category: Option<String>,
    /// Bling category.
    pub bling_category: Option<String>,
    /// Marketplace-specific attributes (free-form JSON).
    pub mercado_livre_attributes: serde_json::Value,
    /// Marketplace-specific attributes (free-form JSON).
    pub magalu_attributes: serde_json::Value,
    /// Suggested sale price (BRL).
    pub suggested_price: Option<Decimal>,
    /// Listing lifecycle status.
    pub status: ProductStatus,
    /// Variation group ID, when part of a group.
    pub group_id: Option<String>,
    /// Variation group display name.
    pub group_name: Option<String>,
    /// Bling product ID once imported from or exported to the ERP.
    pub bling_product_id: Option<String>,
    /// Bling SKU code.
    pub bling_sku: Option<String>,
    /// Raw ERP product payload as imported (kept for diagnostics).
    pub bling_payload: Option<serde_json::Value>,
    /// Marketplaces this product is linked to.
    pub linked_marketplaces: Vec<String>,
    /// Mercosur NCM fiscal code.
    pub ncm: Option<String>,
    /// Shipping weight in kilograms.
    pub weight_kg: Option<Decimal>,
    /// Package width in centimeters.
    pub width_cm: Option<Decimal>,
    /// Package height in centimeters.
    pub height_cm: Option<Decimal>,
    /// Package depth in centimeters.
    pub depth_cm: Option<Decimal>,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Client payload for creating or replacing a product.
///
/// Only `title` is required; everything else defaults to empty.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub gallery_images: Vec<String>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub mercado_livre_category: Option<String>,
    #[serde(default)]
    pub magalu_category: Option<String>,
    #[serde(default)]
    pub bling_category: Option<String>,
    #[serde(default = "empty_object")]
    pub mercado_livre_attributes: serde_json::Value,
    #[serde(default = "empty_object")]
    pub magalu_attributes: serde_json::Value,
    #[serde(default)]
    pub suggested_price: Option<Decimal>,
    #[serde(default)]
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub bling_sku: Option<String>,
    #[serde(default)]
    pub linked_marketplaces: Vec<String>,
    #[serde(default)]
    pub ncm: Option<String>,
    #[serde(default)]
    pub weight_kg: Option<Decimal>,
    #[serde(default)]
    pub width_cm: Option<Decimal>,
    #[serde(default)]
    pub height_cm: Option<Decimal>,
    #[serde(default)]
    pub depth_cm: Option<Decimal>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_input_minimal() {
        let input: ProductInput = serde_json::from_str(r#"{"title": "Fone Bluetooth"}"#).unwrap();
        assert_eq!(input.title, "Fone Bluetooth");
        assert!(input.description.is_none());
        assert!(input.gallery_images.is_empty());
        assert!(input.mercado_livre_attributes.is_object());
        assert!(input.status.is_none());
    }

    #[test]
    fn test_product_input_full() {
        let input: ProductInput = serde_json::from_str(
            r#"{
                "title": "Fone Bluetooth",
                "description": "Som limpo",
                "gallery_images": ["https://img/1.jpg"],
                "suggested_price": "149.90",
                "status": "active",
                "weight_kg": 0.3
            }"#,
        )
        .unwrap();
        assert_eq!(input.description.as_deref(), Some("Som limpo"));
        assert_eq!(input.gallery_images.len(), 1);
        assert_eq!(input.status, Some(ProductStatus::Active));
        assert_eq!(
            input.suggested_price.unwrap(),
            Decimal::new(14990, 2)
        );
    }

    #[test]
    fn test_product_serializes_status_snake_case() {
        let product = Product {
            id: ProductId::new(1),
            user_id: UserId::new(2),
            title: "Caneca".to_string(),
            description: None,
            image_url: None,
            gallery_images: vec![],
            supplier: None,
            mercado_livre_category: None,
            magalu_category: None,
            bling_category: None,
            mercado_livre_attributes: serde_json::json!({}),
            magalu_attributes: serde_json::json!({}),
            suggested_price: None,
            status: ProductStatus::Draft,
            group_id: None,
            group_name: None,
            bling_product_id: None,
            bling_sku: None,
            bling_payload: None,
            linked_marketplaces: vec![],
            ncm: None,
            weight_kg: None,
            width_cm: None,
            height_cm: None,
            depth_cm: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["status"], "draft");
        assert_eq!(json["id"], 1);
        assert_eq!(json["user_id"], 2);
    }
}
