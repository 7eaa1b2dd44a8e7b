//! Typed views over Bling API payloads.
//!
//! The client returns raw JSON; these types exist for the server-side flows
//! that need to read specific fields (token storage, product sync). Field
//! names on the wire are Bling's Portuguese ones.

use serde::{Deserialize, Serialize};

use super::BlingError;

/// Decode a raw Bling payload into a typed view.
///
/// # Errors
///
/// Returns `BlingError::Parse` when the payload does not match `T`.
pub fn from_value<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
) -> Result<T, BlingError> {
    serde_json::from_value(value).map_err(|e| BlingError::Parse(format!("unexpected payload: {e}")))
}

/// OAuth token pair returned by the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
    /// A refresh response may omit this; keep the previous one then.
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// One product as listed by `GET /produtos`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListedProduct {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "codigo", default)]
    pub code: Option<String>,
    #[serde(rename = "preco", default)]
    pub price: Option<f64>,
}

/// Envelope for `POST /produtos` and `PUT /produtos/{id}` responses.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedProduct {
    pub data: CreatedProductData,
}

/// Identifier block inside a create/update response.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedProductData {
    pub id: i64,
}

/// Product payload for `POST /produtos`.
///
/// Only the fields ProductGen fills; `None` fields are left off the wire.
#[derive(Debug, Clone, Serialize)]
pub struct ProductPayload {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "codigo", skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// "P" for a physical product.
    #[serde(rename = "tipo")]
    pub kind: String,
    /// "A" for active.
    #[serde(rename = "situacao")]
    pub situation: String,
    /// "S" for a simple (non-variant) product.
    #[serde(rename = "formato")]
    pub format: String,
    #[serde(rename = "preco", skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(rename = "descricaoCurta", skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(rename = "pesoLiquido", skip_serializing_if = "Option::is_none")]
    pub net_weight: Option<f64>,
    #[serde(rename = "dimensoes", skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    #[serde(rename = "tributacao", skip_serializing_if = "Option::is_none")]
    pub taxation: Option<Taxation>,
}

/// Physical dimensions in centimeters.
#[derive(Debug, Clone, Serialize)]
pub struct Dimensions {
    #[serde(rename = "largura", skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(rename = "altura", skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(rename = "profundidade", skip_serializing_if = "Option::is_none")]
    pub depth: Option<f64>,
}

/// Brazilian tax classification block.
#[derive(Debug, Clone, Serialize)]
pub struct Taxation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ncm: Option<String>,
}
