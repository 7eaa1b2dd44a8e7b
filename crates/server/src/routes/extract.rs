//! AI product-data extraction route handlers.
//!
//! Three OpenAI-backed endpoints: extract listing data from a product photo
//! (vision), extract it from a marketplace URL, and generate ad copy. All
//! answer 503 when `OPENAI_API_KEY` is not configured.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::instrument;

use productgen_core::Price;

use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::openai::types::ChatMessage;
use crate::openai::{OpenAiClient, OpenAiError};
use crate::state::AppState;

/// Prompt for extracting listing data from a product photo.
const IMAGE_EXTRACTION_PROMPT: &str = r#"You are an e-commerce listing specialist. Analyze this product image and extract every detail you can.

Be precise and thorough:

1. Title: an attractive, complete product title (60-80 characters) including the product name, its main characteristics, and the brand when visible.
2. Description: a professional description (300-500 characters) covering what the product is, its main features and benefits, materials and finish, and who it is for.
3. NCM: the most appropriate 8-digit Brazilian NCM code for this kind of product.
4. Estimated dimensions: realistic weight in kg, and width, height, and depth in cm.
5. Suggested price: a fair retail price in BRL.

Respond with valid JSON only:
{
  "title": "...",
  "description": "...",
  "ncm": "12345678",
  "weight_kg": 0.5,
  "width_cm": 10,
  "height_cm": 15,
  "depth_cm": 5,
  "suggested_price": 99.90
}"#;

/// Request body for `POST /api/extract/image`.
#[derive(Debug, Deserialize)]
pub struct ExtractImageRequest {
    pub image_url: String,
}

/// Request body for `POST /api/extract/url`.
#[derive(Debug, Deserialize)]
pub struct ExtractUrlRequest {
    pub url: String,
}

/// Request body for `POST /api/ads/generate`.
#[derive(Debug, Deserialize)]
pub struct GenerateAdRequest {
    pub product_name: String,
    pub description: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub features: Option<String>,
}

/// Listing data extracted by the model. Every field is optional; the model
/// fills what it can see.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ExtractedProduct {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ncm: Option<String>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub width_cm: Option<f64>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub depth_cm: Option<f64>,
    #[serde(default)]
    pub suggested_price: Option<f64>,
}

/// URL extraction adds the listing's own images, brand, and category.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UrlExtraction {
    #[serde(flatten)]
    pub product: ExtractedProduct,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Generated ad copy.
#[derive(Debug, Serialize)]
pub struct AdResponse {
    pub ad_text: String,
}

/// Extract listing data from a product photo.
///
/// `POST /api/extract/image`
///
/// # Errors
///
/// Returns 400 for a blank URL, 502 when the model call or its output
/// fails, 503 when extraction is not configured.
#[instrument(skip(state, request))]
pub async fn from_image(
    State(state): State<AppState>,
    RequireUser(_current): RequireUser,
    Json(request): Json<ExtractImageRequest>,
) -> Result<Json<ExtractedProduct>, AppError> {
    if request.image_url.trim().is_empty() {
        return Err(AppError::BadRequest("image_url is required".to_string()));
    }
    let openai = require_openai(&state)?;

    let messages = vec![ChatMessage::user_with_image(
        IMAGE_EXTRACTION_PROMPT,
        request.image_url,
    )];
    let content = openai.chat_json(messages).await?;

    Ok(Json(parse_model_json(&content)?))
}

/// Extract listing data from a marketplace URL.
///
/// `POST /api/extract/url`
///
/// # Errors
///
/// Same failure modes as image extraction.
#[instrument(skip(state, request))]
pub async fn from_url(
    State(state): State<AppState>,
    RequireUser(_current): RequireUser,
    Json(request): Json<ExtractUrlRequest>,
) -> Result<Json<UrlExtraction>, AppError> {
    if request.url.trim().is_empty() {
        return Err(AppError::BadRequest("url is required".to_string()));
    }
    let openai = require_openai(&state)?;

    let messages = vec![ChatMessage::user(url_extraction_prompt(&request.url))];
    let content = openai.chat_json(messages).await?;

    Ok(Json(parse_model_json(&content)?))
}

/// Generate marketplace ad copy for a product.
///
/// `POST /api/ads/generate`
///
/// # Errors
///
/// Returns 400 when name or description is blank, plus the same upstream
/// failure modes as extraction.
#[instrument(skip(state, request))]
pub async fn generate_ad(
    State(state): State<AppState>,
    RequireUser(_current): RequireUser,
    Json(request): Json<GenerateAdRequest>,
) -> Result<Json<AdResponse>, AppError> {
    if request.product_name.trim().is_empty() || request.description.trim().is_empty() {
        return Err(AppError::BadRequest(
            "product_name and description are required".to_string(),
        ));
    }
    let openai = require_openai(&state)?;

    let messages = vec![ChatMessage::user(ad_prompt(&request))];
    let ad_text = openai.chat_text(messages).await?;

    Ok(Json(AdResponse { ad_text }))
}

fn require_openai(state: &AppState) -> Result<&OpenAiClient, AppError> {
    state
        .openai()
        .ok_or_else(|| AppError::Unavailable("AI extraction is not configured".to_string()))
}

/// Parse model output, surfacing shape drift as an upstream parse error.
fn parse_model_json<T: DeserializeOwned>(content: &str) -> Result<T, AppError> {
    serde_json::from_str(content).map_err(|e| {
        AppError::OpenAi(OpenAiError::Parse(format!("model response: {e}")))
    })
}

fn url_extraction_prompt(url: &str) -> String {
    format!(
        r#"You are a web scraping and e-commerce specialist. Analyze this product listing URL and extract every piece of information available:

URL: {url}

Be thorough:

1. The complete product title as it appears in the listing.
2. A detailed description with everything the listing says.
3. The exact price in BRL.
4. The NCM code if present, otherwise suggest the most appropriate one.
5. Weight in kg (estimate when missing).
6. Dimensions in cm (width, height, depth).
7. All product image URLs.
8. The brand, when stated.
9. The product category.

Respond with valid JSON only:
{{
  "title": "...",
  "description": "...",
  "suggested_price": 99.90,
  "ncm": "12345678",
  "weight_kg": 0.5,
  "width_cm": 10,
  "height_cm": 15,
  "depth_cm": 5,
  "images": ["url1", "url2"],
  "brand": "...",
  "category": "..."
}}"#
    )
}

fn ad_prompt(request: &GenerateAdRequest) -> String {
    let mut prompt = format!(
        "You are a copywriter for Brazilian marketplace listings. Write persuasive, \
         professional ad copy in Portuguese for this product.\n\n\
         Product: {}\nDescription: {}\n",
        request.product_name.trim(),
        request.description.trim()
    );

    if let Some(code) = request.code.as_deref().filter(|c| !c.trim().is_empty()) {
        prompt.push_str(&format!("SKU: {}\n", code.trim()));
    }
    if let Some(price) = request.price {
        prompt.push_str(&format!("Price: {}\n", Price::brl(price)));
    }
    if let Some(features) = request.features.as_deref().filter(|f| !f.trim().is_empty()) {
        prompt.push_str(&format!("Key features: {}\n", features.trim()));
    }

    prompt.push_str(
        "\nStructure the ad with an attention-grabbing headline, a benefits-focused \
         body, and a closing call to action. Plain text only, no markdown.",
    );
    prompt
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_extraction() {
        let content = r#"{
            "title": "Fone Bluetooth TWS com Case",
            "description": "Fone sem fio com cancelamento de ruido.",
            "ncm": "85183000",
            "weight_kg": 0.25,
            "width_cm": 10,
            "height_cm": 5.5,
            "depth_cm": 4,
            "suggested_price": 149.9
        }"#;

        let extracted: ExtractedProduct = parse_model_json(content).unwrap();
        assert_eq!(extracted.title.as_deref(), Some("Fone Bluetooth TWS com Case"));
        assert_eq!(extracted.ncm.as_deref(), Some("85183000"));
        assert_eq!(extracted.weight_kg, Some(0.25));
        assert_eq!(extracted.suggested_price, Some(149.9));
    }

    #[test]
    fn test_parse_partial_extraction() {
        let extracted: ExtractedProduct = parse_model_json(r#"{"title": "Caneca"}"#).unwrap();
        assert_eq!(extracted.title.as_deref(), Some("Caneca"));
        assert!(extracted.description.is_none());
        assert!(extracted.suggested_price.is_none());
    }

    #[test]
    fn test_parse_url_extraction_flattens() {
        let content = r#"{
            "title": "Caneca Térmica 500ml",
            "suggested_price": 79.9,
            "images": ["https://cdn.example.com/1.jpg"],
            "brand": "Stanley",
            "category": "Cozinha"
        }"#;

        let extracted: UrlExtraction = parse_model_json(content).unwrap();
        assert_eq!(extracted.product.title.as_deref(), Some("Caneca Térmica 500ml"));
        assert_eq!(extracted.images.len(), 1);
        assert_eq!(extracted.brand.as_deref(), Some("Stanley"));
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let result: Result<ExtractedProduct, AppError> = parse_model_json("not json");
        assert!(matches!(result, Err(AppError::OpenAi(_))));
    }

    #[test]
    fn test_ad_prompt_includes_optional_fields() {
        let request = GenerateAdRequest {
            product_name: "Fone Bluetooth".to_string(),
            description: "Fone sem fio".to_string(),
            code: Some("FB-01".to_string()),
            price: Some(Decimal::new(9990, 2)),
            features: Some("Bluetooth 5.3, case com LED".to_string()),
        };

        let prompt = ad_prompt(&request);
        assert!(prompt.contains("Fone Bluetooth"));
        assert!(prompt.contains("SKU: FB-01"));
        assert!(prompt.contains("BRL 99.90"));
        assert!(prompt.contains("Bluetooth 5.3"));
    }

    #[test]
    fn test_ad_prompt_skips_blank_fields() {
        let request = GenerateAdRequest {
            product_name: "Caneca".to_string(),
            description: "Caneca de inox".to_string(),
            code: Some("  ".to_string()),
            price: None,
            features: None,
        };

        let prompt = ad_prompt(&request);
        assert!(!prompt.contains("SKU:"));
        assert!(!prompt.contains("Price:"));
        assert!(!prompt.contains("Key features:"));
    }

    #[test]
    fn test_url_prompt_embeds_url() {
        let prompt = url_extraction_prompt("https://loja.example.com/produto/123");
        assert!(prompt.contains("https://loja.example.com/produto/123"));
        assert!(prompt.contains(r#""images""#));
    }
}
