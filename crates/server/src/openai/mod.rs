//! OpenAI chat-completions client for product data extraction.
//!
//! # Features
//!
//! - `gpt-4o` vision requests (text + image parts) for reading product photos
//! - JSON-mode completions (`response_format: json_object`) so extraction
//!   answers parse reliably
//! - Plain-text completions for ad copy generation
//!
//! The whole module is optional at runtime: without `OPENAI_API_KEY` the
//! server starts normally and the extraction routes answer 503.

mod client;
mod error;
pub mod types;

pub use client::OpenAiClient;
pub use error::OpenAiError;
