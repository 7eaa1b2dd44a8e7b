//! Business logic services for the API server.
//!
//! # Services
//!
//! - `auth` - Password login and account provisioning (Argon2id, trials)
//! - `credentials` - Sealing and opening the per-user Bling credential pair
//! - `erp` - Server-side Bling flows (token freshness, import, export)
//! - `imgbb` - Image uploads to the ImgBB hosting API

pub mod auth;
pub mod credentials;
pub mod erp;
pub mod imgbb;
