//! ProductGen Core - Shared types library.
//!
//! This crate provides common types used across all ProductGen components:
//! - `server` - The web application (JSON API, ERP proxy, AI extraction)
//! - `cli` - Command-line tools for migrations and provisioning
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails,
//!   statuses, and trial windows

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
