//! ProductGen server library.
//!
//! This crate provides the API server functionality as a library,
//! allowing it to be tested and reused.
//!
//! # Security
//!
//! This crate handles tenant Bling app credentials and OAuth tokens.
//! Credentials are sealed with AES-256-GCM before they touch the
//! database; see [`services::credentials`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod bling;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod openai;
pub mod routes;
pub mod services;
pub mod state;
