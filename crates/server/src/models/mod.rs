//! Domain model types.
//!
//! Validated domain objects, separate from database row types.

pub mod product;
pub mod session;
pub mod user;
