//! catalog-core - Core types and traits for product catalog search
//!
//! This crate provides the product record model, the provider traits the
//! ranking engine is written against, error handling and configuration
//! shared by every other crate in the workspace.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::{CatalogError, Result};
pub use traits::*;
pub use types::*;
