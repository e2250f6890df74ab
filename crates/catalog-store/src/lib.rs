//! catalog-store - SQLite record store
//!
//! This crate provides persistent storage for product records and their
//! embeddings, with nearest-neighbor and containment queries over a single
//! named collection.

mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

// Re-export schema for testing/migrations
pub use schema::SCHEMA;
