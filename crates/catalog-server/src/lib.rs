//! catalog-server - Catalog service
//!
//! Wires the record store, the embedder and the hybrid ranker together and
//! exposes the catalog operations, each returning a [`ToolResult`].
//!
//! # Operations
//!
//! - `search` - Search products, optionally direct matches only
//! - `add` - Add products from a JSON file or inline
//! - `upsert` - Add or replace products by sku
//! - `import_markdown` - Extract products from a Markdown document
//! - `clear` - Remove every product
//! - `peek` - Show the first stored products
//! - `stats` - Get statistics about the catalog

mod server;

pub use server::{
    format_products, CatalogServer, ImportParams, IngestParams, SearchParams, ToolResult,
};
