//! catalog-ingest - Product ingestion
//!
//! Turns outside data into [`Product`] values ready to be stored:
//!
//! - [`load_products`]: JSON arrays of products, skipping invalid entries
//! - [`extract_products`]: typed document elements (titles, paragraphs,
//!   list items) such as a partitioned menu or brochure
//! - [`markdown_elements`]: partitions Markdown into those elements
//! - [`sample_dataset`] / [`write_sample`]: the built-in sample catalogs
//!
//! # Example
//!
//! ```rust
//! use catalog_ingest::{extract_products, markdown_elements};
//!
//! let elements = markdown_elements("# Latte\n\nEspresso with milk.\n\n11\n");
//! let products = extract_products(&elements).unwrap();
//! assert_eq!(products[0].price, 11.0);
//! ```

mod elements;
mod json;
mod markdown;
mod sample;

pub use elements::{assign_skus, extract_products, Element, ElementKind};
pub use json::{load_products, parse_products, IngestReport, Rejected};
pub use markdown::markdown_elements;
pub use sample::{sample_dataset, write_sample, SAMPLE_DATASETS};

// Re-export for convenience
pub use catalog_core::Product;
