//! JSON product catalogs.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use catalog_core::{CatalogError, Product, Result};

/// An entry that could not be turned into a product.
#[derive(Debug, Clone, Serialize)]
pub struct Rejected {
    /// Position in the source array.
    pub index: usize,

    /// What was wrong with it.
    pub reason: String,
}

/// Outcome of reading a catalog file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    /// Products that parsed and validated.
    pub products: Vec<Product>,

    /// Entries that were skipped.
    pub rejected: Vec<Rejected>,
}

impl IngestReport {
    /// One-line summary for status messages.
    pub fn summary(&self) -> String {
        if self.rejected.is_empty() {
            format!("{} products", self.products.len())
        } else {
            format!(
                "{} products, {} rejected",
                self.products.len(),
                self.rejected.len()
            )
        }
    }
}

/// Read a JSON array of products from a file.
pub fn load_products(path: impl AsRef<Path>) -> Result<IngestReport> {
    let path = path.as_ref();
    debug!("Reading products from {:?}", path);

    let content = std::fs::read_to_string(path)?;
    let report = parse_products(&content)?;

    info!("Loaded {} from {:?}", report.summary(), path);
    Ok(report)
}

/// Parse a JSON array of products.
///
/// Entries that fail to deserialize or validate are skipped and reported;
/// a document that is not an array fails as a whole.
pub fn parse_products(content: &str) -> Result<IngestReport> {
    let entries: Vec<serde_json::Value> = match serde_json::from_str(content)? {
        serde_json::Value::Array(entries) => entries,
        other => {
            return Err(CatalogError::ingest(format!(
                "expected a JSON array of products, found {}",
                json_kind(&other)
            )))
        }
    };

    let mut report = IngestReport::default();
    for (index, entry) in entries.into_iter().enumerate() {
        let parsed = serde_json::from_value::<Product>(entry)
            .map_err(CatalogError::from)
            .and_then(|product| product.validate().map(|_| product));

        match parsed {
            Ok(product) => report.products.push(product),
            Err(e) => {
                warn!("Skipping product entry {}: {}", index, e);
                report.rejected.push(Rejected {
                    index,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_products() {
        let report = parse_products(
            r#"[
                {"name": "Latte", "desc": "Milk coffee", "sku": "CNM0010", "price": 10.89,
                 "tags": ["white", "coffee"]},
                {"name": "Americano", "description": "Black coffee", "sku": "CNB0001",
                 "price": 9.99, "tags": [], "available": false}
            ]"#,
        )
        .unwrap();

        assert!(report.rejected.is_empty());
        assert_eq!(report.products.len(), 2);
        assert_eq!(report.products[0].description, "Milk coffee");
        assert!(report.products[0].available);
        assert!(!report.products[1].available);
    }

    #[test]
    fn test_invalid_entries_are_reported() {
        let report = parse_products(
            r#"[
                {"name": "Latte", "desc": "Milk coffee", "sku": "A", "price": 1.0},
                {"name": "No price", "desc": "", "sku": "B"},
                {"name": "", "desc": "Nameless", "sku": "C", "price": 1.0},
                {"name": "Negative", "desc": "", "sku": "D", "price": -2.0}
            ]"#,
        )
        .unwrap();

        assert_eq!(report.products.len(), 1);
        let rejected: Vec<usize> = report.rejected.iter().map(|r| r.index).collect();
        assert_eq!(rejected, vec![1, 2, 3]);
        assert_eq!(report.summary(), "1 products, 3 rejected");
    }

    #[test]
    fn test_non_array_is_an_error() {
        let err = parse_products(r#"{"name": "Latte"}"#).unwrap_err();
        assert!(err.to_string().contains("an object"));

        assert!(parse_products("not json").is_err());
    }

    #[test]
    fn test_load_products_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.json");
        std::fs::write(
            &path,
            r#"[{"name": "Water", "desc": "Plain", "sku": "W1", "price": 2.0}]"#,
        )
        .unwrap();

        let report = load_products(&path).unwrap();
        assert_eq!(report.products[0].sku, "W1");

        assert!(load_products(dir.path().join("missing.json")).is_err());
    }
}
