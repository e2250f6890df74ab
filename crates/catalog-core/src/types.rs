//! Core domain types for catalog search.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// Delimiter used to flatten tags into a single metadata string.
pub const TAG_DELIMITER: char = ';';

/// A primitive metadata value as held by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl MetadataValue {
    /// Short name of the value's type, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Field name to primitive value, as stored alongside each record.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A product record in the form the record store holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Record id (the product sku).
    pub id: String,

    /// Indexed text blob, used for embedding and containment matching.
    pub text: String,

    /// Flattened product fields.
    pub metadata: Metadata,
}

/// One sellable item.
///
/// Equality and hashing cover every field: two products that differ only in
/// availability are distinct values even though they share a sku.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Display name.
    pub name: String,

    /// Free-form description.
    #[serde(alias = "desc")]
    pub description: String,

    /// Stock keeping unit, the store's primary key.
    pub sku: String,

    /// Unit price.
    pub price: f64,

    /// Ordered labels.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Whether the product can currently be ordered.
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl Product {
    /// Create an available product.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        sku: impl Into<String>,
        price: f64,
        tags: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            sku: sku.into(),
            price,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            available: true,
        }
    }

    /// Set availability, consuming self.
    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    /// Case-insensitive match against name, description or a whole tag.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self.tags.iter().any(|tag| tag.to_lowercase() == needle)
    }

    /// Canonical lowercase text that gets embedded and indexed.
    pub fn searchable_text(&self) -> String {
        format!(
            "NAME: {}; DESCRIPTION: {}; TAGS: {}",
            self.name.to_lowercase(),
            self.description.to_lowercase(),
            self.joined_tags().to_lowercase()
        )
    }

    fn joined_tags(&self) -> String {
        self.tags.join(&TAG_DELIMITER.to_string())
    }

    /// Check the invariants required before a product is stored.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::invalid_argument(format!(
                "product '{}' has an empty name",
                self.sku
            )));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(CatalogError::invalid_argument(format!(
                "product '{}' has invalid price {}",
                self.name, self.price
            )));
        }
        Ok(())
    }

    /// Flatten into store metadata, joining tags with `;`.
    pub fn to_metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("name".to_string(), self.name.as_str().into());
        metadata.insert("description".to_string(), self.description.as_str().into());
        metadata.insert("sku".to_string(), self.sku.as_str().into());
        metadata.insert("price".to_string(), self.price.into());
        metadata.insert("tags".to_string(), self.joined_tags().into());
        metadata.insert("available".to_string(), self.available.into());
        metadata
    }

    /// Build the record handed to the store.
    pub fn to_record(&self) -> StoredRecord {
        StoredRecord {
            id: self.sku.clone(),
            text: self.searchable_text(),
            metadata: self.to_metadata(),
        }
    }

    /// Rebuild a product from store metadata.
    ///
    /// Fails with [`CatalogError::MalformedRecord`] when a required field is
    /// missing or has the wrong primitive type.
    pub fn from_metadata(metadata: &Metadata) -> Result<Self> {
        let description = match metadata.get("description") {
            Some(value) => Some(value),
            None => metadata.get("desc"),
        };

        Ok(Self {
            name: expect_text("name", metadata.get("name"))?,
            description: expect_text("description", description)?,
            sku: expect_text("sku", metadata.get("sku"))?,
            price: match metadata.get("price") {
                Some(MetadataValue::Number(n)) => *n,
                Some(other) => return Err(mistyped("price", "number", other)),
                None => return Err(missing("price")),
            },
            tags: split_tags(&expect_text("tags", metadata.get("tags"))?),
            available: match metadata.get("available") {
                Some(MetadataValue::Bool(b)) => *b,
                Some(other) => return Err(mistyped("available", "bool", other)),
                None => true,
            },
        })
    }
}

impl PartialEq for Product {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.sku == other.sku
            && self.price.to_bits() == other.price.to_bits()
            && self.tags == other.tags
            && self.available == other.available
    }
}

impl Eq for Product {}

impl Hash for Product {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.description.hash(state);
        self.sku.hash(state);
        self.price.to_bits().hash(state);
        self.tags.hash(state);
        self.available.hash(state);
    }
}

/// Split a `;`-joined tag string back into tags.
pub fn split_tags(joined: &str) -> Vec<String> {
    if joined.is_empty() {
        return Vec::new();
    }
    joined.split(TAG_DELIMITER).map(String::from).collect()
}

fn expect_text(field: &str, value: Option<&MetadataValue>) -> Result<String> {
    match value {
        Some(MetadataValue::Text(s)) => Ok(s.clone()),
        Some(other) => Err(mistyped(field, "text", other)),
        None => Err(missing(field)),
    }
}

fn missing(field: &str) -> CatalogError {
    CatalogError::malformed(format!("missing field '{}'", field))
}

fn mistyped(field: &str, expected: &str, found: &MetadataValue) -> CatalogError {
    CatalogError::malformed(format!(
        "field '{}' should be {}, found {}",
        field,
        expected,
        found.kind()
    ))
}

/// Why a search came back empty without failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchNotice {
    /// The collection was recreated under this handle; a restart is needed.
    IndexStale { message: String },

    /// A stored record could not be decoded into a product.
    MalformedData { message: String },
}

impl SearchNotice {
    /// Human-readable explanation.
    pub fn message(&self) -> &str {
        match self {
            SearchNotice::IndexStale { message } | SearchNotice::MalformedData { message } => {
                message
            }
        }
    }
}

/// Search results container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    /// The original query.
    pub query: String,

    /// Whether recommendations were suppressed.
    pub exact_only: bool,

    /// Total results returned.
    pub total_results: usize,

    /// Search latency in milliseconds.
    pub latency_ms: u64,

    /// Ranked products.
    pub products: Vec<Product>,

    /// Set when a recoverable failure emptied the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<SearchNotice>,
}

/// Statistics about the product collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogStats {
    /// Collection name.
    pub collection: String,

    /// Number of stored products.
    pub products: u64,

    /// Embedding dimension in use.
    pub dimension: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn latte() -> Product {
        Product::new(
            "Latte",
            "A shot of coffee mixed with a shot of milk.",
            "CNM0010",
            10.89,
            &["white", "coffee", "dairy", "other milk available"],
        )
    }

    #[test]
    fn test_matches_name_and_description_case_insensitive() {
        let product = latte();
        assert!(product.matches("LATTE"));
        assert!(product.matches("shot of"));
        assert!(product.matches("Milk"));
        assert!(!product.matches("tea"));
    }

    #[test]
    fn test_matches_whole_tags_only() {
        let product = Product::new("Item", "plain", "X1", 1.0, &["ice cream vanilla"]);
        assert!(product.matches("Ice Cream Vanilla"));
        // A tag substring is not a tag match.
        assert!(!product.matches("vanilla"));
    }

    #[test]
    fn test_searchable_text() {
        let product = Product::new("Water", "Plain WATER.", "WNN0001", 2.0, &["Plain", "water"]);
        assert_eq!(
            product.searchable_text(),
            "NAME: water; DESCRIPTION: plain water.; TAGS: plain;water"
        );
        assert_eq!(product.searchable_text(), product.searchable_text());
    }

    #[test]
    fn test_metadata_round_trip_preserves_value() {
        let product = latte().with_available(false);
        let record = product.to_record();
        assert_eq!(record.id, "CNM0010");
        assert_eq!(
            record.metadata.get("tags"),
            Some(&MetadataValue::Text(
                "white;coffee;dairy;other milk available".to_string()
            ))
        );
        assert_eq!(Product::from_metadata(&record.metadata).unwrap(), product);
    }

    #[test]
    fn test_from_metadata_defaults_and_aliases() {
        let mut metadata = Metadata::new();
        metadata.insert("name".into(), "Water".into());
        metadata.insert("desc".into(), "Plain water.".into());
        metadata.insert("sku".into(), "W1".into());
        metadata.insert("price".into(), 2.0.into());
        metadata.insert("tags".into(), "".into());

        let product = Product::from_metadata(&metadata).unwrap();
        assert_eq!(product.description, "Plain water.");
        assert!(product.tags.is_empty());
        assert!(product.available);
    }

    #[test]
    fn test_from_metadata_missing_field() {
        let mut metadata = latte().to_metadata();
        metadata.remove("sku");
        let err = Product::from_metadata(&metadata).unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("sku"));
    }

    #[test]
    fn test_from_metadata_mistyped_field() {
        let mut metadata = latte().to_metadata();
        metadata.insert("price".into(), "cheap".into());
        assert!(Product::from_metadata(&metadata).unwrap_err().is_malformed());

        let mut metadata = latte().to_metadata();
        metadata.insert("available".into(), 1.0.into());
        assert!(Product::from_metadata(&metadata).unwrap_err().is_malformed());
    }

    #[test]
    fn test_equality_covers_every_field() {
        let a = latte();
        let b = latte().with_available(false);
        assert_ne!(a, b);

        let mut set = HashSet::new();
        set.insert(a.clone());
        set.insert(a.clone());
        set.insert(b);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_validate() {
        assert!(latte().validate().is_ok());

        let mut nameless = latte();
        nameless.name = "  ".to_string();
        assert!(nameless.validate().is_err());

        let mut negative = latte();
        negative.price = -1.0;
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{"name":"Water","desc":"Plain water.","sku":"W1","price":2,"tags":["water"]}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert!(product.available);
        assert_eq!(product.price, 2.0);

        let value = serde_json::to_value(&product).unwrap();
        assert_eq!(value["description"], "Plain water.");
        assert_eq!(value["tags"][0], "water");
    }

    #[test]
    fn test_metadata_value_untagged_json() {
        let metadata: Metadata =
            serde_json::from_str(r#"{"available":false,"price":3,"name":"Tea"}"#).unwrap();
        assert_eq!(metadata.get("available"), Some(&MetadataValue::Bool(false)));
        assert_eq!(metadata.get("price"), Some(&MetadataValue::Number(3.0)));
        assert_eq!(metadata.get("name"), Some(&MetadataValue::Text("Tea".into())));
    }
}
