//! Catalog service implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use catalog_core::{
    CatalogConfig, CatalogError, CatalogStats, CatalogStore, Embedder, Product, Result,
    SearchResults, StoredRecord,
};
use catalog_embed::MockEmbedder;
use catalog_ingest::{assign_skus, extract_products, load_products, markdown_elements, Rejected};
use catalog_query::{HybridRanker, RankerConfig};
use catalog_store::SqliteStore;

/// Catalog service state.
pub struct CatalogServer {
    /// Product store.
    store: Arc<SqliteStore>,

    /// Embedder shared by the store and the ranker.
    embedder: Arc<dyn Embedder>,

    /// Hybrid ranker over the store.
    ranker: HybridRanker<SqliteStore, dyn Embedder>,
}

/// Search request parameters.
#[derive(Debug, Deserialize, Serialize)]
pub struct SearchParams {
    /// The search query.
    pub query: String,

    /// Only return direct matches, no recommendations.
    #[serde(default, rename = "exactOnly")]
    pub exact_only: bool,
}

/// Ingest request parameters. Products from `path` (a JSON array) are
/// stored along with any given inline.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct IngestParams {
    /// JSON catalog file to read.
    pub path: Option<PathBuf>,

    /// Products given directly.
    #[serde(default)]
    pub products: Vec<Product>,
}

/// Markdown import parameters.
#[derive(Debug, Deserialize, Serialize)]
pub struct ImportParams {
    /// Markdown document to extract products from.
    pub path: PathBuf,

    /// Replace products with the same sku instead of failing.
    #[serde(default)]
    pub upsert: bool,
}

/// Tool result.
#[derive(Debug, Serialize)]
pub struct ToolResult {
    /// Whether the operation was successful.
    pub success: bool,

    /// Result message or content.
    pub message: String,
}

impl ToolResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Add,
    Upsert,
}

impl WriteMode {
    fn verb(self) -> &'static str {
        match self {
            WriteMode::Add => "Added",
            WriteMode::Upsert => "Upserted",
        }
    }
}

impl CatalogServer {
    /// Create a catalog server from configuration.
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        info!(
            "Initializing catalog server with database at {:?}",
            config.database.path
        );

        let embedder = catalog_embed::from_config(&config.embedding)?;
        let store = Arc::new(SqliteStore::open_with_config(
            &config.database,
            embedder.clone(),
        )?);

        Ok(Self::from_parts(
            store,
            embedder,
            RankerConfig::from(&config.search),
        ))
    }

    /// Create a catalog server with an in-memory database and the mock
    /// embedder.
    pub fn new_memory() -> Result<Self> {
        info!("Initializing catalog server with in-memory database");

        let embedder: Arc<dyn Embedder> = Arc::new(MockEmbedder::new());
        let store = Arc::new(SqliteStore::open_memory("products", embedder.clone())?);

        Ok(Self::from_parts(store, embedder, RankerConfig::default()))
    }

    fn from_parts(
        store: Arc<SqliteStore>,
        embedder: Arc<dyn Embedder>,
        ranker_config: RankerConfig,
    ) -> Self {
        let ranker = HybridRanker::with_config(store.clone(), embedder.clone(), ranker_config);
        Self {
            store,
            embedder,
            ranker,
        }
    }

    /// Search for products, returning structured results.
    pub async fn search_products(&self, query: &str, exact_only: bool) -> Result<SearchResults> {
        self.ranker.search(query, exact_only).await
    }

    /// Search for products.
    pub async fn search(&self, params: SearchParams) -> ToolResult {
        match self.search_products(&params.query, params.exact_only).await {
            Ok(results) => {
                if let Some(notice) = &results.notice {
                    return ToolResult::error(format!("No results: {}", notice.message()));
                }

                if results.products.is_empty() {
                    return ToolResult::success(format!(
                        "No products found for {:?}.",
                        results.query
                    ));
                }

                let mut output = format!(
                    "Found {} products in {}ms:\n\n",
                    results.total_results, results.latency_ms
                );
                output.push_str(&format_products(&results.products));

                ToolResult::success(output)
            }
            Err(e) => ToolResult::error(format!("Search failed: {}", e)),
        }
    }

    /// Add products. Fails without writing anything if a sku is already
    /// stored.
    pub async fn add(&self, params: IngestParams) -> ToolResult {
        self.ingest(params, WriteMode::Add).await
    }

    /// Add products, replacing any stored under the same sku.
    pub async fn upsert(&self, params: IngestParams) -> ToolResult {
        self.ingest(params, WriteMode::Upsert).await
    }

    async fn ingest(&self, params: IngestParams, mode: WriteMode) -> ToolResult {
        let mut products = Vec::with_capacity(params.products.len());
        let mut rejected: Vec<Rejected> = Vec::new();

        for (index, product) in params.products.into_iter().enumerate() {
            match product.validate() {
                Ok(()) => products.push(product),
                Err(e) => {
                    warn!("Skipping inline product {}: {}", index, e);
                    rejected.push(Rejected {
                        index,
                        reason: format!("inline product: {}", e),
                    });
                }
            }
        }

        if let Some(path) = &params.path {
            info!("Loading products from {:?}", path);
            match load_products(path) {
                Ok(report) => {
                    products.extend(report.products);
                    rejected.extend(report.rejected);
                }
                Err(e) => {
                    return ToolResult::error(format!("Failed to read {}: {}", path.display(), e))
                }
            }
        }

        if products.is_empty() {
            return ToolResult::error(with_rejections("No products to store.".to_string(), &rejected));
        }

        match self.write(&products, mode).await {
            Ok(()) => ToolResult::success(with_rejections(
                format!("{} {} products.", mode.verb(), products.len()),
                &rejected,
            )),
            Err(CatalogError::DuplicateRecord { id }) => ToolResult::error(format!(
                "A product with sku '{}' is already stored. Use upsert to replace it.",
                id
            )),
            Err(e) => ToolResult::error(format!("Failed to store products: {}", e)),
        }
    }

    /// Extract products from a Markdown document and store them.
    pub async fn import_markdown(&self, params: ImportParams) -> ToolResult {
        info!("Importing products from {:?}", params.path);

        let products = match read_markdown_products(&params.path) {
            Ok(products) => products,
            Err(e) => {
                return ToolResult::error(format!(
                    "Failed to import {}: {}",
                    params.path.display(),
                    e
                ))
            }
        };

        if products.is_empty() {
            return ToolResult::error(format!(
                "No products found in {}.",
                params.path.display()
            ));
        }

        let mode = if params.upsert {
            WriteMode::Upsert
        } else {
            WriteMode::Add
        };
        self.ingest(
            IngestParams {
                path: None,
                products,
            },
            mode,
        )
        .await
    }

    async fn write(&self, products: &[Product], mode: WriteMode) -> Result<()> {
        let records: Vec<StoredRecord> = products.iter().map(Product::to_record).collect();
        match mode {
            WriteMode::Add => self.store.add(&records).await,
            WriteMode::Upsert => self.store.upsert(&records).await,
        }
    }

    /// Remove every product.
    pub async fn clear(&self) -> ToolResult {
        info!("Clearing collection: {}", self.store.collection());

        match self.store.clear().await {
            Ok(()) => ToolResult::success(format!(
                "Collection '{}' cleared.",
                self.store.collection()
            )),
            Err(e) => ToolResult::error(format!("Failed to clear collection: {}", e)),
        }
    }

    /// Show the metadata of the first `limit` stored products.
    pub async fn peek(&self, limit: usize) -> ToolResult {
        let metadata = match self.store.peek(limit).await {
            Ok(metadata) => metadata,
            Err(e) => return ToolResult::error(format!("Failed to peek: {}", e)),
        };

        if metadata.is_empty() {
            return ToolResult::success("No products stored.");
        }

        match serde_json::to_string_pretty(&metadata) {
            Ok(json) => ToolResult::success(json),
            Err(e) => ToolResult::error(format!("Failed to format products: {}", e)),
        }
    }

    /// Collection statistics.
    pub async fn catalog_stats(&self) -> Result<CatalogStats> {
        Ok(CatalogStats {
            collection: self.store.collection().to_string(),
            products: self.store.count().await?,
            dimension: self.embedder.dimension(),
        })
    }

    /// Get statistics.
    pub async fn stats(&self) -> ToolResult {
        match self.catalog_stats().await {
            Ok(stats) => ToolResult::success(format!(
                "Statistics for collection '{}':\n\n- Products: {}\n- Embedding dimension: {}\n",
                stats.collection, stats.products, stats.dimension
            )),
            Err(e) => ToolResult::error(format!("Failed to get stats: {}", e)),
        }
    }
}

fn read_markdown_products(path: &Path) -> Result<Vec<Product>> {
    let source = std::fs::read_to_string(path)?;
    let mut products = extract_products(&markdown_elements(&source))?;

    let prefix = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("doc");
    assign_skus(&mut products, prefix);

    Ok(products)
}

fn with_rejections(mut message: String, rejected: &[Rejected]) -> String {
    if rejected.is_empty() {
        return message;
    }

    warn!("{} entries were rejected", rejected.len());
    message.push_str(&format!("\n\nSkipped {} invalid entries:\n", rejected.len()));
    for r in rejected {
        message.push_str(&format!("- entry {}: {}\n", r.index, r.reason));
    }
    message
}

/// Numbered listing of products: name, sku, availability, price and tags.
pub fn format_products(products: &[Product]) -> String {
    let mut output = String::new();
    for (i, product) in products.iter().enumerate() {
        output.push_str(&format!(
            "{}. {} [{}]{} {:.2}\n",
            i + 1,
            product.name,
            product.sku,
            if product.available { "" } else { " (unavailable)" },
            product.price
        ));
        if !product.description.is_empty() {
            output.push_str(&format!("   {}\n", product.description));
        }
        if !product.tags.is_empty() {
            output.push_str(&format!("   tags: {}\n", product.tags.join(", ")));
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::SearchNotice;

    fn menu() -> Vec<Product> {
        vec![
            Product::new("Latte", "Espresso with steamed milk", "CNM0010", 10.89, &["coffee"]),
            Product::new("Americano", "Black coffee", "CNB0001", 9.99, &["coffee"])
                .with_available(false),
            Product::new("Water", "Plain water", "WNN0001", 2.0, &["water"]),
        ]
    }

    async fn seeded() -> CatalogServer {
        let server = CatalogServer::new_memory().unwrap();
        let result = server
            .add(IngestParams {
                path: None,
                products: menu(),
            })
            .await;
        assert!(result.success, "Add failed: {}", result.message);
        server
    }

    fn file_config(dir: &Path) -> CatalogConfig {
        let mut config = CatalogConfig::default();
        config.database.path = dir.join("catalog.db");
        config.embedding.dimension = 32;
        config
    }

    #[tokio::test]
    async fn test_server_creation() {
        let server = CatalogServer::new_memory().unwrap();
        let stats = server.catalog_stats().await.unwrap();
        assert_eq!(stats.collection, "products");
        assert_eq!(stats.products, 0);
    }

    #[tokio::test]
    async fn test_exact_search() {
        let server = seeded().await;

        let results = server.search_products("water", true).await.unwrap();
        assert_eq!(results.products, vec![menu()[2].clone()]);

        let result = server
            .search(SearchParams {
                query: "water".to_string(),
                exact_only: true,
            })
            .await;
        assert!(result.success, "Search failed: {}", result.message);
        assert!(result.message.contains("1. Water [WNN0001]"));
    }

    #[tokio::test]
    async fn test_recommendations_fill_results() {
        let server = seeded().await;

        let results = server.search_products("water", false).await.unwrap();
        assert_eq!(results.total_results, 3);
        assert_eq!(results.products[0].name, "Water");
        // Unavailable products always come last.
        assert_eq!(results.products[2].name, "Americano");
    }

    #[tokio::test]
    async fn test_add_duplicate_sku_fails() {
        let server = seeded().await;

        let result = server
            .add(IngestParams {
                path: None,
                products: vec![menu()[0].clone()],
            })
            .await;
        assert!(!result.success);
        assert!(result.message.contains("CNM0010"));

        let result = server
            .upsert(IngestParams {
                path: None,
                products: vec![menu()[0].clone().with_available(false)],
            })
            .await;
        assert!(result.success, "Upsert failed: {}", result.message);

        let results = server.search_products("latte", true).await.unwrap();
        assert!(!results.products[0].available);
    }

    #[tokio::test]
    async fn test_add_from_file_reports_rejections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.json");
        std::fs::write(
            &path,
            r#"[
                {"name": "Scone", "desc": "Buttery pastry", "sku": "BNC0001", "price": 4.0},
                {"name": "Broken", "sku": "X"}
            ]"#,
        )
        .unwrap();

        let server = CatalogServer::new_memory().unwrap();
        let result = server
            .add(IngestParams {
                path: Some(path),
                products: Vec::new(),
            })
            .await;

        assert!(result.success, "Add failed: {}", result.message);
        assert!(result.message.contains("Added 1 products."));
        assert!(result.message.contains("entry 1"));
    }

    #[tokio::test]
    async fn test_invalid_inline_products_are_not_stored() {
        let server = CatalogServer::new_memory().unwrap();

        let result = server
            .add(IngestParams {
                path: None,
                products: vec![Product::new("", "x", "BAD1", -5.0, &[])],
            })
            .await;
        assert!(!result.success);
        assert!(result.message.contains("entry 0"));
        assert_eq!(server.catalog_stats().await.unwrap().products, 0);

        let result = server
            .upsert(IngestParams {
                path: None,
                products: vec![
                    Product::new("Scone", "Buttery pastry", "BNC0001", f64::NAN, &[]),
                    menu()[2].clone(),
                ],
            })
            .await;
        assert!(result.success, "Upsert failed: {}", result.message);
        assert!(result.message.contains("Upserted 1 products."));
        assert!(result.message.contains("entry 0"));
        assert_eq!(server.catalog_stats().await.unwrap().products, 1);
    }

    #[tokio::test]
    async fn test_empty_ingest_is_an_error() {
        let server = CatalogServer::new_memory().unwrap();
        let result = server.add(IngestParams::default()).await;
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_import_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("menu.md");
        std::fs::write(
            &path,
            "# Latte\n\nEspresso with steamed milk.\n\n11\n\n# Scone\n\nButtery pastry.\n",
        )
        .unwrap();

        let server = CatalogServer::new_memory().unwrap();
        let result = server
            .import_markdown(ImportParams {
                path: path.clone(),
                upsert: false,
            })
            .await;
        assert!(result.success, "Import failed: {}", result.message);

        let results = server.search_products("scone", true).await.unwrap();
        assert_eq!(results.products[0].sku, "menu-0002");
        assert_eq!(results.products[0].price, 0.0);

        // Importing the same document again needs upsert.
        let again = server
            .import_markdown(ImportParams {
                path: path.clone(),
                upsert: false,
            })
            .await;
        assert!(!again.success);

        let again = server.import_markdown(ImportParams { path, upsert: true }).await;
        assert!(again.success, "Upsert import failed: {}", again.message);
    }

    #[tokio::test]
    async fn test_clear_peek_and_stats() {
        let server = seeded().await;

        let peek = server.peek(2).await;
        assert!(peek.success);
        assert!(peek.message.contains("CNM0010"));
        assert!(!peek.message.contains("WNN0001"));

        let stats = server.catalog_stats().await.unwrap();
        assert_eq!(stats.products, 3);

        assert!(server.clear().await.success);
        assert_eq!(server.catalog_stats().await.unwrap().products, 0);
        assert!(server.stats().await.message.contains("Products: 0"));

        // The clearing handle keeps working.
        let results = server.search_products("latte", false).await.unwrap();
        assert!(results.products.is_empty());
        assert!(results.notice.is_none());
    }

    #[tokio::test]
    async fn test_clear_from_another_handle_makes_search_stale() {
        let dir = tempfile::tempdir().unwrap();
        let config = file_config(dir.path());

        let reader = CatalogServer::new(&config).unwrap();
        let writer = CatalogServer::new(&config).unwrap();

        assert!(writer
            .add(IngestParams {
                path: None,
                products: menu(),
            })
            .await
            .success);
        assert_eq!(reader.search_products("latte", true).await.unwrap().total_results, 1);

        assert!(writer.clear().await.success);

        let results = reader.search_products("latte", false).await.unwrap();
        assert!(results.products.is_empty());
        assert!(matches!(results.notice, Some(SearchNotice::IndexStale { .. })));

        let result = reader
            .search(SearchParams {
                query: "latte".to_string(),
                exact_only: false,
            })
            .await;
        assert!(!result.success);
    }
}
