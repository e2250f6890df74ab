//! SQLite-based record store implementation.

use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::{debug, info};

use catalog_core::{
    CatalogError, CatalogStore, DatabaseConfig, Embedder, Metadata, RecordStore, Result,
    StoredRecord,
};

use crate::schema::{SCHEMA, SCHEMA_VERSION};

/// SQLite-based record store.
///
/// Holds one named collection of records. Each record keeps its text, its
/// metadata as JSON and the embedding of its text, computed with the store's
/// embedder when the record is written.
pub struct SqliteStore {
    /// Connection wrapped in blocking Mutex.
    conn: Arc<Mutex<Connection>>,

    /// Embeds record text on write and query text on search.
    embedder: Arc<dyn Embedder>,

    /// Collection name.
    collection: String,

    /// Collection id this handle operates on.
    generation: AtomicI64,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open(
        path: impl AsRef<Path>,
        collection: &str,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        Self::open_path(path.as_ref(), collection, embedder, 30000)
    }

    /// Open the database described by a configuration section.
    pub fn open_with_config(config: &DatabaseConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        Self::open_path(
            &config.path,
            &config.collection,
            embedder,
            config.busy_timeout_ms,
        )
    }

    fn open_path(
        path: &Path,
        collection: &str,
        embedder: Arc<dyn Embedder>,
        busy_timeout_ms: u32,
    ) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            CatalogError::unavailable("record store", format!("Failed to open database: {}", e))
        })?;

        Self::init(conn, path, collection, embedder, busy_timeout_ms)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory(collection: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            CatalogError::database(format!("Failed to open in-memory database: {}", e))
        })?;

        Self::init(conn, Path::new(":memory:"), collection, embedder, 30000)
    }

    fn init(
        conn: Connection,
        path: &Path,
        collection: &str,
        embedder: Arc<dyn Embedder>,
        busy_timeout_ms: u32,
    ) -> Result<Self> {
        Self::configure_connection(&conn, busy_timeout_ms)?;

        conn.execute_batch(SCHEMA)
            .map_err(|e| CatalogError::database(format!("Failed to initialize schema: {}", e)))?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(|e| CatalogError::database(e.to_string()))?;

        let generation = Self::get_or_create_collection(&conn, collection)?;

        info!(
            "Database opened at {:?}, collection '{}' (generation {})",
            path, collection, generation
        );

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            embedder,
            collection: collection.to_string(),
            generation: AtomicI64::new(generation),
        })
    }

    /// Configure SQLite connection for optimal performance.
    fn configure_connection(conn: &Connection, busy_timeout_ms: u32) -> Result<()> {
        conn.execute_batch(&format!(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -16000;
            PRAGMA busy_timeout = {};
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            "#,
            busy_timeout_ms
        ))
        .map_err(|e| CatalogError::database(format!("Failed to configure connection: {}", e)))?;

        Ok(())
    }

    fn live_generation(conn: &Connection, name: &str) -> Result<Option<i64>> {
        conn.query_row(
            "SELECT id FROM collections WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| CatalogError::database(e.to_string()))
    }

    fn create_collection(conn: &Connection, name: &str) -> Result<i64> {
        conn.execute(
            "INSERT INTO collections (name, created_at) VALUES (?1, ?2)",
            params![name, now_millis()],
        )
        .map_err(|e| CatalogError::database(format!("Failed to create collection: {}", e)))?;

        Ok(conn.last_insert_rowid())
    }

    fn get_or_create_collection(conn: &Connection, name: &str) -> Result<i64> {
        match Self::live_generation(conn, name)? {
            Some(id) => Ok(id),
            None => {
                let id = Self::create_collection(conn, name)?;
                debug!("Created collection: {}", name);
                Ok(id)
            }
        }
    }

    /// Collection id, failing if the collection was dropped or recreated
    /// since this handle last saw it.
    fn current_generation(&self, conn: &Connection) -> Result<i64> {
        let expected = self.generation.load(Ordering::SeqCst);
        match Self::live_generation(conn, &self.collection)? {
            Some(live) if live == expected => Ok(live),
            _ => Err(CatalogError::CollectionNotFound {
                name: self.collection.clone(),
            }),
        }
    }

    /// Name of the collection this handle serves.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Execute a blocking operation on the connection.
    fn with_conn<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CatalogError::database(e.to_string()))?;
        f(&conn)
    }

    /// Execute a mutable blocking operation on the connection.
    fn with_conn_mut<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Connection) -> Result<R>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| CatalogError::database(e.to_string()))?;
        f(&mut conn)
    }

    async fn embed_records(&self, records: &[StoredRecord]) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != records.len() {
            return Err(CatalogError::embedding(format!(
                "Expected {} embeddings, got {}",
                records.len(),
                embeddings.len()
            )));
        }
        Ok(embeddings)
    }

    fn write_records(
        &self,
        records: &[StoredRecord],
        embeddings: &[Vec<f32>],
        replace: bool,
    ) -> Result<()> {
        let sql = if replace {
            r#"
            INSERT INTO records (collection_id, id, text, metadata, embedding)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(collection_id, id) DO UPDATE SET
                text = excluded.text,
                metadata = excluded.metadata,
                embedding = excluded.embedding
            "#
        } else {
            r#"
            INSERT INTO records (collection_id, id, text, metadata, embedding)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#
        };

        self.with_conn_mut(|conn| {
            let generation = self.current_generation(conn)?;
            let tx = conn
                .transaction()
                .map_err(|e| CatalogError::database(e.to_string()))?;

            {
                let mut stmt = tx
                    .prepare(sql)
                    .map_err(|e| CatalogError::database(e.to_string()))?;

                for (record, embedding) in records.iter().zip(embeddings) {
                    let metadata = serde_json::to_string(&record.metadata)?;
                    stmt.execute(params![
                        generation,
                        record.id,
                        record.text,
                        metadata,
                        vec_to_bytes(embedding),
                    ])
                    .map_err(|e| {
                        if e.to_string().contains("UNIQUE constraint") {
                            CatalogError::DuplicateRecord {
                                id: record.id.clone(),
                            }
                        } else {
                            CatalogError::database(format!("Failed to write record: {}", e))
                        }
                    })?;
                }
            }

            tx.commit()
                .map_err(|e| CatalogError::database(e.to_string()))?;

            debug!("Wrote {} records", records.len());
            Ok(())
        })
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn nearest_neighbors(
        &self,
        query_text: &str,
        limit: usize,
    ) -> Result<Vec<(Metadata, f32)>> {
        let query = self.embedder.embed(query_text).await?;

        self.with_conn(|conn| {
            let generation = self.current_generation(conn)?;
            let mut stmt = conn
                .prepare("SELECT id, metadata, embedding FROM records WHERE collection_id = ?1")
                .map_err(|e| CatalogError::database(e.to_string()))?;

            let rows = stmt
                .query_map(params![generation], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                    ))
                })
                .map_err(|e| CatalogError::database(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| CatalogError::database(e.to_string()))?;

            let mut scored = Vec::with_capacity(rows.len());
            for (id, metadata, blob) in rows {
                let embedding = bytes_to_vec(&blob);
                if embedding.len() != query.len() {
                    return Err(CatalogError::malformed(format!(
                        "record '{}' has a {}-dimensional embedding, query has {}",
                        id,
                        embedding.len(),
                        query.len()
                    )));
                }
                let distance: f32 = query
                    .iter()
                    .zip(&embedding)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                scored.push((parse_metadata(&id, &metadata)?, distance));
            }

            scored.sort_by(|a, b| a.1.total_cmp(&b.1));
            scored.truncate(limit);

            debug!("Nearest-neighbor query returned {} records", scored.len());
            Ok(scored)
        })
    }

    async fn containment_filter(&self, needle: &str) -> Result<Vec<Metadata>> {
        self.with_conn(|conn| {
            let generation = self.current_generation(conn)?;
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT id, metadata FROM records
                    WHERE collection_id = ?1 AND instr(text, ?2) > 0
                    ORDER BY rowid
                    "#,
                )
                .map_err(|e| CatalogError::database(e.to_string()))?;

            let rows = stmt
                .query_map(params![generation, needle], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(|e| CatalogError::database(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| CatalogError::database(e.to_string()))?;

            debug!("Containment query for {:?} matched {} records", needle, rows.len());

            rows.iter()
                .map(|(id, metadata)| parse_metadata(id, metadata))
                .collect()
        })
    }
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn add(&self, records: &[StoredRecord]) -> Result<()> {
        let embeddings = self.embed_records(records).await?;
        self.write_records(records, &embeddings, false)
    }

    async fn upsert(&self, records: &[StoredRecord]) -> Result<()> {
        let embeddings = self.embed_records(records).await?;
        self.write_records(records, &embeddings, true)
    }

    async fn clear(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM collections WHERE name = ?1",
                params![self.collection],
            )
            .map_err(|e| CatalogError::database(e.to_string()))?;

            let generation = Self::create_collection(conn, &self.collection)?;
            self.generation.store(generation, Ordering::SeqCst);

            info!(
                "Cleared collection '{}' (generation {})",
                self.collection, generation
            );
            Ok(())
        })
    }

    async fn peek(&self, limit: usize) -> Result<Vec<Metadata>> {
        self.with_conn(|conn| {
            let generation = self.current_generation(conn)?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, metadata FROM records WHERE collection_id = ?1 ORDER BY rowid LIMIT ?2",
                )
                .map_err(|e| CatalogError::database(e.to_string()))?;

            let rows = stmt
                .query_map(params![generation, limit as i64], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(|e| CatalogError::database(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| CatalogError::database(e.to_string()))?;

            rows.iter()
                .map(|(id, metadata)| parse_metadata(id, metadata))
                .collect()
        })
    }

    async fn count(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let generation = self.current_generation(conn)?;
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM records WHERE collection_id = ?1",
                    params![generation],
                    |row| row.get(0),
                )
                .map_err(|e| CatalogError::database(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

fn parse_metadata(id: &str, raw: &str) -> Result<Metadata> {
    serde_json::from_str(raw).map_err(|e| {
        CatalogError::malformed(format!("record '{}' has unreadable metadata: {}", id, e))
    })
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Convert f32 vector to bytes (little-endian).
fn vec_to_bytes(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert little-endian bytes back to an f32 vector.
fn bytes_to_vec(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::{MetadataValue, Product};
    use catalog_embed::MockEmbedder;

    fn embedder() -> Arc<dyn Embedder> {
        Arc::new(MockEmbedder::with_dimension(32))
    }

    fn water() -> Product {
        Product::new(
            "Water",
            "Plain water. Comes hot, cold or lukwarm.",
            "WNN0001",
            2.0,
            &["no coffee", "plain", "water"],
        )
    }

    fn latte() -> Product {
        Product::new(
            "Latte",
            "A shot of coffee mixed with a shot of milk.",
            "CNM0010",
            10.89,
            &["white", "coffee", "dairy"],
        )
    }

    fn sku(metadata: &Metadata) -> String {
        match metadata.get("sku") {
            Some(MetadataValue::Text(s)) => s.clone(),
            other => panic!("unexpected sku value: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_open_memory() {
        let store = SqliteStore::open_memory("products", embedder()).unwrap();
        assert_eq!(store.collection(), "products");
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_add_and_peek() {
        let store = SqliteStore::open_memory("products", embedder()).unwrap();
        store
            .add(&[water().to_record(), latte().to_record()])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 2);

        let peeked = store.peek(1).await.unwrap();
        assert_eq!(peeked.len(), 1);
        assert_eq!(Product::from_metadata(&peeked[0]).unwrap(), water());
    }

    #[tokio::test]
    async fn test_add_duplicate_fails() {
        let store = SqliteStore::open_memory("products", embedder()).unwrap();
        store.add(&[water().to_record()]).await.unwrap();

        let err = store.add(&[water().to_record()]).await.unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_RECORD");
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let store = SqliteStore::open_memory("products", embedder()).unwrap();
        store.add(&[water().to_record()]).await.unwrap();

        let sold_out = water().with_available(false);
        store.upsert(&[sold_out.to_record()]).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let peeked = store.peek(10).await.unwrap();
        assert_eq!(Product::from_metadata(&peeked[0]).unwrap(), sold_out);
    }

    #[tokio::test]
    async fn test_containment_filter_is_case_sensitive_substring() {
        let store = SqliteStore::open_memory("products", embedder()).unwrap();
        store
            .add(&[water().to_record(), latte().to_record()])
            .await
            .unwrap();

        let hits = store.containment_filter("coffee").await.unwrap();
        let skus: Vec<String> = hits.iter().map(sku).collect();
        assert_eq!(skus, vec!["WNN0001", "CNM0010"]);

        // Indexed text is lowercase.
        assert!(store.containment_filter("Coffee").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_nearest_neighbors_sorted_and_limited() {
        let store = SqliteStore::open_memory("products", embedder()).unwrap();
        store
            .add(&[water().to_record(), latte().to_record()])
            .await
            .unwrap();

        let exact = water().searchable_text();
        let hits = store.nearest_neighbors(&exact, 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(sku(&hits[0].0), "WNN0001");
        assert!(hits[0].1.abs() < 1e-6);
        assert!(hits[0].1 <= hits[1].1);

        let limited = store.nearest_neighbors(&exact, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_on_same_handle() {
        let store = SqliteStore::open_memory("products", embedder()).unwrap();
        store.add(&[water().to_record()]).await.unwrap();

        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.containment_filter("water").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_from_other_handle_makes_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");

        let reader = SqliteStore::open(&path, "products", embedder()).unwrap();
        let writer = SqliteStore::open(&path, "products", embedder()).unwrap();
        writer.add(&[water().to_record()]).await.unwrap();
        assert_eq!(reader.containment_filter("water").await.unwrap().len(), 1);

        writer.clear().await.unwrap();

        let err = reader.containment_filter("water").await.unwrap_err();
        assert!(err.is_stale());
        let err = reader.nearest_neighbors("water", 5).await.unwrap_err();
        assert!(err.is_stale());

        // A fresh handle sees the recreated collection.
        let reopened = SqliteStore::open(&path, "products", embedder()).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_metadata_reported() {
        let store = SqliteStore::open_memory("products", embedder()).unwrap();
        store.add(&[water().to_record()]).await.unwrap();

        store
            .with_conn(|conn| {
                conn.execute("UPDATE records SET metadata = '[1, 2]'", [])
                    .map_err(|e| CatalogError::database(e.to_string()))
            })
            .unwrap();

        let err = store.containment_filter("water").await.unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_vec_bytes_round_trip() {
        let v = vec![0.5f32, -1.25, 3.0];
        assert_eq!(bytes_to_vec(&vec_to_bytes(&v)), v);
    }
}
