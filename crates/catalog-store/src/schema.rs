//! Database schema definitions.

/// Main schema SQL for initializing the database.
pub const SCHEMA: &str = r#"
-- Collections table. A cleared collection is recreated under a new id,
-- which is how open handles detect that they are stale.
CREATE TABLE IF NOT EXISTS collections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL
);

-- Records table
CREATE TABLE IF NOT EXISTS records (
    collection_id INTEGER NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
    id TEXT NOT NULL,
    text TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}',
    embedding BLOB NOT NULL,
    PRIMARY KEY (collection_id, id)
);
"#;

/// Schema version for migrations.
pub const SCHEMA_VERSION: u32 = 1;
