//! Error types for the catalog search system.

use thiserror::Error;

/// Result type alias using CatalogError.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors that can occur in the catalog search system.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The collection this handle was opened against no longer exists.
    #[error("Collection not found: {name} (database changed, restart required)")]
    CollectionNotFound { name: String },

    /// A stored record is missing a required field or has a mistyped one.
    #[error("Malformed record: {message}")]
    MalformedRecord { message: String },

    /// A provider (embedding model or record store) could not be reached.
    #[error("{provider} unavailable: {message}")]
    Unavailable { provider: String, message: String },

    /// A record with the same id is already stored.
    #[error("Record already exists: {id}")]
    DuplicateRecord { id: String },

    /// Invalid argument provided.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Database error.
    #[error("Database error: {message}")]
    Database { message: String },

    /// Embedding model error.
    #[error("Embedding error: {message}")]
    Embedding { message: String },

    /// Ingestion error.
    #[error("Ingest error: {message}")]
    Ingest { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CatalogError {
    /// Create a malformed record error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            message: message.into(),
        }
    }

    /// Create a provider unavailable error.
    pub fn unavailable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Create an embedding error.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    /// Create an ingest error.
    pub fn ingest(message: impl Into<String>) -> Self {
        Self::Ingest {
            message: message.into(),
        }
    }

    /// Whether the backing index changed shape since this session began.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::CollectionNotFound { .. })
    }

    /// Whether a returned record was structurally invalid.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedRecord { .. })
    }

    /// Get the error code for structured responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::CollectionNotFound { .. } => "COLLECTION_NOT_FOUND",
            Self::MalformedRecord { .. } => "MALFORMED_RECORD",
            Self::Unavailable { .. } => "PROVIDER_UNAVAILABLE",
            Self::DuplicateRecord { .. } => "DUPLICATE_RECORD",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::Database { .. } => "DATABASE_ERROR",
            Self::Embedding { .. } => "EMBEDDING_ERROR",
            Self::Ingest { .. } => "INGEST_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CatalogError::CollectionNotFound {
            name: "products".to_string(),
        };
        assert!(err.to_string().contains("products"));
        assert!(err.to_string().contains("restart required"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            CatalogError::malformed("missing sku").error_code(),
            "MALFORMED_RECORD"
        );
        assert_eq!(
            CatalogError::unavailable("embedder", "connection refused").error_code(),
            "PROVIDER_UNAVAILABLE"
        );
        assert_eq!(CatalogError::database("test").error_code(), "DATABASE_ERROR");
    }

    #[test]
    fn test_classifiers() {
        let stale = CatalogError::CollectionNotFound {
            name: "products".to_string(),
        };
        assert!(stale.is_stale());
        assert!(!stale.is_malformed());

        let malformed = CatalogError::malformed("price is a string");
        assert!(malformed.is_malformed());
        assert!(!malformed.is_stale());

        assert!(!CatalogError::ingest("boom").is_stale());
    }
}
