use std::path::PathBuf;

/// Error type for loading phase definitions.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A phase document could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A phase document is not valid JSON or does not match the schema.
    #[error("Invalid JSON in {document}: {source}")]
    Json {
        document: String,
        source: serde_json::Error,
    },

    /// The requested manifest does not exist in this phase.
    #[error("Manifest '{0}' not found")]
    ManifestNotFound(String),

    /// A mode name other than `lite` or `full`.
    #[error("Unknown mode '{0}' (expected 'lite' or 'full')")]
    UnknownMode(String),
}

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Storage is disabled or over quota.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A stored blob could not be encoded or decoded.
    #[error("Invalid stored value: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend-specific failure (file system, etc.)
    #[error("Storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    /// Create a backend error from any error type.
    pub fn backend(err: impl Into<anyhow::Error>) -> Self {
        Self::Backend(err.into())
    }

    /// Check if this error means storage is unavailable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
