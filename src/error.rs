use thiserror::Error;

/// Main error type for vecgraph
#[derive(Error, Debug)]
pub enum VecgraphError {
    /// Underlying storage inaccessible or failing
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// External embedding service failed, timed out, or is not configured
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Node not found where the caller required one
    #[error("Node not found: {0}")]
    NotFound(String),

    /// Malformed caller input, rejected before any storage access
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configured per-hop frontier cap exceeded; the whole call is aborted
    #[error("Frontier too large at hop {hop}: {size} nodes (limit {limit})")]
    FrontierTooLarge {
        hop: usize,
        size: usize,
        limit: usize,
    },

    /// Caller-driven cancellation observed mid-traversal
    #[error("Traversal cancelled")]
    Cancelled,
}

/// Convenient Result type using VecgraphError
pub type Result<T> = std::result::Result<T, VecgraphError>;
