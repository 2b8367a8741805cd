/// Error types for blog-service
use thiserror::Error;

/// Domain errors raised by the post store.
///
/// The gRPC layer reports these in the response `error` field rather than as
/// a `tonic::Status`, so there is deliberately no conversion into `Status`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlogError {
    #[error("post not found: {0}")]
    NotFound(String),
}

impl BlogError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }
}

/// Result type alias for store operations
pub type BlogResult<T> = Result<T, BlogError>;
