//! Error types for MIME operations.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid content type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Invalid encoding.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Missing boundary in multipart entity.
    #[error("Missing boundary in multipart entity")]
    MissingBoundary,

    /// Part path could not be parsed or does not exist in the entity tree.
    #[error("Invalid part path: {0}")]
    InvalidPath(String),

    /// Multiparts are nested deeper than the parser accepts.
    #[error("Multipart nesting exceeds {0} levels")]
    TooDeep(usize),

    /// Operation requires a leaf entity but got a multipart one.
    #[error("Entity is multipart and has no single body")]
    NotALeaf,
}
