//! Typed failures returned by the storage layer.
//!
//! The front end decides how each kind is reported; the storage layer only
//! guarantees that a failed write left the database untouched.

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Malformed or missing input, caught at the boundary.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A point lookup matched zero rows.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Pool, connection, transaction or constraint error.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(err: r2d2::Error) -> Self {
        Self::Storage(format!("Failed to get connection from pool: {}", err))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
