//! Custom error types for the common library
//!
//! This module defines the errors raised by the credential store.

use thiserror::Error;

/// Custom error type for credential store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error occurred while reading or writing the credential file
    #[error("Credential file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The credential file could not be parsed or serialized
    #[error("Credential file format error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Credential store configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;
