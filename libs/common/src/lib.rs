//! Common library for the KIP SAFE application
//!
//! This crate provides the credential store shared by the services of the
//! KIP SAFE application, together with its error types.

pub mod credentials;
pub mod error;

pub use credentials::{Account, Accounts, CredentialStore, CsvCredentialStore, MemoryCredentialStore};
pub use error::{StoreError, StoreResult};
