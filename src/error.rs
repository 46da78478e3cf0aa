//! Errors produced by the entry store, the validator and the CSV codec.
//!
//! - [`InvalidField`] a payload failed validation.
//! - [`NotFound`] no entry matches the requested id.
//! - [`MalformedImport`] a CSV document cannot be imported at all.
//! - [`StorageUnavailable`] the database failed or could not be reached.
//!
//!  [`InvalidField`]: EntryError::InvalidField
//!  [`NotFound`]: EntryError::NotFound
//!  [`MalformedImport`]: EntryError::MalformedImport
//!  [`StorageUnavailable`]: EntryError::StorageUnavailable
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EntryError {
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("entry {0} not found")]
    NotFound(i64),
    #[error("malformed import: {0}")]
    MalformedImport(String),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),
}

impl EntryError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = EntryError> = std::result::Result<T, E>;
