// crates/adi-core/src/error.rs

use std::num::ParseIntError;

use adi_bucket::BucketError;
use adi_repository::RepositoryError;
use thiserror::Error;

use crate::dates::DateError;
use crate::secrets::SecretError;

/// Startup configuration problems, reported before any I/O happens.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "'{0}' is not a valid logging level. Possible values are debug, info, warning, error, and critical."
    )]
    InvalidLogLevel(String),

    #[error("'{0}' is not a valid log format. Possible values are json and text.")]
    InvalidLogFormat(String),

    #[error("environment variable '{0}' must be set")]
    MissingVar(&'static str),

    #[error("'{value}' is not a valid database port: {source}")]
    InvalidPort {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("failed to install logging subscriber: {0}")]
    Logging(String),
}

/// Why a single record was left out of the import. The run carries on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("Assessment at index {index} is {found}, not an object")]
    NotAnObject { index: usize, found: &'static str },

    #[error("Assessment at index {index} missing 'id'")]
    MissingId { index: usize },

    #[error("Assessment at index {index} has an 'id' that is {found}, not a string or integer")]
    InvalidId { index: usize, found: &'static str },

    #[error("'{id}' is missing the following required field(s): {}", quoted(.fields))]
    MissingFields { id: String, fields: Vec<&'static str> },

    #[error("'{id}' has a malformed '{field}' date: {source}")]
    MalformedDate {
        id: String,
        field: &'static str,
        #[source]
        source: DateError,
    },
}

fn quoted(fields: &[&'static str]) -> String {
    fields
        .iter()
        .map(|field| format!("'{field}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl RecordError {
    /// The assessment id, when the record got far enough to have one.
    pub fn id(&self) -> Option<&str> {
        match self {
            RecordError::MissingFields { id, .. }
            | RecordError::MalformedDate { id, .. } => Some(id),
            RecordError::NotAnObject { .. }
            | RecordError::MissingId { .. }
            | RecordError::InvalidId { .. } => None,
        }
    }

    pub fn is_malformed_date(&self) -> bool {
        matches!(self, RecordError::MalformedDate { .. })
    }
}

/// Failures that abort an import run before the source object is deleted.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("object storage error: {0}")]
    Bucket(#[from] BucketError),

    #[error("secrets lookup failed: {0}")]
    Secrets(#[from] SecretError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("staging file error: {0}")]
    Staging(#[from] std::io::Error),

    #[error("source document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("source document must be a JSON array of objects, found {found}")]
    NotAnArray { found: &'static str },

    #[error("aborting import: {0}")]
    MalformedDate(#[source] RecordError),
}

pub type Result<T> = std::result::Result<T, ImportError>;
