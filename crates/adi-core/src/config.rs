use std::env;
use std::path::PathBuf;

use adi_repository::ConnectionSettings;

use crate::error::ConfigError;
use crate::logging::{LogFormat, LogLevel};
use crate::secrets::Credentials;

pub const DEFAULT_DB_PORT: u16 = 27017;

/// A single JSON document in object storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub bucket: String,
    pub key: String,
}

/// Names of the secrets holding the database credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRefs {
    pub db_name: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseTarget {
    pub host: String,
    pub port: u16,
    pub secrets: CredentialRefs,
}

impl DatabaseTarget {
    pub fn connection_settings(&self, credentials: Credentials) -> ConnectionSettings {
        ConnectionSettings {
            host: self.host.clone(),
            port: self.port,
            database: credentials.db_name,
            username: credentials.username,
            password: credentials.password,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub source: SourceLocation,
    pub database: DatabaseTarget,
}

/// What to do with a record whose date field cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatePolicy {
    /// Log a warning and leave the record out.
    #[default]
    SkipRecord,
    /// Fail the whole run; the source object is kept.
    AbortRun,
}

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Directory for the staged copy of the source document. Defaults to the
    /// system temp dir.
    pub staging_dir: Option<PathBuf>,
    pub date_policy: DatePolicy,
}

pub fn parse_port(value: &str) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|source| ConfigError::InvalidPort {
            value: value.to_string(),
            source,
        })
}

/// Settings for event-driven runs, read from the function's environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerConfig {
    pub request: ImportRequest,
    pub log_level: LogLevel,
    pub log_format: LogFormat,
}

impl TriggerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the same variables as [`TriggerConfig::from_env`] through an
    /// arbitrary lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::MissingVar(name));

        let port = match get("db_port") {
            Some(value) => parse_port(&value)?,
            None => DEFAULT_DB_PORT,
        };
        let log_level = match get("log_level") {
            Some(value) => value.parse()?,
            None => LogLevel::Info,
        };
        let log_format = match get("log_format") {
            Some(value) => value.parse()?,
            None => LogFormat::Json,
        };

        Ok(Self {
            request: ImportRequest {
                source: SourceLocation {
                    bucket: require("s3_bucket")?,
                    key: require("data_filename")?,
                },
                database: DatabaseTarget {
                    host: require("db_hostname")?,
                    port,
                    secrets: CredentialRefs {
                        db_name: require("ssm_db_name")?,
                        username: require("ssm_db_user")?,
                        password: require("ssm_db_password")?,
                    },
                },
            },
            log_level,
            log_format,
        })
    }
}
