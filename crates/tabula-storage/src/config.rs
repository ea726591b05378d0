//! Backend selection and database configuration.
//!
//! The database URL is the whole configuration surface the storage layer
//! depends on. [`BackendKind::parse`] accepts:
//!
//! | url | backend |
//! |---|---|
//! | `""`, `sqlite::memory:`, `sqlite://` | SQLite, in-memory |
//! | `sqlite://<path>`, `sqlite:<path>` | SQLite file at `<path>` |
//! | `mock`, `mock://`, `memory://` | in-memory mock executor |

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::StorageError;

/// Environment variable holding the database URL.
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
/// Environment variable enabling statement echo.
pub const DEBUG_VAR: &str = "DEBUG";

/// Where a SQLite database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteLocation {
    Memory,
    File(PathBuf),
}

impl fmt::Display for SqliteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqliteLocation::Memory => f.write_str(":memory:"),
            SqliteLocation::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// The executor a URL selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    Sqlite(SqliteLocation),
    Mock,
}

impl BackendKind {
    pub fn parse(url: &str) -> Result<Self, StorageError> {
        let url = url.trim();
        match url {
            "" | "sqlite::memory:" | "sqlite://" | "sqlite:" => {
                return Ok(BackendKind::Sqlite(SqliteLocation::Memory))
            }
            "mock" | "mock://" | "memory://" => return Ok(BackendKind::Mock),
            _ => {}
        }

        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .ok_or_else(|| StorageError::UnsupportedUrl(url.to_string()))?;
        if path == ":memory:" {
            Ok(BackendKind::Sqlite(SqliteLocation::Memory))
        } else {
            Ok(BackendKind::Sqlite(SqliteLocation::File(PathBuf::from(path))))
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Sqlite(_) => "sqlite",
            BackendKind::Mock => "mock",
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, BackendKind::Mock)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Sqlite(location) => write!(f, "sqlite ({location})"),
            BackendKind::Mock => f.write_str("mock"),
        }
    }
}

/// Database settings, loadable from the environment or any serde source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Backend URL; empty selects in-memory SQLite.
    pub url: String,
    /// Echo every statement at `info` level instead of `debug`.
    pub debug: bool,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        DatabaseConfig {
            url: url.into(),
            debug: false,
        }
    }

    /// Reads `DATABASE_URL` and `DEBUG` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(DATABASE_URL_VAR).unwrap_or_default();
        let debug = lookup(DEBUG_VAR)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1"))
            .unwrap_or(false);
        DatabaseConfig { url, debug }
    }

    pub fn backend(&self) -> Result<BackendKind, StorageError> {
        BackendKind::parse(&self.url)
    }
}
