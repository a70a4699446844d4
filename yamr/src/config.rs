//! Store configuration module.
//!
//! This module provides configuration loading for the yamr CLI from
//! environment variables.
//!
//! # Environment Variables
//!
//! - `YAMR_DATABASE_PATH`: Path of the chunk file (default: `./yamr.db`)
//! - `YAMR_MAX_SIZE`: Branching factor for newly created trees (default: `1024`)
//!
//! # Invariants
//!
//! - `max_size` is always at least `MIN_BRANCHING_FACTOR` and fits in a `u32`

use std::path::PathBuf;

use crate::btree::{DEFAULT_BRANCHING_FACTOR, MIN_BRANCHING_FACTOR};

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Path of the chunk file holding the tree.
    pub database_path: PathBuf,
    /// Branching factor used when the file has no committed tree yet.
    pub max_size: usize,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl StoreConfig {
    /// Default chunk file path.
    pub const DEFAULT_DATABASE_PATH: &'static str = "./yamr.db";

    const DATABASE_PATH_VAR: &'static str = "YAMR_DATABASE_PATH";
    const MAX_SIZE_VAR: &'static str = "YAMR_MAX_SIZE";

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `YAMR_MAX_SIZE` is set but is not an integer of
    /// at least `MIN_BRANCHING_FACTOR`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_path = Self::load_database_path(std::env::var(Self::DATABASE_PATH_VAR).ok());
        let max_size = Self::load_max_size(std::env::var(Self::MAX_SIZE_VAR).ok())?;

        Ok(Self {
            database_path,
            max_size,
        })
    }

    /// Returns the default if not set.
    fn load_database_path(value: Option<String>) -> PathBuf {
        value.map_or_else(|| PathBuf::from(Self::DEFAULT_DATABASE_PATH), PathBuf::from)
    }

    /// Returns the default if not set.
    fn load_max_size(value: Option<String>) -> Result<usize, ConfigError> {
        let Some(value) = value else {
            return Ok(DEFAULT_BRANCHING_FACTOR);
        };

        let invalid = |message: String| ConfigError::InvalidValue {
            name: Self::MAX_SIZE_VAR.to_string(),
            message,
        };

        let max_size = value
            .trim()
            .parse::<u32>()
            .map_err(|_| invalid(format!("'{value}' is not a valid branching factor")))?;
        if (max_size as usize) < MIN_BRANCHING_FACTOR {
            return Err(invalid(format!(
                "{max_size} is below the minimum of {MIN_BRANCHING_FACTOR}"
            )));
        }

        Ok(max_size as usize)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(Self::DEFAULT_DATABASE_PATH),
            max_size: DEFAULT_BRANCHING_FACTOR,
        }
    }
}
