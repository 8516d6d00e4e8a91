//! Client-wide defaults.

use std::path::Path;

use doccol_common::{Result, error::Error};
use serde::{Deserialize, Serialize};

/// Number of rows per block when a block query does not specify its own.
pub const DEFAULT_BLOCK_SIZE: usize = 1000;

/// Largest block a streaming query may request.
pub const MAX_BLOCK_SIZE: usize = 1 << 24;

/// Configuration of a [`Client`](crate::Client).
///
/// Every field has a default, so a JSON configuration only needs to mention the
/// settings it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Rows per block for block queries that do not set a block size.
    pub default_block_size: usize,
    /// Whether one-shot reads count the matching documents before allocating.
    /// When `false` and a limit is given, the limit is used as the row count.
    pub use_exact_count: bool,
    /// Whether queries ask the server to return only the requested fields.
    pub select_fields: bool,
    /// Upper bound on the rows of a one-shot read; `0` means unbounded.
    pub max_allocation_rows: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_block_size: DEFAULT_BLOCK_SIZE,
            use_exact_count: true,
            select_fields: false,
            max_allocation_rows: 0,
        }
    }
}

impl ClientConfig {
    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.default_block_size == 0 {
            return Err(Error::invalid_config(
                "default_block_size must be greater than 0",
            ));
        }
        if self.default_block_size > MAX_BLOCK_SIZE {
            return Err(Error::invalid_config(format!(
                "default_block_size must not exceed {MAX_BLOCK_SIZE}"
            )));
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<ClientConfig> {
        let config: ClientConfig =
            serde_json::from_str(json).map_err(|e| Error::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<ClientConfig> {
        let path = path.as_ref();
        let json =
            std::fs::read_to_string(path).map_err(|e| Error::io(path.display().to_string(), e))?;
        ClientConfig::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::invalid_config(e.to_string()))
    }
}
