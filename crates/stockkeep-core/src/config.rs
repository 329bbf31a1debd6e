//! StockKeep configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! tax_rate = 0.09
//!
//! [storage]
//! backend = "file"
//! data_dir = "/var/lib/stockkeep"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default sales tax applied to quote and order subtotals
pub const DEFAULT_TAX_RATE: f64 = 0.09;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Value out of range
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Where collections live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Lost when the process exits
    Memory,
    /// JSON files under `data_dir`
    #[default]
    File,
}

/// Storage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            data_dir: PathBuf::from(".stockkeep"),
        }
    }
}

/// StockKeep configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockKeepConfig {
    /// Storage settings
    pub storage: StorageConfig,
    /// Tax rate applied to order subtotals (0.09 = 9%)
    pub tax_rate: f64,
    /// Default length of the recent purchase order list
    pub recent_purchase_orders: usize,
    /// Default length of the recent transaction list
    pub recent_transactions: usize,
    /// Transactions shown on the dashboard
    pub dashboard_recent: usize,
    /// Low-stock cutoff when a query gives none; unset means each
    /// product's own minimum stock level
    pub low_stock_threshold: Option<u32>,
}

impl StockKeepConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// Parse or validation failure
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// I/O, parse or validation failure
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `Invalid` when the tax rate is negative or not finite
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tax_rate.is_finite() || self.tax_rate < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "tax_rate must be a non-negative number, got {}",
                self.tax_rate
            )));
        }
        Ok(())
    }

    /// With in-memory storage
    #[inline]
    #[must_use]
    pub fn in_memory(mut self) -> Self {
        self.storage.backend = StorageBackend::Memory;
        self
    }

    /// With file storage under `dir`
    #[inline]
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage.backend = StorageBackend::File;
        self.storage.data_dir = dir.into();
        self
    }

    /// With tax rate
    #[inline]
    #[must_use]
    pub fn with_tax_rate(mut self, rate: f64) -> Self {
        self.tax_rate = rate;
        self
    }

    /// With a fixed low-stock cutoff
    #[inline]
    #[must_use]
    pub fn with_low_stock_threshold(mut self, threshold: u32) -> Self {
        self.low_stock_threshold = Some(threshold);
        self
    }
}

impl Default for StockKeepConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            tax_rate: DEFAULT_TAX_RATE,
            recent_purchase_orders: 5,
            recent_transactions: 10,
            dashboard_recent: 5,
            low_stock_threshold: None,
        }
    }
}
