//! Package options
//!
//! Options control how packages are written and how strictly they are read.
//! They can be built in code or loaded from TOML:
//!
//! ```toml
//! compression = "stored"
//! require_styles = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use zip::CompressionMethod;

use crate::error::Result;

/// Compression used for archive entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Deflate every entry
    #[default]
    Deflated,
    /// Store entries uncompressed
    Stored,
}

impl Compression {
    pub(crate) fn method(self) -> CompressionMethod {
        match self {
            Self::Deflated => CompressionMethod::Deflated,
            Self::Stored => CompressionMethod::Stored,
        }
    }
}

/// Options for reading and writing packages
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageOptions {
    /// Entry compression
    pub compression: Compression,
    /// Deflate level; `None` uses the zip default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_level: Option<i64>,
    /// Fail unpacking when the document has no styles relationship
    pub require_styles: bool,
}

impl PackageOptions {
    /// Parse options from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Load options from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Set the entry compression
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Require a styles part when unpacking
    pub fn with_require_styles(mut self, require: bool) -> Self {
        self.require_styles = require;
        self
    }
}
