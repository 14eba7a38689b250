//! Merge configuration types
//!
//! This module defines the small amount of configuration the library needs:
//! how C1 files are recognised and where the merge reads its channel pool
//! from. Output locations belong to the application layer.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How a C1 log file is recognised and filtered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFormat {
    /// Required file extension, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Lines starting with this prefix are headers and are skipped
    #[serde(default = "default_header_prefix")]
    pub header_prefix: String,
}

fn default_extension() -> String {
    "c1".to_string()
}

fn default_header_prefix() -> String {
    "Pi".to_string()
}

fn default_channel_pool() -> PathBuf {
    PathBuf::from("channels.txt")
}

impl Default for LogFormat {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            header_prefix: default_header_prefix(),
        }
    }
}

impl LogFormat {
    /// Check whether a path carries the expected extension
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .map(|ext| ext == self.extension)
            .unwrap_or(false)
    }

    /// Check whether a line is a header line
    pub fn is_header(&self, line: &str) -> bool {
        !self.header_prefix.is_empty() && line.starts_with(&self.header_prefix)
    }
}

/// Configuration for merging two C1 logs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// File recognition rules for both inputs
    #[serde(flatten)]
    pub format: LogFormat,

    /// Reference list of channels that may be handed out on collision
    #[serde(default = "default_channel_pool")]
    pub channel_pool: PathBuf,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            channel_pool: default_channel_pool(),
        }
    }
}

impl MergeConfig {
    /// Create a new merge configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the required log file extension
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.format.extension = extension.into();
        self
    }

    /// Builder method: set the header line prefix
    pub fn with_header_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.format.header_prefix = prefix.into();
        self
    }

    /// Builder method: set the channel pool reference file
    pub fn with_channel_pool(mut self, path: impl Into<PathBuf>) -> Self {
        self.channel_pool = path.into();
        self
    }
}
