//! Export configuration.

use std::path::PathBuf;

/// Default deflate level for archive entries.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Configuration for package export.
#[derive(Debug, Clone, Default)]
pub struct ExportConfig {
    /// Compression level for deflate (0-9, default 6).
    pub compression_level: Option<u32>,
    /// If true, declare the IMS CP and IMS MD namespaces on the manifest root.
    pub namespaces: bool,
    /// Directory for the temporary archive. Defaults to the system temp dir.
    pub temp_dir: Option<PathBuf>,
}

impl ExportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = Some(level.min(9));
        self
    }

    pub fn with_namespaces(mut self, namespaces: bool) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn compression_level(&self) -> u32 {
        self.compression_level.unwrap_or(DEFAULT_COMPRESSION_LEVEL)
    }
}
