//! TOML configuration file support.
//!
//! Instead of passing many CLI flags, users can keep writer settings in a
//! config file. Every key is optional and overrides the selected profile:
//!
//! ```toml
//! # mergepart.toml
//! [writer]
//! index_granularity = 4096
//! min_compress_block_size = 65536
//! max_compress_block_size = 1048576
//! aio_threshold = 0
//! compression = "zstd:3"
//! batch_size = 10000
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use mergepart::compression::CompressionMethod;
use mergepart::writer::WriterConfig;

/// Root configuration structure for mergepart.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Writer settings.
    #[serde(default)]
    pub writer: WriterSection,
}

/// The `[writer]` section.
#[derive(Debug, Default, Deserialize)]
pub struct WriterSection {
    /// Rows per granule.
    pub index_granularity: Option<usize>,

    /// Minimum uncompressed block size before a mark starts a new block.
    pub min_compress_block_size: Option<usize>,

    /// Maximum uncompressed block size.
    pub max_compress_block_size: Option<usize>,

    /// Estimated column size at which the direct I/O buffer is used.
    pub aio_threshold: Option<u64>,

    /// Codec, e.g. `lz4`, `zstd:5`, `deflate`, `none`.
    pub compression: Option<String>,

    /// Rows per generated batch.
    pub batch_size: Option<usize>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Apply the `[writer]` overrides on top of `config`.
    pub fn apply(&self, mut config: WriterConfig) -> Result<WriterConfig> {
        let section = &self.writer;
        if let Some(value) = section.index_granularity {
            config.index_granularity = value;
        }
        if let Some(value) = section.min_compress_block_size {
            config.min_compress_block_size = value;
        }
        if let Some(value) = section.max_compress_block_size {
            config.max_compress_block_size = value;
        }
        if let Some(value) = section.aio_threshold {
            config.aio_threshold = value;
        }
        if let Some(ref value) = section.compression {
            config.compression = value
                .parse::<CompressionMethod>()
                .map_err(anyhow::Error::msg)
                .context("Invalid [writer] compression")?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [writer]
            index_granularity = 4096
            min_compress_block_size = 1024
            max_compress_block_size = 8192
            aio_threshold = 1000000
            compression = "zstd:5"
            batch_size = 2000
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.writer.index_granularity, Some(4096));
        assert_eq!(config.writer.batch_size, Some(2_000));

        let applied = config.apply(WriterConfig::default()).unwrap();
        assert_eq!(applied.index_granularity, 4096);
        assert_eq!(applied.min_compress_block_size, 1024);
        assert_eq!(applied.max_compress_block_size, 8192);
        assert_eq!(applied.aio_threshold, 1_000_000);
        assert_eq!(applied.compression, CompressionMethod::Zstd(5));
    }

    #[test]
    fn test_partial_config_keeps_profile_values() {
        let toml = r#"
            [writer]
            index_granularity = 16
        "#;

        let config = Config::from_str(toml).unwrap();
        let applied = config.apply(WriterConfig::max_compression()).unwrap();
        assert_eq!(applied.index_granularity, 16);
        assert_eq!(applied.compression, CompressionMethod::Zstd(19));
    }

    #[test]
    fn test_empty_config() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.writer.index_granularity, None);
        assert_eq!(
            config.apply(WriterConfig::default()).unwrap(),
            WriterConfig::default()
        );
    }

    #[test]
    fn test_bad_compression_rejected() {
        let config = Config::from_str("[writer]\ncompression = \"brotli\"").unwrap();
        assert!(config.apply(WriterConfig::default()).is_err());
    }
}
