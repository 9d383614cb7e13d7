//! Writer profiles for common use cases.
//!
//! Profiles pick a codec, block sizes and a batch size so that users do not
//! have to tune low-level writer settings by hand.

use std::fmt;
use std::str::FromStr;

use mergepart::writer::WriterConfig;

/// Writer profiles for common use cases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Profile {
    /// Prioritize speed over compression.
    ///
    /// - Compression: LZ4
    /// - Batch size: 65,536 rows
    Fast,

    /// Balance between speed and compression (default).
    ///
    /// - Compression: LZ4
    /// - Batch size: 16,384 rows
    #[default]
    Balanced,

    /// Maximum compression, slower writes.
    ///
    /// - Compression: ZSTD level 19, 256 KiB - 4 MiB blocks
    /// - Batch size: 8,192 rows
    MaxCompression,
}

impl Profile {
    /// Writer settings for this profile
    pub fn writer_config(&self) -> WriterConfig {
        match self {
            Profile::Fast => WriterConfig::fast(),
            Profile::Balanced => WriterConfig::balanced(),
            Profile::MaxCompression => WriterConfig::max_compression(),
        }
    }

    /// Rows per generated batch
    pub fn batch_size(&self) -> usize {
        match self {
            Profile::Fast => 65_536,
            Profile::Balanced => 16_384,
            Profile::MaxCompression => 8_192,
        }
    }

    /// Returns all available profile names.
    pub fn variants() -> &'static [&'static str] {
        &["fast", "balanced", "max-compression"]
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Fast => write!(f, "fast"),
            Profile::Balanced => write!(f, "balanced"),
            Profile::MaxCompression => write!(f, "max-compression"),
        }
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Profile::Fast),
            "balanced" | "default" => Ok(Profile::Balanced),
            "max-compression" | "maxcompression" | "max" => Ok(Profile::MaxCompression),
            _ => Err(format!(
                "Unknown profile '{}'. Valid options: {}",
                s,
                Profile::variants().join(", ")
            )),
        }
    }
}
