use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use flate2::write::ZlibEncoder;

/// Method byte stored in the header of a block written without compression
pub const METHOD_BYTE_NONE: u8 = 0x02;
/// Method byte stored in the header of an LZ4 block
pub const METHOD_BYTE_LZ4: u8 = 0x82;
/// Method byte stored in the header of a ZSTD block
pub const METHOD_BYTE_ZSTD: u8 = 0x90;
/// Method byte stored in the header of a zlib (deflate) block
pub const METHOD_BYTE_DEFLATE: u8 = 0x91;

/// Compression options for column data blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Blocks are framed but stored as-is
    None,
    /// LZ4 block compression (fast, the default)
    Lz4,
    /// ZSTD with the given level
    Zstd(i32),
    /// zlib-framed deflate with the given level (0-9)
    Deflate(u32),
}

impl Default for CompressionMethod {
    fn default() -> Self {
        Self::Lz4
    }
}

impl CompressionMethod {
    /// Maximum compression (slower write, smallest files)
    pub fn max_compression() -> Self {
        Self::Zstd(19)
    }

    /// Balanced compression (recommended default)
    pub fn balanced() -> Self {
        Self::Lz4
    }

    /// The byte identifying this method in a block header
    pub fn method_byte(&self) -> u8 {
        match self {
            Self::None => METHOD_BYTE_NONE,
            Self::Lz4 => METHOD_BYTE_LZ4,
            Self::Zstd(_) => METHOD_BYTE_ZSTD,
            Self::Deflate(_) => METHOD_BYTE_DEFLATE,
        }
    }

    /// Compress `input`, appending the payload to `out`.
    pub fn compress_into(&self, input: &[u8], out: &mut Vec<u8>) -> io::Result<()> {
        match *self {
            Self::None => out.extend_from_slice(input),
            Self::Lz4 => out.extend_from_slice(&lz4_flex::block::compress(input)),
            Self::Zstd(level) => out.extend_from_slice(&zstd::bulk::compress(input, level)?),
            Self::Deflate(level) => {
                let mut encoder = ZlibEncoder::new(out, flate2::Compression::new(level.min(9)));
                encoder.write_all(input)?;
                encoder.finish()?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Lz4 => write!(f, "lz4"),
            Self::Zstd(level) => write!(f, "zstd:{}", level),
            Self::Deflate(level) => write!(f, "deflate:{}", level),
        }
    }
}

impl FromStr for CompressionMethod {
    type Err = String;

    /// Accepts `none`, `lz4`, `zstd`, `zstd:<level>`, `deflate`, `deflate:<level>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let (name, level) = match lowered.split_once(':') {
            Some((name, level)) => (name, Some(level)),
            None => (lowered.as_str(), None),
        };

        let bad_level = |level: &str| format!("Invalid compression level '{}' in '{}'", level, s);

        match (name, level) {
            ("none", None) => Ok(Self::None),
            ("lz4", None) => Ok(Self::Lz4),
            ("zstd", None) => Ok(Self::Zstd(3)),
            ("zstd", Some(level)) => level
                .parse()
                .map(Self::Zstd)
                .map_err(|_| bad_level(level)),
            ("deflate", None) => Ok(Self::Deflate(6)),
            ("deflate", Some(level)) => level
                .parse()
                .map(Self::Deflate)
                .map_err(|_| bad_level(level)),
            _ => Err(format!(
                "Unknown compression method '{}'. Valid options: none, lz4, zstd[:level], deflate[:level]",
                s
            )),
        }
    }
}
