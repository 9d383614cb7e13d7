use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::compression::CompressionMethod;
use crate::schema::{NamesAndTypesList, SortDescription};

use super::error::WriterError;

/// How the table merges rows of equal key; decides whether a part is sorted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeMode {
    /// Plain sorted merge
    #[default]
    Ordinary,
    /// Sorted, rows with opposite sign collapse
    Collapsing,
    /// Sorted, numeric columns are summed per key
    Summing,
    /// Sorted, aggregate states are merged per key
    Aggregating,
    /// Sorted, the latest row per key wins
    Replacing,
    /// Sorted, rolled up by retention rules
    Graphite,
    /// Rows kept in insertion order, no primary index
    Unsorted,
}

impl MergeMode {
    /// Whether parts of this mode carry a primary index
    #[inline]
    pub fn is_sorted(&self) -> bool {
        !matches!(self, MergeMode::Unsorted)
    }

    fn name(&self) -> &'static str {
        match self {
            MergeMode::Ordinary => "ordinary",
            MergeMode::Collapsing => "collapsing",
            MergeMode::Summing => "summing",
            MergeMode::Aggregating => "aggregating",
            MergeMode::Replacing => "replacing",
            MergeMode::Graphite => "graphite",
            MergeMode::Unsorted => "unsorted",
        }
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MergeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            MergeMode::Ordinary,
            MergeMode::Collapsing,
            MergeMode::Summing,
            MergeMode::Aggregating,
            MergeMode::Replacing,
            MergeMode::Graphite,
            MergeMode::Unsorted,
        ]
        .into_iter()
        .find(|mode| mode.name().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown merge mode '{}'", s))
    }
}

/// Configuration for part writers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    /// Rows per granule (one mark and one primary index entry each)
    pub index_granularity: usize,

    /// A new compressed block is started before a mark once the open block
    /// holds at least this many uncompressed bytes
    pub min_compress_block_size: usize,

    /// Upper bound for the uncompressed size of a block
    pub max_compress_block_size: usize,

    /// Columns estimated at or above this size get the direct I/O buffer
    /// (0 disables)
    pub aio_threshold: u64,

    /// Codec for column data
    pub compression: CompressionMethod,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            index_granularity: 8192,
            min_compress_block_size: 64 * 1024,
            max_compress_block_size: 1024 * 1024,
            aio_threshold: 0,
            compression: CompressionMethod::Lz4,
        }
    }
}

impl WriterConfig {
    /// Configuration optimized for maximum compression (slower write)
    pub fn max_compression() -> Self {
        Self {
            min_compress_block_size: 256 * 1024,
            max_compress_block_size: 4 * 1024 * 1024,
            compression: CompressionMethod::max_compression(),
            ..Self::default()
        }
    }

    /// Configuration optimized for fast writing (larger files)
    pub fn fast() -> Self {
        Self {
            min_compress_block_size: 64 * 1024,
            max_compress_block_size: 1024 * 1024,
            compression: CompressionMethod::Lz4,
            ..Self::default()
        }
    }

    /// Balanced configuration
    pub fn balanced() -> Self {
        Self {
            compression: CompressionMethod::balanced(),
            ..Self::default()
        }
    }

    /// Builder-style override of the index granularity
    pub fn with_index_granularity(mut self, index_granularity: usize) -> Self {
        self.index_granularity = index_granularity;
        self
    }

    /// Check that the settings can drive a writer
    pub fn validate(&self) -> Result<(), WriterError> {
        if self.index_granularity == 0 {
            return Err(WriterError::InvalidConfig(
                "index_granularity must be positive".to_string(),
            ));
        }
        if self.max_compress_block_size == 0 {
            return Err(WriterError::InvalidConfig(
                "max_compress_block_size must be positive".to_string(),
            ));
        }
        if self.min_compress_block_size > self.max_compress_block_size {
            return Err(WriterError::InvalidConfig(format!(
                "min_compress_block_size ({}) exceeds max_compress_block_size ({})",
                self.min_compress_block_size, self.max_compress_block_size
            )));
        }
        if u32::try_from(self.max_compress_block_size).is_err() {
            return Err(WriterError::InvalidConfig(
                "max_compress_block_size must fit in 32 bits".to_string(),
            ));
        }
        Ok(())
    }
}

/// Table-level description shared by every part of one table
#[derive(Debug, Clone)]
pub struct Storage {
    /// Columns stored in every part
    pub columns: NamesAndTypesList,
    /// Primary key columns
    pub sort_description: SortDescription,
    /// Merge mode
    pub merge_mode: MergeMode,
    /// Writer settings
    pub config: WriterConfig,
}

impl Storage {
    /// Ordinary sorted storage with default settings
    pub fn new(columns: NamesAndTypesList, sort_description: SortDescription) -> Self {
        Self {
            columns,
            sort_description,
            merge_mode: MergeMode::default(),
            config: WriterConfig::default(),
        }
    }

    /// Builder-style override of the merge mode
    pub fn with_merge_mode(mut self, merge_mode: MergeMode) -> Self {
        self.merge_mode = merge_mode;
        self
    }

    /// Builder-style override of the writer settings
    pub fn with_config(mut self, config: WriterConfig) -> Self {
        self.config = config;
        self
    }
}
