/// Extension of compressed column data files
pub const DATA_FILE_EXTENSION: &str = ".bin";

/// Extension of mark files
pub const MARKS_FILE_EXTENSION: &str = ".mrk";

/// Extension of compressed null-map files
pub const NULL_MAP_EXTENSION: &str = ".null.bin";

/// Extension of null-map mark files
pub const NULL_MARKS_FILE_EXTENSION: &str = ".null_mrk";

/// Suffix (followed by the nesting level) naming array sizes streams
pub const ARRAY_SIZES_COLUMN_NAME_SUFFIX: &str = ".size";

/// Sparse primary index file
pub const PRIMARY_INDEX_FILE: &str = "primary.idx";

/// Column list descriptor
pub const COLUMNS_FILE: &str = "columns.txt";

/// Checksum manifest
pub const CHECKSUMS_FILE: &str = "checksums.txt";

/// Version line written at the top of `columns.txt`
pub const COLUMNS_FORMAT_VERSION: u32 = 1;

/// Version line written at the top of `checksums.txt`
pub const CHECKSUMS_FORMAT_VERSION: u32 = 2;

/// Size of one serialized mark: two little-endian u64
pub const MARK_SIZE_BYTES: usize = 16;
