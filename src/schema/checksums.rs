//! Checksum manifest of a part (`checksums.txt`).
//!
//! Every file of a part is listed with its on-disk size and hash. Compressed
//! column files additionally carry the size and hash of their uncompressed
//! content, so two parts can be compared independently of the codec.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use serde::{Serialize, Serializer};

use super::constants::CHECKSUMS_FORMAT_VERSION;
use super::error::SchemaError;
use crate::compression::HashingWriter;

fn serialize_hash<S: Serializer>(hash: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:032x}", hash))
}

/// Size and content hash of one file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Checksum {
    /// Bytes on disk
    pub file_size: u64,
    /// XXH3-128 of the bytes on disk
    #[serde(serialize_with = "serialize_hash")]
    pub file_hash: u128,
    /// Whether the file holds compressed blocks
    pub is_compressed: bool,
    /// Bytes before compression (compressed files only)
    pub uncompressed_size: u64,
    /// XXH3-128 of the bytes before compression (compressed files only)
    #[serde(serialize_with = "serialize_hash")]
    pub uncompressed_hash: u128,
}

impl Checksum {
    /// Checksum of a plain file
    pub fn plain(file_size: u64, file_hash: u128) -> Self {
        Self {
            file_size,
            file_hash,
            ..Default::default()
        }
    }

    /// Checksum of a compressed file
    pub fn compressed(
        file_size: u64,
        file_hash: u128,
        uncompressed_size: u64,
        uncompressed_hash: u128,
    ) -> Self {
        Self {
            file_size,
            file_hash,
            is_compressed: true,
            uncompressed_size,
            uncompressed_hash,
        }
    }

    /// Compare against `rhs`.
    ///
    /// With `have_uncompressed`, compressed files are compared by their
    /// uncompressed content so a different codec does not count as a change.
    pub fn check_equal(
        &self,
        rhs: &Checksum,
        have_uncompressed: bool,
        name: &str,
    ) -> Result<(), SchemaError> {
        let mismatch = |reason: String| SchemaError::ChecksumMismatch {
            file: name.to_string(),
            reason,
        };

        if self.is_compressed && have_uncompressed {
            if !rhs.is_compressed {
                return Err(mismatch("no uncompressed checksum in part".to_string()));
            }
            if self.uncompressed_size != rhs.uncompressed_size {
                return Err(mismatch(format!(
                    "uncompressed size {} != {}",
                    rhs.uncompressed_size, self.uncompressed_size
                )));
            }
            if self.uncompressed_hash != rhs.uncompressed_hash {
                return Err(mismatch("uncompressed hash differs".to_string()));
            }
            return Ok(());
        }

        if self.file_size != rhs.file_size {
            return Err(mismatch(format!(
                "size {} != {}",
                rhs.file_size, self.file_size
            )));
        }
        if self.file_hash != rhs.file_hash {
            return Err(mismatch("hash differs".to_string()));
        }
        Ok(())
    }

    /// Check that the file at `path` has the recorded size
    pub fn check_size(&self, path: &Path) -> Result<(), SchemaError> {
        let name = path.display().to_string();
        let size = std::fs::metadata(path)
            .map_err(|e| SchemaError::ChecksumMismatch {
                file: name.clone(),
                reason: e.to_string(),
            })?
            .len();
        if size != self.file_size {
            return Err(SchemaError::ChecksumMismatch {
                file: name,
                reason: format!("size {} != {}", size, self.file_size),
            });
        }
        Ok(())
    }
}

/// Size and XXH3-128 hash of a file on disk
pub fn checksum_file(path: &Path) -> io::Result<Checksum> {
    let mut file = File::open(path)?;
    let mut hashing = HashingWriter::new(io::sink());
    io::copy(&mut file, &mut hashing)?;
    Ok(Checksum::plain(hashing.count(), hashing.hash()))
}

/// Checksums of every file in a part, keyed by file name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Checksums {
    files: BTreeMap<String, Checksum>,
}

impl Checksums {
    /// Create an empty manifest
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) the checksum of `name`
    pub fn insert(&mut self, name: impl Into<String>, checksum: Checksum) {
        self.files.insert(name.into(), checksum);
    }

    /// Checksum of `name`
    pub fn get(&self, name: &str) -> Option<&Checksum> {
        self.files.get(name)
    }

    /// Whether `name` is listed
    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no files are listed
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate in file name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Checksum)> {
        self.files.iter().map(|(name, checksum)| (name.as_str(), checksum))
    }

    /// Sum of on-disk sizes
    pub fn total_size(&self) -> u64 {
        self.files.values().map(|c| c.file_size).sum()
    }

    /// Merge another manifest into this one, replacing duplicates
    pub fn extend(&mut self, other: Checksums) {
        self.files.extend(other.files);
    }

    /// Check that both manifests list the same files with equal checksums
    pub fn check_equal(&self, rhs: &Checksums, have_uncompressed: bool) -> Result<(), SchemaError> {
        for name in rhs.files.keys() {
            if !self.files.contains_key(name) {
                return Err(SchemaError::ChecksumMismatch {
                    file: name.clone(),
                    reason: "unexpected file in part".to_string(),
                });
            }
        }

        for (name, checksum) in &self.files {
            let other = rhs.files.get(name).ok_or_else(|| SchemaError::ChecksumMismatch {
                file: name.clone(),
                reason: "no file in part".to_string(),
            })?;
            checksum.check_equal(other, have_uncompressed, name)?;
        }
        Ok(())
    }

    /// Check that every listed file in `dir` exists with the recorded size
    pub fn check_sizes(&self, dir: &Path) -> Result<(), SchemaError> {
        for (name, checksum) in &self.files {
            checksum.check_size(&dir.join(name))?;
        }
        Ok(())
    }

    /// Recompute size and hash of every listed file in `dir`.
    ///
    /// Only on-disk bytes are checked; uncompressed checksums would need the
    /// blocks decoded and are left to [`Checksums::check_equal`].
    pub fn verify_files(&self, dir: &Path) -> Result<(), SchemaError> {
        for (name, expected) in &self.files {
            let actual = checksum_file(&dir.join(name)).map_err(|e| {
                SchemaError::ChecksumMismatch {
                    file: name.clone(),
                    reason: e.to_string(),
                }
            })?;
            Checksum::plain(expected.file_size, expected.file_hash).check_equal(
                &actual,
                false,
                name,
            )?;
        }
        Ok(())
    }

    /// Serialize in the `checksums.txt` format
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "checksums format version: {}", CHECKSUMS_FORMAT_VERSION);
        let _ = writeln!(out, "{} files:", self.files.len());
        for (name, checksum) in &self.files {
            let _ = writeln!(out, "{}", name);
            let _ = writeln!(out, "\tsize: {}", checksum.file_size);
            let _ = writeln!(out, "\thash: {:032x}", checksum.file_hash);
            let _ = writeln!(out, "\tcompressed: {}", u8::from(checksum.is_compressed));
            if checksum.is_compressed {
                let _ = writeln!(out, "\tuncompressed size: {}", checksum.uncompressed_size);
                let _ = writeln!(out, "\tuncompressed hash: {:032x}", checksum.uncompressed_hash);
            }
        }
        out
    }

    /// Write the `checksums.txt` form to `out`
    pub fn write_text<W: Write>(&self, mut out: W) -> Result<(), SchemaError> {
        out.write_all(self.to_text().as_bytes())?;
        out.flush()?;
        Ok(())
    }

    /// Parse the `checksums.txt` form
    pub fn read_text(text: &str) -> Result<Self, SchemaError> {
        let mut lines = text.lines();

        let header = lines
            .next()
            .ok_or_else(|| SchemaError::ChecksumsFormat("empty input".to_string()))?;
        let version = header
            .strip_prefix("checksums format version: ")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .ok_or_else(|| SchemaError::ChecksumsFormat(format!("bad header '{}'", header)))?;
        if version != CHECKSUMS_FORMAT_VERSION {
            return Err(SchemaError::ChecksumsFormat(format!(
                "unsupported version {}",
                version
            )));
        }

        let count_line = lines
            .next()
            .ok_or_else(|| SchemaError::ChecksumsFormat("missing file count".to_string()))?;
        let count: usize = count_line
            .strip_suffix(" files:")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| {
                SchemaError::ChecksumsFormat(format!("bad count line '{}'", count_line))
            })?;

        let mut checksums = Checksums::new();
        for _ in 0..count {
            let name = lines
                .next()
                .filter(|line| !line.is_empty() && !line.starts_with('\t'))
                .ok_or_else(|| SchemaError::ChecksumsFormat("missing file name".to_string()))?;

            let file_size = parse_u64(next_field(&mut lines, "size")?)?;
            let file_hash = parse_hash(next_field(&mut lines, "hash")?)?;
            let checksum = match next_field(&mut lines, "compressed")? {
                "0" => Checksum::plain(file_size, file_hash),
                "1" => Checksum::compressed(
                    file_size,
                    file_hash,
                    parse_u64(next_field(&mut lines, "uncompressed size")?)?,
                    parse_hash(next_field(&mut lines, "uncompressed hash")?)?,
                ),
                other => {
                    return Err(SchemaError::ChecksumsFormat(format!(
                        "bad compressed flag '{}' for {}",
                        other, name
                    )))
                }
            };
            checksums.insert(name, checksum);
        }

        if lines.any(|line| !line.trim().is_empty()) {
            return Err(SchemaError::ChecksumsFormat(
                "more files than declared".to_string(),
            ));
        }

        Ok(checksums)
    }
}

/// Value of the next `\t<key>: <value>` line
fn next_field<'a, I>(lines: &mut I, key: &str) -> Result<&'a str, SchemaError>
where
    I: Iterator<Item = &'a str>,
{
    let line = lines
        .next()
        .ok_or_else(|| SchemaError::ChecksumsFormat(format!("missing '{}'", key)))?;
    line.strip_prefix('\t')
        .and_then(|l| l.strip_prefix(key))
        .and_then(|l| l.strip_prefix(": "))
        .ok_or_else(|| SchemaError::ChecksumsFormat(format!("expected '{}', got '{}'", key, line)))
}

fn parse_u64(value: &str) -> Result<u64, SchemaError> {
    value
        .parse()
        .map_err(|_| SchemaError::ChecksumsFormat(format!("bad number '{}'", value)))
}

fn parse_hash(value: &str) -> Result<u128, SchemaError> {
    if value.len() != 32 {
        return Err(SchemaError::ChecksumsFormat(format!("bad hash '{}'", value)));
    }
    u128::from_str_radix(value, 16)
        .map_err(|_| SchemaError::ChecksumsFormat(format!("bad hash '{}'", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Checksums {
        let mut checksums = Checksums::new();
        checksums.insert("id.bin", Checksum::compressed(120, 0xabc, 400, 0xdef));
        checksums.insert("id.mrk", Checksum::plain(32, u128::MAX));
        checksums
    }

    #[test]
    fn test_text_layout() {
        let text = sample().to_text();
        let expected = format!(
            "checksums format version: 2\n2 files:\n\
             id.bin\n\tsize: 120\n\thash: {:032x}\n\tcompressed: 1\n\
             \tuncompressed size: 400\n\tuncompressed hash: {:032x}\n\
             id.mrk\n\tsize: 32\n\thash: {:032x}\n\tcompressed: 0\n",
            0xabc, 0xdef, u128::MAX
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_read_text_inverts_to_text() {
        let checksums = sample();
        assert_eq!(Checksums::read_text(&checksums.to_text()).unwrap(), checksums);
        assert_eq!(
            Checksums::read_text(&Checksums::new().to_text()).unwrap(),
            Checksums::new()
        );
    }

    #[test]
    fn test_read_text_rejects_malformed() {
        assert!(Checksums::read_text("checksums format version: 3\n0 files:\n").is_err());
        assert!(Checksums::read_text("checksums format version: 2\n1 files:\n").is_err());
        let bad_flag = "checksums format version: 2\n1 files:\na\n\tsize: 1\n\thash: \
                        00000000000000000000000000000001\n\tcompressed: 2\n";
        assert!(Checksums::read_text(bad_flag).is_err());
    }

    #[test]
    fn test_check_equal_prefers_uncompressed() {
        let lhs = sample();
        let mut rhs = sample();
        rhs.insert("id.bin", Checksum::compressed(99, 0x1, 400, 0xdef));

        assert!(lhs.check_equal(&rhs, true).is_ok());
        assert!(lhs.check_equal(&rhs, false).is_err());

        rhs.insert("extra.bin", Checksum::plain(1, 1));
        assert!(lhs.check_equal(&rhs, true).is_err());
    }

    #[test]
    fn test_verify_files_against_disk() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();

        let mut checksums = Checksums::new();
        checksums.insert("a.txt", checksum_file(&dir.path().join("a.txt")).unwrap());
        assert_eq!(checksums.total_size(), 5);
        assert!(checksums.verify_files(dir.path()).is_ok());
        assert!(checksums.check_sizes(dir.path()).is_ok());

        std::fs::write(dir.path().join("a.txt"), b"jello").unwrap();
        assert!(checksums.check_sizes(dir.path()).is_ok());
        assert!(checksums.verify_files(dir.path()).is_err());

        std::fs::remove_file(dir.path().join("a.txt")).unwrap();
        assert!(checksums.check_sizes(dir.path()).is_err());
    }

    #[test]
    fn test_serializes_hashes_as_hex() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            json["files"]["id.mrk"]["file_hash"],
            "ffffffffffffffffffffffffffffffff"
        );
    }
}
