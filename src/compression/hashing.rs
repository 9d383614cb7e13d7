use std::io::{self, Write};

use xxhash_rust::xxh3::Xxh3;

/// Write adapter that counts bytes and keeps a rolling XXH3-128 hash of
/// everything passed through it.
pub struct HashingWriter<W: Write> {
    inner: W,
    hasher: Xxh3,
    count: u64,
}

impl<W: Write> HashingWriter<W> {
    /// Wrap `inner`
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Xxh3::new(),
            count: 0,
        }
    }

    /// Bytes written so far
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Hash of the bytes written so far
    pub fn hash(&self) -> u128 {
        self.hasher.digest128()
    }

    /// Borrow the wrapped writer
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Mutably borrow the wrapped writer
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        self.count += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Hash a complete byte slice the same way [`HashingWriter`] does.
pub fn hash_bytes(data: &[u8]) -> u128 {
    let mut hasher = Xxh3::new();
    hasher.update(data);
    hasher.digest128()
}
