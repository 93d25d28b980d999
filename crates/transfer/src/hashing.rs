use std::io::{self, Read};
use std::path::Path;

use sha1::{Digest, Sha1};

use crate::TransferError;

// ---------------------------------------------------------------------------
// Checksum helpers
// ---------------------------------------------------------------------------

/// Computes SHA-1 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

/// Computes SHA-1 of an entire file and returns the hex-encoded digest.
pub fn checksum_file(path: &Path) -> Result<String, TransferError> {
    let file = std::fs::File::open(path)?;
    let mut reader = HashingReader::new(file);
    io::copy(&mut reader, &mut io::sink())?;
    Ok(reader.hex_digest())
}

// ---------------------------------------------------------------------------
// HashingReader
// ---------------------------------------------------------------------------

/// Pass-through reader that hashes every byte it hands out.
///
/// Hashing happens on the read side, so a stream fanned out to several
/// sinks is hashed exactly once. The digest covers everything read so far;
/// it is the content hash only once the source has reached EOF.
pub struct HashingReader<R> {
    inner: R,
    hasher: Sha1,
    bytes_read: u64,
}

impl<R> HashingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Sha1::new(),
            bytes_read: 0,
        }
    }

    /// Hex digest of all bytes read so far.
    pub fn hex_digest(&self) -> String {
        hex::encode(self.hasher.clone().finalize())
    }

    /// Number of bytes read so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // Errors pass through without touching the hash.
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        self.bytes_read += n as u64;
        Ok(n)
    }
}
