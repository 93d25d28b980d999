//! Reassembly and verification of a chunk set.

use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use chunkxfer_protocol::{TransferMetadata, chunk_path};
use tracing::{debug, info};

use crate::TransferError;
use crate::hashing::HashingReader;

/// Digest and length of a concatenated chunk set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDigest {
    pub content_hash: String,
    pub size: u64,
}

impl ChunkDigest {
    /// Checks the digest against the blob `meta` describes.
    pub fn check(&self, meta: &TransferMetadata) -> Result<(), TransferError> {
        if self.size != meta.size {
            return Err(TransferError::SizeMismatch {
                expected: meta.size,
                actual: self.size,
            });
        }
        if !self.content_hash.eq_ignore_ascii_case(&meta.content_hash) {
            return Err(TransferError::HashMismatch {
                expected: meta.content_hash.clone(),
                actual: self.content_hash.clone(),
            });
        }
        Ok(())
    }
}

/// Reads chunk files `1..=count` back to back as one stream.
struct ChunkSequence {
    dir: PathBuf,
    next: u64,
    count: u64,
    current: Option<File>,
    missing: Option<u64>,
}

impl ChunkSequence {
    fn new(dir: &Path, count: u64) -> Self {
        Self {
            dir: dir.to_path_buf(),
            next: 1,
            count,
            current: None,
            missing: None,
        }
    }
}

impl Read for ChunkSequence {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if let Some(file) = self.current.as_mut() {
                match file.read(buf)? {
                    0 => self.current = None,
                    n => return Ok(n),
                }
                continue;
            }

            if self.next > self.count {
                return Ok(0);
            }
            let index = self.next;
            match File::open(chunk_path(&self.dir, index)) {
                Ok(file) => {
                    self.current = Some(file);
                    self.next += 1;
                }
                Err(e) => {
                    if e.kind() == ErrorKind::NotFound {
                        self.missing = Some(index);
                    }
                    return Err(e);
                }
            }
        }
    }
}

fn concat_into<W: Write>(
    chunk_dir: &Path,
    count: u64,
    out: &mut W,
) -> Result<ChunkDigest, TransferError> {
    let mut reader = HashingReader::new(ChunkSequence::new(chunk_dir, count));
    let size = io::copy(&mut reader, out).map_err(|e| match reader.get_ref().missing {
        Some(index) => TransferError::ChunkMissing(index),
        None => TransferError::Io(e),
    })?;

    Ok(ChunkDigest {
        content_hash: reader.hex_digest(),
        size,
    })
}

/// Hashes chunks `1..=count` in index order without writing them anywhere.
pub fn hash_chunks(chunk_dir: &Path, count: u64) -> Result<ChunkDigest, TransferError> {
    concat_into(chunk_dir, count, &mut io::sink())
}

/// Concatenates chunks `1..=count` into `out_path` and returns their digest.
pub fn assemble_chunks(
    chunk_dir: &Path,
    count: u64,
    out_path: &Path,
) -> Result<ChunkDigest, TransferError> {
    let mut out = BufWriter::new(File::create(out_path)?);
    let digest = concat_into(chunk_dir, count, &mut out)?;
    out.flush()?;

    info!(
        path = %out_path.display(),
        size = digest.size,
        "chunks assembled"
    );
    Ok(digest)
}

/// Checks that the chunk set in `chunk_dir` reproduces the blob `meta`
/// describes.
pub fn verify_chunks(chunk_dir: &Path, meta: &TransferMetadata) -> Result<(), TransferError> {
    hash_chunks(chunk_dir, meta.chunks)?.check(meta)?;
    debug!(chunks = meta.chunks, "chunk set verified");
    Ok(())
}
