//! Blob generation: one pass over a source produces the whole-blob file,
//! the chunk set and the metadata record.

use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Read, Write};

use chunkxfer_protocol::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_GENERATE_SIZE};
use chunkxfer_protocol::{StoreLayout, TransferMetadata};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::info;

use crate::chunked::ChunkWriter;
use crate::hashing::HashingReader;
use crate::metadata::save_metadata;
use crate::TransferError;

/// Copy buffer size for the generation pass (64 KiB).
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Parameters of a generation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Bytes to take from the source.
    pub size: u64,
    /// Chunk size in bytes.
    pub chunk_size: u64,
    /// Per-write chunk logging.
    pub verbose: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            size: DEFAULT_GENERATE_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            verbose: false,
        }
    }
}

/// Endless source of random bytes.
pub struct RandomSource {
    rng: StdRng,
}

impl RandomSource {
    /// Seeds from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic source, for reproducible payloads.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Read for RandomSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.rng.fill_bytes(buf);
        Ok(buf.len())
    }
}

/// Generates a new blob in `layout` from the first `options.size` bytes of
/// `source`.
///
/// Any previous blob, chunk set and metadata are replaced. The stale
/// metadata is removed first, so a failed generation leaves no record
/// pointing at a half-written chunk set.
pub fn generate<R: Read>(
    source: R,
    layout: &StoreLayout,
    options: &GenerateOptions,
) -> Result<TransferMetadata, TransferError> {
    std::fs::create_dir_all(layout.base_dir())?;
    remove_if_exists(&layout.meta_file(), false)?;
    remove_if_exists(&layout.chunk_dir(), true)?;

    info!(
        path = %layout.data_file().display(),
        size = options.size,
        chunk_size = options.chunk_size,
        "generating data file"
    );

    let mut data = BufWriter::new(File::create(layout.data_file())?);
    let mut chunks =
        ChunkWriter::new(layout.chunk_dir(), options.chunk_size).with_verbose(options.verbose);
    let mut reader = HashingReader::new(source.take(options.size));

    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        data.write_all(&buf[..n])?;
        chunks.write_chunked(&buf[..n])?;
    }

    if reader.bytes_read() < options.size {
        return Err(TransferError::SourceExhausted {
            expected: options.size,
            actual: reader.bytes_read(),
        });
    }

    data.flush()?;
    let summary = chunks.finish()?;

    let meta = TransferMetadata::new(reader.hex_digest(), summary.chunks, summary.bytes);
    save_metadata(&layout.meta_file(), &meta)?;

    info!(
        sha1 = %meta.content_hash,
        chunks = meta.chunks,
        size = meta.size,
        "data file generated"
    );
    Ok(meta)
}

fn remove_if_exists(path: &std::path::Path, dir: bool) -> io::Result<()> {
    let result = if dir {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    match result {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
