use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chunkxfer_protocol::chunk_path;
use chunkxfer_protocol::constants::DEFAULT_CHUNK_SIZE;
use tracing::debug;

use crate::TransferError;

/// Running totals reported after each [`ChunkWriter::write_chunked`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteProgress {
    /// Bytes accepted from this call (always the full input on success).
    pub accepted: usize,
    /// Chunk files created so far, including the one currently open.
    pub chunks: u64,
    /// Bytes written across all chunks so far.
    pub bytes: u64,
}

/// Final totals of a finished chunk stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSummary {
    pub chunks: u64,
    pub bytes: u64,
}

struct OpenChunk {
    file: BufWriter<File>,
    written: u64,
}

// ---------------------------------------------------------------------------
// ChunkWriter
// ---------------------------------------------------------------------------

/// Splits a byte stream into sequentially numbered fixed-size chunk files.
///
/// Writes may be any size and need not line up with chunk boundaries; a
/// single write can fill and roll over many chunks. Chunk files are named
/// `1`, `2`, ... inside the chunk directory, which is created on the first
/// non-empty write.
///
/// A chunk is closed and the next one opened as soon as it reaches
/// `chunk_size` bytes, so a stream that ends exactly on a boundary leaves an
/// empty trailing chunk open. [`finish`](Self::finish) closes the last chunk
/// and discards it if it is empty.
///
/// On error the writer is left as-is; callers must treat the stream as
/// failed.
pub struct ChunkWriter {
    dir: PathBuf,
    chunk_size: u64,
    verbose: bool,
    dir_ready: bool,
    chunk_count: u64,
    byte_count: u64,
    current: Option<OpenChunk>,
}

impl ChunkWriter {
    /// Creates a writer producing chunks of `chunk_size` bytes in `dir`.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] is used.
    pub fn new(dir: impl Into<PathBuf>, chunk_size: u64) -> Self {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Self {
            dir: dir.into(),
            chunk_size,
            verbose: false,
            dir_ready: false,
            chunk_count: 0,
            byte_count: 0,
            current: None,
        }
    }

    /// Enables per-write debug logging.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Chunk files created so far, including the open one.
    pub fn chunk_count(&self) -> u64 {
        self.chunk_count
    }

    /// Bytes written so far.
    pub fn byte_count(&self) -> u64 {
        self.byte_count
    }

    /// Writes `buf` across as many chunk files as it needs.
    pub fn write_chunked(&mut self, buf: &[u8]) -> Result<WriteProgress, TransferError> {
        if buf.is_empty() {
            return Ok(self.progress(0));
        }

        if self.verbose {
            debug!(len = buf.len(), "chunk write");
        }

        if !self.dir_ready {
            self.create_dir()?;
        }

        let mut rest = buf;
        while !rest.is_empty() {
            let Some(open) = self.current.as_mut() else {
                self.open_next()?;
                continue;
            };

            let room = (self.chunk_size - open.written) as usize;
            let take = room.min(rest.len());
            open.file
                .write_all(&rest[..take])
                .map_err(|source| TransferError::WriteChunk {
                    index: self.chunk_count,
                    source,
                })?;
            open.written += take as u64;
            let full = open.written == self.chunk_size;

            self.byte_count += take as u64;
            rest = &rest[take..];

            if full {
                self.close_current()?;
                self.open_next()?;
            }
        }

        Ok(self.progress(buf.len()))
    }

    /// Closes the last chunk and returns the final totals.
    ///
    /// An empty trailing chunk (left open when the stream ended exactly on a
    /// chunk boundary) is removed and not counted. The chunk directory is
    /// created even for an empty stream.
    pub fn finish(mut self) -> Result<ChunkSummary, TransferError> {
        if !self.dir_ready {
            self.create_dir()?;
        }

        if self.close_current()? == Some(0) {
            let index = self.chunk_count;
            std::fs::remove_file(chunk_path(&self.dir, index))?;
            self.chunk_count -= 1;
            if self.verbose {
                debug!(index, "discarded empty trailing chunk");
            }
        }

        Ok(ChunkSummary {
            chunks: self.chunk_count,
            bytes: self.byte_count,
        })
    }

    fn progress(&self, accepted: usize) -> WriteProgress {
        WriteProgress {
            accepted,
            chunks: self.chunk_count,
            bytes: self.byte_count,
        }
    }

    fn create_dir(&mut self) -> Result<(), TransferError> {
        debug!(dir = %self.dir.display(), "creating chunk directory");
        std::fs::create_dir_all(&self.dir).map_err(|source| TransferError::CreateChunkDir {
            path: self.dir.clone(),
            source,
        })?;
        self.dir_ready = true;
        Ok(())
    }

    fn open_next(&mut self) -> Result<(), TransferError> {
        let index = self.chunk_count + 1;
        let file = File::create(chunk_path(&self.dir, index))
            .map_err(|source| TransferError::CreateChunk { index, source })?;

        self.chunk_count = index;
        self.current = Some(OpenChunk {
            file: BufWriter::new(file),
            written: 0,
        });

        if self.verbose {
            debug!(index, "opened chunk file");
        }
        Ok(())
    }

    /// Flushes and closes the open chunk, returning how many bytes it holds.
    fn close_current(&mut self) -> Result<Option<u64>, TransferError> {
        let Some(mut open) = self.current.take() else {
            return Ok(None);
        };
        open.file
            .flush()
            .map_err(|source| TransferError::WriteChunk {
                index: self.chunk_count,
                source,
            })?;
        Ok(Some(open.written))
    }
}

impl Write for ChunkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_chunked(buf)
            .map(|progress| progress.accepted)
            .map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.current.as_mut() {
            Some(open) => open.file.flush(),
            None => Ok(()),
        }
    }
}
