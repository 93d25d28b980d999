//! Directory layout of a blob store and chunk arithmetic.
//!
//! ```text
//! <base>/datafile      whole blob
//! <base>/meta.json     TransferMetadata
//! <base>/chunks/<n>    chunk n, 1-based
//! ```

use std::path::{Path, PathBuf};

use crate::constants::{CHUNK_DIR_NAME, DATA_FILE_NAME, META_FILE_NAME};

/// Paths of a blob store rooted at a base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    base: PathBuf,
}

impl StoreLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    /// Path of the whole-blob file.
    pub fn data_file(&self) -> PathBuf {
        self.base.join(DATA_FILE_NAME)
    }

    /// Path of the metadata file.
    pub fn meta_file(&self) -> PathBuf {
        self.base.join(META_FILE_NAME)
    }

    /// Directory holding the numbered chunk files.
    pub fn chunk_dir(&self) -> PathBuf {
        self.base.join(CHUNK_DIR_NAME)
    }

    /// Path of chunk `index` (1-based).
    pub fn chunk_file(&self, index: u64) -> PathBuf {
        chunk_path(&self.chunk_dir(), index)
    }
}

/// Path of chunk `index` inside `chunk_dir`.
pub fn chunk_path(chunk_dir: &Path, index: u64) -> PathBuf {
    chunk_dir.join(index.to_string())
}

/// Number of chunks needed for `total_size` bytes: `ceil(total_size / chunk_size)`.
///
/// An empty stream has zero chunks. `chunk_size` must be non-zero.
pub fn chunk_count(total_size: u64, chunk_size: u64) -> u64 {
    total_size.div_ceil(chunk_size)
}

/// Length of chunk `index` (1-based) in a stream of `total_size` bytes.
///
/// Returns `None` when `index` is outside `1..=chunk_count`.
pub fn chunk_len(index: u64, total_size: u64, chunk_size: u64) -> Option<u64> {
    let count = chunk_count(total_size, chunk_size);
    if index == 0 || index > count {
        return None;
    }
    let start = (index - 1) * chunk_size;
    Some((total_size - start).min(chunk_size))
}
