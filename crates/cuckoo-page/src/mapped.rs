//! File-backed cuckoo pages.
//!
//! A table file is exactly one page ([`TABLE_BYTES`]) of little-endian
//! words with no header. The file is mapped read-write and a
//! [`CuckooTable`] is bound over the mapping on demand.
//!
//! Only the bucket contents live in the file. The overflow association of
//! a full table is held by the in-memory [`CuckooTable`] and is lost when
//! it is dropped, so callers split a full table before letting go of it.

use crate::config::TableConfig;
use crate::layout::{TABLE_BYTES, TABLE_WORDS};
use crate::region::new_buffer;
use crate::table::CuckooTable;
use crate::{CuckooError, Result};
use memmap2::{MmapMut, MmapOptions};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A memory-mapped page file.
#[derive(Debug)]
pub struct TableFile {
    /// Path of the backing file
    path: PathBuf,
    /// Read-write mapping of the whole file
    mmap: MmapMut,
}

impl TableFile {
    /// Create a new zero-filled page file at `path`.
    ///
    /// Fails if the file already exists.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        file.set_len(TABLE_BYTES as u64)?;

        info!("Created table file {} ({} bytes)", path.display(), TABLE_BYTES);
        Self::map(path, &file)
    }

    /// Open an existing page file at `path`.
    ///
    /// The file must be exactly [`TABLE_BYTES`] long.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        let actual = file.metadata()?.len();
        if actual != TABLE_BYTES as u64 {
            return Err(CuckooError::RegionSize {
                expected: TABLE_BYTES,
                actual: usize::try_from(actual).unwrap_or(usize::MAX),
            });
        }

        debug!("Opened table file {}", path.display());
        Self::map(path, &file)
    }

    fn map(path: &Path, file: &File) -> Result<Self> {
        #[allow(unsafe_code)]
        let mmap = unsafe { MmapOptions::new().len(TABLE_BYTES).map_mut(file)? };

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bind a table over the mapping with the default configuration.
    pub fn table(&mut self) -> Result<CuckooTable<'_, [u8]>> {
        CuckooTable::new(&mut self.mmap[..])
    }

    /// Bind a table over the mapping with an explicit configuration.
    pub fn table_with_config(&mut self, config: TableConfig) -> Result<CuckooTable<'_, [u8]>> {
        CuckooTable::with_config(&mut self.mmap[..], config)
    }

    /// Copy the page into a heap word buffer.
    ///
    /// Edits made through a table bound over the copy stay off the file
    /// until [`TableFile::write_buffer`] stores them back.
    pub fn to_buffer(&self) -> Box<[u32]> {
        let mut words = new_buffer();
        for (word, chunk) in words.iter_mut().zip(self.mmap.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        words
    }

    /// Overwrite the mapped page with the contents of `words`.
    ///
    /// `words` must hold exactly one page.
    pub fn write_buffer(&mut self, words: &[u32]) -> Result<()> {
        if words.len() != TABLE_WORDS {
            return Err(CuckooError::RegionSize {
                expected: TABLE_BYTES,
                actual: words.len() * 4,
            });
        }

        for (chunk, word) in self.mmap.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        Ok(())
    }

    /// Ask the OS to write dirty pages of the mapping back to the file.
    pub fn flush(&self) -> Result<()> {
        self.mmap.flush()?;
        Ok(())
    }
}
