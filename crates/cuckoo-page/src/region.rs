//! Borrowed backing storage for a cuckoo page.
//!
//! The page never owns its memory. A [`Region`] borrows any [`WordStore`]
//! of exactly [`TABLE_BYTES`] bytes and exposes whole-entry and
//! whole-bucket access only, so the packed layout logic stays in
//! [`crate::layout`].
//!
//! Two stores are provided:
//! - `[u32]`: native words, e.g. a heap buffer or a shared segment
//! - `[u8]`: little-endian words, e.g. a memory-mapped file

use crate::layout::{
    BUCKET_WORDS, Bucket, ENTRIES_PER_BUCKET, ENTRY_WORDS, Entry, SubTable, TABLE_BYTES,
    TABLE_WORDS,
};
use crate::{CuckooError, Result};
use std::fmt;

/// Flat word-addressable memory.
pub trait WordStore {
    /// Size of the store in bytes.
    fn byte_len(&self) -> usize;

    /// Read the word at `index`.
    fn load(&self, index: usize) -> u32;

    /// Write the word at `index`.
    fn store(&mut self, index: usize, word: u32);
}

impl WordStore for [u32] {
    fn byte_len(&self) -> usize {
        self.len() * 4
    }

    #[inline]
    fn load(&self, index: usize) -> u32 {
        self[index]
    }

    #[inline]
    fn store(&mut self, index: usize, word: u32) {
        self[index] = word;
    }
}

impl WordStore for [u8] {
    fn byte_len(&self) -> usize {
        self.len()
    }

    #[inline]
    fn load(&self, index: usize) -> u32 {
        let offset = index * 4;
        u32::from_le_bytes([
            self[offset],
            self[offset + 1],
            self[offset + 2],
            self[offset + 3],
        ])
    }

    #[inline]
    fn store(&mut self, index: usize, word: u32) {
        let offset = index * 4;
        self[offset..offset + 4].copy_from_slice(&word.to_le_bytes());
    }
}

/// Allocate a zeroed word buffer sized for one page.
///
/// Convenience for callers that keep pages on the heap; the table itself
/// only ever borrows.
pub fn new_buffer() -> Box<[u32]> {
    vec![0u32; TABLE_WORDS].into_boxed_slice()
}

/// Bucket and entry accessor over a borrowed page.
pub struct Region<'a, B: WordStore + ?Sized> {
    words: &'a mut B,
}

impl<B: WordStore + ?Sized> fmt::Debug for Region<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("bytes", &self.words.byte_len())
            .finish()
    }
}

impl<'a, B: WordStore + ?Sized> Region<'a, B> {
    /// Bind to `words`, which must be exactly one page long.
    pub fn new(words: &'a mut B) -> Result<Self> {
        let actual = words.byte_len();
        if actual != TABLE_BYTES {
            return Err(CuckooError::RegionSize {
                expected: TABLE_BYTES,
                actual,
            });
        }
        Ok(Self { words })
    }

    /// Read the entry in `slot` of `bucket`.
    pub fn read_entry(&self, sub: SubTable, bucket: u16, slot: usize) -> Entry {
        let base = Self::entry_offset(sub, bucket, slot);
        Entry::from_words([
            self.words.load(base),
            self.words.load(base + 1),
            self.words.load(base + 2),
        ])
    }

    /// Overwrite the entry in `slot` of `bucket`.
    pub fn write_entry(&mut self, sub: SubTable, bucket: u16, slot: usize, entry: Entry) {
        let base = Self::entry_offset(sub, bucket, slot);
        for (i, word) in entry.words().into_iter().enumerate() {
            self.words.store(base + i, word);
        }
    }

    /// Read every entry of `bucket`.
    pub fn read_bucket(&self, sub: SubTable, bucket: u16) -> Bucket {
        std::array::from_fn(|slot| self.read_entry(sub, bucket, slot))
    }

    /// Overwrite every entry of `bucket`. The padding word is left alone.
    pub fn write_bucket(&mut self, sub: SubTable, bucket: u16, entries: &Bucket) {
        for (slot, entry) in entries.iter().enumerate() {
            self.write_entry(sub, bucket, slot, *entry);
        }
    }

    fn entry_offset(sub: SubTable, bucket: u16, slot: usize) -> usize {
        assert!(
            slot < ENTRIES_PER_BUCKET,
            "slot {slot} out of range for a {ENTRIES_PER_BUCKET}-entry bucket"
        );
        let offset = sub.bucket_offset(bucket) + slot * ENTRY_WORDS;
        debug_assert!(offset + ENTRY_WORDS < sub.bucket_offset(bucket) + BUCKET_WORDS);
        offset
    }
}
