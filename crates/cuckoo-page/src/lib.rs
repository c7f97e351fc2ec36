//! Fixed-capacity two-way cuckoo hash table over a borrowed memory region.
//!
//! A cuckoo page maps 64-bit keys to 48-bit values inside a flat 8 MiB
//! region supplied by the caller, such as a memory-mapped file or a shared
//! segment. The table never allocates, frees, or resizes that region.
//!
//! # Layout
//!
//! Two sub-tables of 65536 buckets share the region. A bucket is one
//! 64-byte cache line holding 5 packed 96-bit entries. The first
//! sub-table is indexed by key bits 0-15, the second by key bits 16-31,
//! so keys must already be well distributed in their low 32 bits. See
//! [`layout`] for the entry format.
//!
//! # Lifecycle
//!
//! Inserts that exhaust the displacement budget leave the table
//! [`TableState::Full`] with one overflow association held out of band.
//! A full table accepts no more inserts; callers reshard it with
//! [`CuckooTable::split`] into two fresh tables.
//!
//! The table performs no synchronization. Callers serialize mutation.
//!
//! # Example
//!
//! ```rust
//! use cuckoo_page::{CuckooTable, InsertStatus, new_buffer};
//!
//! # fn example() -> cuckoo_page::Result<()> {
//! let mut words = new_buffer();
//! let mut table = CuckooTable::new(&mut *words)?;
//!
//! assert_eq!(table.insert(0x0001_0002_0003_0004, 42)?, InsertStatus::Inserted);
//! assert_eq!(table.lookup(0x0001_0002_0003_0004), vec![42]);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]

use thiserror::Error;

// Packed binary layout
pub mod layout;

// Borrowed word storage
pub mod region;

// Cuckoo table operations
pub mod table;

// Configuration
pub mod config;

// File-backed pages
pub mod mapped;

pub use config::TableConfig;
pub use layout::{MAX_VALUE, SubTable, TABLE_BYTES, TABLE_CAPACITY, TABLE_WORDS};
pub use mapped::TableFile;
pub use region::{Region, WordStore, new_buffer};
pub use table::{CuckooTable, Divider, InsertStatus, RemoveStatus, TableState, TableStats};

/// Result type for cuckoo table operations.
pub type Result<T> = std::result::Result<T, CuckooError>;

/// Which destination of a split an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitHalf {
    /// Associations sorting below the divider.
    Lower,
    /// The divider and everything above it.
    Upper,
}

impl std::fmt::Display for SplitHalf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lower => f.write_str("lower"),
            Self::Upper => f.write_str("upper"),
        }
    }
}

/// Errors that can occur during cuckoo table operations.
///
/// A full table and a missing key are ordinary outcomes reported through
/// [`InsertStatus`] and [`RemoveStatus`], not errors.
#[derive(Debug, Error)]
pub enum CuckooError {
    /// Backing region is not exactly one page.
    #[error("Region is {actual} bytes, expected {expected}")]
    RegionSize {
        /// Required size in bytes
        expected: usize,
        /// Size supplied by the caller
        actual: usize,
    },

    /// Value does not fit in 48 bits.
    #[error("Value {0:#x} exceeds the 48-bit value range")]
    ValueTooWide(u64),

    /// Value 0 marks empty slots and cannot be stored.
    #[error("Value 0 is reserved for empty slots")]
    ZeroValue,

    /// Insert attempted while the table holds an overflow association.
    #[error("Table is full, split it before inserting {key:#018x} => {value:#x}")]
    InsertWhileFull {
        /// Key of the rejected insert
        key: u64,
        /// Value of the rejected insert
        value: u64,
    },

    /// Split of a table with no live associations.
    #[error("Cannot split an empty table")]
    EmptySplit,

    /// A split destination could not absorb its half.
    #[error("Split destination for the {half} half is full")]
    SplitOverflow {
        /// Destination that overflowed
        half: SplitHalf,
    },

    /// I/O error on a file-backed page.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
