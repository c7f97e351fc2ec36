//! Binary layout of a cuckoo page.
//!
//! A page is a flat array of 32-bit words split into two sub-tables of
//! 65536 buckets each. Every bucket fills one 64-byte cache line:
//!
//! | Word  | Contents |
//! |-------|----------|
//! | 0-2   | Entry 0 |
//! | 3-5   | Entry 1 |
//! | 6-8   | Entry 2 |
//! | 9-11  | Entry 3 |
//! | 12-14 | Entry 4 |
//! | 15    | Padding (never read or written) |
//!
//! # Entry Format (3 words)
//!
//! | Word | Bits  | Field |
//! |------|-------|-------|
//! | 0    | 0-31  | Key bits 32-63 |
//! | 1    | 16-31 | Key half not used as this sub-table's bucket index |
//! | 1    | 0-15  | Value bits 32-47 |
//! | 2    | 0-31  | Value bits 0-31 |
//!
//! The first sub-table is indexed by key bits 0-15 and stores key bits
//! 16-31 in word 1. The second sub-table is indexed by key bits 16-31 and
//! stores key bits 0-15 in word 1. The bucket index supplies the missing
//! half on decode, so no key bits are lost. An all-zero entry is empty.

use std::fmt;

/// Number of buckets in each sub-table.
pub const BUCKETS_PER_TABLE: usize = 65536;

/// Number of sub-tables sharing one page.
pub const SUB_TABLES: usize = 2;

/// Entries packed into a single bucket.
pub const ENTRIES_PER_BUCKET: usize = 5;

/// Words used by one packed entry.
pub const ENTRY_WORDS: usize = 3;

/// Words per bucket (one 64-byte cache line, including padding).
pub const BUCKET_WORDS: usize = 16;

/// Total words in a page.
pub const TABLE_WORDS: usize = SUB_TABLES * BUCKETS_PER_TABLE * BUCKET_WORDS;

/// Total bytes in a page (8 MiB).
pub const TABLE_BYTES: usize = TABLE_WORDS * 4;

/// Total entry slots across both sub-tables.
pub const TABLE_CAPACITY: usize = SUB_TABLES * BUCKETS_PER_TABLE * ENTRIES_PER_BUCKET;

/// Width of a storable value in bits.
pub const VALUE_BITS: u32 = 48;

/// Largest storable value.
pub const MAX_VALUE: u64 = (1 << VALUE_BITS) - 1;

const LOWER_16: u64 = 0xFFFF;
const UPPER_16: u32 = 0xFFFF_0000;

const _: () = assert!(ENTRIES_PER_BUCKET * ENTRY_WORDS < BUCKET_WORDS);
const _: () = assert!(TABLE_BYTES == 8 * 1024 * 1024);

/// Contents of one bucket, in slot order.
pub type Bucket = [Entry; ENTRIES_PER_BUCKET];

/// A packed 96-bit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Entry([u32; ENTRY_WORDS]);

impl Entry {
    /// The empty slot pattern.
    pub const EMPTY: Self = Self([0; ENTRY_WORDS]);

    /// Create an entry from its raw words.
    pub const fn from_words(words: [u32; ENTRY_WORDS]) -> Self {
        Self(words)
    }

    /// Raw words of the entry.
    pub const fn words(&self) -> [u32; ENTRY_WORDS] {
        self.0
    }

    /// Whether all three words are zero.
    pub const fn is_empty(&self) -> bool {
        self.0[0] == 0 && self.0[1] == 0 && self.0[2] == 0
    }

    /// Decode the 48-bit value. Identical for both sub-tables.
    pub const fn value(&self) -> u64 {
        (((self.0[1] as u64) & LOWER_16) << 32) | self.0[2] as u64
    }
}

/// One of the two sub-tables of a page.
///
/// Carries the sub-table specific bucket selection, word addressing and
/// entry encoding so callers pick behavior with a plain `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubTable {
    /// Indexed by key bits 0-15.
    First,
    /// Indexed by key bits 16-31.
    Second,
}

impl SubTable {
    /// Both sub-tables in probe order.
    pub const ALL: [Self; SUB_TABLES] = [Self::First, Self::Second];

    /// The alternate sub-table used by the next displacement round.
    pub const fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }

    /// Bucket index for `key` in this sub-table.
    pub const fn bucket_index(self, key: u64) -> u16 {
        match self {
            Self::First => (key & LOWER_16) as u16,
            Self::Second => ((key >> 16) & LOWER_16) as u16,
        }
    }

    /// Word offset of the first word of `bucket`.
    pub const fn bucket_offset(self, bucket: u16) -> usize {
        let bucket = bucket as usize;
        match self {
            Self::First => BUCKET_WORDS * bucket,
            Self::Second => BUCKET_WORDS * (BUCKETS_PER_TABLE + bucket),
        }
    }

    /// Pack `(key, value)` with this sub-table's rule.
    ///
    /// Only the low 48 bits of `value` are stored.
    pub const fn encode(self, key: u64, value: u64) -> Entry {
        let high = (key >> 32) as u32;
        let other_half = match self {
            Self::First => (key as u32) & UPPER_16,
            Self::Second => ((key & LOWER_16) << 16) as u32,
        };
        let value_high = ((value >> 32) & LOWER_16) as u32;
        Entry([high, other_half | value_high, value as u32])
    }

    /// Rebuild the full key of an entry read from `bucket` of this sub-table.
    pub const fn decode_key(self, bucket: u16, entry: Entry) -> u64 {
        let high = (entry.0[0] as u64) << 32;
        let stored = (entry.0[1] & UPPER_16) as u64;
        match self {
            Self::First => high | stored | bucket as u64,
            Self::Second => high | ((bucket as u64) << 16) | (stored >> 16),
        }
    }

    /// Decode a live entry into `(key, value)`, or `None` for an empty slot.
    pub const fn decode(self, bucket: u16, entry: Entry) -> Option<(u64, u64)> {
        let value = entry.value();
        if value == 0 {
            None
        } else {
            Some((self.decode_key(bucket, entry), value))
        }
    }
}

impl fmt::Display for SubTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => f.write_str("table1"),
            Self::Second => f.write_str("table2"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_geometry() {
        assert_eq!(TABLE_WORDS, 2_097_152);
        assert_eq!(TABLE_BYTES, 8_388_608);
        assert_eq!(TABLE_CAPACITY, 655_360);
        assert_eq!(BUCKET_WORDS * 4, 64);
    }

    #[test]
    fn test_bucket_offsets() {
        assert_eq!(SubTable::First.bucket_offset(0), 0);
        assert_eq!(SubTable::First.bucket_offset(1), 16);
        assert_eq!(SubTable::First.bucket_offset(u16::MAX), 16 * 65535);
        assert_eq!(SubTable::Second.bucket_offset(0), 16 * 65536);
        assert_eq!(
            SubTable::Second.bucket_offset(u16::MAX) + BUCKET_WORDS,
            TABLE_WORDS
        );
    }

    #[test]
    fn test_bucket_index_slices() {
        let key = 0x0001_0002_0003_0004;
        assert_eq!(SubTable::First.bucket_index(key), 0x0004);
        assert_eq!(SubTable::Second.bucket_index(key), 0x0003);
    }

    #[test]
    fn test_encode_first() {
        let entry = SubTable::First.encode(0x1111_2222_3333_4444, 0xAAAA_BBBB_CCCC);
        assert_eq!(entry.words(), [0x1111_2222, 0x3333_AAAA, 0xBBBB_CCCC]);
        assert_eq!(entry.value(), 0xAAAA_BBBB_CCCC);
    }

    #[test]
    fn test_encode_second() {
        let entry = SubTable::Second.encode(0x1111_2222_3333_4444, 0xAAAA_BBBB_CCCC);
        assert_eq!(entry.words(), [0x1111_2222, 0x4444_AAAA, 0xBBBB_CCCC]);
        assert_eq!(entry.value(), 0xAAAA_BBBB_CCCC);
    }

    #[test]
    fn test_encode_truncates_wide_value() {
        let entry = SubTable::First.encode(1, 0x0001_0000_0000_0000 | 7);
        assert_eq!(entry.value(), 7);
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(SubTable::First.decode(5, Entry::EMPTY), None);
        assert_eq!(SubTable::Second.decode(5, Entry::EMPTY), None);
        assert!(Entry::EMPTY.is_empty());
        assert!(!SubTable::First.encode(0, 1).is_empty());
    }

    #[test]
    fn test_other_alternates() {
        assert_eq!(SubTable::First.other(), SubTable::Second);
        assert_eq!(SubTable::Second.other(), SubTable::First);
        assert_eq!(SubTable::First.to_string(), "table1");
    }

    proptest! {
        #[test]
        fn prop_key_round_trip(key in any::<u64>(), value in 1u64..=MAX_VALUE) {
            for sub in SubTable::ALL {
                let bucket = sub.bucket_index(key);
                let entry = sub.encode(key, value);
                prop_assert_eq!(sub.decode(bucket, entry), Some((key, value)));
            }
        }

        #[test]
        fn prop_encodings_differ_only_in_word1(key in any::<u64>(), value in 1u64..=MAX_VALUE) {
            let first = SubTable::First.encode(key, value).words();
            let second = SubTable::Second.encode(key, value).words();
            prop_assert_eq!(first[0], second[0]);
            prop_assert_eq!(first[2], second[2]);
            prop_assert_eq!(first[1] & 0xFFFF, second[1] & 0xFFFF);
        }
    }
}
