//! Two-way cuckoo table operations.
//!
//! Every key has exactly one candidate bucket per sub-table, chosen by a
//! 16-bit slice of the key. Inserts try both candidates first and then
//! fall back to a displacement chain that alternates between the
//! sub-tables. Buckets are kept left-packed: inserts fill the lowest free
//! slot, displacement rotates entries toward the end of a bucket, and
//! removal shifts later entries down.

use crate::config::TableConfig;
use crate::layout::{
    BUCKETS_PER_TABLE, Bucket, ENTRIES_PER_BUCKET, Entry, MAX_VALUE, SubTable, TABLE_CAPACITY,
};
use crate::region::{Region, WordStore};
use crate::{CuckooError, Result, SplitHalf};
use tracing::{debug, warn};

const LAST_SLOT: usize = ENTRIES_PER_BUCKET - 1;

/// Outcome of an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertStatus {
    /// The association was stored.
    Inserted,
    /// The displacement budget ran out. One association, not necessarily
    /// the inserted one, is now held as the table's overflow.
    Full,
}

/// Outcome of a remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveStatus {
    /// At least one matching association was removed.
    Removed,
    /// No slot held the association.
    NotFound,
}

/// Lifecycle state of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    /// Accepts inserts.
    Normal,
    /// Holds an overflow association and must be split.
    Full,
}

/// Boundary association returned by [`CuckooTable::split`].
///
/// Everything in the lower destination sorts at or before `(key, value)`,
/// since duplicates of the divider may land on either side. The divider
/// itself and everything after it went to the upper one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Divider {
    /// Divider key
    pub key: u64,
    /// Divider value
    pub value: u64,
}

/// Occupancy snapshot of a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableStats {
    /// Live entries in the first sub-table.
    pub first_entries: usize,
    /// Live entries in the second sub-table.
    pub second_entries: usize,
    /// Buckets with every slot occupied, across both sub-tables.
    pub full_buckets: usize,
    /// Whether an overflow association is held.
    pub overflow: bool,
}

impl TableStats {
    /// Associations stored in buckets.
    pub const fn resident(&self) -> usize {
        self.first_entries + self.second_entries
    }

    /// Fraction of the slot capacity in use.
    #[allow(clippy::cast_precision_loss)]
    pub fn load_factor(&self) -> f64 {
        self.resident() as f64 / TABLE_CAPACITY as f64
    }
}

/// Cuckoo hash table over a borrowed page.
///
/// The default store is a `[u32]` word buffer; file-backed pages use a
/// little-endian `[u8]` store (see [`crate::TableFile`]).
pub struct CuckooTable<'a, B: WordStore + ?Sized = [u32]> {
    region: Region<'a, B>,
    config: TableConfig,
    overflow: Option<(u64, u64)>,
}

impl<B: WordStore + ?Sized> std::fmt::Debug for CuckooTable<'_, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CuckooTable")
            .field("region", &self.region)
            .field("config", &self.config)
            .field("overflow", &self.overflow)
            .finish()
    }
}

fn check_value(value: u64) -> Result<()> {
    if value == 0 {
        return Err(CuckooError::ZeroValue);
    }
    if value > MAX_VALUE {
        return Err(CuckooError::ValueTooWide(value));
    }
    Ok(())
}

impl<'a, B: WordStore + ?Sized> CuckooTable<'a, B> {
    /// Bind a table to `words` with the default configuration.
    ///
    /// Existing contents of the region are kept, so a previously
    /// populated page can be reopened. A fresh page must be zeroed.
    pub fn new(words: &'a mut B) -> Result<Self> {
        Self::with_config(words, TableConfig::default())
    }

    /// Bind a table to `words` with an explicit configuration.
    pub fn with_config(words: &'a mut B, config: TableConfig) -> Result<Self> {
        Ok(Self {
            region: Region::new(words)?,
            config,
            overflow: None,
        })
    }

    /// Configuration in effect.
    pub const fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> TableState {
        if self.overflow.is_some() {
            TableState::Full
        } else {
            TableState::Normal
        }
    }

    /// Whether the table holds an overflow association.
    pub const fn is_full(&self) -> bool {
        self.overflow.is_some()
    }

    /// The association held out of band while full.
    pub const fn overflow(&self) -> Option<(u64, u64)> {
        self.overflow
    }

    /// Store `(key, value)`.
    ///
    /// Places the association in the first free slot of its first-table
    /// bucket, then its second-table bucket. When both are full, runs a
    /// displacement chain of at most `max_displacements` rounds. If the
    /// chain does not end in a free slot the last evicted association
    /// becomes the overflow and [`InsertStatus::Full`] is returned.
    ///
    /// Values must be in `1..=MAX_VALUE`. Inserting into a full table is
    /// rejected with [`CuckooError::InsertWhileFull`].
    pub fn insert(&mut self, key: u64, value: u64) -> Result<InsertStatus> {
        if self.overflow.is_some() {
            return Err(CuckooError::InsertWhileFull { key, value });
        }
        check_value(value)?;

        for sub in SubTable::ALL {
            let bucket = sub.bucket_index(key);
            let entries = self.region.read_bucket(sub, bucket);
            if let Some(slot) = entries.iter().position(Entry::is_empty) {
                self.region
                    .write_entry(sub, bucket, slot, sub.encode(key, value));
                return Ok(InsertStatus::Inserted);
            }
        }

        let mut sub = SubTable::First;
        let (mut key, mut value) = (key, value);

        for round in 0..self.config.max_displacements {
            let bucket = sub.bucket_index(key);
            let evicted = self.rotate_in(sub, bucket, sub.encode(key, value));

            match sub.decode(bucket, evicted) {
                None => {
                    debug!("Displacement chain settled after {} rounds", round + 1);
                    return Ok(InsertStatus::Inserted);
                }
                Some((evicted_key, evicted_value)) => {
                    key = evicted_key;
                    value = evicted_value;
                    sub = sub.other();
                }
            }
        }

        warn!(
            "Cuckoo table full after {} displacement rounds, holding overflow key {:#018x}",
            self.config.max_displacements, key
        );
        self.overflow = Some((key, value));
        Ok(InsertStatus::Full)
    }

    /// Push `entry` into slot 0 of `bucket`, shifting every entry one slot
    /// toward the end, and return the entry that fell off the last slot.
    fn rotate_in(&mut self, sub: SubTable, bucket: u16, entry: Entry) -> Entry {
        let mut entries = self.region.read_bucket(sub, bucket);
        let evicted = entries[LAST_SLOT];
        entries.copy_within(0..LAST_SLOT, 1);
        entries[0] = entry;
        self.region.write_bucket(sub, bucket, &entries);
        evicted
    }

    /// Every value stored under `key`, from both candidate buckets.
    ///
    /// Duplicates are returned as often as they are stored. The result is
    /// empty when the key is not present. The overflow association of a
    /// full table is not consulted.
    pub fn lookup(&self, key: u64) -> Vec<u64> {
        let mut values = Vec::new();
        for sub in SubTable::ALL {
            let bucket = sub.bucket_index(key);
            for entry in self.region.read_bucket(sub, bucket) {
                if let Some((found, value)) = sub.decode(bucket, entry) {
                    if found == key {
                        values.push(value);
                    }
                }
            }
        }
        values
    }

    /// Whether any value is stored under `key`.
    pub fn contains_key(&self, key: u64) -> bool {
        !self.lookup(key).is_empty()
    }

    /// Remove every stored copy of the exact association `(key, value)`.
    ///
    /// Both candidate buckets are cleaned. Entries after a match shift down
    /// one slot, so buckets stay packed and duplicates within a bucket are
    /// all removed. A zero value can never be stored and reports
    /// [`RemoveStatus::NotFound`].
    pub fn remove(&mut self, key: u64, value: u64) -> Result<RemoveStatus> {
        if value == 0 {
            return Ok(RemoveStatus::NotFound);
        }
        check_value(value)?;

        let mut removed = 0;
        for sub in SubTable::ALL {
            let bucket = sub.bucket_index(key);
            let target = sub.encode(key, value);
            let mut entries = self.region.read_bucket(sub, bucket);
            let before = removed;

            let mut slot = 0;
            while slot < ENTRIES_PER_BUCKET {
                if entries[slot] == target {
                    entries.copy_within(slot + 1.., slot);
                    entries[LAST_SLOT] = Entry::EMPTY;
                    removed += 1;
                } else {
                    slot += 1;
                }
            }

            if removed > before {
                self.region.write_bucket(sub, bucket, &entries);
            }
        }

        if removed > 0 {
            Ok(RemoveStatus::Removed)
        } else {
            Ok(RemoveStatus::NotFound)
        }
    }

    /// Iterate over every association stored in a bucket.
    ///
    /// Visits all slots of all buckets, first sub-table then second. The
    /// overflow association is not included.
    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        SubTable::ALL.into_iter().flat_map(move |sub| {
            (0..=u16::MAX).flat_map(move |bucket| {
                self.region
                    .read_bucket(sub, bucket)
                    .into_iter()
                    .filter_map(move |entry| sub.decode(bucket, entry))
            })
        })
    }

    /// Live associations, including the overflow when full.
    pub fn len(&self) -> usize {
        self.iter().count() + usize::from(self.overflow.is_some())
    }

    /// Whether the table holds no associations at all.
    pub fn is_empty(&self) -> bool {
        self.overflow.is_none() && self.iter().next().is_none()
    }

    /// Count occupancy per sub-table.
    pub fn stats(&self) -> TableStats {
        let mut stats = TableStats {
            overflow: self.overflow.is_some(),
            ..TableStats::default()
        };

        for sub in SubTable::ALL {
            let mut live = 0;
            for bucket in 0..BUCKETS_PER_TABLE {
                let entries: Bucket = self.region.read_bucket(sub, bucket as u16);
                let used = entries.iter().filter(|e| e.value() != 0).count();
                if used == ENTRIES_PER_BUCKET {
                    stats.full_buckets += 1;
                }
                live += used;
            }
            match sub {
                SubTable::First => stats.first_entries = live,
                SubTable::Second => stats.second_entries = live,
            }
        }

        stats
    }

    /// Reshard every live association into two destination tables.
    ///
    /// Collects the overflow (if any) and every stored association, sorts
    /// them by key then value, and splits at the median index
    /// `len / 2`. Associations below the median go to `lower`, the rest to
    /// `upper`. The median association is returned as the divider. This
    /// table is left unchanged.
    ///
    /// Fails with [`CuckooError::EmptySplit`] when there is nothing to
    /// split, and with [`CuckooError::SplitOverflow`] when a destination
    /// reports full, which means it was not empty enough to absorb its
    /// half.
    pub fn split<L, U>(
        &self,
        lower: &mut CuckooTable<'_, L>,
        upper: &mut CuckooTable<'_, U>,
    ) -> Result<Divider>
    where
        L: WordStore + ?Sized,
        U: WordStore + ?Sized,
    {
        let mut pairs: Vec<(u64, u64)> = self.overflow.into_iter().chain(self.iter()).collect();
        if pairs.is_empty() {
            return Err(CuckooError::EmptySplit);
        }
        pairs.sort_unstable();

        let median = pairs.len() / 2;
        let (key, value) = pairs[median];
        debug!(
            "Splitting {} associations at divider {:#018x}/{:#x}",
            pairs.len(),
            key,
            value
        );

        fill(lower, &pairs[..median], SplitHalf::Lower)?;
        fill(upper, &pairs[median..], SplitHalf::Upper)?;

        Ok(Divider { key, value })
    }
}

fn fill<B: WordStore + ?Sized>(
    table: &mut CuckooTable<'_, B>,
    pairs: &[(u64, u64)],
    half: SplitHalf,
) -> Result<()> {
    for &(key, value) in pairs {
        if table.insert(key, value)? == InsertStatus::Full {
            warn!("Split destination for the {} half overflowed", half);
            return Err(CuckooError::SplitOverflow { half });
        }
    }
    Ok(())
}
