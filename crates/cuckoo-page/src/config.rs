//! Configuration for cuckoo tables

use serde::{Deserialize, Serialize};

/// Default number of displacement rounds before a table reports full.
pub const DEFAULT_MAX_DISPLACEMENTS: usize = 16;

/// Tunables for a [`crate::CuckooTable`].
///
/// The page geometry is fixed by [`crate::layout`] and is not configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Displacement rounds an insert may perform before the table is full
    pub max_displacements: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            max_displacements: DEFAULT_MAX_DISPLACEMENTS,
        }
    }
}

impl TableConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the displacement budget
    #[must_use]
    pub const fn with_max_displacements(mut self, rounds: usize) -> Self {
        self.max_displacements = rounds;
        self
    }
}
