use serde::{Deserialize, Serialize};

/// Snapshot of the registry size, per partition.
///
/// Entry counts include handles that are already dead but not yet swept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusStats {
    pub exact_types: usize,
    pub exact_entries: usize,
    pub polymorphic_types: usize,
    pub polymorphic_entries: usize,
    pub cleanup_pending: bool,
}

impl BusStats {
    pub fn total_entries(&self) -> usize {
        self.exact_entries + self.polymorphic_entries
    }
}
