//! Index module: subscription entries and the two partition indices.

mod entry;
mod partition;

pub use entry::SubscriptionEntry;
pub use partition::{PartitionKind, SubscriptionIndex, Sweep};
