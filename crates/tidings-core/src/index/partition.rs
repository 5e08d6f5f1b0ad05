//! Subscription index partition.
//!
//! Design:
//! - One `Mutex` per partition; exact and polymorphic traffic never contend.
//! - Lists keep insertion order, which is the delivery order.
//! - Unsubscribe only marks handles; `sweep` is the single place that
//!   removes entries and empty keys.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use super::entry::SubscriptionEntry;
use crate::domain::NotificationType;

/// Which partition a subscription lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartitionKind {
    /// Only the precise notification type.
    Exact,

    /// The type itself plus every notification declaring it as a category.
    Polymorphic,
}

impl PartitionKind {
    pub fn for_subtypes(accept_subtypes: bool) -> Self {
        if accept_subtypes {
            PartitionKind::Polymorphic
        } else {
            PartitionKind::Exact
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PartitionKind::Exact => "exact",
            PartitionKind::Polymorphic => "polymorphic",
        }
    }
}

type EntryList = Vec<Arc<SubscriptionEntry>>;

/// Result of one sweep over a partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sweep {
    pub removed_entries: usize,
    pub removed_types: usize,
}

/// Mapping from notification type to its ordered subscription list.
pub struct SubscriptionIndex {
    kind: PartitionKind,
    lists: Mutex<HashMap<NotificationType, EntryList>>,
}

impl SubscriptionIndex {
    pub fn new(kind: PartitionKind) -> Self {
        Self {
            kind,
            lists: Mutex::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> PartitionKind {
        self.kind
    }

    /// Append an entry, creating the list for `notification` if absent.
    pub fn insert(&self, notification: NotificationType, entry: Arc<SubscriptionEntry>) {
        self.lock().entry(notification).or_default().push(entry);
    }

    /// Copy of the list for exactly `notification`.
    pub fn snapshot(&self, notification: NotificationType) -> Option<EntryList> {
        self.lock().get(&notification).cloned()
    }

    /// Copies of every list whose key satisfies `matches`.
    ///
    /// `matches` runs under the partition lock and must not touch the registry.
    pub fn snapshot_where(
        &self,
        mut matches: impl FnMut(NotificationType) -> bool,
    ) -> Vec<(NotificationType, EntryList)> {
        self.lock()
            .iter()
            .filter(|(key, _)| matches(**key))
            .map(|(key, list)| (*key, list.clone()))
            .collect()
    }

    /// Mark dead every entry accepted by `select`, within one key or all keys.
    ///
    /// Returns how many live entries were marked. Structure is left untouched.
    /// Detached handler state is dropped after the lock is released.
    pub fn mark_where(
        &self,
        notification: Option<NotificationType>,
        select: impl Fn(&SubscriptionEntry) -> bool,
    ) -> usize {
        let mut detached = Vec::new();
        {
            let lists = self.lock();
            let mut mark = |list: &EntryList| {
                for entry in list {
                    if entry.handle.is_marked() || !select(&**entry) {
                        continue;
                    }
                    let refs = entry.handle.detach();
                    if !refs.is_empty() {
                        detached.push(refs);
                    }
                }
            };
            match notification {
                Some(notification) => {
                    if let Some(list) = lists.get(&notification) {
                        mark(list);
                    }
                }
                None => lists.values().for_each(&mut mark),
            }
        }
        detached.len()
    }

    /// Remove dead entries, then keys left without entries.
    ///
    /// Removed entries are marked dead once the lock is released, so handler
    /// captures are never dropped under it.
    pub fn sweep(&self) -> Sweep {
        let mut removed: EntryList = Vec::new();
        let removed_types = {
            let mut lists = self.lock();
            for list in lists.values_mut() {
                let (alive, dead): (EntryList, EntryList) =
                    list.drain(..).partition(|entry| entry.handle.is_alive());
                *list = alive;
                removed.extend(dead);
            }

            let before = lists.len();
            lists.retain(|_, list| !list.is_empty());
            before - lists.len()
        };

        for entry in &removed {
            entry.handle.mark_dead();
        }

        Sweep {
            removed_entries: removed.len(),
            removed_types,
        }
    }

    /// Entries under `notification`, swept or not.
    pub fn len_of(&self, notification: NotificationType) -> usize {
        self.lock().get(&notification).map_or(0, Vec::len)
    }

    pub fn type_count(&self) -> usize {
        self.lock().len()
    }

    pub fn entry_count(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<NotificationType, EntryList>> {
        self.lists.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed::{Handler, WeakHandle};
    use rstest::rstest;

    struct Listener;

    impl Listener {
        fn on_value(&self, _value: &u8) {}
    }

    fn entry(listener: &Arc<Listener>) -> Arc<SubscriptionEntry> {
        let handle =
            WeakHandle::new(None, Some(Handler::<u8>::method(listener, Listener::on_value)))
                .unwrap();
        Arc::new(SubscriptionEntry::new(handle, None))
    }

    fn key() -> NotificationType {
        NotificationType::of::<u8>()
    }

    #[rstest]
    #[case::exact(false, PartitionKind::Exact)]
    #[case::polymorphic(true, PartitionKind::Polymorphic)]
    fn partition_kind_follows_subtype_flag(#[case] accept: bool, #[case] kind: PartitionKind) {
        assert_eq!(PartitionKind::for_subtypes(accept), kind);
    }

    #[test]
    fn insert_keeps_order() {
        let index = SubscriptionIndex::new(PartitionKind::Exact);
        let listener = Arc::new(Listener);
        let first = entry(&listener);
        let second = entry(&listener);

        index.insert(key(), Arc::clone(&first));
        index.insert(key(), Arc::clone(&second));

        let snapshot = index.snapshot(key()).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].id, first.id);
        assert_eq!(snapshot[1].id, second.id);
    }

    #[test]
    fn snapshot_is_detached_from_index() {
        let index = SubscriptionIndex::new(PartitionKind::Exact);
        let listener = Arc::new(Listener);
        index.insert(key(), entry(&listener));

        let snapshot = index.snapshot(key()).unwrap();
        index.insert(key(), entry(&listener));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(index.len_of(key()), 2);
    }

    #[test]
    fn mark_where_does_not_remove_entries() {
        let index = SubscriptionIndex::new(PartitionKind::Exact);
        let listener = Arc::new(Listener);
        index.insert(key(), entry(&listener));

        assert_eq!(index.mark_where(None, |_| true), 1);
        assert_eq!(index.mark_where(Some(key()), |_| true), 0);
        assert_eq!(index.len_of(key()), 1);
    }

    #[test]
    fn sweep_marks_removed_entries() {
        let index = SubscriptionIndex::new(PartitionKind::Exact);
        let dropped = Arc::new(Listener);
        index.insert(key(), entry(&dropped));
        let in_flight = index.snapshot(key()).unwrap();
        drop(dropped);

        assert!(!in_flight[0].handle.is_marked());
        index.sweep();
        assert!(in_flight[0].handle.is_marked());
    }

    #[test]
    fn captures_are_dropped_outside_the_lock() {
        struct Reentrant {
            index: Arc<SubscriptionIndex>,
        }

        impl Drop for Reentrant {
            fn drop(&mut self) {
                // 同じ partition のロックを取り直す
                let _ = self.index.entry_count();
            }
        }

        let index = Arc::new(SubscriptionIndex::new(PartitionKind::Exact));
        for _ in 0..2 {
            let guard = Reentrant {
                index: Arc::clone(&index),
            };
            let handle = WeakHandle::new(
                None,
                Some(Handler::<u8>::function(move |_value: &u8| {
                    let _ = &guard;
                })),
            )
            .unwrap();
            index.insert(key(), Arc::new(SubscriptionEntry::new(handle, None)));
        }

        let first = index.snapshot(key()).unwrap()[0].id;
        assert_eq!(index.mark_where(None, |entry| entry.id == first), 1);
        assert_eq!(index.mark_where(None, |_| true), 1);
        assert_eq!(index.sweep().removed_entries, 2);
        assert_eq!(index.type_count(), 0);
    }

    #[test]
    fn sweep_removes_dead_entries_and_empty_keys() {
        let index = SubscriptionIndex::new(PartitionKind::Polymorphic);
        let kept = Arc::new(Listener);
        let dropped = Arc::new(Listener);
        index.insert(key(), entry(&kept));
        index.insert(key(), entry(&dropped));
        index.insert(NotificationType::of::<u16>(), entry(&dropped));
        drop(dropped);

        let sweep = index.sweep();

        assert_eq!(
            sweep,
            Sweep {
                removed_entries: 2,
                removed_types: 1
            }
        );
        assert_eq!(index.type_count(), 1);
        assert_eq!(index.entry_count(), 1);
    }
}
