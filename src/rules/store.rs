//! Rule store
//!
//! Holds the active [`RuleSnapshot`] in an [`ArcSwapOption`]. Readers load the
//! pointer without taking a lock, so a reader sees either the old or the new
//! snapshot in full and never waits on a replace. Compilation happens outside
//! the store; installing a snapshot is a single pointer publish.

use crate::rules::types::RuleSnapshot;
use arc_swap::ArcSwapOption;
use std::sync::Arc;

/// Atomically swappable holder of the active rule snapshot
#[derive(Default)]
pub struct RuleStore {
    /// `None` until the first successful compile
    current: ArcSwapOption<RuleSnapshot>,
}

impl RuleStore {
    /// Create an uninitialized store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that starts with a snapshot
    pub fn with_snapshot(snapshot: RuleSnapshot) -> Self {
        let store = Self::new();
        store.replace(snapshot);
        store
    }

    /// The active snapshot, or `None` while uninitialized
    ///
    /// Uninitialized means every request is allowed.
    pub fn current(&self) -> Option<Arc<RuleSnapshot>> {
        self.current.load_full()
    }

    /// Install a new snapshot and return its generation
    ///
    /// The generation is stamped into the snapshot, one past the one it
    /// replaces. The previous snapshot is dropped once no reader holds it.
    pub fn replace(&self, snapshot: RuleSnapshot) -> u64 {
        let previous = self.current.rcu(|current| {
            let generation = current.as_ref().map_or(0, |s| s.generation()) + 1;
            Some(Arc::new(snapshot.clone().with_generation(generation)))
        });
        previous.as_ref().map_or(0, |s| s.generation()) + 1
    }

    pub fn is_initialized(&self) -> bool {
        self.current.load().is_some()
    }

    /// Number of snapshots installed so far
    pub fn generation(&self) -> u64 {
        self.current.load().as_ref().map_or(0, |s| s.generation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::NodeId;

    #[test]
    fn test_starts_uninitialized() {
        let store = RuleStore::new();
        assert!(store.current().is_none());
        assert!(!store.is_initialized());
        assert_eq!(store.generation(), 0);
    }

    #[test]
    fn test_replace_swaps_whole_snapshot() {
        let store = RuleStore::with_snapshot(RuleSnapshot::new(NodeId(1), false, vec![], vec![]));
        let held = store.current().unwrap();

        let generation = store.replace(RuleSnapshot::new(NodeId(2), true, vec![], vec![]));
        assert_eq!(generation, 2);

        // A reader that grabbed the old snapshot keeps a consistent view
        assert_eq!(held.folder_id(), NodeId(1));
        assert!(!held.visualize_coverage());

        let fresh = store.current().unwrap();
        assert_eq!(fresh.folder_id(), NodeId(2));
        assert!(fresh.visualize_coverage());
        assert!(!Arc::ptr_eq(&held, &fresh));
    }

    #[test]
    fn test_concurrent_readers_see_complete_snapshots() {
        let store = Arc::new(RuleStore::with_snapshot(RuleSnapshot::new(
            NodeId(0),
            false,
            vec![],
            vec![],
        )));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        let snapshot = store.current().unwrap();
                        // Folder id and flag are always written together
                        assert_eq!(snapshot.folder_id().0 % 2 == 1, snapshot.visualize_coverage());
                    }
                })
            })
            .collect();

        for i in 1..200 {
            store.replace(RuleSnapshot::new(NodeId(i), i % 2 == 1, vec![], vec![]));
        }

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(store.generation(), 200);
    }

    #[test]
    fn test_readers_never_wait_on_replace() {
        let store = Arc::new(RuleStore::new());
        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 1..=500 {
                    store.replace(RuleSnapshot::new(NodeId(i), false, vec![], vec![]));
                }
            })
        };

        // Each generation is stamped into the snapshot it belongs to
        let mut last_seen = 0;
        while !writer.is_finished() {
            if let Some(snapshot) = store.current() {
                assert_eq!(snapshot.folder_id().0 as u64, snapshot.generation());
                assert!(snapshot.generation() >= last_seen);
                last_seen = snapshot.generation();
            }
        }
        writer.join().unwrap();

        let snapshot = store.current().unwrap();
        assert_eq!(snapshot.generation(), 500);
        assert_eq!(store.generation(), 500);
    }

    #[test]
    fn test_uninstalled_snapshot_has_no_generation() {
        let snapshot = RuleSnapshot::new(NodeId(1), false, vec![], vec![]);
        assert_eq!(snapshot.generation(), 0);

        let store = RuleStore::with_snapshot(snapshot);
        assert_eq!(store.current().unwrap().generation(), 1);
    }
}
