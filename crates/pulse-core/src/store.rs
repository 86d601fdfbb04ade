//! The concurrency-safe cache of the latest cluster state.

use std::sync::Arc;

use parking_lot::RwLock;
use pulse_proto::ClusterState;

use crate::detector::changed;

/// A consistent view of the store: the current state and its generation.
///
/// Generation `0` means nothing has been installed yet; every successful
/// install bumps it by one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    /// Install counter at the time of the read.
    pub generation: u64,
    /// The installed state, or `None` before the first successful cycle.
    pub state: Option<Arc<ClusterState>>,
}

impl StoreSnapshot {
    /// Check if a state has been installed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }
}

#[derive(Debug, Default)]
struct Slot {
    current: Option<Arc<ClusterState>>,
    generation: u64,
}

/// Holds exactly one live [`ClusterState`].
///
/// Reads clone an `Arc` under a shared lock; installs swap the `Arc` under
/// an exclusive lock. The installed state is never mutated, so a reader can
/// keep its `Arc` for as long as it likes.
#[derive(Debug, Default)]
pub struct StateStore {
    slot: RwLock<Slot>,
}

impl StateStore {
    /// Create an uninitialized store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current state, or `None` before the first install.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<ClusterState>> {
        self.slot.read().current.clone()
    }

    /// The current state together with its generation, read atomically.
    #[must_use]
    pub fn versioned(&self) -> StoreSnapshot {
        let slot = self.slot.read();
        StoreSnapshot {
            generation: slot.generation,
            state: slot.current.clone(),
        }
    }

    /// The number of installs so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.slot.read().generation
    }

    /// Install `candidate` if it differs from the current state.
    ///
    /// The comparison is repeated under the exclusive lock, so of two racing
    /// producers offering the same state only one reports a change.
    pub fn swap_if_changed(&self, candidate: ClusterState) -> bool {
        let candidate = Arc::new(candidate);
        let mut slot = self.slot.write();
        if !changed(slot.current.as_deref(), &candidate) {
            return false;
        }
        slot.current = Some(candidate);
        slot.generation += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_proto::NodeEntry;
    use std::thread;

    fn one_node(name: &str) -> ClusterState {
        ClusterState::new(vec![NodeEntry::empty(name).unwrap()]).unwrap()
    }

    #[test]
    fn test_new_store_is_uninitialized() {
        let store = StateStore::new();

        assert!(store.snapshot().is_none());
        assert_eq!(store.generation(), 0);
        assert!(!store.versioned().is_initialized());
    }

    #[test]
    fn test_first_swap_installs_even_empty_state() {
        let store = StateStore::new();

        assert!(store.swap_if_changed(ClusterState::empty()));
        assert_eq!(store.snapshot().as_deref(), Some(&ClusterState::empty()));
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn test_repeat_swap_is_noop() {
        let store = StateStore::new();

        assert!(store.swap_if_changed(one_node("n1")));
        assert!(!store.swap_if_changed(one_node("n1")));
        assert!(!store.swap_if_changed(one_node("n1")));
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn test_swap_replaces_changed_state() {
        let store = StateStore::new();
        store.swap_if_changed(one_node("n1"));
        let old = store.snapshot().unwrap();

        assert!(store.swap_if_changed(one_node("n2")));

        // Readers holding the old Arc still see the old state.
        assert_eq!(old.nodes()[0].name(), "n1");
        assert_eq!(store.snapshot().unwrap().nodes()[0].name(), "n2");
        assert_eq!(store.versioned().generation, 2);
    }

    #[test]
    fn test_concurrent_identical_candidates_install_once() {
        let store = Arc::new(StateStore::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.swap_if_changed(one_node("n1")))
            })
            .collect();

        let installs = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|installed| *installed)
            .count();

        assert_eq!(installs, 1);
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn test_readers_see_whole_states() {
        let store = Arc::new(StateStore::new());
        store.swap_if_changed(one_node("a"));

        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..200 {
                    let name = if i % 2 == 0 { "a" } else { "b" };
                    store.swap_if_changed(one_node(name));
                }
            })
        };

        for _ in 0..200 {
            let snap = store.versioned();
            let state = snap.state.unwrap();
            assert_eq!(state.node_count(), 1);
            assert!(matches!(state.nodes()[0].name(), "a" | "b"));
        }

        writer.join().unwrap();
    }
}
