//! Append-only, deduplicating node sets.
//!
//! Back-reference and collection edges are mutated from many call sites while other
//! workers iterate them. [`NodeSet`] gives those edges set semantics over node
//! identity: inserts are append-only and deduplicated by key, reads take a
//! copy-on-read snapshot so iteration never holds the lock.
//!
//! Edges are held weakly; the registry caches own the strong references for the
//! session, so an upgrade failing means the session is tearing down and the edge is
//! simply skipped.

use std::sync::{Arc, RwLock, Weak};

use crate::graph::{identity::NodeKey, node::GraphNode};

/// An append-only, deduplicating set of graph nodes, insertion-ordered.
pub struct NodeSet<T: GraphNode + ?Sized> {
    entries: RwLock<Vec<(NodeKey, Weak<T>)>>,
}

impl<T: GraphNode + ?Sized> NodeSet<T> {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        NodeSet {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Insert a node. Returns `false` when a node with the same identity is
    /// already present (the duplicate is dropped).
    pub fn insert(&self, node: &Arc<T>) -> bool {
        let key = node.node_key().clone();
        let mut entries = write_lock!(self.entries);
        if entries.iter().any(|(existing, _)| *existing == key) {
            return false;
        }
        entries.push((key, Arc::downgrade(node)));
        true
    }

    /// Returns `true` when a node with the given identity is present.
    pub fn contains(&self, key: &NodeKey) -> bool {
        read_lock!(self.entries)
            .iter()
            .any(|(existing, _)| existing == key)
    }

    /// Find a node by identity.
    pub fn get(&self, key: &NodeKey) -> Option<Arc<T>> {
        read_lock!(self.entries)
            .iter()
            .find(|(existing, _)| existing == key)
            .and_then(|(_, weak)| weak.upgrade())
    }

    /// Copy-on-read snapshot of the live nodes, in insertion order.
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        read_lock!(self.entries)
            .iter()
            .filter_map(|(_, weak)| weak.upgrade())
            .collect()
    }

    /// Snapshot of the identity keys, in insertion order.
    pub fn keys(&self) -> Vec<NodeKey> {
        read_lock!(self.entries)
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Number of entries (live or not).
    pub fn len(&self) -> usize {
        read_lock!(self.entries).len()
    }

    /// Returns `true` when the set holds no entries.
    pub fn is_empty(&self) -> bool {
        read_lock!(self.entries).is_empty()
    }
}

impl<T: GraphNode + ?Sized> Default for NodeSet<T> {
    fn default() -> Self {
        NodeSet::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{
        diagnostics::Faults,
        node::{NodeKind, NodeState},
        registry::NodeRegistry,
    };

    struct Stub {
        key: NodeKey,
        state: NodeState,
    }

    impl Stub {
        fn new(key: &str) -> Arc<Self> {
            Arc::new(Stub {
                key: NodeKey::new(key),
                state: NodeState::new(Arc::new(Faults::new())),
            })
        }
    }

    impl GraphNode for Stub {
        fn node_key(&self) -> &NodeKey {
            &self.key
        }

        fn kind(&self) -> NodeKind {
            NodeKind::Type
        }

        fn state(&self) -> &NodeState {
            &self.state
        }

        fn build(&self, _registry: &NodeRegistry) {}
    }

    #[test]
    fn test_insert_deduplicates_by_key() {
        let set: NodeSet<Stub> = NodeSet::new();
        let a = Stub::new("a");
        let a_again = Stub::new("a");
        let b = Stub::new("b");

        assert!(set.insert(&a));
        assert!(!set.insert(&a));
        assert!(!set.insert(&a_again));
        assert!(set.insert(&b));

        assert_eq!(set.len(), 2);
        assert!(set.contains(&NodeKey::new("a")));
    }

    #[test]
    fn test_snapshot_preserves_insertion_order() {
        let set: NodeSet<Stub> = NodeSet::new();
        let nodes = [Stub::new("x"), Stub::new("y"), Stub::new("z")];
        for node in &nodes {
            set.insert(node);
        }

        let keys: Vec<String> = set
            .snapshot()
            .iter()
            .map(|n| n.node_key().to_string())
            .collect();
        assert_eq!(keys, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_snapshot_skips_dropped_nodes() {
        let set: NodeSet<Stub> = NodeSet::new();
        let keep = Stub::new("keep");
        set.insert(&keep);
        {
            let drop_me = Stub::new("drop");
            set.insert(&drop_me);
        }

        assert_eq!(set.len(), 2);
        assert_eq!(set.snapshot().len(), 1);
    }
}
