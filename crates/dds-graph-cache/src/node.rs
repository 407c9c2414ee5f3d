// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Participant and node index.
//!
//! Nodes live in a slab arena and are referenced by [`NodeKey`] from both their
//! owning participant and from associated endpoints. A secondary index keyed by
//! [`NodeName`] gives deterministic `(namespace, name)` ordering for queries.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use slab::Slab;

use crate::entity::EndpointKind;
use crate::gid::Gid;

/// Namespace and name of a node. Orders by namespace first, then name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeName {
    /// Node namespace (e.g. `/` or `/robot1`).
    pub namespace: String,
    /// Node name within the namespace.
    pub name: String,
}

impl NodeName {
    /// Build a node name from its two parts.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.ends_with('/') {
            write!(f, "{}{}", self.namespace, self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

/// Arena handle of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct NodeKey(usize);

#[derive(Debug)]
pub(crate) struct NodeRecord {
    pub(crate) participant: Gid,
    pub(crate) name: NodeName,
    pub(crate) readers: BTreeSet<Gid>,
    pub(crate) writers: BTreeSet<Gid>,
}

impl NodeRecord {
    pub(crate) fn endpoints(&self, kind: EndpointKind) -> &BTreeSet<Gid> {
        match kind {
            EndpointKind::Reader => &self.readers,
            EndpointKind::Writer => &self.writers,
        }
    }

    pub(crate) fn endpoints_mut(&mut self, kind: EndpointKind) -> &mut BTreeSet<Gid> {
        match kind {
            EndpointKind::Reader => &mut self.readers,
            EndpointKind::Writer => &mut self.writers,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ParticipantRecord {
    pub(crate) enclave: String,
    /// Owned nodes in creation order.
    pub(crate) nodes: Vec<NodeKey>,
}

#[derive(Debug, Default)]
pub(crate) struct NodeArena {
    nodes: Slab<NodeRecord>,
    by_name: BTreeMap<NodeName, Vec<NodeKey>>,
}

impl NodeArena {
    pub(crate) fn insert(&mut self, participant: Gid, name: NodeName) -> NodeKey {
        let key = NodeKey(self.nodes.insert(NodeRecord {
            participant,
            name: name.clone(),
            readers: BTreeSet::new(),
            writers: BTreeSet::new(),
        }));
        self.by_name.entry(name).or_default().push(key);
        key
    }

    pub(crate) fn remove(&mut self, key: NodeKey) -> Option<NodeRecord> {
        let record = self.nodes.try_remove(key.0)?;
        if let Some(keys) = self.by_name.get_mut(&record.name) {
            keys.retain(|k| *k != key);
            if keys.is_empty() {
                self.by_name.remove(&record.name);
            }
        }
        Some(record)
    }

    pub(crate) fn get(&self, key: NodeKey) -> Option<&NodeRecord> {
        self.nodes.get(key.0)
    }

    pub(crate) fn get_mut(&mut self, key: NodeKey) -> Option<&mut NodeRecord> {
        self.nodes.get_mut(key.0)
    }

    /// Node hosted by `participant` under `name`, if any.
    pub(crate) fn find(&self, participant: &Gid, name: &NodeName) -> Option<NodeKey> {
        self.by_name.get(name)?.iter().copied().find(|key| {
            self.get(*key)
                .is_some_and(|node| node.participant == *participant)
        })
    }

    /// Every node with this name, across participants.
    pub(crate) fn matching<'a>(
        &'a self,
        name: &NodeName,
    ) -> impl Iterator<Item = &'a NodeRecord> + 'a {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|key| self.get(*key))
    }

    /// All nodes ordered by `(namespace, name)`, ties in creation order.
    pub(crate) fn iter_sorted(&self) -> impl Iterator<Item = &NodeRecord> {
        self.by_name
            .values()
            .flatten()
            .filter_map(|key| self.get(*key))
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn gid(label: &str) -> Gid {
        Gid::from_prefix(label.as_bytes()).unwrap()
    }

    #[test]
    fn display_joins_namespace_and_name() {
        assert_eq!(NodeName::new("/", "talker").to_string(), "/talker");
        let nested = NodeName::new("/robot1", "talker");
        assert_eq!(nested.to_string(), "/robot1/talker");
    }

    #[test]
    fn iteration_is_sorted_by_namespace_then_name() {
        let mut arena = NodeArena::default();
        let p = gid("participant1");
        arena.insert(p, NodeName::new("ns2", "node1"));
        arena.insert(p, NodeName::new("ns1", "node2"));
        arena.insert(p, NodeName::new("ns1", "node1"));
        let names: Vec<String> = arena.iter_sorted().map(|n| n.name.to_string()).collect();
        assert_eq!(names, vec!["ns1/node1", "ns1/node2", "ns2/node1"]);
    }

    #[test]
    fn find_is_scoped_to_participant() {
        let mut arena = NodeArena::default();
        let name = NodeName::new("ns1", "node1");
        let a = arena.insert(gid("p1"), name.clone());
        let b = arena.insert(gid("p2"), name.clone());
        assert_eq!(arena.find(&gid("p1"), &name), Some(a));
        assert_eq!(arena.find(&gid("p2"), &name), Some(b));
        assert_eq!(arena.find(&gid("p3"), &name), None);
        assert_eq!(arena.matching(&name).count(), 2);

        arena.remove(a).unwrap();
        assert_eq!(arena.find(&gid("p1"), &name), None);
        assert_eq!(arena.matching(&name).count(), 1);
        assert!(arena.remove(a).is_none());
        arena.remove(b).unwrap();
        assert_eq!(arena.len(), 0);
        assert_eq!(arena.iter_sorted().count(), 0);
    }
}
