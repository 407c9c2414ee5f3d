// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Entity table: every publisher/subscriber endpoint known to discovery.
//!
//! Readers and writers live in separate maps because the same raw gid may in
//! principle be reused across kinds; every lookup is keyed by `(gid, kind)`.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::gid::Gid;
use crate::node::NodeKey;

/// Endpoint classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EndpointKind {
    /// Subscriber side of a topic.
    Reader,
    /// Publisher side of a topic.
    Writer,
}

impl EndpointKind {
    /// Map the discovery layer's `is_reader` flag to a kind.
    pub fn from_is_reader(is_reader: bool) -> Self {
        if is_reader {
            Self::Reader
        } else {
            Self::Writer
        }
    }

    /// Returns `true` for [`EndpointKind::Reader`].
    pub fn is_reader(self) -> bool {
        self == Self::Reader
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reader => f.write_str("reader"),
            Self::Writer => f.write_str("writer"),
        }
    }
}

/// A single endpoint as reported by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRecord {
    /// Endpoint identifier.
    pub gid: Gid,
    /// Raw (mangled) topic name.
    pub topic_name: String,
    /// Raw (mangled) type name.
    pub type_name: String,
    /// Reader or writer.
    pub kind: EndpointKind,
    /// Node this endpoint is currently associated with, if any.
    pub(crate) node: Option<NodeKey>,
}

impl EndpointRecord {
    /// Returns `true` when the endpoint is attached to a node.
    pub fn is_associated(&self) -> bool {
        self.node.is_some()
    }
}

#[derive(Debug, Default)]
pub(crate) struct EntityTable {
    readers: BTreeMap<Gid, EndpointRecord>,
    writers: BTreeMap<Gid, EndpointRecord>,
}

impl EntityTable {
    fn map(&self, kind: EndpointKind) -> &BTreeMap<Gid, EndpointRecord> {
        match kind {
            EndpointKind::Reader => &self.readers,
            EndpointKind::Writer => &self.writers,
        }
    }

    fn map_mut(&mut self, kind: EndpointKind) -> &mut BTreeMap<Gid, EndpointRecord> {
        match kind {
            EndpointKind::Reader => &mut self.readers,
            EndpointKind::Writer => &mut self.writers,
        }
    }

    pub(crate) fn insert(
        &mut self,
        gid: Gid,
        topic_name: String,
        type_name: String,
        kind: EndpointKind,
    ) -> Result<&mut EndpointRecord, GraphError> {
        match self.map_mut(kind).entry(gid) {
            Entry::Occupied(_) => Err(GraphError::DuplicateEndpoint { gid, kind }),
            Entry::Vacant(slot) => Ok(slot.insert(EndpointRecord {
                gid,
                topic_name,
                type_name,
                kind,
                node: None,
            })),
        }
    }

    pub(crate) fn remove(
        &mut self,
        gid: &Gid,
        kind: EndpointKind,
    ) -> Result<EndpointRecord, GraphError> {
        self.map_mut(kind)
            .remove(gid)
            .ok_or(GraphError::UnknownEndpoint { gid: *gid, kind })
    }

    pub(crate) fn get(&self, gid: &Gid, kind: EndpointKind) -> Option<&EndpointRecord> {
        self.map(kind).get(gid)
    }

    pub(crate) fn get_mut(&mut self, gid: &Gid, kind: EndpointKind) -> Option<&mut EndpointRecord> {
        self.map_mut(kind).get_mut(gid)
    }

    pub(crate) fn contains(&self, gid: &Gid, kind: EndpointKind) -> bool {
        self.map(kind).contains_key(gid)
    }

    /// Readers first, then writers, each in gid order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &EndpointRecord> {
        self.readers.values().chain(self.writers.values())
    }

    pub(crate) fn iter_kind(&self, kind: EndpointKind) -> impl Iterator<Item = &EndpointRecord> {
        self.map(kind).values()
    }

    pub(crate) fn count_on_topic(&self, topic_name: &str, kind: EndpointKind) -> usize {
        self.iter_kind(kind)
            .filter(|e| e.topic_name == topic_name)
            .count()
    }

    pub(crate) fn len(&self) -> usize {
        self.readers.len() + self.writers.len()
    }
}
