// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-participant snapshot exchanged between peers.
//!
//! A [`ParticipantSnapshot`] always carries the participant's *total* state:
//! every node it hosts and the endpoints associated with each. It is what
//! `add_node`/`remove_node` hand back for publication, and what
//! `update_participant_entities` consumes when a peer announces itself.

use std::collections::BTreeSet;

use blake3::Hasher;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gid::Gid;
use crate::node::NodeName;

/// BLAKE3 digest (32 bytes).
pub type Hash32 = [u8; 32];

/// Endpoints associated with one node of a participant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeEntities {
    /// Node namespace.
    pub namespace: String,
    /// Node name.
    pub name: String,
    /// Associated reader gids.
    pub readers: Vec<Gid>,
    /// Associated writer gids.
    pub writers: Vec<Gid>,
}

impl NodeEntities {
    /// Node record with no associated endpoints.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            readers: Vec::new(),
            writers: Vec::new(),
        }
    }

    /// Replace the reader list.
    pub fn with_readers(mut self, readers: impl IntoIterator<Item = Gid>) -> Self {
        self.readers = readers.into_iter().collect();
        self
    }

    /// Replace the writer list.
    pub fn with_writers(mut self, writers: impl IntoIterator<Item = Gid>) -> Self {
        self.writers = writers.into_iter().collect();
        self
    }

    /// The `(namespace, name)` key of this node.
    pub fn node_name(&self) -> NodeName {
        NodeName::new(self.namespace.clone(), self.name.clone())
    }
}

/// Full state of one participant: its gid plus every node it hosts, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSnapshot {
    /// Participant identifier.
    pub gid: Gid,
    /// Hosted nodes with their associations.
    pub nodes: Vec<NodeEntities>,
}

/// Errors from snapshot encoding and decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    /// CBOR serialization failed.
    #[error("encode error: {0}")]
    Encode(String),
    /// CBOR deserialization failed (including gid length violations).
    #[error("decode error: {0}")]
    Decode(String),
}

impl ParticipantSnapshot {
    /// Snapshot of a participant hosting no nodes.
    pub fn new(gid: Gid) -> Self {
        Self {
            gid,
            nodes: Vec::new(),
        }
    }

    /// Append a node record.
    pub fn with_node(mut self, node: NodeEntities) -> Self {
        self.nodes.push(node);
        self
    }

    /// Encode as CBOR.
    pub fn to_cbor(&self) -> Result<Vec<u8>, CodecError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes).map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(bytes)
    }

    /// Decode from CBOR. Gids of any width other than 24 bytes are rejected.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, CodecError> {
        ciborium::from_reader(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }

    /// Domain-separated BLAKE3 digest of the snapshot contents.
    ///
    /// Node order is significant, matching how nodes are published. Each
    /// node's reader and writer lists are hashed as sets, so a snapshot that
    /// went through the cache keeps its digest.
    pub fn digest(&self) -> Hash32 {
        let mut hasher = Hasher::new();
        hasher.update(b"participant:");
        hasher.update(self.gid.as_bytes());
        hasher.update(&(self.nodes.len() as u64).to_le_bytes());
        for node in &self.nodes {
            update_str(&mut hasher, &node.namespace);
            update_str(&mut hasher, &node.name);
            update_gids(&mut hasher, &node.readers);
            update_gids(&mut hasher, &node.writers);
        }
        hasher.finalize().into()
    }
}

fn update_str(hasher: &mut Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn update_gids(hasher: &mut Hasher, gids: &[Gid]) {
    let sorted: BTreeSet<&Gid> = gids.iter().collect();
    hasher.update(&(sorted.len() as u64).to_le_bytes());
    for gid in sorted {
        hasher.update(gid.as_bytes());
    }
}
