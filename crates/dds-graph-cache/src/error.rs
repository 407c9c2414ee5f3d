// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error taxonomy for graph cache mutations.

use thiserror::Error;

use crate::entity::EndpointKind;
use crate::gid::Gid;
use crate::node::NodeName;

/// Errors reported by [`GraphCache`](crate::GraphCache) mutators.
///
/// None of these are fatal: a returned error always means the cache was left
/// exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// An endpoint with this gid and kind is already known.
    #[error("{kind} {gid} already exists")]
    DuplicateEndpoint {
        /// Endpoint identifier.
        gid: Gid,
        /// Endpoint kind.
        kind: EndpointKind,
    },
    /// No endpoint with this gid and kind is known.
    #[error("{kind} {gid} not found")]
    UnknownEndpoint {
        /// Endpoint identifier.
        gid: Gid,
        /// Endpoint kind.
        kind: EndpointKind,
    },
    /// A participant with this gid is already known.
    #[error("participant {0} already exists")]
    DuplicateParticipant(Gid),
    /// No participant with this gid is known.
    #[error("participant {0} not found")]
    UnknownParticipant(Gid),
    /// The participant already hosts a node with this namespace and name.
    #[error("node {node} already exists in participant {participant}")]
    DuplicateNode {
        /// Owning participant.
        participant: Gid,
        /// Node namespace and name.
        node: NodeName,
    },
    /// The participant hosts no node with this namespace and name.
    #[error("node {node} not found in participant {participant}")]
    UnknownNode {
        /// Owning participant.
        participant: Gid,
        /// Node namespace and name.
        node: NodeName,
    },
    /// A participant snapshot lists the same node more than once.
    #[error("snapshot lists node {node} more than once")]
    DuplicateSnapshotNode {
        /// Node namespace and name.
        node: NodeName,
    },
    /// A gid was built from a byte slice of the wrong length.
    #[error("invalid gid length {len}, expected {}", crate::gid::GID_STORAGE_SIZE)]
    InvalidGidLength {
        /// Length that was supplied.
        len: usize,
    },
}
