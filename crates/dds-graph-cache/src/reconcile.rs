// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Merging a peer's self-reported state into the cache.
//!
//! A [`ParticipantSnapshot`] is authoritative for the participant it names:
//! after [`GraphCache::update_participant_entities`] the participant hosts
//! exactly the snapshot's nodes, and each node is associated with exactly the
//! listed endpoints that the cache knows about. Listed endpoints that are not
//! known yet are parked as pending associations (see
//! [`ReconcilePrefs`](crate::prefs::ReconcilePrefs)).
//!
//! Only the difference between current state and snapshot is applied, so
//! applying the same snapshot twice changes nothing the second time. An
//! endpoint listed under several nodes of one snapshot goes to the first of them.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::cache::GraphCache;
use crate::entity::EndpointKind;
use crate::error::GraphError;
use crate::gid::Gid;
use crate::node::{NodeKey, NodeName, ParticipantRecord};
use crate::snapshot::{NodeEntities, ParticipantSnapshot};

/// Changes applied by one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileSummary {
    /// The participant was unknown and has been created.
    pub participant_created: bool,
    /// Nodes created from the snapshot.
    pub nodes_added: usize,
    /// Nodes the snapshot no longer lists.
    pub nodes_removed: usize,
    /// Endpoints newly associated.
    pub associations_added: usize,
    /// Endpoints no longer associated.
    pub associations_removed: usize,
    /// Associations parked until their endpoint is discovered.
    pub deferred: usize,
}

impl ReconcileSummary {
    /// Returns `true` when the snapshot already matched the cache.
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

impl GraphCache {
    /// Converge the participant named by `snapshot` to exactly its content.
    ///
    /// Unknown participants are created. Nodes absent from the snapshot are
    /// removed (an empty node list removes them all). Validation happens
    /// before any mutation, so an error leaves the cache unchanged.
    pub fn update_participant_entities(
        &mut self,
        snapshot: &ParticipantSnapshot,
    ) -> Result<ReconcileSummary, GraphError> {
        let wanted = index_snapshot(snapshot)?;
        let owners = first_listing_owners(snapshot);
        let participant = snapshot.gid;
        let mut summary = ReconcileSummary::default();

        if let Entry::Vacant(slot) = self.participants.entry(participant) {
            slot.insert(ParticipantRecord::default());
            summary.participant_created = true;
        }

        let stale: Vec<NodeKey> = self
            .participants
            .get(&participant)
            .map(|record| {
                record
                    .nodes
                    .iter()
                    .copied()
                    .filter(|key| {
                        self.nodes
                            .get(*key)
                            .is_none_or(|node| !wanted.contains_key(&node.name))
                    })
                    .collect()
            })
            .unwrap_or_default();
        for key in stale {
            self.remove_node_by_key(&participant, key);
            summary.nodes_removed += 1;
        }

        for entry in &snapshot.nodes {
            let name = entry.node_name();
            let key = if let Some(key) = self.nodes.find(&participant, &name) {
                key
            } else {
                summary.nodes_added += 1;
                self.insert_node(participant, name.clone())
            };
            for (kind, listed) in [
                (EndpointKind::Reader, &entry.readers),
                (EndpointKind::Writer, &entry.writers),
            ] {
                let owned: BTreeSet<Gid> = listed
                    .iter()
                    .copied()
                    .filter(|gid| owners.get(&(kind, *gid)) == Some(&name))
                    .collect();
                self.reconcile_endpoints(key, kind, &owned, &mut summary);
            }
        }

        debug!(
            %participant,
            digest = %hex::encode(snapshot.digest()),
            ?summary,
            "participant entities reconciled"
        );
        if !summary.is_noop() {
            self.notify();
        }
        Ok(summary)
    }

    fn reconcile_endpoints(
        &mut self,
        key: NodeKey,
        kind: EndpointKind,
        wanted: &BTreeSet<Gid>,
        summary: &mut ReconcileSummary,
    ) {
        let current: BTreeSet<Gid> = self
            .nodes
            .get(key)
            .map(|node| node.endpoints(kind).clone())
            .unwrap_or_default();

        for gid in current.difference(wanted) {
            if self.detach_endpoint(*gid, kind, key) {
                summary.associations_removed += 1;
            }
        }

        self.pending.retain(|&(k, gid), node| {
            k != kind || *node != key || wanted.contains(&gid)
        });

        for gid in wanted.difference(&current) {
            if self.entities.contains(gid, kind) {
                if self.attach(*gid, kind, key) {
                    summary.associations_added += 1;
                }
            } else if self.prefs.reconcile.defer_unknown_endpoints
                && self.pending.insert((kind, *gid), key) != Some(key)
            {
                debug!(%gid, %kind, "association deferred until endpoint is discovered");
                summary.deferred += 1;
            }
        }
    }

    /// Number of associations waiting for their endpoint to be discovered.
    pub fn pending_associations(&self) -> usize {
        self.pending.len()
    }
}

fn index_snapshot(
    snapshot: &ParticipantSnapshot,
) -> Result<BTreeMap<NodeName, &NodeEntities>, GraphError> {
    let mut wanted = BTreeMap::new();
    for entry in &snapshot.nodes {
        let name = entry.node_name();
        if wanted.contains_key(&name) {
            return Err(GraphError::DuplicateSnapshotNode { node: name });
        }
        wanted.insert(name, entry);
    }
    Ok(wanted)
}

fn first_listing_owners(
    snapshot: &ParticipantSnapshot,
) -> BTreeMap<(EndpointKind, Gid), NodeName> {
    let mut owners = BTreeMap::new();
    for entry in &snapshot.nodes {
        let listed = entry
            .readers
            .iter()
            .map(|gid| (EndpointKind::Reader, *gid))
            .chain(entry.writers.iter().map(|gid| (EndpointKind::Writer, *gid)));
        for key in listed {
            owners.entry(key).or_insert_with(|| entry.node_name());
        }
    }
    owners
}
