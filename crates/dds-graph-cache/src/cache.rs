// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The graph cache: entity table, participant/node index and association layer.
//!
//! # Invariants
//!
//! - An endpoint's node link, when set, names a live node whose matching-kind
//!   set contains the endpoint's gid, and vice versa.
//! - Removing a node detaches every endpoint pointing at it; the endpoints
//!   themselves stay in the entity table.
//! - Removing an endpoint drops its gid from its node.
//! - A pending association always names a live node and a gid that is not in
//!   the entity table for that kind.
//! - Every mutator either succeeds or leaves the cache untouched.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};

use crate::entity::{EndpointKind, EndpointRecord, EntityTable};
use crate::error::GraphError;
use crate::gid::Gid;
use crate::node::{NodeArena, NodeKey, NodeName, NodeRecord, ParticipantRecord};
use crate::prefs::CachePrefs;
use crate::snapshot::{NodeEntities, ParticipantSnapshot};

type ChangeCallback = Box<dyn FnMut() + Send>;

/// In-memory cache of the discovered middleware graph.
///
/// The cache does no locking of its own; callers serialize access.
#[derive(Default)]
pub struct GraphCache {
    pub(crate) entities: EntityTable,
    pub(crate) participants: BTreeMap<Gid, ParticipantRecord>,
    pub(crate) nodes: NodeArena,
    /// Snapshot-listed associations waiting for their endpoint to be discovered.
    pub(crate) pending: BTreeMap<(EndpointKind, Gid), NodeKey>,
    pub(crate) prefs: CachePrefs,
    on_change: Option<ChangeCallback>,
}

impl fmt::Debug for GraphCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphCache")
            .field("entities", &self.entities)
            .field("participants", &self.participants)
            .field("nodes", &self.nodes)
            .field("pending", &self.pending)
            .field("prefs", &self.prefs)
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}

impl GraphCache {
    /// Empty cache with default preferences.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty cache using `prefs`.
    pub fn with_prefs(prefs: CachePrefs) -> Self {
        Self {
            prefs,
            ..Self::default()
        }
    }

    /// Preferences in effect.
    pub fn prefs(&self) -> &CachePrefs {
        &self.prefs
    }

    /// Register a callback run after every mutation that changed the cache.
    pub fn set_on_change_callback<F>(&mut self, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.on_change = Some(Box::new(callback));
    }

    /// Remove the change callback, if any.
    pub fn clear_on_change_callback(&mut self) {
        self.on_change = None;
    }

    pub(crate) fn notify(&mut self) {
        if let Some(callback) = self.on_change.as_mut() {
            callback();
        }
    }

    // --- Entity table -------------------------------------------------------

    /// Record a newly discovered endpoint.
    ///
    /// If a peer snapshot already listed this endpoint under one of its nodes,
    /// the deferred association is applied now.
    pub fn add_entity(
        &mut self,
        gid: Gid,
        topic_name: impl Into<String>,
        type_name: impl Into<String>,
        kind: EndpointKind,
    ) -> Result<(), GraphError> {
        let record = self
            .entities
            .insert(gid, topic_name.into(), type_name.into(), kind)
            .inspect_err(|err| warn!(%err, "add_entity rejected"))?;
        debug!(%gid, %kind, topic = %record.topic_name, ty = %record.type_name, "endpoint added");

        if let Some(key) = self.pending.remove(&(kind, gid)) {
            if self.attach(gid, kind, key) {
                debug!(%gid, %kind, "deferred association applied");
            }
        }
        self.notify();
        Ok(())
    }

    /// Forget an endpoint, detaching it from its node.
    pub fn remove_entity(&mut self, gid: &Gid, kind: EndpointKind) -> Result<(), GraphError> {
        let record = self
            .entities
            .remove(gid, kind)
            .inspect_err(|err| warn!(%err, "remove_entity rejected"))?;
        if let Some(node) = record.node.and_then(|key| self.nodes.get_mut(key)) {
            node.endpoints_mut(kind).remove(gid);
        }
        debug!(%gid, %kind, topic = %record.topic_name, "endpoint removed");
        self.notify();
        Ok(())
    }

    /// Look up an endpoint by gid and kind.
    pub fn endpoint(&self, gid: &Gid, kind: EndpointKind) -> Option<&EndpointRecord> {
        self.entities.get(gid, kind)
    }

    /// Number of readers whose raw topic name equals `topic_name`.
    pub fn get_reader_count(&self, topic_name: &str) -> usize {
        self.entities
            .count_on_topic(topic_name, EndpointKind::Reader)
    }

    /// Number of writers whose raw topic name equals `topic_name`.
    pub fn get_writer_count(&self, topic_name: &str) -> usize {
        self.entities
            .count_on_topic(topic_name, EndpointKind::Writer)
    }

    // --- Participants and nodes --------------------------------------------

    /// Register a participant with no nodes and an empty enclave.
    pub fn add_participant(&mut self, gid: Gid) -> Result<(), GraphError> {
        self.add_participant_with_enclave(gid, String::new())
    }

    /// Register a participant belonging to `enclave`.
    pub fn add_participant_with_enclave(
        &mut self,
        gid: Gid,
        enclave: impl Into<String>,
    ) -> Result<(), GraphError> {
        if self.participants.contains_key(&gid) {
            let err = GraphError::DuplicateParticipant(gid);
            warn!(%err, "add_participant rejected");
            return Err(err);
        }
        let enclave = enclave.into();
        debug!(%gid, %enclave, "participant added");
        self.participants.insert(
            gid,
            ParticipantRecord {
                enclave,
                nodes: Vec::new(),
            },
        );
        self.notify();
        Ok(())
    }

    /// Forget a participant. Nodes it still hosts are removed with it; their
    /// endpoints stay known but lose the association.
    pub fn remove_participant(&mut self, gid: &Gid) -> Result<(), GraphError> {
        let participant = self.participants.remove(gid).ok_or_else(|| {
            let err = GraphError::UnknownParticipant(*gid);
            warn!(%err, "remove_participant rejected");
            err
        })?;
        for key in participant.nodes {
            if let Some(node) = self.detach_node(key) {
                debug!(participant = %gid, node = %node.name, "node removed with participant");
            }
        }
        debug!(%gid, "participant removed");
        self.notify();
        Ok(())
    }

    /// Create node `namespace/name` under `participant` and return the
    /// participant's full snapshot.
    pub fn add_node(
        &mut self,
        participant: &Gid,
        name: &str,
        namespace: &str,
    ) -> Result<ParticipantSnapshot, GraphError> {
        let node_name = NodeName::new(namespace, name);
        if !self.participants.contains_key(participant) {
            let err = GraphError::UnknownParticipant(*participant);
            warn!(%err, node = %node_name, "add_node rejected");
            return Err(err);
        }
        if self.nodes.find(participant, &node_name).is_some() {
            let err = GraphError::DuplicateNode {
                participant: *participant,
                node: node_name,
            };
            warn!(%err, "add_node rejected");
            return Err(err);
        }
        self.insert_node(*participant, node_name);
        self.notify();
        self.participant_snapshot(participant)
            .ok_or(GraphError::UnknownParticipant(*participant))
    }

    /// Remove node `namespace/name` from `participant` and return the
    /// participant's full snapshot afterwards.
    pub fn remove_node(
        &mut self,
        participant: &Gid,
        name: &str,
        namespace: &str,
    ) -> Result<ParticipantSnapshot, GraphError> {
        let node_name = NodeName::new(namespace, name);
        let key = self.lookup_node(participant, node_name)?;
        self.remove_node_by_key(participant, key);
        self.notify();
        self.participant_snapshot(participant)
            .ok_or(GraphError::UnknownParticipant(*participant))
    }

    /// Names of every known node, sorted by `(namespace, name)`.
    ///
    /// Returns `(names, namespaces)` as parallel vectors.
    pub fn get_node_names(&self) -> (Vec<String>, Vec<String>) {
        self.nodes
            .iter_sorted()
            .map(|node| (node.name.name.clone(), node.name.namespace.clone()))
            .unzip()
    }

    /// Like [`get_node_names`](Self::get_node_names), plus each node's enclave.
    pub fn get_node_names_with_enclaves(&self) -> (Vec<String>, Vec<String>, Vec<String>) {
        let mut names = Vec::with_capacity(self.nodes.len());
        let mut namespaces = Vec::with_capacity(self.nodes.len());
        let mut enclaves = Vec::with_capacity(self.nodes.len());
        for node in self.nodes.iter_sorted() {
            names.push(node.name.name.clone());
            namespaces.push(node.name.namespace.clone());
            enclaves.push(
                self.participants
                    .get(&node.participant)
                    .map(|p| p.enclave.clone())
                    .unwrap_or_default(),
            );
        }
        (names, namespaces, enclaves)
    }

    /// Number of known nodes across all participants.
    pub fn get_number_of_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Full snapshot of a participant, or `None` if it is unknown.
    ///
    /// Nodes come back in creation order; each node's readers and writers
    /// come back in gid order, whatever order they were listed or associated in.
    pub fn participant_snapshot(&self, gid: &Gid) -> Option<ParticipantSnapshot> {
        let participant = self.participants.get(gid)?;
        let nodes = participant
            .nodes
            .iter()
            .filter_map(|key| self.nodes.get(*key))
            .map(|node| NodeEntities {
                namespace: node.name.namespace.clone(),
                name: node.name.name.clone(),
                readers: node.readers.iter().copied().collect(),
                writers: node.writers.iter().copied().collect(),
            })
            .collect();
        Some(ParticipantSnapshot { gid: *gid, nodes })
    }

    // --- Associations -------------------------------------------------------

    /// Attach a reader to a node, replacing any previous association.
    pub fn associate_reader(
        &mut self,
        gid: &Gid,
        participant: &Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<(), GraphError> {
        self.associate(
            EndpointKind::Reader,
            gid,
            participant,
            node_name,
            node_namespace,
        )
    }

    /// Attach a writer to a node, replacing any previous association.
    pub fn associate_writer(
        &mut self,
        gid: &Gid,
        participant: &Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<(), GraphError> {
        self.associate(
            EndpointKind::Writer,
            gid,
            participant,
            node_name,
            node_namespace,
        )
    }

    /// Detach a reader from a node.
    pub fn dissociate_reader(
        &mut self,
        gid: &Gid,
        participant: &Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<(), GraphError> {
        self.dissociate(
            EndpointKind::Reader,
            gid,
            participant,
            node_name,
            node_namespace,
        )
    }

    /// Detach a writer from a node.
    pub fn dissociate_writer(
        &mut self,
        gid: &Gid,
        participant: &Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<(), GraphError> {
        self.dissociate(
            EndpointKind::Writer,
            gid,
            participant,
            node_name,
            node_namespace,
        )
    }

    /// Attach an endpoint of `kind` to a node.
    ///
    /// Fails without changes when the endpoint or the node is unknown.
    pub fn associate(
        &mut self,
        kind: EndpointKind,
        gid: &Gid,
        participant: &Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<(), GraphError> {
        let key = self.lookup_node(participant, NodeName::new(node_namespace, node_name))?;
        if !self.entities.contains(gid, kind) {
            let err = GraphError::UnknownEndpoint { gid: *gid, kind };
            warn!(%err, "associate rejected");
            return Err(err);
        }
        if self.attach(*gid, kind, key) {
            debug!(%gid, %kind, %participant, node_namespace, node_name, "endpoint associated");
            self.notify();
        }
        Ok(())
    }

    /// Detach an endpoint of `kind` from a node.
    ///
    /// Succeeds without changes when the endpoint is not associated with that
    /// node; fails when the endpoint or the node is unknown.
    pub fn dissociate(
        &mut self,
        kind: EndpointKind,
        gid: &Gid,
        participant: &Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<(), GraphError> {
        let key = self.lookup_node(participant, NodeName::new(node_namespace, node_name))?;
        if !self.entities.contains(gid, kind) {
            let err = GraphError::UnknownEndpoint { gid: *gid, kind };
            warn!(%err, "dissociate rejected");
            return Err(err);
        }
        if self.detach_endpoint(*gid, kind, key) {
            debug!(%gid, %kind, %participant, node_namespace, node_name, "endpoint dissociated");
            self.notify();
        }
        Ok(())
    }

    // --- Internals ----------------------------------------------------------

    fn lookup_node(&self, participant: &Gid, node: NodeName) -> Result<NodeKey, GraphError> {
        if !self.participants.contains_key(participant) {
            let err = GraphError::UnknownParticipant(*participant);
            warn!(%err, %node, "node lookup failed");
            return Err(err);
        }
        self.nodes.find(participant, &node).ok_or_else(|| {
            let err = GraphError::UnknownNode {
                participant: *participant,
                node,
            };
            warn!(%err, "node lookup failed");
            err
        })
    }

    /// Create a node and append it to its participant. The participant must exist.
    pub(crate) fn insert_node(&mut self, participant: Gid, name: NodeName) -> NodeKey {
        debug!(%participant, node = %name, "node added");
        let key = self.nodes.insert(participant, name);
        if let Some(record) = self.participants.get_mut(&participant) {
            record.nodes.push(key);
        }
        key
    }

    pub(crate) fn remove_node_by_key(&mut self, participant: &Gid, key: NodeKey) {
        if let Some(record) = self.participants.get_mut(participant) {
            record.nodes.retain(|k| *k != key);
        }
        if let Some(node) = self.detach_node(key) {
            debug!(%participant, node = %node.name, "node removed");
        }
    }

    /// Drop a node from the arena, clearing every endpoint link and pending
    /// association that names it. The owning participant's list is left to the caller.
    fn detach_node(&mut self, key: NodeKey) -> Option<NodeRecord> {
        let node = self.nodes.remove(key)?;
        for kind in [EndpointKind::Reader, EndpointKind::Writer] {
            for gid in node.endpoints(kind) {
                if let Some(record) = self.entities.get_mut(gid, kind) {
                    record.node = None;
                }
            }
        }
        self.pending.retain(|_, pending| *pending != key);
        Some(node)
    }

    /// Link a known endpoint to a node. Returns `false` if it was already linked there.
    pub(crate) fn attach(&mut self, gid: Gid, kind: EndpointKind, key: NodeKey) -> bool {
        if self.nodes.get(key).is_none() {
            return false;
        }
        let Some(record) = self.entities.get_mut(&gid, kind) else {
            return false;
        };
        let previous = record.node.replace(key);
        if previous == Some(key) {
            return false;
        }
        if let Some(old) = previous.and_then(|old| self.nodes.get_mut(old)) {
            old.endpoints_mut(kind).remove(&gid);
        }
        if let Some(node) = self.nodes.get_mut(key) {
            node.endpoints_mut(kind).insert(gid);
        }
        true
    }

    /// Unlink an endpoint from a node. Returns `false` if it was not linked there.
    pub(crate) fn detach_endpoint(&mut self, gid: Gid, kind: EndpointKind, key: NodeKey) -> bool {
        let Some(record) = self.entities.get_mut(&gid, kind) else {
            return false;
        };
        if record.node != Some(key) {
            return false;
        }
        record.node = None;
        if let Some(node) = self.nodes.get_mut(key) {
            node.endpoints_mut(kind).remove(&gid);
        }
        true
    }
}

impl fmt::Display for GraphCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Participants:")?;
        for (gid, participant) in &self.participants {
            writeln!(f, "  gid: {gid}")?;
            writeln!(f, "  enclave: {}", participant.enclave)?;
            writeln!(f, "  nodes:")?;
            for node in participant
                .nodes
                .iter()
                .filter_map(|key| self.nodes.get(*key))
            {
                writeln!(f, "    {}", node.name)?;
                for gid in &node.readers {
                    writeln!(f, "      reader: {gid}")?;
                }
                for gid in &node.writers {
                    writeln!(f, "      writer: {gid}")?;
                }
            }
        }
        writeln!(f, "Endpoints ({}):", self.entities.len())?;
        for endpoint in self.entities.iter() {
            writeln!(
                f,
                "  {} {}: topic={} type={}",
                endpoint.kind, endpoint.gid, endpoint.topic_name, endpoint.type_name
            )?;
        }
        Ok(())
    }
}
