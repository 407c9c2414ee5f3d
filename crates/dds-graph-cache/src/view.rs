// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Topic views computed on demand from the entity table.
//!
//! Nothing here is stored; demanglers are per-call parameters.

use std::collections::{BTreeMap, BTreeSet};

use crate::cache::GraphCache;
use crate::demangle::Demangle;
use crate::entity::{EndpointKind, EndpointRecord};
use crate::gid::Gid;
use crate::node::NodeName;

/// Demangled topic name -> sorted, deduplicated demangled type names.
pub type NamesAndTypes = BTreeMap<String, BTreeSet<String>>;

/// Node name reported for endpoints not associated with any node.
pub const NODE_NAME_UNKNOWN: &str = "_NODE_NAME_UNKNOWN_";
/// Node namespace reported for endpoints not associated with any node.
pub const NODE_NAMESPACE_UNKNOWN: &str = "_NODE_NAMESPACE_UNKNOWN_";

/// One endpoint on a topic, with the node it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicEndpointInfo {
    /// Owning node name, or [`NODE_NAME_UNKNOWN`].
    pub node_name: String,
    /// Owning node namespace, or [`NODE_NAMESPACE_UNKNOWN`].
    pub node_namespace: String,
    /// Demangled type name.
    pub topic_type: String,
    /// Reader or writer.
    pub kind: EndpointKind,
    /// Endpoint identifier.
    pub gid: Gid,
}

fn collect_names_and_types<'a, T, Y>(
    endpoints: impl Iterator<Item = &'a EndpointRecord>,
    demangle_topic: &T,
    demangle_type: &Y,
) -> NamesAndTypes
where
    T: Demangle + ?Sized,
    Y: Demangle + ?Sized,
{
    let mut out = NamesAndTypes::new();
    for endpoint in endpoints {
        let topic = demangle_topic.demangle(&endpoint.topic_name);
        if topic.is_empty() {
            continue;
        }
        let ty = demangle_type.demangle(&endpoint.type_name);
        out.entry(topic).or_default().insert(ty);
    }
    out
}

impl GraphCache {
    /// Every visible topic with the set of types carried on it.
    pub fn get_names_and_types<T, Y>(&self, demangle_topic: &T, demangle_type: &Y) -> NamesAndTypes
    where
        T: Demangle + ?Sized,
        Y: Demangle + ?Sized,
    {
        collect_names_and_types(self.entities.iter(), demangle_topic, demangle_type)
    }

    /// Topics and types read by node `namespace/name`. Empty if no such node.
    pub fn get_reader_names_and_types_by_node<T, Y>(
        &self,
        node_name: &str,
        node_namespace: &str,
        demangle_topic: &T,
        demangle_type: &Y,
    ) -> NamesAndTypes
    where
        T: Demangle + ?Sized,
        Y: Demangle + ?Sized,
    {
        self.names_and_types_by_node(
            EndpointKind::Reader,
            &NodeName::new(node_namespace, node_name),
            demangle_topic,
            demangle_type,
        )
    }

    /// Topics and types written by node `namespace/name`. Empty if no such node.
    pub fn get_writer_names_and_types_by_node<T, Y>(
        &self,
        node_name: &str,
        node_namespace: &str,
        demangle_topic: &T,
        demangle_type: &Y,
    ) -> NamesAndTypes
    where
        T: Demangle + ?Sized,
        Y: Demangle + ?Sized,
    {
        self.names_and_types_by_node(
            EndpointKind::Writer,
            &NodeName::new(node_namespace, node_name),
            demangle_topic,
            demangle_type,
        )
    }

    // Nodes sharing a name across participants are merged.
    fn names_and_types_by_node<T, Y>(
        &self,
        kind: EndpointKind,
        node: &NodeName,
        demangle_topic: &T,
        demangle_type: &Y,
    ) -> NamesAndTypes
    where
        T: Demangle + ?Sized,
        Y: Demangle + ?Sized,
    {
        let endpoints = self
            .nodes
            .matching(node)
            .flat_map(|record| record.endpoints(kind).iter())
            .filter_map(|gid| self.entities.get(gid, kind));
        collect_names_and_types(endpoints, demangle_topic, demangle_type)
    }

    /// Readers whose raw topic name is `topic_name`, in gid order.
    pub fn get_readers_info_by_topic<Y>(
        &self,
        topic_name: &str,
        demangle_type: &Y,
    ) -> Vec<TopicEndpointInfo>
    where
        Y: Demangle + ?Sized,
    {
        self.info_by_topic(EndpointKind::Reader, topic_name, demangle_type)
    }

    /// Writers whose raw topic name is `topic_name`, in gid order.
    pub fn get_writers_info_by_topic<Y>(
        &self,
        topic_name: &str,
        demangle_type: &Y,
    ) -> Vec<TopicEndpointInfo>
    where
        Y: Demangle + ?Sized,
    {
        self.info_by_topic(EndpointKind::Writer, topic_name, demangle_type)
    }

    fn info_by_topic<Y>(
        &self,
        kind: EndpointKind,
        topic_name: &str,
        demangle_type: &Y,
    ) -> Vec<TopicEndpointInfo>
    where
        Y: Demangle + ?Sized,
    {
        self.entities
            .iter_kind(kind)
            .filter(|endpoint| endpoint.topic_name == topic_name)
            .map(|endpoint| {
                let owner = endpoint.node.and_then(|key| self.nodes.get(key));
                let node_name = owner.map_or(NODE_NAME_UNKNOWN, |node| node.name.name.as_str());
                let node_namespace =
                    owner.map_or(NODE_NAMESPACE_UNKNOWN, |node| node.name.namespace.as_str());
                TopicEndpointInfo {
                    node_name: node_name.to_owned(),
                    node_namespace: node_namespace.to_owned(),
                    topic_type: demangle_type.demangle(&endpoint.type_name),
                    kind,
                    gid: endpoint.gid,
                }
            })
            .collect()
    }
}
