// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]
use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;

use dds_graph_cache::{
    EndpointKind, Gid, GraphCache, Identity, NamesAndTypes, NodeEntities, ParticipantSnapshot,
};

const NAMESPACES: [&str; 2] = ["ns1", "ns2"];
const NAMES: [&str; 3] = ["node1", "node2", "node3"];
const TOPICS: [&str; 3] = ["topic1", "topic2", "topic3"];
const TYPES: [&str; 3] = ["Str", "Int", "Bool"];

fn gid(label: &str) -> Gid {
    Gid::from_prefix(label.as_bytes()).expect("label fits in a gid")
}

fn endpoint_gid(kind: EndpointKind, index: u8) -> Gid {
    let prefix = match kind {
        EndpointKind::Reader => "reader",
        EndpointKind::Writer => "writer",
    };
    gid(&format!("{prefix}{index}"))
}

fn reader_gid(index: u8) -> Gid {
    endpoint_gid(EndpointKind::Reader, index)
}

fn writer_gid(index: u8) -> Gid {
    endpoint_gid(EndpointKind::Writer, index)
}

/// Observable state used to compare caches.
#[derive(Debug, PartialEq, Eq)]
struct Observed {
    node_names: (Vec<String>, Vec<String>),
    node_count: usize,
    topics: NamesAndTypes,
    per_node: BTreeMap<(String, String), (NamesAndTypes, NamesAndTypes)>,
    counts: Vec<(usize, usize)>,
}

fn observe(cache: &GraphCache) -> Observed {
    let mut per_node = BTreeMap::new();
    for namespace in NAMESPACES {
        for name in NAMES {
            per_node.insert(
                (namespace.to_owned(), name.to_owned()),
                (
                    cache.get_reader_names_and_types_by_node(name, namespace, &Identity, &Identity),
                    cache.get_writer_names_and_types_by_node(name, namespace, &Identity, &Identity),
                ),
            );
        }
    }
    Observed {
        node_names: cache.get_node_names(),
        node_count: cache.get_number_of_nodes(),
        topics: cache.get_names_and_types(&Identity, &Identity),
        per_node,
        counts: TOPICS
            .iter()
            .map(|t| (cache.get_reader_count(t), cache.get_writer_count(t)))
            .collect(),
    }
}

/// (kind, index, topic, type)
fn endpoints_strategy() -> impl Strategy<Value = Vec<(EndpointKind, u8, usize, usize)>> {
    prop::collection::vec(
        (
            prop_oneof![Just(EndpointKind::Reader), Just(EndpointKind::Writer)],
            0u8..8,
            0..TOPICS.len(),
            0..TYPES.len(),
        ),
        0..16,
    )
}

fn snapshot_strategy(participant: &'static str) -> impl Strategy<Value = ParticipantSnapshot> {
    let node = (
        0..NAMESPACES.len(),
        0..NAMES.len(),
        prop::collection::btree_set(0u8..10, 0..4),
        prop::collection::btree_set(0u8..10, 0..4),
    );
    prop::collection::vec(node, 0..5).prop_map(move |nodes| {
        let mut seen = BTreeSet::new();
        let mut snapshot = ParticipantSnapshot::new(gid(participant));
        for (ns, name, readers, writers) in nodes {
            if !seen.insert((ns, name)) {
                continue;
            }
            snapshot = snapshot.with_node(
                NodeEntities::new(NAMESPACES[ns], NAMES[name])
                    .with_readers(readers.into_iter().map(reader_gid))
                    .with_writers(writers.into_iter().map(writer_gid)),
            );
        }
        snapshot
    })
}

fn populate(cache: &mut GraphCache, endpoints: &[(EndpointKind, u8, usize, usize)]) {
    for (kind, index, topic, ty) in endpoints {
        // Duplicates in the generated list are expected and rejected.
        let gid = endpoint_gid(*kind, *index);
        let _ = cache.add_entity(gid, TOPICS[*topic], TYPES[*ty], *kind);
    }
}

proptest! {
    #[test]
    fn reconciliation_is_idempotent(
        endpoints in endpoints_strategy(),
        first in snapshot_strategy("remote"),
        second in snapshot_strategy("remote"),
    ) {
        let mut cache = GraphCache::new();
        populate(&mut cache, &endpoints);

        cache.update_participant_entities(&first).unwrap();
        cache.update_participant_entities(&second).unwrap();
        let before = observe(&cache);
        let pending = cache.pending_associations();

        let again = cache.update_participant_entities(&second).unwrap();
        prop_assert!(again.is_noop(), "{:?}", again);
        prop_assert_eq!(observe(&cache), before);
        prop_assert_eq!(cache.pending_associations(), pending);
    }

    #[test]
    fn reconciled_participant_matches_known_part_of_snapshot(
        endpoints in endpoints_strategy(),
        snapshot in snapshot_strategy("remote"),
    ) {
        let mut cache = GraphCache::new();
        populate(&mut cache, &endpoints);
        cache.update_participant_entities(&snapshot).unwrap();

        let stored = cache.participant_snapshot(&gid("remote")).unwrap();
        prop_assert_eq!(stored.nodes.len(), snapshot.nodes.len());
        // An endpoint listed under several nodes belongs to the first listing.
        let mut claimed = BTreeSet::new();
        for (have, want) in stored.nodes.iter().zip(&snapshot.nodes) {
            prop_assert_eq!(&have.namespace, &want.namespace);
            prop_assert_eq!(&have.name, &want.name);
            let known_readers: Vec<Gid> = want
                .readers
                .iter()
                .copied()
                .filter(|g| cache.endpoint(g, EndpointKind::Reader).is_some())
                .filter(|g| claimed.insert((EndpointKind::Reader, *g)))
                .collect();
            let known_writers: Vec<Gid> = want
                .writers
                .iter()
                .copied()
                .filter(|g| cache.endpoint(g, EndpointKind::Writer).is_some())
                .filter(|g| claimed.insert((EndpointKind::Writer, *g)))
                .collect();
            prop_assert_eq!(&have.readers, &known_readers);
            prop_assert_eq!(&have.writers, &known_writers);
        }
    }

    #[test]
    fn associate_then_dissociate_round_trips(
        endpoints in endpoints_strategy(),
        index in 0u8..8,
        is_reader in any::<bool>(),
    ) {
        let mut cache = GraphCache::new();
        let p = gid("participant1");
        cache.add_participant(p).unwrap();
        cache.add_node(&p, "node1", "ns1").unwrap();
        populate(&mut cache, &endpoints);

        let kind = EndpointKind::from_is_reader(is_reader);
        let target = endpoint_gid(kind, index);
        prop_assume!(cache.endpoint(&target, kind).is_some());

        let before = cache.participant_snapshot(&p).unwrap();
        cache.associate(kind, &target, &p, "node1", "ns1").unwrap();
        prop_assert_ne!(&cache.participant_snapshot(&p).unwrap(), &before);
        cache.dissociate(kind, &target, &p, "node1", "ns1").unwrap();
        prop_assert_eq!(cache.participant_snapshot(&p).unwrap(), before);
    }

    #[test]
    fn topic_counts_track_live_endpoints(
        endpoints in endpoints_strategy(),
        removals in prop::collection::vec((any::<bool>(), 0u8..8), 0..8),
    ) {
        let mut cache = GraphCache::new();
        let mut live: BTreeMap<(EndpointKind, Gid), &str> = BTreeMap::new();
        for (kind, index, topic, ty) in &endpoints {
            let gid = endpoint_gid(*kind, *index);
            let added = cache.add_entity(gid, TOPICS[*topic], TYPES[*ty], *kind);
            if added.is_ok() {
                live.insert((*kind, gid), TOPICS[*topic]);
            }
        }
        for (is_reader, index) in removals {
            let kind = EndpointKind::from_is_reader(is_reader);
            let gid = endpoint_gid(kind, index);
            let removed = cache.remove_entity(&gid, kind).is_ok();
            prop_assert_eq!(removed, live.remove(&(kind, gid)).is_some());
        }
        for topic in TOPICS {
            let expected = live.values().filter(|t| **t == topic).count();
            prop_assert_eq!(
                cache.get_reader_count(topic) + cache.get_writer_count(topic),
                expected
            );
        }
    }

    #[test]
    fn full_teardown_matches_fresh_cache(
        endpoints in endpoints_strategy(),
        snapshot in snapshot_strategy("remote"),
    ) {
        let mut cache = GraphCache::new();
        let local = gid("local");
        cache.add_participant(local).unwrap();
        cache.add_node(&local, "node1", "ns1").unwrap();
        populate(&mut cache, &endpoints);
        cache.update_participant_entities(&snapshot).unwrap();

        cache.remove_node(&local, "node1", "ns1").unwrap();
        cache.remove_participant(&local).unwrap();
        cache
            .update_participant_entities(&ParticipantSnapshot::new(gid("remote")))
            .unwrap();
        cache.remove_participant(&gid("remote")).unwrap();
        for (kind, index, _, _) in &endpoints {
            let _ = cache.remove_entity(&endpoint_gid(*kind, *index), *kind);
        }

        prop_assert_eq!(observe(&cache), observe(&GraphCache::new()));
        prop_assert_eq!(cache.pending_associations(), 0);
    }
}
