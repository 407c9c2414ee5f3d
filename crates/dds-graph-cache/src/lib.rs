// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Discovery graph cache for DDS-style publish/subscribe middleware.
//!
//! [`GraphCache`] tracks which participants exist, which nodes they host,
//! which endpoints (readers/writers) live on which topics, and how endpoints
//! attach to nodes. Discovery events feed the mutators; peers exchange
//! [`ParticipantSnapshot`]s which [`GraphCache::update_participant_entities`]
//! reconciles. Topic catalogs are computed per query with caller-supplied
//! [`Demangle`] implementations.
//!
//! The cache is synchronous and does no locking; wrap it in the caller's
//! mutex when shared.

mod cache;
pub mod demangle;
mod entity;
mod error;
mod gid;
mod node;
pub mod prefs;
mod reconcile;
mod snapshot;
mod view;

pub use cache::GraphCache;
pub use demangle::{DdsTypeDemangler, Demangle, Identity, TopicPrefixDemangler};
pub use entity::{EndpointKind, EndpointRecord};
pub use error::GraphError;
pub use gid::{Gid, GID_STORAGE_SIZE};
pub use node::NodeName;
pub use prefs::CachePrefs;
pub use reconcile::ReconcileSummary;
pub use snapshot::{CodecError, Hash32, NodeEntities, ParticipantSnapshot};
pub use view::{NamesAndTypes, TopicEndpointInfo, NODE_NAMESPACE_UNKNOWN, NODE_NAME_UNKNOWN};
