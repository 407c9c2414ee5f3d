// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Loading cache preferences and building a configured cache from them.

use dds_graph_cache::{CachePrefs, GraphCache, TopicPrefixDemangler};
use tracing::{debug, warn};

use crate::config::{ConfigService, ConfigStore};

/// Config key holding [`CachePrefs`].
pub const CACHE_PREFS_KEY: &str = "graph_cache";

/// Load [`CachePrefs`], falling back to defaults when missing or unreadable.
///
/// Decode and I/O failures are logged rather than returned; a host should
/// still come up with a working cache when its config file is damaged.
pub fn load_cache_prefs<S: ConfigStore>(svc: &ConfigService<S>) -> CachePrefs {
    match svc.load::<CachePrefs>(CACHE_PREFS_KEY) {
        Ok(Some(prefs)) => prefs,
        Ok(None) => {
            debug!(
                key = CACHE_PREFS_KEY,
                "no cache prefs stored; using defaults"
            );
            CachePrefs::default()
        }
        Err(err) => {
            warn!(key = CACHE_PREFS_KEY, %err, "cache prefs unreadable; using defaults");
            CachePrefs::default()
        }
    }
}

/// A cache configured from stored prefs, plus the topic demangler they describe.
pub fn cache_from_config<S: ConfigStore>(
    svc: &ConfigService<S>,
) -> (GraphCache, TopicPrefixDemangler) {
    let prefs = load_cache_prefs(svc);
    let demangler = TopicPrefixDemangler::from_prefs(&prefs.demangle);
    (GraphCache::with_prefs(prefs), demangler)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigStore;
    use dds_graph_cache::Demangle;

    #[test]
    fn missing_prefs_fall_back_to_defaults() {
        let svc = ConfigService::new(MemoryConfigStore::new());
        assert_eq!(load_cache_prefs(&svc), CachePrefs::default());
    }

    #[test]
    fn partial_prefs_fill_in_defaults() {
        let svc = ConfigService::new(MemoryConfigStore::new());
        svc.store()
            .save_raw(
                CACHE_PREFS_KEY,
                br#"{ "reconcile": { "defer_unknown_endpoints": false } }"#,
            )
            .unwrap();
        let prefs = load_cache_prefs(&svc);
        assert!(!prefs.reconcile.defer_unknown_endpoints);
        assert_eq!(prefs.demangle, CachePrefs::default().demangle);
    }

    #[test]
    fn malformed_prefs_fall_back_to_defaults() {
        let svc = ConfigService::new(MemoryConfigStore::new());
        svc.store()
            .save_raw(CACHE_PREFS_KEY, b"{ \"reconcile\": 7 }")
            .unwrap();
        assert_eq!(load_cache_prefs(&svc), CachePrefs::default());
    }

    #[test]
    fn configured_cache_uses_stored_prefixes() {
        let svc = ConfigService::new(MemoryConfigStore::new());
        let mut prefs = CachePrefs::default();
        prefs.demangle.topic_prefixes = vec!["rq".into(), "rr".into()];
        prefs.demangle.hide_unprefixed = false;
        svc.save(CACHE_PREFS_KEY, &prefs).unwrap();

        let (cache, demangler) = cache_from_config(&svc);
        assert_eq!(cache.prefs(), &prefs);
        assert_eq!(
            demangler.demangle("rq/add_two_intsRequest"),
            "/add_two_intsRequest"
        );
        assert_eq!(demangler.demangle("rt/chatter"), "rt/chatter");
    }
}
