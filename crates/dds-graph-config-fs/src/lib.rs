// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Filesystem-backed `ConfigStore` for graph cache hosts (uses platform config dir).

use dds_graph_app_core::config::{ConfigError, ConfigStore};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Store configs as JSON files under the platform config directory.
#[derive(Debug, Clone)]
pub struct FsConfigStore {
    base: PathBuf,
}

impl FsConfigStore {
    /// Create a store rooted at the user config directory (e.g., `~/.config/dds-graph`).
    pub fn new() -> Result<Self, ConfigError> {
        let proj = ProjectDirs::from("dev", "flyingrobots", "dds-graph")
            .ok_or_else(|| ConfigError::Other("could not resolve config dir".into()))?;
        Self::with_base(proj.config_dir())
    }

    /// Create a store rooted at `base`, creating the directory if needed.
    pub fn with_base(base: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let base = base.into();
        fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    /// Directory holding the config files.
    pub fn base(&self) -> &Path {
        &self.base
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ConfigError> {
        // Keys name a single file; reject anything that would escape `base`.
        if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
            return Err(ConfigError::Other(format!("invalid config key {key:?}")));
        }
        Ok(self.base.join(format!("{key}.json")))
    }
}

impl ConfigStore for FsConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let path = self.path_for(key)?;
        match fs::read(path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(ConfigError::NotFound),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use dds_graph_app_core::config::ConfigService;
    use dds_graph_app_core::prefs::{load_cache_prefs, CACHE_PREFS_KEY};
    use dds_graph_cache::CachePrefs;

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsConfigStore::with_base(dir.path()).unwrap();
        assert!(matches!(
            store.load_raw("absent"),
            Err(ConfigError::NotFound)
        ));
    }

    #[test]
    fn raw_blobs_land_in_key_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsConfigStore::with_base(dir.path().join("nested")).unwrap();
        store.save_raw("graph_cache", b"{}").unwrap();
        assert!(dir.path().join("nested").join("graph_cache.json").is_file());
        assert_eq!(store.load_raw("graph_cache").unwrap(), b"{}");
    }

    #[test]
    fn keys_cannot_escape_the_base() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsConfigStore::with_base(dir.path()).unwrap();
        for key in ["", "..", "../outside", "a/b", "a\\b"] {
            assert!(
                matches!(store.save_raw(key, b"{}"), Err(ConfigError::Other(_))),
                "{key:?}"
            );
        }
    }

    #[test]
    fn cache_prefs_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut prefs = CachePrefs::default();
        prefs.reconcile.defer_unknown_endpoints = false;
        prefs.demangle.topic_prefixes.push("rq".into());

        let svc = ConfigService::new(FsConfigStore::with_base(dir.path()).unwrap());
        svc.save(CACHE_PREFS_KEY, &prefs).unwrap();
        drop(svc);

        let svc = ConfigService::new(FsConfigStore::with_base(dir.path()).unwrap());
        assert_eq!(load_cache_prefs(&svc), prefs);
    }

    #[test]
    fn damaged_prefs_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("graph_cache.json"), b"\xff\xfe")
            .unwrap();
        let svc = ConfigService::new(FsConfigStore::with_base(dir.path()).unwrap());
        assert_eq!(load_cache_prefs(&svc), CachePrefs::default());
    }
}
