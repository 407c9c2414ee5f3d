// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persisted preferences for a graph cache instance.

use serde::{Deserialize, Serialize};

/// Top-level cache preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CachePrefs {
    /// Reconciliation behaviour.
    pub reconcile: ReconcilePrefs,
    /// Default demangler configuration.
    pub demangle: DemanglePrefs,
}

/// How peer snapshots are merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilePrefs {
    /// Keep associations to endpoints not yet discovered and apply them when
    /// the endpoint is added. When off, such gids are ignored.
    pub defer_unknown_endpoints: bool,
}

impl Default for ReconcilePrefs {
    fn default() -> Self {
        Self {
            defer_unknown_endpoints: true,
        }
    }
}

/// Configuration of the prefix-based topic demangler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemanglePrefs {
    /// Transport prefixes marking externally visible topics.
    pub topic_prefixes: Vec<String>,
    /// Hide topics carrying none of the prefixes.
    pub hide_unprefixed: bool,
}

impl Default for DemanglePrefs {
    fn default() -> Self {
        Self {
            topic_prefixes: vec!["rt".to_owned()],
            hide_unprefixed: true,
        }
    }
}
