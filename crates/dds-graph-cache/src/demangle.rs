// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Query-time name demangling.
//!
//! A demangler maps a raw, transport-specific topic or type name to the name
//! shown to graph observers. An empty result marks the name as hidden; hidden
//! topics are dropped from topic catalogs. Demanglers are supplied per query
//! and their results are never cached.

use crate::prefs::DemanglePrefs;

/// Pure string transform applied to raw topic or type names.
pub trait Demangle {
    /// Demangle `raw`. Returning an empty string hides the name.
    fn demangle(&self, raw: &str) -> String;
}

impl<F> Demangle for F
where
    F: Fn(&str) -> String,
{
    fn demangle(&self, raw: &str) -> String {
        self(raw)
    }
}

/// Returns names unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Demangle for Identity {
    fn demangle(&self, raw: &str) -> String {
        raw.to_owned()
    }
}

/// Strips a transport prefix such as `rt` from topic names (`rt/chatter` -> `/chatter`).
///
/// Names that carry none of the configured prefixes are implementation-private
/// and are hidden unless `hide_unprefixed` is off.
#[derive(Debug, Clone)]
pub struct TopicPrefixDemangler {
    prefixes: Vec<String>,
    hide_unprefixed: bool,
}

impl TopicPrefixDemangler {
    /// Build a demangler recognising the given prefixes.
    pub fn new<I, S>(prefixes: I, hide_unprefixed: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
            hide_unprefixed,
        }
    }

    /// Build from cache preferences.
    pub fn from_prefs(prefs: &DemanglePrefs) -> Self {
        Self::new(prefs.topic_prefixes.iter().cloned(), prefs.hide_unprefixed)
    }
}

impl Default for TopicPrefixDemangler {
    fn default() -> Self {
        Self::from_prefs(&DemanglePrefs::default())
    }
}

impl Demangle for TopicPrefixDemangler {
    fn demangle(&self, raw: &str) -> String {
        for prefix in &self.prefixes {
            if let Some(rest) = raw.strip_prefix(prefix.as_str()) {
                if rest.starts_with('/') {
                    return rest.to_owned();
                }
            }
        }
        if self.hide_unprefixed {
            String::new()
        } else {
            raw.to_owned()
        }
    }
}

/// Turns DDS-mangled type names into their logical form
/// (`std_msgs::msg::dds_::String_` -> `std_msgs/msg/String`).
///
/// Names without the `::dds_::` marker are returned unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct DdsTypeDemangler;

const DDS_MARKER: &str = "::dds_::";

impl Demangle for DdsTypeDemangler {
    fn demangle(&self, raw: &str) -> String {
        let Some(pos) = raw.find(DDS_MARKER) else {
            return raw.to_owned();
        };
        let package = raw[..pos].replace("::", "/");
        let tail = &raw[pos + DDS_MARKER.len()..];
        let type_name = tail.strip_suffix('_').unwrap_or(tail);
        format!("{package}/{type_name}")
    }
}
