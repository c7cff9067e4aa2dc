//! Resource identifier parsing
//!
//! iControl REST addresses objects by partition and name. Clients spell that
//! pair several ways, all of which resolve to the same [`ResourceKey`]:
//!
//! - `~Common~pool1` (URL-safe tilde form, extra segments ignored)
//! - `/Common/pool1` or `Common/pool1` (full path form)
//! - `pool1` (bare name in the default partition)

use std::fmt;

/// Partition used when an identifier does not name one
pub const DEFAULT_PARTITION: &str = "Common";

/// A `(partition, name)` pair addressing one resource in a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub partition: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(partition: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            name: name.into(),
        }
    }

    /// Key in the default partition
    pub fn common(name: impl Into<String>) -> Self {
        Self::new(DEFAULT_PARTITION, name)
    }

    /// Parse a raw identifier. Never fails: anything unrecognised is a bare name.
    pub fn parse(raw: &str) -> Self {
        if let Some((partition, name)) = split_tilde(raw) {
            return Self::new(partition, name);
        }
        if let Some((partition, name)) = split_slash(raw) {
            return Self::new(partition, name);
        }
        Self::common(raw)
    }

    /// `~Partition~Name`, the form used in self links
    pub fn tilde_path(&self) -> String {
        format!("~{}~{}", self.partition, self.name)
    }

    /// `/Partition/Name`
    pub fn full_path(&self) -> String {
        format!("/{}/{}", self.partition, self.name)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition, self.name)
    }
}

fn split_tilde(raw: &str) -> Option<(&str, &str)> {
    if !raw.starts_with('~') {
        return None;
    }
    let mut parts = raw.trim_matches('~').split('~');
    match (parts.next(), parts.next()) {
        (Some(partition), Some(name)) => Some((partition, name)),
        _ => None,
    }
}

fn split_slash(raw: &str) -> Option<(&str, &str)> {
    if !raw.contains('/') {
        return None;
    }
    let parts: Vec<&str> = raw.trim_matches('/').split('/').collect();
    if parts.len() < 2 {
        return None;
    }
    Some((parts[0], parts[parts.len() - 1]))
}

/// Split a `fullPath` body field into an optional partition and a name.
///
/// `/Common/pool1` gives `(Some("Common"), "pool1")`; `pool1` gives `(None, "pool1")`.
pub fn split_full_path(full_path: &str) -> (Option<&str>, &str) {
    let parts: Vec<&str> = full_path.trim_matches('/').split('/').collect();
    let name = parts[parts.len() - 1];
    if parts.len() > 1 {
        (Some(parts[0]), name)
    } else {
        (None, name)
    }
}
