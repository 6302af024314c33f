// ── Watch list ──
//
// A true set of plate ids in the order the user added them. Every entry
// point normalizes ids the same way the normalizer does (trim + uppercase)
// so membership never depends on how the plate was typed.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Outcome of a watch-list mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", content = "id", rename_all = "lowercase")]
pub enum WatchChange {
    Added(String),
    Removed(String),
}

/// Normalize a plate into a truck id: trimmed, uppercase, non-empty.
pub fn normalize_id(raw: &str) -> Option<String> {
    let id = raw.trim().to_uppercase();
    if id.is_empty() { None } else { Some(id) }
}

/// The user's durable set of watched truck ids.
///
/// Serialized as an ordered JSON array; duplicates collapse on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct WatchSet {
    ids: IndexSet<String>,
}

impl WatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        normalize_id(id).is_some_and(|id| self.ids.contains(&id))
    }

    /// Add an id. Returns `false` if it was already present or empty.
    pub fn insert(&mut self, id: &str) -> bool {
        normalize_id(id).is_some_and(|id| self.ids.insert(id))
    }

    /// Remove an id, keeping the order of the rest. Returns `false` if absent.
    pub fn remove(&mut self, id: &str) -> bool {
        normalize_id(id).is_some_and(|id| self.ids.shift_remove(&id))
    }

    /// Flip membership. `None` only for an empty id.
    pub fn toggle(&mut self, id: &str) -> Option<WatchChange> {
        let id = normalize_id(id)?;
        if self.ids.shift_remove(&id) {
            Some(WatchChange::Removed(id))
        } else {
            self.ids.insert(id.clone());
            Some(WatchChange::Added(id))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl From<Vec<String>> for WatchSet {
    fn from(ids: Vec<String>) -> Self {
        ids.iter().map(String::as_str).collect()
    }
}

impl From<WatchSet> for Vec<String> {
    fn from(set: WatchSet) -> Self {
        set.ids.into_iter().collect()
    }
}

impl<'a> FromIterator<&'a str> for WatchSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().filter_map(normalize_id).collect(),
        }
    }
}
