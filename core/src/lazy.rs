//! Two-state lazy cells for command tree children.
//!
//! A catalogue holds tens of thousands of commands, each backed by its own
//! document. Parsing all of them up front is wasteful, so every child of a
//! [`CommandGroup`](crate::CommandGroup) is stored as a [`Lazy`] cell that is
//! either [`Unresolved`](Lazy::Unresolved) (only its [`Locator`] is known) or
//! [`Resolved`](Lazy::Resolved) (parsed into memory).
//!
//! [`LazyMap`] performs the `Unresolved -> Resolved` transition on access and
//! memoizes the result in place. The caller supplies the loader, so this
//! module stays free of any I/O.
//!
//! # Examples
//!
//! ```
//! use command_catalog_core::{Lazy, LazyMap, Locator};
//!
//! let mut map: LazyMap<String> = LazyMap::new();
//! map.insert_unresolved("vm", Locator::new(vec!["vm".into()], "/Commands/vm/readme.md"));
//!
//! assert!(matches!(map.get_raw("vm"), Some(Lazy::Unresolved(_))));
//! let loaded = map.resolve("vm", |loc| Some(format!("parsed {}", loc.uri)));
//! assert_eq!(loaded.map(|s| s.as_str()), Some("parsed /Commands/vm/readme.md"));
//! assert!(matches!(map.get_raw("vm"), Some(Lazy::Resolved(_))));
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Address of a node's backing document, plus what the parent listing
/// already told us about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    /// Full path of the node, without the reserved root segment.
    pub names: Vec<String>,
    /// Document address relative to the catalogue root (e.g.
    /// `/Commands/vm/_deallocate.md`).
    pub uri: String,
    /// Short help copied from the parent's listing, if any.
    pub short_help: Option<String>,
}

impl Locator {
    /// Creates a locator with no short help.
    pub fn new(names: Vec<String>, uri: impl Into<String>) -> Self {
        Self {
            names,
            uri: uri.into(),
            short_help: None,
        }
    }

    /// Attaches the short help listed by the parent document.
    pub fn with_short_help(mut self, short_help: impl Into<String>) -> Self {
        self.short_help = Some(short_help.into());
        self
    }
}

/// A child node that is either only addressed or already materialized.
#[derive(Debug, Clone, PartialEq)]
pub enum Lazy<T> {
    /// Known only by path and document locator.
    Unresolved(Locator),
    /// Parsed into memory. Terminal for the node's lifetime.
    Resolved(T),
}

impl<T> Lazy<T> {
    /// Returns `true` if the node has been materialized.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Lazy::Resolved(_))
    }

    /// Returns the materialized node without forcing resolution.
    pub fn as_resolved(&self) -> Option<&T> {
        match self {
            Lazy::Resolved(node) => Some(node),
            Lazy::Unresolved(_) => None,
        }
    }

    /// Returns the locator of a placeholder.
    pub fn as_unresolved(&self) -> Option<&Locator> {
        match self {
            Lazy::Unresolved(locator) => Some(locator),
            Lazy::Resolved(_) => None,
        }
    }
}

/// Ordered name → [`Lazy`] mapping with memoizing accessors.
///
/// Accessors that take a loader resolve placeholders; the `raw` accessors
/// never do, which is what patch reconciliation relies on to tell parsed
/// children from unparsed ones.
#[derive(Debug, Clone, PartialEq)]
pub struct LazyMap<T> {
    entries: BTreeMap<String, Lazy<T>>,
}

impl<T> Default for LazyMap<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> LazyMap<T> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, resolved or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if `name` is present in either state.
    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Child names in order. Entries are not resolved; use
    /// [`resolve_all`](Self::resolve_all) to load them.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Inserts a materialized node, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, node: T) {
        self.entries.insert(name.into(), Lazy::Resolved(node));
    }

    /// Inserts a placeholder, replacing any previous entry.
    pub fn insert_unresolved(&mut self, name: impl Into<String>, locator: Locator) {
        self.entries.insert(name.into(), Lazy::Unresolved(locator));
    }

    /// Removes an entry in whatever state it is in.
    pub fn remove(&mut self, name: &str) -> Option<Lazy<T>> {
        self.entries.remove(name)
    }

    /// Returns the stored cell without resolving it.
    pub fn get_raw(&self, name: &str) -> Option<&Lazy<T>> {
        self.entries.get(name)
    }

    /// Iterates stored cells without resolving them.
    pub fn iter_raw(&self) -> impl Iterator<Item = (&str, &Lazy<T>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates stored cells mutably without resolving them.
    pub fn iter_raw_mut(&mut self) -> impl Iterator<Item = (&str, &mut Lazy<T>)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns a child only if it is already resolved.
    pub fn get_resolved(&self, name: &str) -> Option<&T> {
        self.entries.get(name).and_then(Lazy::as_resolved)
    }

    /// Mutable variant of [`get_resolved`](Self::get_resolved).
    pub fn get_resolved_mut(&mut self, name: &str) -> Option<&mut T> {
        match self.entries.get_mut(name) {
            Some(Lazy::Resolved(node)) => Some(node),
            _ => None,
        }
    }

    /// Removes and returns a child only if it is resolved.
    pub fn take_resolved(&mut self, name: &str) -> Option<T> {
        if !self.entries.get(name).is_some_and(Lazy::is_resolved) {
            return None;
        }
        match self.entries.remove(name) {
            Some(Lazy::Resolved(node)) => Some(node),
            _ => None,
        }
    }

    /// Already-resolved children, without forcing the rest.
    pub fn resolved_values(&self) -> impl Iterator<Item = &T> {
        self.entries.values().filter_map(Lazy::as_resolved)
    }

    /// Names of entries still waiting to be parsed.
    pub fn unresolved_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, v)| !v.is_resolved())
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Resolves `name` with `load` if needed and returns the cached node.
    ///
    /// When `load` yields `None` the placeholder is kept as is and `None` is
    /// returned, so a later call (or a patch) can still materialize it.
    pub fn resolve<F>(&mut self, name: &str, load: F) -> Option<&mut T>
    where
        F: FnOnce(&Locator) -> Option<T>,
    {
        let entry = self.entries.get_mut(name)?;
        let loaded = match &*entry {
            Lazy::Unresolved(locator) => Some(load(locator)),
            Lazy::Resolved(_) => None,
        };
        match loaded {
            Some(Some(node)) => *entry = Lazy::Resolved(node),
            Some(None) => return None,
            None => {}
        }
        match entry {
            Lazy::Resolved(node) => Some(node),
            Lazy::Unresolved(_) => None,
        }
    }

    /// Resolves every entry and iterates the materialized nodes.
    ///
    /// Entries whose loader fails are skipped and stay unresolved.
    pub fn resolve_all<F>(&mut self, mut load: F) -> impl Iterator<Item = (&str, &mut T)>
    where
        F: FnMut(&Locator) -> Option<T>,
    {
        for entry in self.entries.values_mut() {
            let loaded = match &*entry {
                Lazy::Unresolved(locator) => load(locator),
                Lazy::Resolved(_) => None,
            };
            if let Some(node) = loaded {
                *entry = Lazy::Resolved(node);
            }
        }
        self.entries.iter_mut().filter_map(|(k, v)| match v {
            Lazy::Resolved(node) => Some((k.as_str(), node)),
            Lazy::Unresolved(_) => None,
        })
    }
}

#[derive(Serialize)]
struct LimitedHelp<'a> {
    short: &'a str,
}

/// Serialized form of a placeholder: what is known without parsing.
#[derive(Serialize)]
struct LimitedNode<'a> {
    names: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    help: Option<LimitedHelp<'a>>,
}

impl<T: Serialize> Serialize for Lazy<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Lazy::Resolved(node) => node.serialize(serializer),
            Lazy::Unresolved(locator) => LimitedNode {
                names: &locator.names,
                help: locator
                    .short_help
                    .as_deref()
                    .map(|short| LimitedHelp { short }),
            }
            .serialize(serializer),
        }
    }
}

impl<T: Serialize> Serialize for LazyMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for LazyMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = BTreeMap::<String, T>::deserialize(deserializer)?;
        Ok(Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k, Lazy::Resolved(v)))
                .collect(),
        })
    }
}

impl<T> FromIterator<(String, Lazy<T>)> for LazyMap<T> {
    fn from_iter<I: IntoIterator<Item = (String, Lazy<T>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn locator(name: &str) -> Locator {
        Locator::new(vec![name.to_string()], format!("/Commands/{name}/readme.md"))
    }

    #[test]
    fn test_resolve_memoizes() {
        let calls = Cell::new(0);
        let mut map: LazyMap<String> = LazyMap::new();
        map.insert_unresolved("vm", locator("vm"));

        for _ in 0..3 {
            let value = map.resolve("vm", |loc| {
                calls.set(calls.get() + 1);
                Some(loc.names.join(" "))
            });
            assert_eq!(value.map(|v| v.clone()), Some("vm".to_string()));
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_failed_load_keeps_placeholder() {
        let mut map: LazyMap<String> = LazyMap::new();
        map.insert_unresolved("vm", locator("vm"));

        assert!(map.resolve("vm", |_| None).is_none());
        assert!(matches!(map.get_raw("vm"), Some(Lazy::Unresolved(_))));
        assert_eq!(map.unresolved_names(), vec!["vm".to_string()]);
    }

    #[test]
    fn test_resolve_missing_name() {
        let mut map: LazyMap<String> = LazyMap::new();
        assert!(map.resolve("nope", |_| Some(String::new())).is_none());
    }

    #[test]
    fn test_resolve_all_skips_failures() {
        let mut map: LazyMap<String> = LazyMap::new();
        map.insert_unresolved("a", locator("a"));
        map.insert_unresolved("b", locator("b"));
        map.insert("c", "ready".to_string());

        let names: Vec<String> = map
            .resolve_all(|loc| (loc.names[0] != "b").then(|| loc.uri.clone()))
            .map(|(k, _)| k.to_string())
            .collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(map.unresolved_names(), vec!["b".to_string()]);
    }

    #[test]
    fn test_raw_access_does_not_resolve() {
        let mut map: LazyMap<String> = LazyMap::new();
        map.insert_unresolved("a", locator("a"));
        assert_eq!(map.iter_raw().filter(|(_, v)| v.is_resolved()).count(), 0);
        assert!(map.get_resolved("a").is_none());
        assert!(map.take_resolved("a").is_none());
        assert!(map.contains_key("a"));
    }

    #[test]
    fn test_keys_list_placeholders_unresolved() {
        let mut map: LazyMap<String> = LazyMap::new();
        map.insert_unresolved("b", locator("b"));
        map.insert("a", "ready".to_string());

        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(map.unresolved_names(), vec!["b".to_string()]);
    }

    #[test]
    fn test_placeholder_serializes_limited() {
        let mut map: LazyMap<String> = LazyMap::new();
        map.insert_unresolved("vm", locator("vm").with_short_help("Manage VMs"));
        map.insert("disk", "full".to_string());

        let value = serde_json::to_value(&map).unwrap();
        assert_eq!(value["vm"]["names"], serde_json::json!(["vm"]));
        assert_eq!(value["vm"]["help"]["short"], "Manage VMs");
        assert_eq!(value["disk"], "full");
    }

    #[test]
    fn test_deserialize_marks_resolved() {
        let map: LazyMap<u32> = serde_json::from_str(r#"{"a": 1, "b": 2}"#).unwrap();
        assert_eq!(map.len(), 2);
        assert!(map.iter_raw().all(|(_, v)| v.is_resolved()));
        assert_eq!(map.get_resolved("b"), Some(&2));
    }
}
