//! Command tree type definitions.
//!
//! These types model the catalogue hierarchy: [`CommandGroup`]s nest other
//! groups and [`Command`]s, and each command owns a sorted list of
//! [`CommandVersion`]s tied to the API [`Resource`]s that back them.
//!
//! Field names serialize in camelCase so a fully resolved tree round-trips
//! through the authoritative index file unchanged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::lazy::LazyMap;

/// Reserved name of the catalogue root group.
pub const ROOT_NAME: &str = "aaz";

/// Stage name that is implied when a version carries no stage.
pub const STABLE_STAGE: &str = "Stable";

/// Help text attached to a group or command.
///
/// # Examples
///
/// ```
/// use command_catalog_core::Help;
///
/// let help = Help::new("Manage virtual machines.").with_lines(["Long form."]);
/// assert!(help.has_short());
/// assert_eq!(help.lines.as_deref().map(|l| l.len()), Some(1));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Help {
    /// One-paragraph summary. Empty means missing.
    #[serde(default)]
    pub short: String,
    /// Optional detail lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<String>>,
}

impl Help {
    /// Creates help with a short summary and no detail lines.
    pub fn new(short: impl Into<String>) -> Self {
        Self {
            short: short.into(),
            lines: None,
        }
    }

    /// Sets detail lines; an empty iterator clears them.
    pub fn with_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        self.lines = (!lines.is_empty()).then_some(lines);
        self
    }

    /// Returns `true` if a non-blank short summary is present.
    pub fn has_short(&self) -> bool {
        !self.short.trim().is_empty()
    }
}

/// API plane a resource belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Plane {
    /// Azure Resource Manager style management APIs.
    #[serde(rename = "mgmt-plane")]
    Management,
    /// Service data APIs.
    #[serde(rename = "data-plane")]
    Data,
}

impl Plane {
    /// Wire name, as written in documents and the index.
    pub fn as_str(&self) -> &'static str {
        match self {
            Plane::Management => "mgmt-plane",
            Plane::Data => "data-plane",
        }
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plane {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mgmt-plane" => Ok(Plane::Management),
            "data-plane" => Ok(Plane::Data),
            other => Err(format!("unknown plane: {other}")),
        }
    }
}

/// API endpoint identity backing a command version.
///
/// Two resources are the same endpoint when their [`key`](Resource::key)
/// (`id`, `version`) matches; plane and subresource do not participate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub plane: Plane,
    /// Normalized resource path (e.g. `/subscriptions/{}/resourcegroups/{}`).
    pub id: String,
    /// API version.
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subresource: Option<String>,
}

impl Resource {
    pub fn new(plane: Plane, id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            plane,
            id: id.into(),
            version: version.into(),
            subresource: None,
        }
    }

    /// Dedup key used when comparing resource sets.
    pub fn key(&self) -> (&str, &str) {
        (&self.id, &self.version)
    }
}

/// A usage example: a description and the command lines it shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    /// Description of what the example does.
    pub name: String,
    pub commands: Vec<String>,
}

impl Example {
    pub fn new<I, S>(name: impl Into<String>, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            commands: commands.into_iter().map(Into::into).collect(),
        }
    }
}

/// One API version snapshot of a command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandVersion {
    pub name: String,
    /// Maturity stage; `None` means stable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Example>,
}

impl CommandVersion {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Sets the stage, folding the stable stage into `None`.
    pub fn set_stage(&mut self, stage: Option<&str>) {
        self.stage = stage
            .filter(|s| !s.is_empty() && *s != STABLE_STAGE)
            .map(String::from);
    }

    /// Stage name with the stable default filled in.
    pub fn stage_name(&self) -> &str {
        self.stage.as_deref().unwrap_or(STABLE_STAGE)
    }
}

/// A leaf of the catalogue owning one or more versions.
///
/// # Examples
///
/// ```
/// use command_catalog_core::Command;
///
/// let mut command = Command::new(vec!["vm".into(), "start".into()]);
/// command.version_or_insert("2022-11-01");
/// command.version_or_insert("2017-03-30");
///
/// let names: Vec<&str> = command.versions.iter().map(|v| v.name.as_str()).collect();
/// assert_eq!(names, vec!["2017-03-30", "2022-11-01"]);
/// assert!(command.remove_version("2017-03-30"));
/// assert!(!command.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<Help>,
    /// Sorted by name ascending.
    #[serde(default)]
    pub versions: Vec<CommandVersion>,
}

impl Command {
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names,
            ..Default::default()
        }
    }

    /// Leaf name (last path segment).
    pub fn name(&self) -> &str {
        self.names.last().map(String::as_str).unwrap_or_default()
    }

    /// A command with no versions may be deleted.
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn find_version(&self, name: &str) -> Option<&CommandVersion> {
        self.versions.iter().find(|v| v.name == name)
    }

    pub fn find_version_mut(&mut self, name: &str) -> Option<&mut CommandVersion> {
        self.versions.iter_mut().find(|v| v.name == name)
    }

    /// Returns the named version, inserting an empty one at its sorted
    /// position if absent.
    pub fn version_or_insert(&mut self, name: &str) -> &mut CommandVersion {
        let idx = match self
            .versions
            .binary_search_by(|v| v.name.as_str().cmp(name))
        {
            Ok(idx) => idx,
            Err(idx) => {
                self.versions.insert(idx, CommandVersion::new(name));
                idx
            }
        };
        &mut self.versions[idx]
    }

    /// Removes a version by exact name. Returns `false` if absent.
    pub fn remove_version(&mut self, name: &str) -> bool {
        let before = self.versions.len();
        self.versions.retain(|v| v.name != name);
        self.versions.len() != before
    }

    /// Restores the name ordering after bulk edits.
    pub fn sort_versions(&mut self) {
        self.versions.sort_by(|a, b| a.name.cmp(&b.name));
    }
}

/// A namespace node holding subgroups and commands.
///
/// Children are stored in [`LazyMap`]s so a group parsed from its document
/// knows its children's names without parsing them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandGroup {
    pub names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<Help>,
    #[serde(default, skip_serializing_if = "LazyMap::is_empty")]
    pub command_groups: LazyMap<CommandGroup>,
    #[serde(default, skip_serializing_if = "LazyMap::is_empty")]
    pub commands: LazyMap<Command>,
}

impl CommandGroup {
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names,
            ..Default::default()
        }
    }

    /// Creates the catalogue root, named `["aaz"]`.
    pub fn root() -> Self {
        Self::new(vec![ROOT_NAME.to_string()])
    }

    /// Returns `true` for the reserved root path (`["aaz"]` or empty).
    pub fn is_root(&self) -> bool {
        is_root_path(&self.names)
    }

    /// Returns `true` when the group holds neither subgroups nor commands.
    pub fn is_empty(&self) -> bool {
        self.command_groups.is_empty() && self.commands.is_empty()
    }

    /// Path segments relative to the root (the reserved root name dropped).
    pub fn relative_names(&self) -> &[String] {
        relative_names(&self.names)
    }
}

/// Returns `true` if `names` addresses the root group.
pub fn is_root_path(names: &[String]) -> bool {
    names.is_empty() || (names.len() == 1 && names[0] == ROOT_NAME)
}

/// Strips the reserved root segment from a group path.
pub fn relative_names(names: &[String]) -> &[String] {
    if is_root_path(names) { &[] } else { names }
}
