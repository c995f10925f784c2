//! Change tracking for tree mutations.
//!
//! Every mutation of a [`CommandTreeManager`](crate::CommandTreeManager)
//! records the paths it touched, so a caller persisting the tree knows which
//! backing documents must be rewritten.

use std::collections::BTreeSet;

use serde::Serialize;

/// Paths of modified groups and commands.
///
/// # Examples
///
/// ```
/// use command_catalog_db::ChangeSet;
///
/// let mut changes = ChangeSet::default();
/// changes.record_command_group(&["vm".to_string()]);
/// changes.record_command(&["vm".to_string(), "start".to_string()]);
/// changes.record_command_group(&["vm".to_string()]);
///
/// assert_eq!(changes.command_groups().count(), 1);
/// assert!(changes.contains_command(&["vm".to_string(), "start".to_string()]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    command_groups: BTreeSet<Vec<String>>,
    commands: BTreeSet<Vec<String>>,
}

impl ChangeSet {
    pub fn record_command_group(&mut self, names: &[String]) {
        self.command_groups.insert(names.to_vec());
    }

    pub fn record_command(&mut self, names: &[String]) {
        self.commands.insert(names.to_vec());
    }

    pub fn contains_command_group(&self, names: &[String]) -> bool {
        self.command_groups.contains(names)
    }

    pub fn contains_command(&self, names: &[String]) -> bool {
        self.commands.contains(names)
    }

    pub fn command_groups(&self) -> impl Iterator<Item = &[String]> {
        self.command_groups.iter().map(Vec::as_slice)
    }

    pub fn commands(&self) -> impl Iterator<Item = &[String]> {
        self.commands.iter().map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.command_groups.is_empty() && self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.command_groups.clear();
        self.commands.clear();
    }
}
