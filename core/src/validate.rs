//! Structural validation of command trees.
//!
//! Catches inconsistencies that the manager's mutations never produce but a
//! hand-edited index or backing document can: a name used for both a group
//! and a command, children whose paths disagree with their parent, and
//! version lists that are unsorted, duplicated or detached from resources.
//!
//! # Examples
//!
//! ```
//! use command_catalog_core::*;
//!
//! let mut tree = CommandTree::default();
//! let mut vm = CommandGroup::new(vec!["vm".into()]);
//! let mut start = Command::new(vec!["vm".into(), "start".into()]);
//! start
//!     .version_or_insert("2022-11-01")
//!     .resources
//!     .push(Resource::new(Plane::Management, "/subscriptions/{}/vm", "2022-11-01"));
//! vm.commands.insert("start", start);
//! tree.root.command_groups.insert("vm", vm);
//! assert!(validate_tree(&tree).is_empty());
//!
//! // A group named like the command
//! tree.root
//!     .command_groups
//!     .get_resolved_mut("vm")
//!     .unwrap()
//!     .command_groups
//!     .insert("start", CommandGroup::new(vec!["vm".into(), "start".into()]));
//! let errors = validate_tree(&tree);
//! assert!(errors.iter().any(|e| matches!(e, ValidationError::NameCollision(_))));
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::lazy::Lazy;
use crate::{Command, CommandGroup, CommandTree};

/// Tree and schema validation errors.
///
/// Paths in messages are space separated, the way commands are typed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A group and a command share a name under the same parent.
    #[error("name used by both a command group and a command: {0}")]
    NameCollision(String),
    /// A child's stored path is not its parent's path plus its key.
    #[error("child path mismatch at {path}: found {found}")]
    NameMismatch { path: String, found: String },
    /// Versions are not sorted ascending by name.
    #[error("versions not sorted: {0}")]
    UnsortedVersions(String),
    #[error("duplicate version {version} in {path}")]
    DuplicateVersion { path: String, version: String },
    /// A version with no backing resource.
    #[error("version {version} of {path} has no resources")]
    EmptyResources { path: String, version: String },
    /// A class reference with no canonical definition in its document.
    #[error("missing class definition: {0}")]
    MissingClassDefinition(String),
}

/// Validates every loaded node of a tree.
///
/// Placeholders are checked only for path consistency; their documents are
/// never read.
pub fn validate_tree(tree: &CommandTree) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    validate_group(&tree.root, &mut errors);
    errors
}

fn join_path(names: &[String]) -> String {
    names.join(" ")
}

fn validate_group(group: &CommandGroup, errors: &mut Vec<ValidationError>) {
    let parent = group.relative_names();

    for name in group.command_groups.keys() {
        if group.commands.contains_key(name) {
            let mut path = parent.to_vec();
            path.push(name.to_string());
            errors.push(ValidationError::NameCollision(join_path(&path)));
        }
    }

    for (name, child) in group.command_groups.iter_raw() {
        let names = match child {
            Lazy::Resolved(child) => &child.names,
            Lazy::Unresolved(locator) => &locator.names,
        };
        check_child_path(parent, name, names, errors);
        if let Lazy::Resolved(child) = child {
            validate_group(child, errors);
        }
    }

    for (name, command) in group.commands.iter_raw() {
        let names = match command {
            Lazy::Resolved(command) => &command.names,
            Lazy::Unresolved(locator) => &locator.names,
        };
        check_child_path(parent, name, names, errors);
        if let Lazy::Resolved(command) = command {
            validate_command(command, errors);
        }
    }
}

fn check_child_path(parent: &[String], name: &str, found: &[String], errors: &mut Vec<ValidationError>) {
    let consistent = found.len() == parent.len() + 1
        && found.starts_with(parent)
        && found.last().is_some_and(|last| last == name);
    if !consistent {
        let mut path = parent.to_vec();
        path.push(name.to_string());
        errors.push(ValidationError::NameMismatch {
            path: join_path(&path),
            found: join_path(found),
        });
    }
}

fn validate_command(command: &Command, errors: &mut Vec<ValidationError>) {
    let path = join_path(&command.names);

    if command.versions.windows(2).any(|w| w[0].name > w[1].name) {
        errors.push(ValidationError::UnsortedVersions(path.clone()));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for version in &command.versions {
        if !seen.insert(version.name.as_str()) {
            errors.push(ValidationError::DuplicateVersion {
                path: path.clone(),
                version: version.name.clone(),
            });
        }
        if version.resources.is_empty() {
            errors.push(ValidationError::EmptyResources {
                path: path.clone(),
                version: version.name.clone(),
            });
        }
    }
}
