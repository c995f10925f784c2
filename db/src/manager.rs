//! The lazily loaded, mutable command tree.
//!
//! [`CommandTreeManager`] owns the catalogue root. Children are parsed from
//! their backing documents the first time a lookup or mutation walks
//! through them; a document that cannot be read or parsed is logged and the
//! child is treated as absent. Mutations record the touched paths in a
//! [`ChangeSet`].
//!
//! [`CommandTreeManager::patch`] replaces every child still unresolved with
//! the matching subtree of the authoritative index, giving a complete tree
//! without parsing every document.
//!
//! # Examples
//!
//! ```
//! use command_catalog_db::{CommandTreeManager, MemoryDocumentStore};
//!
//! let mut store = MemoryDocumentStore::new();
//! store.insert("/Commands/readme.md", "# Root\n");
//! let mut manager = CommandTreeManager::open(store).unwrap();
//!
//! manager.create_command(&["vm", "start"]).unwrap();
//! assert!(manager.find_command_group(&["vm"]).is_some());
//! assert!(manager.find_command(&["vm", "start"]).is_some());
//! assert!(manager.changes().contains_command(&["vm".to_string(), "start".to_string()]));
//! ```

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io;

use command_catalog_core::{
    Command, CommandGroup, CommandTree, Help, Lazy, Locator, Plane, merge_help,
};
use tracing::{debug, info, warn};

use crate::changes::ChangeSet;
use crate::config::{CatalogConfig, VerifyConfig};
use crate::document::{parse_command, parse_command_group};
use crate::error::{CatalogError, NodeKind, Result, Violation};
use crate::external::{ExternalCommand, ExternalCommandGroup, VersionDescriptor};
use crate::store::{DocumentStore, FsDocumentStore};

const MISSING_SHORT_SUMMARY: &str = "Miss short summary.";

/// Outcome of a patch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchReport {
    /// Placeholders replaced by index subtrees.
    pub substituted: usize,
    /// Placeholders with no counterpart in the index, left in place.
    pub unresolved: usize,
}

/// Owner of the catalogue root with navigation, mutation, patch and
/// verification operations.
///
/// Not internally synchronized: callers sharing one manager across threads
/// must serialize access.
pub struct CommandTreeManager {
    root: CommandGroup,
    store: Box<dyn DocumentStore>,
    changes: ChangeSet,
    verify: VerifyConfig,
}

impl std::fmt::Debug for CommandTreeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandTreeManager")
            .field("root", &self.root.names)
            .field("changes", &self.changes)
            .finish_non_exhaustive()
    }
}

impl CommandTreeManager {
    /// Opens a catalogue by parsing its root group document.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](CatalogError::Io) if the root document cannot be read
    /// and [`Document`](CatalogError::Document) if it does not parse. Unlike
    /// other nodes, a broken root is fatal.
    pub fn open(store: impl DocumentStore + 'static) -> Result<Self> {
        let uri = store.root_uri();
        let text = store.read(&uri)?;
        let root = parse_command_group(&text, &[])
            .map_err(|source| CatalogError::Document { uri, source })?;
        Ok(Self::from_root(root, store))
    }

    /// Opens the on-disk catalogue described by `config`.
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        let manager = Self::open(FsDocumentStore::from_config(config))?;
        Ok(manager.with_verify_config(config.verify.clone()))
    }

    /// Wraps an already built root.
    pub fn from_root(root: CommandGroup, store: impl DocumentStore + 'static) -> Self {
        Self {
            root,
            store: Box::new(store),
            changes: ChangeSet::default(),
            verify: VerifyConfig::default(),
        }
    }

    pub fn with_verify_config(mut self, verify: VerifyConfig) -> Self {
        self.verify = verify;
        self
    }

    /// The root group as currently loaded.
    ///
    /// Serializing it renders unresolved children in their limited form
    /// (`names` and short help) without loading them.
    pub fn root(&self) -> &CommandGroup {
        &self.root
    }

    /// Paths modified since the manager was opened.
    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Finds a group, loading documents along the path. The empty path is
    /// the root.
    pub fn find_command_group<S: AsRef<str>>(&mut self, names: &[S]) -> Option<&CommandGroup> {
        self.find_command_group_mut(names).map(|group| &*group)
    }

    pub fn find_command_group_mut<S: AsRef<str>>(&mut self, names: &[S]) -> Option<&mut CommandGroup> {
        resolve_group(&mut self.root, &*self.store, names)
    }

    /// Finds a command, loading documents along the path. Paths shorter
    /// than two segments never name a command.
    pub fn find_command<S: AsRef<str>>(&mut self, names: &[S]) -> Option<&Command> {
        self.find_command_mut(names).map(|command| &*command)
    }

    pub fn find_command_mut<S: AsRef<str>>(&mut self, names: &[S]) -> Option<&mut Command> {
        resolve_command(&mut self.root, &*self.store, names)
    }

    /// Paths of the group at `root` and every group below it, breadth first.
    pub fn command_group_paths<S: AsRef<str>>(&mut self, root: &[S]) -> Vec<Vec<String>> {
        let store = &*self.store;
        let Some(start) = resolve_group(&mut self.root, store, root) else {
            return Vec::new();
        };
        let mut paths = Vec::new();
        let mut queue: VecDeque<&mut CommandGroup> = VecDeque::from([start]);
        while let Some(group) = queue.pop_front() {
            paths.push(group.relative_names().to_vec());
            let children = group
                .command_groups
                .resolve_all(move |locator| load_group(store, locator));
            queue.extend(children.map(|(_, child)| child));
        }
        paths
    }

    /// Paths of every command in the group at `root` and below it.
    pub fn command_paths<S: AsRef<str>>(&mut self, root: &[S]) -> Vec<Vec<String>> {
        let store = &*self.store;
        let Some(start) = resolve_group(&mut self.root, store, root) else {
            return Vec::new();
        };
        let mut paths = Vec::new();
        let mut queue: VecDeque<&mut CommandGroup> = VecDeque::from([start]);
        while let Some(group) = queue.pop_front() {
            let CommandGroup {
                command_groups,
                commands,
                ..
            } = group;
            paths.extend(
                commands
                    .resolve_all(move |locator| load_command(store, locator))
                    .map(|(_, command)| command.names.clone()),
            );
            let children = command_groups.resolve_all(move |locator| load_group(store, locator));
            queue.extend(children.map(|(_, child)| child));
        }
        paths
    }

    /// Creates the group at `names` and any missing ancestors.
    ///
    /// Idempotent: an existing group is returned unchanged.
    ///
    /// # Errors
    ///
    /// - [`InvalidPath`](CatalogError::InvalidPath) for the empty path.
    /// - [`NameConflict`](CatalogError::NameConflict) if a segment already
    ///   names a command.
    /// - [`NodeUnavailable`](CatalogError::NodeUnavailable) if an existing
    ///   ancestor's document cannot be loaded.
    pub fn create_command_group<S: AsRef<str>>(&mut self, names: &[S]) -> Result<&mut CommandGroup> {
        if names.is_empty() {
            return Err(CatalogError::InvalidPath(
                "command group path cannot be empty".to_string(),
            ));
        }
        let names = to_names(names);
        let store = &*self.store;
        let changes = &mut self.changes;

        let mut node = &mut self.root;
        for (idx, name) in names.iter().enumerate() {
            let path = &names[..=idx];
            if node.commands.contains_key(name) {
                return Err(CatalogError::NameConflict {
                    path: join_path(path),
                    existing: NodeKind::Command,
                });
            }
            if !node.command_groups.contains_key(name) {
                node.command_groups
                    .insert(name.clone(), CommandGroup::new(path.to_vec()));
                changes.record_command_group(path);
            }
            node = node
                .command_groups
                .resolve(name, |locator| load_group(store, locator))
                .ok_or_else(|| CatalogError::NodeUnavailable(join_path(path)))?;
        }
        Ok(node)
    }

    /// Deletes an empty group, then every ancestor left empty (the root is
    /// never deleted). Returns `false` if the group does not exist.
    ///
    /// # Errors
    ///
    /// - [`InvalidPath`](CatalogError::InvalidPath) for the root.
    /// - [`Conflict`](CatalogError::Conflict) if the group or any descendant
    ///   still holds commands.
    /// - [`NodeUnavailable`](CatalogError::NodeUnavailable) if the group or a
    ///   descendant exists but cannot be loaded to check for commands.
    pub fn delete_command_group<S: AsRef<str>>(&mut self, names: &[S]) -> Result<bool> {
        let names = to_names(names);
        let Some((name, parent)) = names.split_last() else {
            return Err(CatalogError::InvalidPath(
                "cannot delete the root command group".to_string(),
            ));
        };
        let store = &*self.store;

        let Some(parent_group) = resolve_group(&mut self.root, store, parent) else {
            return Ok(false);
        };
        if !parent_group.command_groups.contains_key(name) {
            return Ok(false);
        }
        let group = parent_group
            .command_groups
            .resolve(name, |locator| load_group(store, locator))
            .ok_or_else(|| CatalogError::NodeUnavailable(join_path(&names)))?;
        if holds_commands(group, store)? {
            return Err(CatalogError::Conflict {
                path: join_path(&names),
                reason: "command group still holds commands".to_string(),
            });
        }

        parent_group.command_groups.remove(name);
        let cascade = parent_group.is_empty() && !parent.is_empty();
        self.changes.record_command_group(&names);
        debug!(group = %join_path(&names), "Deleted command group");

        if cascade {
            self.delete_command_group(parent)?;
        }
        Ok(true)
    }

    /// Creates the command at `names` (at least two segments) and any
    /// missing groups above it.
    ///
    /// Idempotent: an existing command is returned unchanged.
    ///
    /// # Errors
    ///
    /// - [`InvalidPath`](CatalogError::InvalidPath) for paths shorter than two.
    /// - [`NameConflict`](CatalogError::NameConflict) if the name is taken by
    ///   a group, or a parent segment by a command.
    pub fn create_command<S: AsRef<str>>(&mut self, names: &[S]) -> Result<&mut Command> {
        let names = to_names(names);
        if names.len() < 2 {
            return Err(CatalogError::InvalidPath(format!(
                "command path needs a group and a name: '{}'",
                join_path(&names)
            )));
        }
        let (name, parent) = names.split_at(names.len() - 1);
        let name = &name[0];

        self.create_command_group(parent)?;
        let store = &*self.store;
        let group = resolve_group(&mut self.root, store, parent)
            .ok_or_else(|| CatalogError::NodeUnavailable(join_path(parent)))?;

        if group.command_groups.contains_key(name) {
            return Err(CatalogError::NameConflict {
                path: join_path(&names),
                existing: NodeKind::CommandGroup,
            });
        }
        if !group.commands.contains_key(name) {
            group.commands.insert(name.clone(), Command::new(names.clone()));
            self.changes.record_command(&names);
        }
        group
            .commands
            .resolve(name, |locator| load_command(store, locator))
            .ok_or_else(|| CatalogError::NodeUnavailable(join_path(&names)))
    }

    /// Deletes a command without versions, then every ancestor left empty.
    /// Returns `false` if the command does not exist.
    ///
    /// # Errors
    ///
    /// - [`InvalidPath`](CatalogError::InvalidPath) for paths shorter than two.
    /// - [`Conflict`](CatalogError::Conflict) if versions remain.
    pub fn delete_command<S: AsRef<str>>(&mut self, names: &[S]) -> Result<bool> {
        let names = to_names(names);
        if names.len() < 2 {
            return Err(CatalogError::InvalidPath(format!(
                "command path needs a group and a name: '{}'",
                join_path(&names)
            )));
        }
        let (name, parent) = names.split_at(names.len() - 1);
        let name = &name[0];
        let store = &*self.store;

        let Some(group) = resolve_group(&mut self.root, store, parent) else {
            return Ok(false);
        };
        if !group.commands.contains_key(name) {
            return Ok(false);
        }
        let command = group
            .commands
            .resolve(name, |locator| load_command(store, locator))
            .ok_or_else(|| CatalogError::NodeUnavailable(join_path(&names)))?;
        if !command.is_empty() {
            return Err(CatalogError::Conflict {
                path: join_path(&names),
                reason: format!("command still has {} version(s)", command.versions.len()),
            });
        }

        group.commands.remove(name);
        let cascade = group.is_empty();
        self.changes.record_command(&names);
        debug!(command = %join_path(&names), "Deleted command");

        if cascade {
            self.delete_command_group(parent)?;
        }
        Ok(true)
    }

    /// Removes one version by exact name, deleting the command when it was
    /// the last. Returns `false` if the command or version does not exist.
    pub fn delete_command_version<S: AsRef<str>>(&mut self, names: &[S], version: &str) -> Result<bool> {
        let names = to_names(names);
        if names.len() < 2 {
            return Err(CatalogError::InvalidPath(format!(
                "command path needs a group and a name: '{}'",
                join_path(&names)
            )));
        }
        let Some(command) = resolve_command(&mut self.root, &*self.store, &names) else {
            return Ok(false);
        };
        if !command.remove_version(version) {
            return Ok(false);
        }
        let now_empty = command.is_empty();
        self.changes.record_command(&names);

        if now_empty {
            self.delete_command(&names)?;
        }
        Ok(true)
    }

    /// Finds or creates `descriptor.version` under the command (creating the
    /// command if needed) and replaces its resources with the descriptor's.
    ///
    /// An empty resource list removes the version instead, cascading like
    /// [`delete_command_version`](Self::delete_command_version). Returns
    /// `None` when the command no longer exists afterwards.
    pub fn update_command_version_resources<S: AsRef<str>>(
        &mut self,
        names: &[S],
        plane: Plane,
        descriptor: &VersionDescriptor,
    ) -> Result<Option<&mut Command>> {
        let names = to_names(names);
        if descriptor.resources.is_empty() {
            self.delete_command_version(&names, &descriptor.version)?;
            return Ok(resolve_command(&mut self.root, &*self.store, &names));
        }
        self.create_command(&names)?;
        self.changes.record_command(&names);

        let command = resolve_command(&mut self.root, &*self.store, &names)
            .ok_or_else(|| CatalogError::NodeUnavailable(join_path(&names)))?;
        let version = command.version_or_insert(&descriptor.version);
        version.resources = descriptor
            .resources
            .iter()
            .map(|resource| resource.to_resource(plane))
            .collect();
        Ok(Some(command))
    }

    /// Applies an external group's help, creating the group if needed.
    pub fn reconcile_command_group(&mut self, external: &ExternalCommandGroup) -> Result<&mut CommandGroup> {
        self.create_command_group(&external.names)?;
        self.changes.record_command_group(&external.names);

        let group = resolve_group(&mut self.root, &*self.store, &external.names)
            .ok_or_else(|| CatalogError::NodeUnavailable(join_path(&external.names)))?;
        merge_help(&mut group.help, external.help.as_ref());
        Ok(group)
    }

    /// Applies an external command version: stage, examples and help.
    ///
    /// Examples are replaced only by a non-empty list; help is merged
    /// without erasing local text.
    ///
    /// # Errors
    ///
    /// [`Validation`](CatalogError::Validation) if the command or version
    /// does not exist, or if the external resource set (by id and API
    /// version, ignoring order) differs from the version's. `expected` holds
    /// the catalogue's side and `actual` the external one.
    pub fn reconcile_command(&mut self, external: &ExternalCommand) -> Result<&mut Command> {
        let path = join_path(&external.names);
        let Some(command) = resolve_command(&mut self.root, &*self.store, &external.names) else {
            return Err(CatalogError::Validation {
                message: "command does not exist".to_string(),
                expected: path,
                actual: "none".to_string(),
            });
        };
        let Some(idx) = command
            .versions
            .iter()
            .position(|v| v.name == external.version)
        else {
            let available: Vec<&str> = command.versions.iter().map(|v| v.name.as_str()).collect();
            return Err(CatalogError::Validation {
                message: format!("version of command '{path}' does not exist"),
                expected: available.join(", "),
                actual: external.version.clone(),
            });
        };

        let version = &mut command.versions[idx];
        {
            let local: BTreeSet<(&str, &str)> = version.resources.iter().map(|r| r.key()).collect();
            let incoming: BTreeSet<(&str, &str)> = external
                .resources
                .iter()
                .map(|r| (r.id.as_str(), r.version.as_str()))
                .collect();
            if local != incoming {
                return Err(CatalogError::Validation {
                    message: format!("resources of '{path}' {} do not match", external.version),
                    expected: format!("{local:?}"),
                    actual: format!("{incoming:?}"),
                });
            }
        }

        version.set_stage(external.stage.as_deref());
        if !external.examples.is_empty() {
            version.examples = external.examples.clone();
        }
        merge_help(&mut command.help, external.help.as_ref());
        self.changes.record_command(&command.names);
        Ok(command)
    }

    /// Checks every group (except the root) and every command for a short
    /// summary, loading the whole tree.
    ///
    /// # Errors
    ///
    /// [`Verification`](CatalogError::Verification) carrying every violation,
    /// keyed by dotted path.
    pub fn verify(&mut self) -> Result<()> {
        let mut violations = BTreeMap::new();
        collect_violations(
            &mut self.root,
            &*self.store,
            self.verify.require_group_help,
            &mut violations,
        );
        if violations.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::Verification(violations))
        }
    }

    /// Reconciles unresolved children against the authoritative index.
    ///
    /// A missing index makes this a no-op.
    ///
    /// # Errors
    ///
    /// [`InvalidIndex`](CatalogError::InvalidIndex) if the index is not a
    /// valid tree snapshot; the tree is left untouched.
    pub fn patch(&mut self) -> Result<PatchReport> {
        let uri = self.store.index_uri();
        let text = match self.store.read(&uri) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(uri = %uri, "No authoritative index, skipping patch");
                return Ok(PatchReport::default());
            }
            Err(err) => return Err(err.into()),
        };
        let index: CommandTree = serde_json::from_str(&text)
            .map_err(|err| CatalogError::InvalidIndex(format!("{uri}: {err}")))?;
        Ok(self.patch_with(index))
    }

    /// Replaces every unresolved child with the subtree at the same path in
    /// `index`. Resolved children are descended into; nodes deleted locally
    /// are not brought back.
    pub fn patch_with(&mut self, mut index: CommandTree) -> PatchReport {
        let mut report = PatchReport::default();
        patch_group(&mut self.root, &mut index, &mut report);
        info!(
            substituted = report.substituted,
            unresolved = report.unresolved,
            "Patched command tree from index"
        );
        report
    }

    /// Loads every node and returns a copy of the tree.
    pub fn snapshot(&mut self) -> CommandTree {
        resolve_subtree(&mut self.root, &*self.store);
        CommandTree::new(self.root.clone())
    }

    /// Loads every node and returns the tree.
    pub fn into_tree(mut self) -> CommandTree {
        resolve_subtree(&mut self.root, &*self.store);
        CommandTree::new(self.root)
    }
}

fn to_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    names.iter().map(|name| name.as_ref().to_string()).collect()
}

fn join_path(names: &[String]) -> String {
    names.join(" ")
}

fn has_short(help: &Option<Help>) -> bool {
    help.as_ref().is_some_and(Help::has_short)
}

fn read_document(store: &dyn DocumentStore, uri: &str) -> Option<String> {
    match store.read(uri) {
        Ok(text) => Some(text),
        Err(err) => {
            warn!(uri = %uri, error = %err, "Failed to read document");
            None
        }
    }
}

fn load_group(store: &dyn DocumentStore, locator: &Locator) -> Option<CommandGroup> {
    let text = read_document(store, &locator.uri)?;
    match parse_command_group(&text, &locator.names) {
        Ok(group) => {
            debug!(uri = %locator.uri, "Resolved command group");
            Some(group)
        }
        Err(err) => {
            warn!(uri = %locator.uri, error = %err, "Failed to parse command group document");
            None
        }
    }
}

fn load_command(store: &dyn DocumentStore, locator: &Locator) -> Option<Command> {
    let text = read_document(store, &locator.uri)?;
    match parse_command(&text, &locator.names) {
        Ok(command) => {
            debug!(uri = %locator.uri, "Resolved command");
            Some(command)
        }
        Err(err) => {
            warn!(uri = %locator.uri, error = %err, "Failed to parse command document");
            None
        }
    }
}

fn resolve_group<'t, S: AsRef<str>>(
    root: &'t mut CommandGroup,
    store: &dyn DocumentStore,
    names: &[S],
) -> Option<&'t mut CommandGroup> {
    let mut node = root;
    for name in names {
        node = node
            .command_groups
            .resolve(name.as_ref(), |locator| load_group(store, locator))?;
    }
    Some(node)
}

fn resolve_command<'t, S: AsRef<str>>(
    root: &'t mut CommandGroup,
    store: &dyn DocumentStore,
    names: &[S],
) -> Option<&'t mut Command> {
    if names.len() < 2 {
        return None;
    }
    let (name, parent) = names.split_last()?;
    resolve_group(root, store, parent)?
        .commands
        .resolve(name.as_ref(), |locator| load_command(store, locator))
}

/// Whether `group` or any group below it holds a command.
fn holds_commands(group: &mut CommandGroup, store: &dyn DocumentStore) -> Result<bool> {
    if !group.commands.is_empty() {
        return Ok(true);
    }
    let names: Vec<String> = group.command_groups.keys().map(String::from).collect();
    for name in names {
        let mut path = group.relative_names().to_vec();
        path.push(name.clone());
        let child = group
            .command_groups
            .resolve(&name, |locator| load_group(store, locator))
            .ok_or_else(|| CatalogError::NodeUnavailable(join_path(&path)))?;
        if holds_commands(child, store)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn collect_violations(
    group: &mut CommandGroup,
    store: &dyn DocumentStore,
    require_group_help: bool,
    violations: &mut BTreeMap<String, Violation>,
) {
    let CommandGroup {
        command_groups,
        commands,
        ..
    } = group;

    for (_, child) in command_groups.resolve_all(move |locator| load_group(store, locator)) {
        if require_group_help && !has_short(&child.help) {
            violations.insert(
                child.names.join("."),
                Violation {
                    kind: NodeKind::CommandGroup,
                    message: MISSING_SHORT_SUMMARY.to_string(),
                },
            );
        }
        collect_violations(child, store, require_group_help, violations);
    }

    for (_, command) in commands.resolve_all(move |locator| load_command(store, locator)) {
        if !has_short(&command.help) {
            violations.insert(
                command.names.join("."),
                Violation {
                    kind: NodeKind::Command,
                    message: MISSING_SHORT_SUMMARY.to_string(),
                },
            );
        }
    }
}

fn patch_group(group: &mut CommandGroup, index: &mut CommandTree, report: &mut PatchReport) {
    for (_, child) in group.command_groups.iter_raw_mut() {
        match child {
            Lazy::Resolved(child) => patch_group(child, index, report),
            Lazy::Unresolved(locator) => match index.take_command_group(&locator.names) {
                Some(subtree) => {
                    *child = Lazy::Resolved(subtree);
                    report.substituted += 1;
                }
                None => {
                    warn!(group = %join_path(&locator.names), "Command group missing from index");
                    report.unresolved += 1;
                }
            },
        }
    }

    for (_, command) in group.commands.iter_raw_mut() {
        let Lazy::Unresolved(locator) = command else {
            continue;
        };
        match index.take_command(&locator.names) {
            Some(resolved) => {
                *command = Lazy::Resolved(resolved);
                report.substituted += 1;
            }
            None => {
                warn!(command = %join_path(&locator.names), "Command missing from index");
                report.unresolved += 1;
            }
        }
    }
}

fn resolve_subtree(group: &mut CommandGroup, store: &dyn DocumentStore) {
    let CommandGroup {
        command_groups,
        commands,
        ..
    } = group;
    for (_, child) in command_groups.resolve_all(move |locator| load_group(store, locator)) {
        resolve_subtree(child, store);
    }
    commands
        .resolve_all(move |locator| load_command(store, locator))
        .for_each(drop);
}
