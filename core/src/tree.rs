use serde::{Deserialize, Serialize};

use crate::{Command, CommandGroup};

/// Serialized snapshot of a fully resolved command tree.
///
/// This is the shape of the authoritative index: a single `root` group with
/// every descendant materialized. Lookups never touch storage; a child that
/// is still a placeholder is treated as absent.
///
/// # Examples
///
/// ```
/// use command_catalog_core::*;
///
/// let mut tree = CommandTree::default();
/// let mut vm = CommandGroup::new(vec!["vm".into()]);
/// vm.commands.insert("start", Command::new(vec!["vm".into(), "start".into()]));
/// tree.root.command_groups.insert("vm", vm);
///
/// assert!(tree.find_command_group(&["vm"]).is_some());
/// assert!(tree.find_command(&["vm", "start"]).is_some());
/// assert!(tree.find_command(&["vm", "stop"]).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandTree {
    pub root: CommandGroup,
}

impl Default for CommandTree {
    fn default() -> Self {
        Self {
            root: CommandGroup::root(),
        }
    }
}

impl CommandTree {
    pub fn new(root: CommandGroup) -> Self {
        Self { root }
    }

    /// Finds a group by path relative to the root. The empty path is the root.
    pub fn find_command_group<S: AsRef<str>>(&self, names: &[S]) -> Option<&CommandGroup> {
        let mut node = &self.root;
        for name in names {
            node = node.command_groups.get_resolved(name.as_ref())?;
        }
        Some(node)
    }

    /// Finds a command by full path.
    pub fn find_command<S: AsRef<str>>(&self, names: &[S]) -> Option<&Command> {
        let (name, parent) = names.split_last()?;
        self.find_command_group(parent)?
            .commands
            .get_resolved(name.as_ref())
    }

    /// Detaches the subtree at `names` (non-empty) from the tree.
    pub fn take_command_group<S: AsRef<str>>(&mut self, names: &[S]) -> Option<CommandGroup> {
        let (name, parent) = names.split_last()?;
        self.find_command_group_mut(parent)?
            .command_groups
            .take_resolved(name.as_ref())
    }

    /// Detaches the command at `names` from the tree.
    pub fn take_command<S: AsRef<str>>(&mut self, names: &[S]) -> Option<Command> {
        let (name, parent) = names.split_last()?;
        self.find_command_group_mut(parent)?
            .commands
            .take_resolved(name.as_ref())
    }

    fn find_command_group_mut<S: AsRef<str>>(&mut self, names: &[S]) -> Option<&mut CommandGroup> {
        let mut node = &mut self.root;
        for name in names {
            node = node.command_groups.get_resolved_mut(name.as_ref())?;
        }
        Some(node)
    }

    /// Counts resolved groups (root excluded) and commands.
    pub fn counts(&self) -> (usize, usize) {
        fn walk(group: &CommandGroup, groups: &mut usize, commands: &mut usize) {
            *commands += group.commands.resolved_values().count();
            for child in group.command_groups.resolved_values() {
                *groups += 1;
                walk(child, groups, commands);
            }
        }
        let (mut groups, mut commands) = (0, 0);
        walk(&self.root, &mut groups, &mut commands);
        (groups, commands)
    }
}
