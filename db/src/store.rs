//! Backing storage for catalogue documents.
//!
//! Documents are addressed by store-relative uris such as
//! `/Commands/vm/readme.md`, exactly as group documents list their children.
//! [`FsDocumentStore`] maps them under a catalogue directory;
//! [`MemoryDocumentStore`] keeps them in a map for tests and tooling.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use command_catalog_core::{Command, CommandGroup, CommandTree, ROOT_NAME};

use crate::config::CatalogConfig;
use crate::error::Result;

/// Read access to backing documents.
pub trait DocumentStore {
    /// Reads the document at `uri`.
    ///
    /// A missing document is reported as [`io::ErrorKind::NotFound`].
    fn read(&self, uri: &str) -> io::Result<String>;

    /// Uri of the root group document.
    fn root_uri(&self) -> String {
        "/Commands/readme.md".to_string()
    }

    /// Uri of the authoritative index.
    fn index_uri(&self) -> String {
        "/Commands/tree.json".to_string()
    }
}

/// Documents stored under a catalogue directory.
///
/// # Examples
///
/// ```no_run
/// use command_catalog_db::{DocumentStore, FsDocumentStore};
///
/// let store = FsDocumentStore::new("/src/aaz");
/// let readme = store.read("/Commands/readme.md").unwrap();
/// println!("{}", readme.lines().next().unwrap_or_default());
/// ```
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
    commands_dir: String,
    readme_file: String,
    index_file: String,
}

impl FsDocumentStore {
    /// Store for a catalogue at `root` with the default layout.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::from_config(&CatalogConfig::new(root))
    }

    pub fn from_config(config: &CatalogConfig) -> Self {
        Self {
            root: config.aaz_path.clone(),
            commands_dir: config.commands_dir.clone(),
            readme_file: config.readme_file.clone(),
            index_file: config.index_file.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of the document at `uri`.
    pub fn path_of(&self, uri: &str) -> PathBuf {
        self.root.join(uri.trim_start_matches('/'))
    }

    /// Builds a names-only tree from the directory layout.
    ///
    /// Directories are groups and `_<name>.md` files are commands; nothing
    /// is parsed, so help and versions are empty.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::CatalogError::Io) if a directory cannot be read.
    pub fn simple_tree(&self) -> Result<CommandTree> {
        let commands = self.root.join(&self.commands_dir);
        let root = self.simple_group(&commands, Vec::new())?;
        Ok(CommandTree::new(root))
    }

    fn simple_group(&self, dir: &Path, names: Vec<String>) -> Result<CommandGroup> {
        let mut group = CommandGroup::new(if names.is_empty() {
            vec![ROOT_NAME.to_string()]
        } else {
            names.clone()
        });

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let mut child = names.clone();
            if entry.file_type()?.is_dir() {
                child.push(file_name.to_string());
                let sub = self.simple_group(&entry.path(), child)?;
                group.command_groups.insert(file_name, sub);
            } else if file_name == self.readme_file || file_name == self.index_file {
                continue;
            } else if let Some(name) = file_name
                .strip_prefix('_')
                .and_then(|rest| rest.strip_suffix(".md"))
            {
                child.push(name.to_string());
                group.commands.insert(name, Command::new(child));
            }
        }
        Ok(group)
    }
}

impl DocumentStore for FsDocumentStore {
    fn read(&self, uri: &str) -> io::Result<String> {
        std::fs::read_to_string(self.path_of(uri))
    }

    fn root_uri(&self) -> String {
        format!("/{}/{}", self.commands_dir, self.readme_file)
    }

    fn index_uri(&self) -> String {
        format!("/{}/{}", self.commands_dir, self.index_file)
    }
}

/// Documents held in memory, keyed by uri.
///
/// # Examples
///
/// ```
/// use command_catalog_db::{DocumentStore, MemoryDocumentStore};
///
/// let mut store = MemoryDocumentStore::new();
/// store.insert("/Commands/readme.md", "# Root\n");
/// assert_eq!(store.read("/Commands/readme.md").unwrap(), "# Root\n");
/// assert!(store.read("/Commands/tree.json").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    documents: HashMap<String, String>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uri: impl Into<String>, text: impl Into<String>) {
        self.documents.insert(uri.into(), text.into());
    }

    pub fn remove(&mut self, uri: &str) -> Option<String> {
        self.documents.remove(uri)
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn read(&self, uri: &str) -> io::Result<String> {
        self.documents
            .get(uri)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no document at {uri}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_paths_follow_config() {
        let mut config = CatalogConfig::new("/src/aaz");
        config.commands_dir = "Cmds".into();
        let store = FsDocumentStore::from_config(&config);
        assert_eq!(store.root_uri(), "/Cmds/readme.md");
        assert_eq!(store.index_uri(), "/Cmds/tree.json");
        assert_eq!(
            store.path_of("/Cmds/vm/readme.md"),
            PathBuf::from("/src/aaz/Cmds/vm/readme.md")
        );
    }

    #[test]
    fn test_fs_read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        let err = store.read("/Commands/readme.md").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_simple_tree() {
        let dir = tempfile::tempdir().unwrap();
        let commands = dir.path().join("Commands");
        std::fs::create_dir_all(commands.join("vm").join("disk")).unwrap();
        std::fs::write(commands.join("readme.md"), "# Root\n").unwrap();
        std::fs::write(commands.join("tree.json"), "{}").unwrap();
        std::fs::write(commands.join("vm").join("readme.md"), "").unwrap();
        std::fs::write(commands.join("vm").join("_start.md"), "").unwrap();
        std::fs::write(commands.join("vm").join("disk").join("_attach.md"), "").unwrap();

        let tree = FsDocumentStore::new(dir.path()).simple_tree().unwrap();
        assert!(tree.root.is_root());
        assert!(tree.root.commands.is_empty());
        assert_eq!(
            tree.find_command(&["vm", "start"]).map(|c| c.names.clone()),
            Some(vec!["vm".to_string(), "start".to_string()])
        );
        assert!(tree.find_command(&["vm", "disk", "attach"]).is_some());
        assert_eq!(tree.counts(), (2, 2));
    }
}
