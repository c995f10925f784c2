//! Document-backed storage and lazy navigation for command catalogues.
//!
//! A catalogue on disk is a tree of markdown documents: one `readme.md` per
//! group and one `_<name>.md` per command, plus an optional pre-built JSON
//! index of the whole tree. This crate parses those documents on demand,
//! keeps the loaded tree mutable, and reconciles it against the index.
//!
//! # Quick start
//!
//! ```no_run
//! use command_catalog_db::{CatalogConfig, CommandTreeManager};
//!
//! let config = CatalogConfig::load(".catalog.yml").unwrap();
//! let mut manager = CommandTreeManager::from_config(&config).unwrap();
//!
//! // Only the documents along the path are parsed.
//! if let Some(command) = manager.find_command(&["vm", "deallocate"]) {
//!     println!("vm deallocate has {} versions", command.versions.len());
//! }
//!
//! // Fill in everything not yet parsed from the index.
//! let report = manager.patch().unwrap();
//! println!("{} nodes taken from the index", report.substituted);
//! ```

mod changes;
mod config;
mod document;
mod error;
mod external;
mod manager;
mod store;

pub use changes::ChangeSet;
pub use config::{CatalogConfig, VerifyConfig};
pub use document::{parse_command, parse_command_group};
pub use error::{CatalogError, DocumentError, NodeKind, Result, Violation};
pub use external::{ExternalCommand, ExternalCommandGroup, ResourceDescriptor, VersionDescriptor};
pub use manager::{CommandTreeManager, PatchReport};
pub use store::{DocumentStore, FsDocumentStore, MemoryDocumentStore};
