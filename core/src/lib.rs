//! Core command catalogue types and schema algorithms.
//!
//! This crate defines the in-memory model of a CLI command catalogue and
//! the pure algorithms over it. It performs no I/O:
//!
//! - [`CommandGroup`] / [`Command`] / [`CommandVersion`] — the catalogue
//!   hierarchy, with every child held in a [`LazyMap`] so a group can know
//!   its children's names before their documents are parsed.
//! - [`CommandTree`] — a fully resolved snapshot, the shape of the
//!   authoritative index.
//! - [`SchemaNode`] — request/response schema trees, deduplicated by
//!   [`SchemaNormalizer`] and compared by the [`Diff`] trait at a
//!   [`DiffLevel`].
//!
//! Validation ([`validate_tree`]) catches structural errors such as name
//! collisions and unsorted versions. [`merge_help`] reconciles help text
//! from external sources.
//!
//! # Example
//!
//! ```
//! use command_catalog_core::*;
//!
//! let mut command = Command::new(vec!["vm".into(), "deallocate".into()]);
//! command.help = Some(Help::new("Deallocate a VM so that computing resources are no longer allocated."));
//! command
//!     .version_or_insert("2017-03-30")
//!     .resources
//!     .push(Resource::new(
//!         Plane::Management,
//!         "/subscriptions/{}/resourcegroups/{}/providers/microsoft.compute/virtualmachines/{}/deallocate",
//!         "2017-03-30",
//!     ));
//!
//! let mut vm = CommandGroup::new(vec!["vm".into()]);
//! vm.commands.insert("deallocate", command);
//! let mut tree = CommandTree::default();
//! tree.root.command_groups.insert("vm", vm);
//!
//! assert!(tree.find_command(&["vm", "deallocate"]).is_some());
//! assert!(validate_tree(&tree).is_empty());
//! ```

mod content;
mod diff;
mod lazy;
mod merge;
mod normalize;
mod schema;
mod tree;
mod types;
mod validate;

pub use content::{RequestBody, ResponseBody};
pub use diff::{Diff, DiffEntry, DiffLevel, SchemaDiff};
pub use lazy::{Lazy, LazyMap, Locator};
pub use merge::merge_help;
pub use normalize::{ClassRegistry, Normalize, SchemaNormalizer, normalize_schema};
pub use schema::*;
pub use tree::CommandTree;
pub use types::*;
pub use validate::{ValidationError, validate_tree};
