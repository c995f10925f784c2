//! Help text reconciliation.
//!
//! External sources (generated documentation, API descriptions) refresh the
//! help of existing groups and commands. Only what the source actually
//! provides is taken: an empty short summary or an empty line list never
//! erases local text.
//!
//! # Example
//!
//! ```
//! use command_catalog_core::*;
//!
//! let mut local = Some(Help::new("Old summary.").with_lines(["Keep me."]));
//! merge_help(&mut local, Some(&Help::new("New summary.")));
//!
//! let help = local.unwrap();
//! assert_eq!(help.short, "New summary.");
//! assert_eq!(help.lines, Some(vec!["Keep me.".to_string()]));
//! ```

use crate::Help;

/// Merges `external` help into `local`.
///
/// A missing local help is created only when the external one carries text.
/// The short summary is replaced only by a non-empty one, and the detail
/// lines only by a non-empty list.
pub fn merge_help(local: &mut Option<Help>, external: Option<&Help>) {
    let Some(external) = external else {
        return;
    };
    let lines = external.lines.as_ref().filter(|l| !l.is_empty());
    if !external.has_short() && lines.is_none() {
        return;
    }
    let help = local.get_or_insert_with(Help::default);
    if external.has_short() {
        help.short = external.short.clone();
    }
    if let Some(lines) = lines {
        help.lines = Some(lines.clone());
    }
}
