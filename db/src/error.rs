//! Error types for catalogue operations.
//!
//! Provides a unified error type covering every failure mode of the tree
//! manager and its storage: invalid paths, naming conflicts, reconciliation
//! mismatches, verification failures, and I/O or parse errors.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Kind of tree node a violation or conflict refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    CommandGroup,
    Command,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::CommandGroup => f.write_str("command group"),
            NodeKind::Command => f.write_str("command"),
        }
    }
}

/// One problem found by [`CommandTreeManager::verify`](crate::CommandTreeManager::verify).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub message: String,
}

/// Parse failure in a backing document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {reason}")]
pub struct DocumentError {
    /// 1-based line number; 0 when the failure is not tied to a line.
    pub line: usize,
    pub reason: String,
}

impl DocumentError {
    pub fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

/// Errors that can occur during catalogue operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A path is too short or addresses the reserved root.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The name is already taken by a node of the other kind.
    #[error("name conflict: {path} is already a {existing}")]
    NameConflict { path: String, existing: NodeKind },

    /// The node cannot be deleted while it still has content.
    #[error("cannot delete {path}: {reason}")]
    Conflict { path: String, reason: String },

    /// External metadata disagrees with the local tree.
    #[error("{message}: expected {expected}, actual {actual}")]
    Validation {
        message: String,
        expected: String,
        actual: String,
    },

    /// Tree verification failed; keyed by dotted node path.
    #[error("verification failed for {} node(s)", .0.len())]
    Verification(BTreeMap<String, Violation>),

    /// A placeholder's backing document could not be resolved.
    #[error("node unavailable: {0}")]
    NodeUnavailable(String),

    /// The authoritative index is malformed.
    #[error("invalid index: {0}")]
    InvalidIndex(String),

    /// A backing document failed to parse.
    #[error("invalid document {uri}: {source}")]
    Document {
        uri: String,
        #[source]
        source: DocumentError,
    },

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Convenience alias for results with [`CatalogError`].
pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = CatalogError::NameConflict {
            path: "vm start".into(),
            existing: NodeKind::Command,
        };
        assert_eq!(err.to_string(), "name conflict: vm start is already a command");

        let err = CatalogError::Document {
            uri: "/Commands/vm/readme.md".into(),
            source: DocumentError::new(3, "expected '## Versions'"),
        };
        assert_eq!(
            err.to_string(),
            "invalid document /Commands/vm/readme.md: line 3: expected '## Versions'"
        );
    }

    #[test]
    fn test_violation_serializes_type_key() {
        let violation = Violation {
            kind: NodeKind::CommandGroup,
            message: "Miss short summary.".into(),
        };
        let json = serde_json::to_value(&violation).unwrap();
        assert_eq!(json["type"], "commandGroup");
    }
}
