//! Structural comparison of schema trees at two severity levels.
//!
//! A diff is computed from a new value against an old one. Changes that can
//! break existing callers (type, requiredness, formats, discriminator sets)
//! are reported at every level; cosmetic changes (argument bindings, class
//! names, optional properties appearing or disappearing) only when the
//! requested level is [`DiffLevel::Associate`].
//!
//! # Examples
//!
//! ```
//! use command_catalog_core::*;
//!
//! let old = SchemaNode::object(vec![SchemaNode::string("name").with_arg("$a.name")]);
//! let new = SchemaNode::object(vec![SchemaNode::string("name").with_arg("$b.name")]);
//!
//! assert!(new.diff(&old, DiffLevel::BreakingChange).is_empty());
//! let diff = new.diff(&old, DiffLevel::Associate);
//! assert_eq!(
//!     diff.flatten().get("props.name.arg").map(String::as_str),
//!     Some("$a.name != $b.name")
//! );
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use serde::Serialize;

use crate::schema::{ClassReference, Discriminator, ObjectSchema, SchemaKind, SchemaNode};

/// Minimum severity a difference must have to be reported.
///
/// Ordered so that a lower level reports more: everything reported at
/// `BreakingChange` is also reported at `Associate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiffLevel {
    Associate,
    BreakingChange,
}

impl DiffLevel {
    pub fn includes_associate(self) -> bool {
        self <= DiffLevel::Associate
    }
}

impl std::str::FromStr for DiffLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "associate" => Ok(DiffLevel::Associate),
            "breaking" | "breaking-change" => Ok(DiffLevel::BreakingChange),
            other => Err(format!("unknown diff level: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DiffEntry {
    /// Human-readable description, usually `"old != new"`.
    Change(String),
    Nested(SchemaDiff),
}

/// Mapping from a changed attribute or child to its description.
///
/// Only non-empty nested diffs are ever stored, so an empty diff means the
/// compared values are equivalent at the requested level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SchemaDiff(BTreeMap<String, DiffEntry>);

impl SchemaDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&DiffEntry> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DiffEntry)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn insert_change(&mut self, key: impl Into<String>, description: impl Into<String>) {
        self.0.insert(key.into(), DiffEntry::Change(description.into()));
    }

    /// Stores `nested` under `key` unless it is empty.
    pub fn insert_nested(&mut self, key: impl Into<String>, nested: SchemaDiff) {
        if !nested.is_empty() {
            self.0.insert(key.into(), DiffEntry::Nested(nested));
        }
    }

    /// Dotted path of every leaf change.
    pub fn flatten(&self) -> BTreeMap<String, String> {
        fn collect(diff: &SchemaDiff, prefix: &str, out: &mut BTreeMap<String, String>) {
            for (key, entry) in &diff.0 {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                match entry {
                    DiffEntry::Change(message) => {
                        out.insert(path, message.clone());
                    }
                    DiffEntry::Nested(nested) => collect(nested, &path, out),
                }
            }
        }
        let mut out = BTreeMap::new();
        collect(self, "", &mut out);
        out
    }
}

/// Values that can describe how they changed relative to an older version.
pub trait Diff {
    /// Differences of `self` (new) against `old` at `level`.
    fn diff(&self, old: &Self, level: DiffLevel) -> SchemaDiff;
}

fn changed<T: Debug + ?Sized>(old: &T, new: &T) -> String {
    format!("{old:?} != {new:?}")
}

fn changed_opt(old: Option<&str>, new: Option<&str>) -> String {
    format!("{} != {}", old.unwrap_or("None"), new.unwrap_or("None"))
}

impl Diff for ClassReference {
    fn diff(&self, old: &Self, level: DiffLevel) -> SchemaDiff {
        let mut diff = SchemaDiff::new();
        if level.includes_associate() && self.class != old.class {
            diff.insert_change("class", format!("@{} != @{}", old.class, self.class));
        }
        diff
    }
}

impl Diff for SchemaNode {
    fn diff(&self, old: &Self, level: DiffLevel) -> SchemaDiff {
        let mut diff = SchemaDiff::new();

        if self.required != old.required {
            diff.insert_change("required", changed(&old.required, &self.required));
        }
        if self.read_only != old.read_only {
            diff.insert_change("readOnly", changed(&old.read_only, &self.read_only));
        }

        match (&self.kind, &old.kind) {
            (SchemaKind::Scalar(new), SchemaKind::Scalar(prev)) => {
                if new.ty != prev.ty {
                    diff.insert_change("type", format!("{} != {}", prev.ty.as_str(), new.ty.as_str()));
                }
                if new.format != prev.format {
                    diff.insert_change("format", changed(&prev.format, &new.format));
                }
                if new.enum_values != prev.enum_values {
                    diff.insert_change("enum", changed(&prev.enum_values, &new.enum_values));
                }
            }
            (SchemaKind::Object(new), SchemaKind::Object(prev)) => {
                diff_object(new, prev, level, &mut diff);
            }
            (SchemaKind::Array(new), SchemaKind::Array(prev)) => {
                diff.insert_nested("item", new.item.diff(&prev.item, level));
            }
            (SchemaKind::ClassRef(new), SchemaKind::ClassRef(prev)) => {
                if let Some(DiffEntry::Change(message)) = new.diff(prev, level).get("class") {
                    diff.insert_change("type", message.clone());
                }
            }
            (new, prev) => {
                diff.insert_change("type", format!("{} != {}", prev.type_label(), new.type_label()));
            }
        }

        if level.includes_associate() {
            if self.arg != old.arg {
                diff.insert_change("arg", changed_opt(old.arg.as_deref(), self.arg.as_deref()));
            }
            if self.cls != old.cls {
                diff.insert_change("cls", changed_opt(old.cls.as_deref(), self.cls.as_deref()));
            }
        }
        diff
    }
}

fn diff_object(new: &ObjectSchema, old: &ObjectSchema, level: DiffLevel, diff: &mut SchemaDiff) {
    diff.insert_nested("props", diff_props(&new.props, &old.props, level));

    let old_keys: BTreeSet<String> = old.discriminators.iter().map(Discriminator::key).collect();
    let new_keys: BTreeSet<String> = new.discriminators.iter().map(Discriminator::key).collect();
    if old_keys != new_keys {
        diff.insert_change("discriminators", changed(&old_keys, &new_keys));
    } else {
        diff.insert_nested(
            "discriminators",
            diff_discriminators(&new.discriminators, &old.discriminators, level),
        );
    }

    match (&new.additional_props, &old.additional_props) {
        (Some(new), Some(old)) => diff.insert_nested("additionalProps", new.diff(old, level)),
        (Some(_), None) => diff.insert_change("additionalProps", "None != present"),
        (None, Some(_)) => diff.insert_change("additionalProps", "present != None"),
        (None, None) => {}
    }
}

/// Compares discriminator lists whose key sets are known to match.
fn diff_discriminators(new: &[Discriminator], old: &[Discriminator], level: DiffLevel) -> SchemaDiff {
    let mut diff = SchemaDiff::new();
    for disc in new {
        let key = disc.key();
        let Some(prev) = old.iter().find(|d| d.key() == key) else {
            continue;
        };
        let mut nested = SchemaDiff::new();
        nested.insert_nested("props", diff_props(&disc.props, &prev.props, level));

        let old_keys: BTreeSet<String> = prev.discriminators.iter().map(Discriminator::key).collect();
        let new_keys: BTreeSet<String> = disc.discriminators.iter().map(Discriminator::key).collect();
        if old_keys != new_keys {
            nested.insert_change("discriminators", changed(&old_keys, &new_keys));
        } else {
            nested.insert_nested(
                "discriminators",
                diff_discriminators(&disc.discriminators, &prev.discriminators, level),
            );
        }
        diff.insert_nested(key, nested);
    }
    diff
}

fn diff_props(new: &[SchemaNode], old: &[SchemaNode], level: DiffLevel) -> SchemaDiff {
    let mut diff = SchemaDiff::new();
    for prev in old {
        match new.iter().find(|p| p.name == prev.name) {
            Some(prop) => diff.insert_nested(prop.name.clone(), prop.diff(prev, level)),
            None if prev.required => diff.insert_change(prev.name.clone(), "Miss required property"),
            None if level.includes_associate() => diff.insert_change(prev.name.clone(), "Miss property"),
            None => {}
        }
    }
    for prop in new {
        if old.iter().any(|p| p.name == prop.name) {
            continue;
        }
        if prop.required {
            diff.insert_change(prop.name.clone(), "New required property");
        } else if level.includes_associate() {
            diff.insert_change(prop.name.clone(), "New property");
        }
    }
    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ScalarFormat, ScalarSchema, ScalarType};

    fn sample() -> SchemaNode {
        SchemaNode::object(vec![
            SchemaNode::string("name").required().with_arg("$p.name"),
            SchemaNode::array(SchemaNode::scalar(ScalarType::Integer)).named("ports"),
            SchemaNode::class_ref("Tag").named("tag"),
        ])
        .with_discriminator(Discriminator::new("kind", "linux").with_prop(SchemaNode::string("distro")))
    }

    #[test]
    fn test_reflexive() {
        let node = sample();
        assert!(node.diff(&node, DiffLevel::Associate).is_empty());
        assert!(node.diff(&node, DiffLevel::BreakingChange).is_empty());
    }

    fn sku(values: &[&str], max_length: u64) -> SchemaNode {
        SchemaNode::new(SchemaKind::Scalar(ScalarSchema {
            ty: ScalarType::String,
            format: ScalarFormat {
                pattern: Some("^[A-Za-z_]+$".into()),
                min_length: Some(1),
                max_length: Some(max_length),
                ..Default::default()
            },
            enum_values: values.iter().map(|v| v.to_string()).collect(),
        }))
        .named("sku")
    }

    fn os_profile(release_required: bool) -> SchemaNode {
        let mut release = SchemaNode::string("release");
        if release_required {
            release = release.required();
        }
        let mut linux = Discriminator::new("kind", "linux").with_prop(SchemaNode::string("distro"));
        linux
            .discriminators
            .push(Discriminator::new("distro", "ubuntu").with_prop(release));
        SchemaNode::object(vec![SchemaNode::string("kind").required()])
            .with_discriminator(linux)
            .with_discriminator(Discriminator::new("kind", "windows"))
            .named("osProfile")
    }

    /// Schemas covering every node shape and attribute the differ looks at.
    fn shapes() -> Vec<SchemaNode> {
        let mut read_only = SchemaNode::scalar(ScalarType::Integer).named("count");
        read_only.read_only = true;
        let limits = SchemaNode::new(SchemaKind::Scalar(ScalarSchema {
            ty: ScalarType::Float,
            format: ScalarFormat {
                minimum: Some(0.5),
                maximum: Some(10.0),
                ..Default::default()
            },
            enum_values: Vec::new(),
        }));

        vec![
            sample(),
            sku(&["Standard", "Premium"], 64),
            sku(&["Standard"], 64),
            sku(&["Standard", "Premium"], 32),
            limits,
            read_only,
            SchemaNode::scalar(ScalarType::Any),
            SchemaNode::object(vec![SchemaNode::string("id")])
                .with_additional_props(SchemaNode::string("")),
            SchemaNode::object(vec![SchemaNode::string("id")])
                .with_additional_props(SchemaNode::scalar(ScalarType::Integer)),
            SchemaNode::object(vec![SchemaNode::string("id").required()]).with_cls("Resource"),
            os_profile(false),
            os_profile(true),
            SchemaNode::class_ref("Tag").named("tag").required(),
            SchemaNode::class_ref("Label").named("tag").required(),
            SchemaNode::array(SchemaNode::class_ref("Tag")).frozen(),
            SchemaNode::array(sku(&["Standard"], 64)).with_arg("$p.skus"),
        ]
    }

    #[test]
    fn test_reflexive_across_shapes() {
        for node in shapes() {
            for level in [DiffLevel::Associate, DiffLevel::BreakingChange] {
                let diff = node.diff(&node.clone(), level);
                assert!(diff.is_empty(), "{node:?} differs from itself at {level:?}: {diff:?}");
            }
        }
    }

    #[test]
    fn test_associate_superset_across_shapes() {
        let shapes = shapes();
        for new in &shapes {
            for old in &shapes {
                let breaking = new.diff(old, DiffLevel::BreakingChange).flatten();
                let associate = new.diff(old, DiffLevel::Associate).flatten();
                for (key, message) in &breaking {
                    assert_eq!(
                        associate.get(key),
                        Some(message),
                        "{key} reported only at breaking level for {old:?} -> {new:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_scalar_constraints_are_breaking() {
        let old = sku(&["Standard", "Premium"], 64);
        let narrowed = sku(&["Standard"], 64);
        let shorter = sku(&["Standard", "Premium"], 32);

        let diff = narrowed.diff(&old, DiffLevel::BreakingChange);
        assert!(diff.contains_key("enum"));
        assert!(!diff.contains_key("format"));
        let diff = shorter.diff(&old, DiffLevel::BreakingChange);
        assert!(diff.contains_key("format"));
        assert!(!diff.contains_key("enum"));
    }

    #[test]
    fn test_nested_discriminator_variant() {
        let flat = os_profile(true)
            .diff(&os_profile(false), DiffLevel::BreakingChange)
            .flatten();
        assert_eq!(
            flat.keys().collect::<Vec<_>>(),
            vec!["discriminators.kind=linux.discriminators.distro=ubuntu.props.release.required"]
        );
    }

    #[test]
    fn test_type_change_is_breaking() {
        let old = SchemaNode::string("size");
        let new = SchemaNode::scalar(ScalarType::Integer).named("size");
        let diff = new.diff(&old, DiffLevel::BreakingChange);
        assert_eq!(diff.get("type"), Some(&DiffEntry::Change("string != integer".into())));
    }

    #[test]
    fn test_inline_vs_reference_is_breaking() {
        let old = SchemaNode::object(vec![]);
        let new = SchemaNode::class_ref("Tag");
        let diff = new.diff(&old, DiffLevel::BreakingChange);
        assert_eq!(diff.get("type"), Some(&DiffEntry::Change("object != @Tag".into())));
    }

    #[test]
    fn test_reference_rename_is_associate_only() {
        let old = SchemaNode::class_ref("Tag");
        let new = SchemaNode::class_ref("ResourceTag");
        assert!(new.diff(&old, DiffLevel::BreakingChange).is_empty());
        let diff = new.diff(&old, DiffLevel::Associate);
        assert_eq!(diff.get("type"), Some(&DiffEntry::Change("@Tag != @ResourceTag".into())));
    }

    #[test]
    fn test_required_props() {
        let old = sample();
        let mut new = sample();
        let SchemaKind::Object(obj) = &mut new.kind else {
            panic!("expected object")
        };
        obj.props.retain(|p| p.name != "name");
        obj.props.push(SchemaNode::string("zone").required());
        obj.props.push(SchemaNode::string("note"));

        let breaking = new.diff(&old, DiffLevel::BreakingChange).flatten();
        assert_eq!(breaking.get("props.name").map(String::as_str), Some("Miss required property"));
        assert_eq!(breaking.get("props.zone").map(String::as_str), Some("New required property"));
        assert!(!breaking.contains_key("props.note"));

        let associate = new.diff(&old, DiffLevel::Associate).flatten();
        assert_eq!(associate.get("props.note").map(String::as_str), Some("New property"));
    }

    #[test]
    fn test_associate_superset_of_breaking() {
        let old = sample();
        let new = SchemaNode::object(vec![
            SchemaNode::string("name").with_arg("$q.name"),
            SchemaNode::array(SchemaNode::scalar(ScalarType::String)).named("ports"),
            SchemaNode::class_ref("Tag2").named("tag"),
        ]);
        let breaking = new.diff(&old, DiffLevel::BreakingChange).flatten();
        let associate = new.diff(&old, DiffLevel::Associate).flatten();

        assert!(breaking.contains_key("props.name.required"));
        assert!(breaking.contains_key("props.ports.item.type"));
        assert!(breaking.contains_key("discriminators"));
        for key in breaking.keys() {
            assert!(associate.contains_key(key), "{key} missing at associate level");
        }
        assert!(associate.contains_key("props.name.arg"));
        assert!(associate.contains_key("props.tag.type"));
    }

    #[test]
    fn test_nested_discriminator_change() {
        let old = sample();
        let new = SchemaNode::object(vec![
            SchemaNode::string("name").required().with_arg("$p.name"),
            SchemaNode::array(SchemaNode::scalar(ScalarType::Integer)).named("ports"),
            SchemaNode::class_ref("Tag").named("tag"),
        ])
        .with_discriminator(
            Discriminator::new("kind", "linux").with_prop(SchemaNode::string("distro").required()),
        );
        let flat = new.diff(&old, DiffLevel::BreakingChange).flatten();
        assert_eq!(
            flat.keys().collect::<Vec<_>>(),
            vec!["discriminators.kind=linux.props.distro.required"]
        );
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("associate".parse::<DiffLevel>(), Ok(DiffLevel::Associate));
        assert_eq!("breaking".parse::<DiffLevel>(), Ok(DiffLevel::BreakingChange));
        assert_eq!("breaking-change".parse::<DiffLevel>(), Ok(DiffLevel::BreakingChange));
        assert!("minor".parse::<DiffLevel>().is_err());
        assert!(DiffLevel::Associate < DiffLevel::BreakingChange);
    }
}
