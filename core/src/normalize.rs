//! Class deduplication for schema trees.
//!
//! Cloud API descriptions reuse named type definitions heavily. Before a
//! command's schemas are persisted, every node carrying a `cls` marker is
//! checked against a per-document [`ClassRegistry`]: the first occurrence
//! becomes the canonical definition and every later occurrence is replaced
//! by a [`ClassReference`](crate::ClassReference) to it.
//!
//! The registry is an explicit value owned by one [`SchemaNormalizer`], so
//! two documents never share class state.
//!
//! # Examples
//!
//! ```
//! use command_catalog_core::*;
//!
//! let tag = || SchemaNode::object(vec![SchemaNode::string("key")]).with_cls("Tag");
//! let mut body = SchemaNode::object(vec![
//!     tag().named("primary"),
//!     tag().named("secondary"),
//! ]);
//!
//! let mut normalizer = SchemaNormalizer::new();
//! normalizer.normalize(&mut body);
//! let classes = normalizer.finish().unwrap();
//!
//! let SchemaKind::Object(obj) = &body.kind else { unreachable!() };
//! assert_eq!(obj.props[0].cls.as_deref(), Some("Tag"));
//! assert_eq!(obj.props[1].class_name(), Some("Tag"));
//! assert_eq!(classes.canonical_path("Tag"), Some("$.primary"));
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::schema::{Discriminator, SchemaKind, SchemaNode};
use crate::validate::ValidationError;

/// Class context for one document's normalization pass.
///
/// Records where each class is canonically defined and which classes are
/// referenced, so integrity (every reference has exactly one definition) can
/// be checked rather than assumed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassRegistry {
    defined: BTreeMap<String, String>,
    referenced: BTreeSet<String>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `cls` as canonically defined at `path`. Returns `false` and
    /// leaves the registry untouched if it was already defined.
    pub fn define(&mut self, cls: &str, path: &str) -> bool {
        if self.defined.contains_key(cls) {
            return false;
        }
        self.defined.insert(cls.to_string(), path.to_string());
        true
    }

    pub fn is_defined(&self, cls: &str) -> bool {
        self.defined.contains_key(cls)
    }

    pub fn note_reference(&mut self, cls: &str) {
        self.referenced.insert(cls.to_string());
    }

    /// Schema path of the canonical definition.
    pub fn canonical_path(&self, cls: &str) -> Option<&str> {
        self.defined.get(cls).map(String::as_str)
    }

    pub fn defined(&self) -> impl Iterator<Item = &str> {
        self.defined.keys().map(String::as_str)
    }

    pub fn referenced(&self) -> impl Iterator<Item = &str> {
        self.referenced.iter().map(String::as_str)
    }

    /// Referenced classes with no canonical definition in this document.
    pub fn missing(&self) -> Vec<&str> {
        self.referenced
            .iter()
            .filter(|cls| !self.defined.contains_key(*cls))
            .map(String::as_str)
            .collect()
    }

    /// Fails with one error per missing definition.
    pub fn check(&self) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<ValidationError> = self
            .missing()
            .into_iter()
            .map(|cls| ValidationError::MissingClassDefinition(cls.to_string()))
            .collect();
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Anything that owns schema trees to deduplicate.
pub trait Normalize {
    fn normalize(&mut self, classes: &mut ClassRegistry);
}

impl Normalize for SchemaNode {
    fn normalize(&mut self, classes: &mut ClassRegistry) {
        normalize_node(self, "$", classes);
    }
}

/// Runs normalization over every body of one document with a shared
/// [`ClassRegistry`].
#[derive(Debug, Default)]
pub struct SchemaNormalizer {
    classes: ClassRegistry,
}

impl SchemaNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes `target` against the classes seen so far.
    pub fn normalize<N: Normalize + ?Sized>(&mut self, target: &mut N) -> &mut Self {
        target.normalize(&mut self.classes);
        self
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.classes
    }

    /// Ends the pass, checking reference integrity.
    pub fn finish(self) -> Result<ClassRegistry, Vec<ValidationError>> {
        self.classes.check()?;
        Ok(self.classes)
    }
}

/// Normalizes a single tree in its own class context.
pub fn normalize_schema(node: &mut SchemaNode) -> ClassRegistry {
    let mut classes = ClassRegistry::new();
    node.normalize(&mut classes);
    classes
}

pub(crate) fn normalize_node(node: &mut SchemaNode, path: &str, classes: &mut ClassRegistry) {
    if !node.is_reference() {
        if let Some(cls) = node.cls.as_deref() {
            if !classes.define(cls, path) {
                classes.note_reference(cls);
                if let Some(reference) = node.to_reference() {
                    *node = reference;
                }
                return;
            }
        }
    }

    if let SchemaKind::ClassRef(reference) = &node.kind {
        classes.note_reference(&reference.class);
        return;
    }
    if node.frozen {
        return;
    }

    match &mut node.kind {
        SchemaKind::Scalar(_) | SchemaKind::ClassRef(_) => {}
        SchemaKind::Object(obj) => {
            normalize_props(&mut obj.props, path, classes);
            for disc in &mut obj.discriminators {
                normalize_discriminator(disc, path, classes);
            }
            if let Some(item) = obj.additional_props.as_deref_mut() {
                normalize_node(item, &format!("{path}{{}}"), classes);
            }
        }
        SchemaKind::Array(arr) => {
            normalize_node(&mut arr.item, &format!("{path}[]"), classes);
        }
    }
}

fn normalize_props(props: &mut [SchemaNode], path: &str, classes: &mut ClassRegistry) {
    for prop in props {
        let child = format!("{path}.{}", prop.name);
        normalize_node(prop, &child, classes);
    }
}

fn normalize_discriminator(disc: &mut Discriminator, path: &str, classes: &mut ClassRegistry) {
    let path = format!("{path}[{}]", disc.key());
    normalize_props(&mut disc.props, &path, classes);
    for nested in &mut disc.discriminators {
        normalize_discriminator(nested, &path, classes);
    }
}
