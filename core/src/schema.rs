//! Request/response schema model.
//!
//! A [`SchemaNode`] carries the attributes every position shares (property
//! name, required flag, bound argument variable, class marker) and a closed
//! [`SchemaKind`] for the shape. Consumers match on the kind exhaustively.
//!
//! A [`ClassReference`] names a canonical definition elsewhere in the same
//! document rather than pointing at it, so stored trees stay acyclic even for
//! recursive types. Resolving a reference needs the document's
//! [`ClassRegistry`](crate::ClassRegistry).
//!
//! # Examples
//!
//! ```
//! use command_catalog_core::*;
//!
//! let tag = SchemaNode::object(vec![
//!     SchemaNode::string("key").required(),
//!     SchemaNode::string("value"),
//! ])
//! .named("tag")
//! .with_cls("Tag");
//!
//! let reference = tag.to_reference().unwrap();
//! assert_eq!(reference.name, "tag");
//! assert_eq!(reference.class_name(), Some("Tag"));
//! assert!(reference.cls.is_none());
//! ```

use serde::{Deserialize, Serialize};

/// Primitive value type of a scalar schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    String,
    Integer,
    Float,
    Boolean,
    /// Arbitrary JSON value.
    Any,
}

impl ScalarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::String => "string",
            ScalarType::Integer => "integer",
            ScalarType::Float => "float",
            ScalarType::Boolean => "boolean",
            ScalarType::Any => "any",
        }
    }
}

/// Optional value constraints on a scalar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalarFormat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
}

impl ScalarFormat {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarSchema {
    #[serde(rename = "type")]
    pub ty: ScalarType,
    #[serde(default, skip_serializing_if = "ScalarFormat::is_empty")]
    pub format: ScalarFormat,
    /// Allowed values; empty means unrestricted.
    #[serde(default, rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

/// An object variant selected by the value of a discriminator property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discriminator {
    /// Property whose value selects this variant.
    pub property: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<SchemaNode>,
    /// Nested variants of this variant.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discriminators: Vec<Discriminator>,
}

impl Discriminator {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            props: Vec::new(),
            discriminators: Vec::new(),
        }
    }

    pub fn with_prop(mut self, prop: SchemaNode) -> Self {
        self.props.push(prop);
        self
    }

    /// Key identifying this variant among its siblings.
    pub fn key(&self) -> String {
        format!("{}={}", self.property, self.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSchema {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<SchemaNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discriminators: Vec<Discriminator>,
    /// Schema of values under arbitrary extra keys (a dictionary).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_props: Option<Box<SchemaNode>>,
}

impl ObjectSchema {
    pub fn find_prop(&self, name: &str) -> Option<&SchemaNode> {
        self.props.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArraySchema {
    pub item: Box<SchemaNode>,
}

/// Name of a canonical class definition in the same document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassReference {
    pub class: String,
}

/// Shape of a schema node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SchemaKind {
    Scalar(ScalarSchema),
    Object(ObjectSchema),
    Array(ArraySchema),
    #[serde(rename = "cls")]
    ClassRef(ClassReference),
}

impl SchemaKind {
    /// Short type label used in diff messages (`@Name` for references).
    pub fn type_label(&self) -> String {
        match self {
            SchemaKind::Scalar(s) => s.ty.as_str().to_string(),
            SchemaKind::Object(_) => "object".to_string(),
            SchemaKind::Array(_) => "array".to_string(),
            SchemaKind::ClassRef(r) => format!("@{}", r.class),
        }
    }
}

/// One position in a request or response schema tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    /// Property name; empty for a body root or an array item.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
    /// Argument variable this position binds to (e.g. `$parameters.name`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg: Option<String>,
    /// Class name marking this node as a deduplication candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cls: Option<String>,
    /// Already normalized; its subtree is not traversed again.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub frozen: bool,
    #[serde(flatten)]
    pub kind: SchemaKind,
}

impl SchemaNode {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            name: String::new(),
            required: false,
            read_only: false,
            arg: None,
            cls: None,
            frozen: false,
            kind,
        }
    }

    pub fn scalar(ty: ScalarType) -> Self {
        Self::new(SchemaKind::Scalar(ScalarSchema {
            ty,
            format: ScalarFormat::default(),
            enum_values: Vec::new(),
        }))
    }

    /// Shorthand for a named string property.
    pub fn string(name: impl Into<String>) -> Self {
        Self::scalar(ScalarType::String).named(name)
    }

    pub fn object(props: Vec<SchemaNode>) -> Self {
        Self::new(SchemaKind::Object(ObjectSchema {
            props,
            ..Default::default()
        }))
    }

    pub fn array(item: SchemaNode) -> Self {
        Self::new(SchemaKind::Array(ArraySchema {
            item: Box::new(item),
        }))
    }

    pub fn class_ref(class: impl Into<String>) -> Self {
        Self::new(SchemaKind::ClassRef(ClassReference {
            class: class.into(),
        }))
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.arg = Some(arg.into());
        self
    }

    pub fn with_cls(mut self, cls: impl Into<String>) -> Self {
        self.cls = Some(cls.into());
        self
    }

    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    /// Adds a discriminated variant; no-op unless this is an object.
    pub fn with_discriminator(mut self, disc: Discriminator) -> Self {
        if let SchemaKind::Object(obj) = &mut self.kind {
            obj.discriminators.push(disc);
        }
        self
    }

    /// Sets the dictionary value schema; no-op unless this is an object.
    pub fn with_additional_props(mut self, item: SchemaNode) -> Self {
        if let SchemaKind::Object(obj) = &mut self.kind {
            obj.additional_props = Some(Box::new(item));
        }
        self
    }

    /// Target class of a reference node.
    pub fn class_name(&self) -> Option<&str> {
        match &self.kind {
            SchemaKind::ClassRef(r) => Some(&r.class),
            _ => None,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.kind, SchemaKind::ClassRef(_))
    }

    /// Builds the reference that replaces a repeated class occurrence.
    ///
    /// Position attributes (name, required, read-only, argument binding)
    /// are kept; the shape is replaced by a reference to `cls`. Returns
    /// `None` for nodes without a class.
    pub fn to_reference(&self) -> Option<SchemaNode> {
        let class = self.cls.as_ref()?;
        Some(SchemaNode {
            name: self.name.clone(),
            required: self.required,
            read_only: self.read_only,
            arg: self.arg.clone(),
            cls: None,
            frozen: false,
            kind: SchemaKind::ClassRef(ClassReference {
                class: class.clone(),
            }),
        })
    }

    /// Visits this node and every descendant, depth first, parents first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a SchemaNode)) {
        visit(self);
        match &self.kind {
            SchemaKind::Scalar(_) | SchemaKind::ClassRef(_) => {}
            SchemaKind::Object(obj) => {
                for prop in &obj.props {
                    prop.walk(visit);
                }
                for disc in &obj.discriminators {
                    walk_discriminator(disc, visit);
                }
                if let Some(item) = &obj.additional_props {
                    item.walk(visit);
                }
            }
            SchemaKind::Array(arr) => arr.item.walk(visit),
        }
    }
}

fn walk_discriminator<'a>(disc: &'a Discriminator, visit: &mut dyn FnMut(&'a SchemaNode)) {
    for prop in &disc.props {
        prop.walk(visit);
    }
    for nested in &disc.discriminators {
        walk_discriminator(nested, visit);
    }
}
