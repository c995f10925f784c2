//! HTTP body descriptions attached to a command operation.

use serde::{Deserialize, Serialize};

use crate::diff::{Diff, DiffLevel, SchemaDiff};
use crate::normalize::{ClassRegistry, Normalize, normalize_node};
use crate::schema::SchemaNode;

/// JSON request body, either built from a schema or forwarded from a
/// variable named by `ref`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaNode>,
}

impl RequestBody {
    pub fn from_schema(schema: SchemaNode) -> Self {
        Self {
            reference: None,
            schema: Some(schema),
        }
    }
}

/// JSON response body; `var` names the variable the payload is stored in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var: Option<String>,
    pub schema: SchemaNode,
}

impl ResponseBody {
    pub fn new(schema: SchemaNode) -> Self {
        Self { var: None, schema }
    }

    pub fn with_var(mut self, var: impl Into<String>) -> Self {
        self.var = Some(var.into());
        self
    }
}

impl Normalize for RequestBody {
    fn normalize(&mut self, classes: &mut ClassRegistry) {
        if let Some(schema) = &mut self.schema {
            normalize_node(schema, "$request", classes);
        }
    }
}

impl Normalize for ResponseBody {
    fn normalize(&mut self, classes: &mut ClassRegistry) {
        normalize_node(&mut self.schema, "$response", classes);
    }
}

impl Diff for RequestBody {
    fn diff(&self, old: &Self, level: DiffLevel) -> SchemaDiff {
        let mut diff = SchemaDiff::new();
        match (&self.reference, &old.reference) {
            (Some(_), None) | (None, Some(_)) => {
                diff.insert_change("ref", format!("{:?} != {:?}", old.reference, self.reference));
            }
            (Some(new), Some(prev)) if new != prev && level.includes_associate() => {
                diff.insert_change("ref", format!("{prev} != {new}"));
            }
            _ => {}
        }
        match (&self.schema, &old.schema) {
            (Some(new), Some(prev)) => diff.insert_nested("schema", new.diff(prev, level)),
            (Some(_), None) => diff.insert_change("schema", "None != present"),
            (None, Some(_)) => diff.insert_change("schema", "present != None"),
            (None, None) => {}
        }
        diff
    }
}

impl Diff for ResponseBody {
    fn diff(&self, old: &Self, level: DiffLevel) -> SchemaDiff {
        let mut diff = SchemaDiff::new();
        diff.insert_nested("schema", self.schema.diff(&old.schema, level));
        if level.includes_associate() && self.var != old.var {
            diff.insert_change("var", format!("{:?} != {:?}", old.var, self.var));
        }
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::SchemaNormalizer;
    use crate::schema::SchemaKind;

    fn tag() -> SchemaNode {
        SchemaNode::object(vec![SchemaNode::string("key")]).with_cls("Tag")
    }

    #[test]
    fn test_request_ref_presence_is_breaking() {
        let old = RequestBody::from_schema(tag());
        let mut new = old.clone();
        new.reference = Some("$Instance".into());
        let diff = new.diff(&old, DiffLevel::BreakingChange);
        assert!(diff.contains_key("ref"));
    }

    #[test]
    fn test_request_ref_rename_is_associate() {
        let old = RequestBody {
            reference: Some("$Instance".into()),
            schema: None,
        };
        let new = RequestBody {
            reference: Some("$Body".into()),
            schema: None,
        };
        assert!(new.diff(&old, DiffLevel::BreakingChange).is_empty());
        assert!(new.diff(&old, DiffLevel::Associate).contains_key("ref"));
    }

    #[test]
    fn test_response_var_is_associate() {
        let old = ResponseBody::new(tag()).with_var("$Instance");
        let new = ResponseBody::new(tag()).with_var("$Result");
        assert!(new.diff(&old, DiffLevel::BreakingChange).is_empty());
        assert!(new.diff(&old, DiffLevel::Associate).contains_key("var"));
    }

    fn requests() -> Vec<RequestBody> {
        vec![
            RequestBody::default(),
            RequestBody::from_schema(tag()),
            RequestBody::from_schema(SchemaNode::object(vec![tag().named("tag").required()])),
            RequestBody {
                reference: Some("$Instance".into()),
                schema: None,
            },
            RequestBody {
                reference: Some("$Body".into()),
                schema: Some(SchemaNode::class_ref("Tag")),
            },
        ]
    }

    fn responses() -> Vec<ResponseBody> {
        vec![
            ResponseBody::new(tag()),
            ResponseBody::new(tag()).with_var("$Instance"),
            ResponseBody::new(SchemaNode::array(SchemaNode::class_ref("Tag"))).with_var("$Instance"),
            ResponseBody::new(SchemaNode::object(vec![]).with_additional_props(tag())),
        ]
    }

    #[test]
    fn test_bodies_reflexive() {
        for level in [DiffLevel::Associate, DiffLevel::BreakingChange] {
            for body in requests() {
                assert!(body.diff(&body.clone(), level).is_empty(), "{body:?} at {level:?}");
            }
            for body in responses() {
                assert!(body.diff(&body.clone(), level).is_empty(), "{body:?} at {level:?}");
            }
        }
    }

    #[test]
    fn test_bodies_associate_superset_of_breaking() {
        fn check<T: Diff + std::fmt::Debug>(bodies: &[T]) {
            for new in bodies {
                for old in bodies {
                    let breaking = new.diff(old, DiffLevel::BreakingChange).flatten();
                    let associate = new.diff(old, DiffLevel::Associate).flatten();
                    for (key, message) in &breaking {
                        assert_eq!(associate.get(key), Some(message), "{key} for {old:?} -> {new:?}");
                    }
                }
            }
        }
        check(&requests());
        check(&responses());
    }

    #[test]
    fn test_bodies_share_one_class_context() {
        let mut request = RequestBody::from_schema(tag());
        let mut response = ResponseBody::new(SchemaNode::object(vec![tag().named("tag")]));

        let mut normalizer = SchemaNormalizer::new();
        normalizer.normalize(&mut request).normalize(&mut response);
        let classes = normalizer.finish().unwrap();

        assert_eq!(classes.canonical_path("Tag"), Some("$request"));
        let SchemaKind::Object(obj) = &response.schema.kind else {
            panic!("expected object")
        };
        assert_eq!(obj.props[0].class_name(), Some("Tag"));
    }
}
