//! Inputs describing groups and commands from an external workspace.
//!
//! A workspace editor owns its own representation of commands; these are the
//! parts of it the catalogue consumes when reconciling.

use command_catalog_core::{Example, Help, Plane, Resource};
use serde::{Deserialize, Serialize};

/// One API resource as seen by the workspace; the plane comes from context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subresource: Option<String>,
}

impl ResourceDescriptor {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            subresource: None,
        }
    }

    /// Binds the descriptor to a plane.
    pub fn to_resource(&self, plane: Plane) -> Resource {
        let mut resource = Resource::new(plane, &self.id, &self.version);
        resource.subresource = self.subresource.clone();
        resource
    }
}

/// Resource set of one command version, as generated from API descriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDescriptor {
    pub version: String,
    pub resources: Vec<ResourceDescriptor>,
}

/// Workspace view of a command group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalCommandGroup {
    pub names: Vec<String>,
    #[serde(default)]
    pub help: Option<Help>,
}

/// Workspace view of one version of a command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalCommand {
    pub names: Vec<String>,
    pub version: String,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub help: Option<Help>,
    #[serde(default)]
    pub resources: Vec<ResourceDescriptor>,
    #[serde(default)]
    pub examples: Vec<Example>,
}
