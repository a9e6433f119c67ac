//! MCP resources exposed by the server.
//!
//! - `bugsnag://organizations`: organizations of the current user
//! - `bugsnag://projects/{id}`: a single project
//! - `bugsnag://projects/{project_id}/events/{id}`: a single event
//!
//! Resource reads are direct reads: any failure (unknown URI, missing ID,
//! backend error) is reported to the client as a JSON-RPC error rather than
//! as content.

use std::sync::Arc;

use bugsnag_core::IncidentProvider;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::ids::{extract_ids, IdError};
use crate::protocol::{
    JsonRpcError, ResourceContents, ResourceDefinition, ResourceTemplateDefinition,
};

pub const ORGANIZATIONS_URI: &str = "bugsnag://organizations";
pub const PROJECT_TEMPLATE_URI: &str = "bugsnag://projects/{id}";
pub const EVENT_TEMPLATE_URI: &str = "bugsnag://projects/{project_id}/events/{id}";

pub const JSON_MIME_TYPE: &str = "application/json";

const PROJECTS_SEGMENT: &str = "projects";
const EVENTS_SEGMENT: &str = "events";

/// Which handler serves a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Organizations,
    Project,
    Event,
}

/// Static description of a resource or resource template.
#[derive(Debug, Clone, Copy)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    /// Concrete URI, or URI template with `{name}` placeholders
    pub uri: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub mime_type: &'static str,
}

static DESCRIPTORS: [ResourceDescriptor; 3] = [
    ResourceDescriptor {
        kind: ResourceKind::Organizations,
        uri: ORGANIZATIONS_URI,
        name: "Bugsnag Organizations",
        description: "Retrieves a list of Bugsnag organizations",
        mime_type: JSON_MIME_TYPE,
    },
    ResourceDescriptor {
        kind: ResourceKind::Project,
        uri: PROJECT_TEMPLATE_URI,
        name: "Bugsnag Project",
        description: "Retrieves a Bugsnag project by ID",
        mime_type: JSON_MIME_TYPE,
    },
    ResourceDescriptor {
        kind: ResourceKind::Event,
        uri: EVENT_TEMPLATE_URI,
        name: "Bugsnag Event",
        description: "Retrieves a Bugsnag event by ID",
        mime_type: JSON_MIME_TYPE,
    },
];

impl ResourceDescriptor {
    /// Whether the URI contains placeholders.
    pub fn is_template(&self) -> bool {
        self.uri.contains('{')
    }

    /// Whether a concrete request URI is served by this descriptor.
    ///
    /// Literal segments must be equal and placeholders must match a non-empty
    /// segment. A single trailing slash on the request is ignored.
    pub fn matches(&self, uri: &str) -> bool {
        let uri = uri.strip_suffix('/').unwrap_or(uri);
        if !self.is_template() {
            return uri == self.uri;
        }

        let pattern: Vec<&str> = self.uri.split('/').collect();
        let actual: Vec<&str> = uri.split('/').collect();

        pattern.len() == actual.len()
            && pattern.iter().zip(&actual).all(|(expected, got)| {
                if expected.starts_with('{') && expected.ends_with('}') {
                    !got.is_empty()
                } else {
                    expected == got
                }
            })
    }

    fn to_definition(self) -> ResourceDefinition {
        ResourceDefinition {
            uri: self.uri.to_string(),
            name: self.name.to_string(),
            description: self.description.to_string(),
            mime_type: self.mime_type.to_string(),
        }
    }

    fn to_template_definition(self) -> ResourceTemplateDefinition {
        ResourceTemplateDefinition {
            uri_template: self.uri.to_string(),
            name: self.name.to_string(),
            description: self.description.to_string(),
            mime_type: self.mime_type.to_string(),
        }
    }
}

/// Failure while reading a resource.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("resource URI not provided in request")]
    MissingUri,

    #[error("unknown resource: {0}")]
    NotFound(String),

    #[error("failed to extract IDs from URI: {0}")]
    Extraction(#[from] IdError),

    #[error("failed to retrieve {what}: {source}")]
    Backend {
        what: &'static str,
        #[source]
        source: bugsnag_core::Error,
    },

    #[error("failed to marshal {what}: {source}")]
    Serialization {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ResourceError {
    /// Map the failure to the JSON-RPC error returned for a `resources/read`.
    pub fn to_rpc_error(&self, uri: &str) -> JsonRpcError {
        let message = self.to_string();
        match self {
            ResourceError::MissingUri => JsonRpcError::invalid_params(&message),
            ResourceError::NotFound(_) | ResourceError::Extraction(_) => {
                JsonRpcError::resource_not_found(uri, &message)
            }
            ResourceError::Backend {
                source: bugsnag_core::Error::NotFound(_),
                ..
            } => JsonRpcError::resource_not_found(uri, &message),
            ResourceError::Backend { .. } | ResourceError::Serialization { .. } => {
                JsonRpcError::internal_error(&message)
            }
        }
    }
}

/// Serves resource reads against a provider.
pub struct ResourceCatalog {
    provider: Arc<dyn IncidentProvider>,
}

impl ResourceCatalog {
    /// Create a catalog backed by the given provider.
    pub fn new(provider: Arc<dyn IncidentProvider>) -> Self {
        Self { provider }
    }

    /// Concrete resources for `resources/list`.
    pub fn resources(&self) -> Vec<ResourceDefinition> {
        DESCRIPTORS
            .iter()
            .filter(|d| !d.is_template())
            .map(|d| d.to_definition())
            .collect()
    }

    /// Resource templates for `resources/templates/list`.
    pub fn templates(&self) -> Vec<ResourceTemplateDefinition> {
        DESCRIPTORS
            .iter()
            .filter(|d| d.is_template())
            .map(|d| d.to_template_definition())
            .collect()
    }

    /// Find the descriptor serving a URI. Concrete URIs take precedence.
    pub fn route(uri: &str) -> Result<&'static ResourceDescriptor, ResourceError> {
        DESCRIPTORS
            .iter()
            .filter(|d| !d.is_template())
            .chain(DESCRIPTORS.iter().filter(|d| d.is_template()))
            .find(|d| d.matches(uri))
            .ok_or_else(|| ResourceError::NotFound(uri.to_string()))
    }

    /// Read a resource.
    pub async fn read(&self, uri: &str) -> Result<Vec<ResourceContents>, ResourceError> {
        if uri.is_empty() {
            return Err(ResourceError::MissingUri);
        }

        let descriptor = Self::route(uri)?;
        debug!(uri = uri, kind = ?descriptor.kind, "Reading resource");

        match descriptor.kind {
            ResourceKind::Organizations => self.read_organizations().await,
            ResourceKind::Project => self.read_project(uri).await,
            ResourceKind::Event => self.read_event(uri).await,
        }
    }

    async fn read_organizations(&self) -> Result<Vec<ResourceContents>, ResourceError> {
        let orgs = self
            .provider
            .list_organizations()
            .await
            .map_err(|source| ResourceError::Backend {
                what: "organizations",
                source,
            })?;

        Ok(vec![json_contents(ORGANIZATIONS_URI, "organizations", &orgs)?])
    }

    async fn read_project(&self, uri: &str) -> Result<Vec<ResourceContents>, ResourceError> {
        let ids = extract_ids(uri, &[PROJECTS_SEGMENT])?;
        let project_id = &ids[PROJECTS_SEGMENT];

        let project = self
            .provider
            .get_project(project_id)
            .await
            .map_err(|source| ResourceError::Backend {
                what: "project",
                source,
            })?;

        Ok(vec![json_contents(uri, "project", &project)?])
    }

    async fn read_event(&self, uri: &str) -> Result<Vec<ResourceContents>, ResourceError> {
        let ids = extract_ids(uri, &[PROJECTS_SEGMENT, EVENTS_SEGMENT])?;

        let event = self
            .provider
            .get_event(&ids[PROJECTS_SEGMENT], &ids[EVENTS_SEGMENT])
            .await
            .map_err(|source| ResourceError::Backend {
                what: "event",
                source,
            })?;

        Ok(vec![json_contents(uri, "event", &event)?])
    }
}

fn json_contents<T: Serialize>(
    uri: &str,
    what: &'static str,
    value: &T,
) -> Result<ResourceContents, ResourceError> {
    let text = serde_json::to_string(value)
        .map_err(|source| ResourceError::Serialization { what, source })?;

    Ok(ResourceContents {
        uri: uri.to_string(),
        mime_type: JSON_MIME_TYPE.to_string(),
        text,
    })
}
