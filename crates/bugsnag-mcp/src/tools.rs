//! MCP tool definitions and argument validation.
//!
//! Every tool call is parsed into a [`ToolRequest`] before any backend call
//! is made. Parsing fails fast with an error naming the offending parameter.

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::ids::{resolve_event_id, IdError};
use crate::protocol::ToolDefinition;

pub const GET_USER_ORGANIZATIONS: &str = "get_user_organizations";
pub const GET_USER_PROJECTS: &str = "get_user_projects";
pub const GET_PROJECT_EVENT: &str = "get_project_event";
pub const GET_PROJECT_EVENTS: &str = "get_project_events";

/// A named string parameter of a tool.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

/// Static description of a tool.
#[derive(Debug, Clone, Copy)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

static TOOLS: [ToolDescriptor; 4] = [
    ToolDescriptor {
        name: GET_USER_ORGANIZATIONS,
        description: "Retrieves the organizations for the current user from Bugsnag",
        params: &[],
    },
    ToolDescriptor {
        name: GET_USER_PROJECTS,
        description: "Retrieves the projects for the current user from Bugsnag",
        params: &[ParamSpec {
            name: "organization_id",
            required: true,
            description: "The ID of the organization to retrieve projects for",
        }],
    },
    ToolDescriptor {
        name: GET_PROJECT_EVENT,
        description: "Retrieves a specific event for a project from Bugsnag",
        params: &[
            ParamSpec {
                name: "project_id",
                required: true,
                description: "The ID of the project to retrieve the event for",
            },
            ParamSpec {
                name: "event_id",
                required: true,
                description: "The ID of the event, or a Bugsnag dashboard link containing an event_id query parameter",
            },
        ],
    },
    ToolDescriptor {
        name: GET_PROJECT_EVENTS,
        description: "Retrieves all events for a project from Bugsnag",
        params: &[ParamSpec {
            name: "project_id",
            required: true,
            description: "The ID of the project to retrieve events for",
        }],
    },
];

impl ToolDescriptor {
    /// JSON Schema for the tool's arguments.
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| {
                (
                    p.name.to_string(),
                    json!({ "type": "string", "description": p.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Available tool definitions for tools/list.
pub fn available_tools() -> Vec<ToolDefinition> {
    TOOLS.iter().map(ToolDescriptor::to_definition).collect()
}

/// Invalid tool arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("missing required parameter '{0}'")]
    Missing(&'static str),

    #[error("missing required parameter '{0}': value is empty")]
    Empty(&'static str),

    #[error("missing required parameter '{name}': expected a string, got {found}")]
    NotString { name: &'static str, found: &'static str },

    #[error("tool arguments must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Failure of a tool call. Always reported to the client as a tool error
/// result, never as a protocol error.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error(transparent)]
    Param(#[from] ParamError),

    #[error("invalid event ID or link: {0}")]
    InvalidEventId(#[from] IdError),

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

/// Arguments of a tool call, as received.
#[derive(Debug, Default)]
pub struct ToolArguments(Map<String, Value>);

impl ToolArguments {
    /// Wrap the raw `arguments` value. Absent or null arguments are empty.
    pub fn from_value(arguments: Option<Value>) -> Result<Self, ParamError> {
        match arguments {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Object(map)) => Ok(Self(map)),
            Some(other) => Err(ParamError::NotAnObject(json_type(&other))),
        }
    }

    /// Get a required, non-empty string parameter.
    pub fn require_string(&self, name: &'static str) -> Result<String, ParamError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Err(ParamError::Missing(name)),
            Some(Value::String(s)) if s.trim().is_empty() => Err(ParamError::Empty(name)),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(ParamError::NotString {
                name,
                found: json_type(other),
            }),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parameters for get_user_projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetUserProjectsParams {
    pub organization_id: String,
}

/// Parameters for get_project_event, with the event ID already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetProjectEventParams {
    pub project_id: String,
    pub event_id: String,
}

/// Parameters for get_project_events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetProjectEventsParams {
    pub project_id: String,
}

/// A validated tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRequest {
    GetUserOrganizations,
    GetUserProjects(GetUserProjectsParams),
    GetProjectEvent(GetProjectEventParams),
    GetProjectEvents(GetProjectEventsParams),
}

impl ToolRequest {
    /// Validate a tool call by name and raw arguments.
    pub fn parse(name: &str, arguments: Option<Value>) -> Result<Self, ToolError> {
        if !TOOLS.iter().any(|t| t.name == name) {
            return Err(ToolError::UnknownTool(name.to_string()));
        }

        let args = ToolArguments::from_value(arguments)?;

        let request = match name {
            GET_USER_ORGANIZATIONS => ToolRequest::GetUserOrganizations,
            GET_USER_PROJECTS => ToolRequest::GetUserProjects(GetUserProjectsParams {
                organization_id: args.require_string("organization_id")?,
            }),
            GET_PROJECT_EVENT => {
                let project_id = args.require_string("project_id")?;
                let event_ref = args.require_string("event_id")?;
                ToolRequest::GetProjectEvent(GetProjectEventParams {
                    project_id,
                    event_id: resolve_event_id(&event_ref)?,
                })
            }
            GET_PROJECT_EVENTS => ToolRequest::GetProjectEvents(GetProjectEventsParams {
                project_id: args.require_string("project_id")?,
            }),
            _ => return Err(ToolError::UnknownTool(name.to_string())),
        };

        Ok(request)
    }

    /// Name of the tool this request invokes.
    pub fn tool_name(&self) -> &'static str {
        match self {
            ToolRequest::GetUserOrganizations => GET_USER_ORGANIZATIONS,
            ToolRequest::GetUserProjects(_) => GET_USER_PROJECTS,
            ToolRequest::GetProjectEvent(_) => GET_PROJECT_EVENT,
            ToolRequest::GetProjectEvents(_) => GET_PROJECT_EVENTS,
        }
    }
}
