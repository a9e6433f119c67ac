//! Tool handlers for MCP server.
//!
//! Validates the call via [`ToolRequest`], then invokes the provider and
//! renders the payload as pretty-printed JSON. Every failure is reported as
//! a tool error result.

use std::sync::Arc;

use bugsnag_core::IncidentProvider;
use serde::Serialize;
use serde_json::Value;

use crate::protocol::{ToolCallResult, ToolDefinition};
use crate::tools::{
    self, GetProjectEventParams, GetProjectEventsParams, GetUserProjectsParams, ToolError,
    ToolRequest,
};

/// Tool handler that executes tools against an incident provider.
pub struct ToolHandler {
    provider: Arc<dyn IncidentProvider>,
}

impl ToolHandler {
    pub fn new(provider: Arc<dyn IncidentProvider>) -> Self {
        Self { provider }
    }

    /// Get available tool definitions.
    pub fn available_tools(&self) -> Vec<ToolDefinition> {
        tools::available_tools()
    }

    /// Execute a tool by name with arguments.
    pub async fn execute(&self, name: &str, arguments: Option<Value>) -> ToolCallResult {
        let outcome = match ToolRequest::parse(name, arguments) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(text) => ToolCallResult::text(text),
            Err(e) => {
                tracing::warn!(tool = name, "Tool call failed: {}", e);
                ToolCallResult::error(e.to_string())
            }
        }
    }

    async fn dispatch(&self, request: ToolRequest) -> Result<String, ToolError> {
        tracing::debug!(
            "Executing {} via {}",
            request.tool_name(),
            self.provider.provider_name()
        );

        match request {
            ToolRequest::GetUserOrganizations => self.handle_get_user_organizations().await,
            ToolRequest::GetUserProjects(params) => self.handle_get_user_projects(params).await,
            ToolRequest::GetProjectEvent(params) => self.handle_get_project_event(params).await,
            ToolRequest::GetProjectEvents(params) => self.handle_get_project_events(params).await,
        }
    }

    async fn handle_get_user_organizations(&self) -> Result<String, ToolError> {
        let orgs = self
            .provider
            .list_organizations()
            .await
            .map_err(|source| ToolError::Backend {
                what: "organizations",
                source,
            })?;

        tracing::debug!("Got {} organizations", orgs.len());
        render("organizations", &orgs)
    }

    async fn handle_get_user_projects(
        &self,
        params: GetUserProjectsParams,
    ) -> Result<String, ToolError> {
        let projects = self
            .provider
            .list_projects(&params.organization_id)
            .await
            .map_err(|source| ToolError::Backend {
                what: "projects",
                source,
            })?;

        tracing::debug!(
            "Got {} projects for organization {}",
            projects.len(),
            params.organization_id
        );
        render("projects", &projects)
    }

    async fn handle_get_project_event(
        &self,
        params: GetProjectEventParams,
    ) -> Result<String, ToolError> {
        let event = self
            .provider
            .get_event(&params.project_id, &params.event_id)
            .await
            .map_err(|source| ToolError::Backend {
                what: "event",
                source,
            })?;

        render("event", &event)
    }

    async fn handle_get_project_events(
        &self,
        params: GetProjectEventsParams,
    ) -> Result<String, ToolError> {
        let events = self
            .provider
            .list_project_events(&params.project_id)
            .await
            .map_err(|source| ToolError::Backend {
                what: "events",
                source,
            })?;

        tracing::debug!(
            "Got {} events for project {}",
            events.len(),
            params.project_id
        );
        render("events", &events)
    }
}

fn render<T: Serialize>(what: &'static str, value: &T) -> Result<String, ToolError> {
    serde_json::to_string_pretty(value).map_err(|source| ToolError::Serialization { what, source })
}
