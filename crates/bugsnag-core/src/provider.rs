//! Provider trait for incident-tracking services.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Event, Organization, Project};

/// Read-only access to an incident-tracking backend.
///
/// Implementations must be safe to call concurrently; the MCP server shares a
/// single provider between all in-flight requests.
#[async_trait]
pub trait IncidentProvider: Send + Sync {
    /// Get the provider name (e.g., "bugsnag")
    fn provider_name(&self) -> &'static str;

    /// List the organizations the current user belongs to
    async fn list_organizations(&self) -> Result<Vec<Organization>>;

    /// List the projects of an organization
    async fn list_projects(&self, organization_id: &str) -> Result<Vec<Project>>;

    /// Get a single project by ID
    async fn get_project(&self, project_id: &str) -> Result<Project>;

    /// Get a single event of a project
    async fn get_event(&self, project_id: &str, event_id: &str) -> Result<Event>;

    /// List the events of a project
    async fn list_project_events(&self, project_id: &str) -> Result<Vec<Event>>;
}
