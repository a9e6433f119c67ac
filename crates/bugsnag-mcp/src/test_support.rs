//! Mocks and fixtures shared by the unit tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bugsnag_core::{Error, Event, IncidentProvider, Organization, Project, Result};
use mockall::mock;
use serde_json::Map;
use tokio::sync::Notify;

mock! {
    pub Provider {}

    #[async_trait]
    impl IncidentProvider for Provider {
        fn provider_name(&self) -> &'static str;
        async fn list_organizations(&self) -> Result<Vec<Organization>>;
        async fn list_projects(&self, organization_id: &str) -> Result<Vec<Project>>;
        async fn get_project(&self, project_id: &str) -> Result<Project>;
        async fn get_event(&self, project_id: &str, event_id: &str) -> Result<Event>;
        async fn list_project_events(&self, project_id: &str) -> Result<Vec<Event>>;
    }
}

pub fn organization(id: &str) -> Organization {
    Organization {
        id: id.to_string(),
        name: format!("Org {}", id),
        slug: Some(format!("org-{}", id)),
        created_at: None,
        updated_at: None,
        extra: Map::new(),
    }
}

pub fn project(id: &str) -> Project {
    Project {
        id: id.to_string(),
        name: format!("Project {}", id),
        organization_id: Some("o1".to_string()),
        slug: None,
        api_key: None,
        project_type: Some("rails".to_string()),
        language: Some("ruby".to_string()),
        html_url: None,
        open_error_count: Some(3),
        created_at: None,
        updated_at: None,
        extra: Map::new(),
    }
}

pub fn event(id: &str) -> Event {
    Event {
        id: id.to_string(),
        error_id: Some("err1".to_string()),
        received_at: Some("2024-05-01T12:00:00.000Z".to_string()),
        severity: Some("error".to_string()),
        context: Some("UsersController#show".to_string()),
        unhandled: Some(true),
        exceptions: vec![],
        extra: Map::new(),
    }
}

/// Provider whose organization listing blocks until released.
#[derive(Default)]
pub struct GatedProvider {
    pub entered: Notify,
    pub release: Notify,
    finished: AtomicBool,
}

impl GatedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a gated call has returned.
    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IncidentProvider for GatedProvider {
    fn provider_name(&self) -> &'static str {
        "gated"
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>> {
        self.entered.notify_one();
        self.release.notified().await;
        self.finished.store(true, Ordering::SeqCst);
        Ok(vec![])
    }

    async fn list_projects(&self, _organization_id: &str) -> Result<Vec<Project>> {
        Err(Error::NotFound("projects".into()))
    }

    async fn get_project(&self, _project_id: &str) -> Result<Project> {
        Err(Error::NotFound("project".into()))
    }

    async fn get_event(&self, _project_id: &str, _event_id: &str) -> Result<Event> {
        Err(Error::NotFound("event".into()))
    }

    async fn list_project_events(&self, _project_id: &str) -> Result<Vec<Event>> {
        Err(Error::NotFound("events".into()))
    }
}
