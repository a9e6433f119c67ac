//! Bugsnag Data Access API client implementation.

use async_trait::async_trait;
use bugsnag_core::{Error, Event, IncidentProvider, Organization, Project, Result};
use tracing::{debug, warn};

use crate::{API_VERSION, DEFAULT_BUGSNAG_URL};

/// Bugsnag API client.
pub struct BugsnagClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl BugsnagClient {
    /// Create a new Bugsnag client.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BUGSNAG_URL, token)
    }

    /// Create a new Bugsnag client with a custom base URL (on-premise installs).
    pub fn with_base_url(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a client from resolved configuration.
    pub fn from_config(config: &bugsnag_core::Config) -> Self {
        Self::with_base_url(&config.endpoint, &config.auth_token)
    }

    /// Build the API URL for the given path segments.
    ///
    /// Segments are percent-encoded, so IDs can never escape their position
    /// in the path. Empty and dot segments are rejected outright.
    fn api_url(&self, segments: &[&str]) -> Result<reqwest::Url> {
        if let Some(segment) = segments.iter().find(|s| is_unsafe_segment(s)) {
            return Err(Error::InvalidData(format!(
                "Invalid identifier in request path: {:?}",
                segment
            )));
        }

        let invalid = || Error::Config(format!("Invalid Bugsnag endpoint: {}", self.base_url));

        let mut url = reqwest::Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Make an authenticated GET request with typed deserialization.
    async fn get<T: serde::de::DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.api_url(segments)?;
        debug!(url = %url, "Bugsnag GET request");

        let response = self
            .client
            .get(url)
            .header("Authorization", format!("token {}", self.token))
            .header("X-Version", API_VERSION)
            .header("User-Agent", "bugsnag-mcp")
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Handle response and map errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let status_code = status.as_u16();
            let message = response.text().await.unwrap_or_default();
            warn!(
                status = status_code,
                message = %message,
                "Bugsnag API error response"
            );
            return Err(Error::from_status(status_code, message));
        }

        response
            .json()
            .await
            .map_err(|e| Error::InvalidData(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl IncidentProvider for BugsnagClient {
    fn provider_name(&self) -> &'static str {
        "bugsnag"
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>> {
        self.get(&["user", "organizations"]).await
    }

    async fn list_projects(&self, organization_id: &str) -> Result<Vec<Project>> {
        self.get(&["organizations", organization_id, "projects"])
            .await
    }

    async fn get_project(&self, project_id: &str) -> Result<Project> {
        self.get(&["projects", project_id]).await
    }

    async fn get_event(&self, project_id: &str, event_id: &str) -> Result<Event> {
        self.get(&["projects", project_id, "events", event_id])
            .await
    }

    async fn list_project_events(&self, project_id: &str) -> Result<Vec<Event>> {
        self.get(&["projects", project_id, "events"]).await
    }
}

/// Segments a server could resolve as a path step instead of an ID,
/// including percent-encoded dots.
fn is_unsafe_segment(segment: &str) -> bool {
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    decoded.is_empty() || decoded == "." || decoded == ".."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url() {
        let client = BugsnagClient::with_base_url("https://api.bugsnag.com/", "t");
        let url = client.api_url(&["projects", "42", "events"]).unwrap();
        assert_eq!(url.as_str(), "https://api.bugsnag.com/projects/42/events");
    }

    #[test]
    fn test_api_url_keeps_base_path() {
        let client = BugsnagClient::with_base_url("https://bugsnag.corp/api", "t");
        let url = client.api_url(&["user", "organizations"]).unwrap();
        assert_eq!(url.as_str(), "https://bugsnag.corp/api/user/organizations");
    }

    #[test]
    fn test_api_url_encodes_segments() {
        let client = BugsnagClient::new("t");
        let url = client.api_url(&["projects", "../admin"]).unwrap();
        assert_eq!(url.as_str(), "https://api.bugsnag.com/projects/..%2Fadmin");
    }

    #[test]
    fn test_api_url_rejects_dot_segments() {
        let client = BugsnagClient::new("t");
        for id in ["..", ".", "", "%2e%2E", ".%2e"] {
            let err = client.api_url(&["projects", id]).unwrap_err();
            assert!(matches!(err, Error::InvalidData(_)), "{:?} accepted", id);
        }
        assert!(client.api_url(&["projects", "..."]).is_ok());
        assert!(client.api_url(&["projects", "v1.2"]).is_ok());
    }

    #[test]
    fn test_api_url_invalid_base() {
        let client = BugsnagClient::with_base_url("not a url", "t");
        assert!(matches!(client.api_url(&["user"]), Err(Error::Config(_))));
    }

    #[test]
    fn test_provider_name() {
        assert_eq!(BugsnagClient::new("t").provider_name(), "bugsnag");
    }

    // =========================================================================
    // Integration tests with httpmock
    // =========================================================================

    mod integration {
        use super::*;
        use httpmock::prelude::*;

        fn create_test_client(server: &MockServer) -> BugsnagClient {
            BugsnagClient::with_base_url(server.base_url(), "test-token")
        }

        #[tokio::test]
        async fn test_dot_ids_never_reach_the_api() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.any_request();
                then.status(200).json_body(serde_json::json!({"id": "leaked"}));
            });

            let client = create_test_client(&server);
            assert!(matches!(
                client.get_project("..").await,
                Err(Error::InvalidData(_))
            ));
            assert!(matches!(
                client.get_event(".", "e1").await,
                Err(Error::InvalidData(_))
            ));
            assert!(matches!(
                client.list_projects("..").await,
                Err(Error::InvalidData(_))
            ));

            mock.assert_hits(0);
        }

        #[tokio::test]
        async fn test_list_organizations() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(GET)
                    .path("/user/organizations")
                    .header("Authorization", "token test-token")
                    .header("X-Version", "2");
                then.status(200).json_body(serde_json::json!([
                    {
                        "id": "org1",
                        "name": "Acme",
                        "slug": "acme",
                        "billing_emails": ["ops@acme.test"]
                    }
                ]));
            });

            let client = create_test_client(&server);
            let orgs = client.list_organizations().await.unwrap();

            mock.assert();
            assert_eq!(orgs.len(), 1);
            assert_eq!(orgs[0].id, "org1");
            assert_eq!(orgs[0].slug.as_deref(), Some("acme"));
            assert!(orgs[0].extra.contains_key("billing_emails"));
        }

        #[tokio::test]
        async fn test_list_projects() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(GET).path("/organizations/org1/projects");
                then.status(200).json_body(serde_json::json!([
                    {"id": "p1", "name": "Web", "type": "rails"},
                    {"id": "p2", "name": "Android", "type": "android"}
                ]));
            });

            let client = create_test_client(&server);
            let projects = client.list_projects("org1").await.unwrap();

            mock.assert();
            assert_eq!(projects.len(), 2);
            assert_eq!(projects[1].project_type.as_deref(), Some("android"));
        }

        #[tokio::test]
        async fn test_get_project() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(GET).path("/projects/123");
                then.status(200).json_body(serde_json::json!({
                    "id": "123",
                    "name": "Checkout",
                    "organization_id": "org1",
                    "open_error_count": 7
                }));
            });

            let client = create_test_client(&server);
            let project = client.get_project("123").await.unwrap();

            assert_eq!(project.id, "123");
            assert_eq!(project.open_error_count, Some(7));
        }

        #[tokio::test]
        async fn test_get_event() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(GET).path("/projects/42/events/xyz789");
                then.status(200).json_body(serde_json::json!({
                    "id": "xyz789",
                    "error_id": "err1",
                    "exceptions": [{"error_class": "RuntimeError", "message": "boom"}]
                }));
            });

            let client = create_test_client(&server);
            let event = client.get_event("42", "xyz789").await.unwrap();

            mock.assert();
            assert_eq!(event.id, "xyz789");
            assert_eq!(event.exceptions[0].error_class, "RuntimeError");
        }

        #[tokio::test]
        async fn test_list_project_events() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(GET).path("/projects/42/events");
                then.status(200)
                    .json_body(serde_json::json!([{"id": "e1"}, {"id": "e2"}]));
            });

            let client = create_test_client(&server);
            let events = client.list_project_events("42").await.unwrap();

            assert_eq!(
                events.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
                vec!["e1", "e2"]
            );
        }

        #[tokio::test]
        async fn test_unauthorized() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(GET).path("/user/organizations");
                then.status(401).body("{\"errors\":[\"Invalid auth token\"]}");
            });

            let client = create_test_client(&server);
            let err = client.list_organizations().await.unwrap_err();

            assert!(matches!(err, Error::Auth(_)));
            assert!(err.to_string().contains("Invalid auth token"));
        }

        #[tokio::test]
        async fn test_not_found() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(GET).path("/projects/missing");
                then.status(404).body("not found");
            });

            let client = create_test_client(&server);
            let err = client.get_project("missing").await.unwrap_err();

            assert!(matches!(err, Error::NotFound(_)));
        }

        #[tokio::test]
        async fn test_server_error() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(GET).path("/projects/42/events");
                then.status(502).body("bad gateway");
            });

            let client = create_test_client(&server);
            let err = client.list_project_events("42").await.unwrap_err();

            assert!(matches!(err, Error::Api { status: 502, .. }));
        }

        #[tokio::test]
        async fn test_invalid_json() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(GET).path("/projects/123");
                then.status(200).body("<html>maintenance</html>");
            });

            let client = create_test_client(&server);
            let err = client.get_project("123").await.unwrap_err();

            assert!(matches!(err, Error::InvalidData(_)));
        }
    }
}
