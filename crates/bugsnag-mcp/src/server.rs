//! MCP server implementation.
//!
//! The server routes JSON-RPC methods to the resource catalog and the tool
//! handler. It holds no mutable state after construction, so one instance
//! is shared by every transport connection.

use std::sync::Arc;

use bugsnag_core::IncidentProvider;
use serde_json::Value;

use crate::handlers::ToolHandler;
use crate::protocol::{
    IncomingMessage, InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, RequestId, ResourceReadParams, ResourceReadResult,
    ResourceTemplatesListResult, ResourcesCapability, ResourcesListResult, ServerCapabilities,
    ServerInfo, ToolCallParams, ToolsCapability, ToolsListResult, MCP_VERSION,
};
use crate::resources::{ResourceCatalog, ResourceError};

/// Name reported in the `initialize` handshake.
pub const SERVER_NAME: &str = "bugsnag-mcp";

/// MCP server exposing Bugsnag resources and tools.
pub struct McpServer {
    resources: ResourceCatalog,
    tools: ToolHandler,
}

impl McpServer {
    /// Create a server whose resources and tools share one provider.
    pub fn new(provider: Arc<dyn IncidentProvider>) -> Self {
        tracing::info!(
            provider = provider.provider_name(),
            "Registering resources and tools"
        );

        Self {
            resources: ResourceCatalog::new(provider.clone()),
            tools: ToolHandler::new(provider),
        }
    }

    /// Decode and handle one raw message.
    ///
    /// Undecodable input yields a parse-error response with a null id.
    pub async fn handle_raw(&self, raw: &str) -> Option<JsonRpcResponse> {
        match IncomingMessage::parse(raw) {
            Ok(msg) => self.handle_message(msg).await,
            Err(e) => {
                tracing::warn!("Failed to parse message: {}", e);
                Some(JsonRpcResponse::error(
                    RequestId::Null,
                    JsonRpcError::parse_error(&e.to_string()),
                ))
            }
        }
    }

    /// Handle an incoming message. Notifications get no response.
    pub async fn handle_message(&self, msg: IncomingMessage) -> Option<JsonRpcResponse> {
        match msg {
            IncomingMessage::Request(req) => Some(self.handle_request(req).await),
            IncomingMessage::Notification(notif) => {
                self.handle_notification(&notif.method);
                None
            }
        }
    }

    /// Handle a JSON-RPC request.
    pub async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        tracing::debug!("Handling request: {} (id: {:?})", req.method, req.id);

        match req.method.as_str() {
            "initialize" => self.handle_initialize(req.id, req.params),
            "ping" => self.handle_ping(req.id),
            "tools/list" => self.handle_tools_list(req.id),
            "tools/call" => self.handle_tools_call(req.id, req.params).await,
            "resources/list" => self.handle_resources_list(req.id),
            "resources/templates/list" => self.handle_resource_templates_list(req.id),
            "resources/read" => self.handle_resources_read(req.id, req.params).await,
            method => {
                tracing::warn!("Unknown method: {}", method);
                JsonRpcResponse::error(req.id, JsonRpcError::method_not_found(method))
            }
        }
    }

    fn handle_notification(&self, method: &str) {
        match method {
            "initialized" | "notifications/initialized" => {
                tracing::info!("Client initialized");
            }
            "notifications/cancelled" => {
                tracing::debug!("Request cancelled by client");
            }
            _ => {
                tracing::debug!("Ignoring notification: {}", method);
            }
        }
    }

    fn handle_initialize(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        if let Some(params) = params {
            match serde_json::from_value::<InitializeParams>(params) {
                Ok(init_params) => {
                    tracing::info!(
                        "Client: {} v{} (protocol: {})",
                        init_params.client_info.name,
                        init_params.client_info.version,
                        init_params.protocol_version
                    );
                }
                Err(e) => {
                    tracing::warn!("Failed to parse initialize params: {}", e);
                }
            }
        }

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
                resources: Some(ResourcesCapability {
                    subscribe: false,
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        JsonRpcResponse::from_result(id, &result)
    }

    fn handle_ping(&self, id: RequestId) -> JsonRpcResponse {
        JsonRpcResponse::success(id, serde_json::json!({}))
    }

    fn handle_tools_list(&self, id: RequestId) -> JsonRpcResponse {
        let result = ToolsListResult {
            tools: self.tools.available_tools(),
        };
        JsonRpcResponse::from_result(id, &result)
    }

    async fn handle_tools_call(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(&e.to_string()),
                    );
                }
            },
            None => {
                return JsonRpcResponse::error(id, JsonRpcError::invalid_params("Missing params"));
            }
        };

        tracing::info!("Calling tool: {}", params.name);

        let result = self.tools.execute(&params.name, params.arguments).await;
        JsonRpcResponse::from_result(id, &result)
    }

    fn handle_resources_list(&self, id: RequestId) -> JsonRpcResponse {
        let result = ResourcesListResult {
            resources: self.resources.resources(),
        };
        JsonRpcResponse::from_result(id, &result)
    }

    fn handle_resource_templates_list(&self, id: RequestId) -> JsonRpcResponse {
        let result = ResourceTemplatesListResult {
            resource_templates: self.resources.templates(),
        };
        JsonRpcResponse::from_result(id, &result)
    }

    async fn handle_resources_read(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        let params: ResourceReadParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(&e.to_string()),
                    );
                }
            },
            None => {
                let err = ResourceError::MissingUri;
                return JsonRpcResponse::error(id, err.to_rpc_error(""));
            }
        };

        tracing::info!(uri = %params.uri, "Reading resource");

        match self.resources.read(&params.uri).await {
            Ok(contents) => JsonRpcResponse::from_result(id, &ResourceReadResult { contents }),
            Err(e) => {
                tracing::warn!(uri = %params.uri, "Resource read failed: {}", e);
                JsonRpcResponse::error(id, e.to_rpc_error(&params.uri))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ResourceContents, ToolCallResult, JSONRPC_VERSION};
    use crate::test_support::{project, MockProvider};
    use mockall::predicate::eq;
    use serde_json::json;

    fn server(mut mock: MockProvider) -> McpServer {
        mock.expect_provider_name().return_const("mock");
        McpServer::new(Arc::new(mock))
    }

    fn request(method: &str, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: RequestId::Number(1),
            method: method.to_string(),
            params,
        }
    }

    #[tokio::test]
    async fn test_initialize_response() {
        let server = server(MockProvider::new());

        let resp = server
            .handle_request(request(
                "initialize",
                Some(json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": {"name": "test-client", "version": "1.0.0"}
                })),
            ))
            .await;

        assert!(resp.error.is_none());
        let result = resp.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(result["protocolVersion"], MCP_VERSION);
        assert!(result["capabilities"]["tools"].is_object());
        assert!(result["capabilities"]["resources"].is_object());
    }

    #[tokio::test]
    async fn test_initialize_is_repeatable() {
        let server = server(MockProvider::new());

        let first = server.handle_request(request("initialize", None)).await;
        let second = server
            .handle_request(request("initialize", Some(json!({"invalid": true}))))
            .await;

        assert!(first.result.is_some());
        assert!(second.result.is_some());
    }

    #[tokio::test]
    async fn test_ping() {
        let server = server(MockProvider::new());
        let resp = server.handle_request(request("ping", None)).await;
        assert_eq!(resp.result, Some(json!({})));
    }

    #[tokio::test]
    async fn test_tools_list() {
        let server = server(MockProvider::new());
        let resp = server.handle_request(request("tools/list", None)).await;

        let result: ToolsListResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(result.tools.len(), 4);
        assert!(result.tools.iter().any(|t| t.name == "get_user_organizations"));
    }

    #[tokio::test]
    async fn test_resources_lists() {
        let server = server(MockProvider::new());

        let resp = server.handle_request(request("resources/list", None)).await;
        let result: ResourcesListResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(result.resources.len(), 1);
        assert_eq!(result.resources[0].uri, "bugsnag://organizations");

        let resp = server
            .handle_request(request("resources/templates/list", None))
            .await;
        let result = resp.result.unwrap();
        assert_eq!(result["resourceTemplates"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_resources_read_project() {
        let mut mock = MockProvider::new();
        mock.expect_get_project()
            .with(eq("123"))
            .times(1)
            .returning(|id| Ok(project(id)));
        let server = server(mock);

        let resp = server
            .handle_request(request(
                "resources/read",
                Some(json!({"uri": "bugsnag://projects/123"})),
            ))
            .await;

        let result: ResourceReadResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        let contents: &[ResourceContents] = &result.contents;
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].uri, "bugsnag://projects/123");
        assert_eq!(contents[0].mime_type, "application/json");
    }

    #[tokio::test]
    async fn test_resources_read_unknown_uri() {
        let server = server(MockProvider::new());

        let resp = server
            .handle_request(request(
                "resources/read",
                Some(json!({"uri": "bugsnag://nothing/here"})),
            ))
            .await;

        let error = resp.error.unwrap();
        assert_eq!(error.code, JsonRpcError::RESOURCE_NOT_FOUND);
        assert_eq!(error.data, Some(json!({"uri": "bugsnag://nothing/here"})));
    }

    #[tokio::test]
    async fn test_resources_read_missing_uri() {
        let server = server(MockProvider::new());

        let resp = server.handle_request(request("resources/read", None)).await;
        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_PARAMS);

        let resp = server
            .handle_request(request("resources/read", Some(json!({}))))
            .await;
        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_resources_read_backend_failure() {
        let mut mock = MockProvider::new();
        mock.expect_get_project()
            .returning(|_| Err(bugsnag_core::Error::Http("connection refused".to_string())));
        let server = server(mock);

        let resp = server
            .handle_request(request(
                "resources/read",
                Some(json!({"uri": "bugsnag://projects/123"})),
            ))
            .await;

        let error = resp.error.unwrap();
        assert_eq!(error.code, JsonRpcError::INTERNAL_ERROR);
        assert!(error.message.contains("failed to retrieve project"));
    }

    #[tokio::test]
    async fn test_tools_call_failure_is_not_protocol_error() {
        let mut mock = MockProvider::new();
        mock.expect_list_projects().times(0);
        let server = server(mock);

        let resp = server
            .handle_request(request(
                "tools/call",
                Some(json!({"name": "get_user_projects", "arguments": {}})),
            ))
            .await;

        assert!(resp.error.is_none());
        let result: ToolCallResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert!(result.is_error());
        assert!(result.text_content().unwrap().contains("organization_id"));
    }

    #[tokio::test]
    async fn test_tools_call_missing_params() {
        let server = server(MockProvider::new());

        let resp = server.handle_request(request("tools/call", None)).await;
        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_PARAMS);

        let resp = server
            .handle_request(request("tools/call", Some(json!("not an object"))))
            .await;
        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let server = server(MockProvider::new());
        let resp = server.handle_request(request("unknown/method", None)).await;
        assert_eq!(resp.error.unwrap().code, JsonRpcError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let server = server(MockProvider::new());

        for method in [
            "initialized",
            "notifications/initialized",
            "notifications/cancelled",
            "some/unknown/notification",
        ] {
            let raw = json!({"jsonrpc": "2.0", "method": method}).to_string();
            assert!(server.handle_raw(&raw).await.is_none());
        }
    }

    #[tokio::test]
    async fn test_handle_raw_parse_error() {
        let server = server(MockProvider::new());

        let resp = server.handle_raw("{not json").await.unwrap();
        assert_eq!(resp.id, RequestId::Null);
        assert_eq!(resp.error.unwrap().code, JsonRpcError::PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_handle_raw_request() {
        let server = server(MockProvider::new());

        let resp = server
            .handle_raw(r#"{"jsonrpc":"2.0","id":"abc","method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(resp.id, RequestId::String("abc".to_string()));
        assert!(resp.result.is_some());
    }
}
