//! Method dispatch for one JSON-RPC request

use super::resources;
use crate::client::CallContext;
use crate::protocol::mcp::{
    methods, Implementation, InitializeParams, InitializeResult, ListChangedCapability,
    ResourcesListResult, ResourcesReadParams, ResourcesReadResult, ServerCapabilities,
    ToolsCallParams, ToolsListResult,
};
use crate::protocol::{error_codes, JsonRpcRequest, JsonRpcResponse, RequestId, PROTOCOL_VERSION};
use crate::tools::{error_result, ToolError, ToolSystem};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

const INSTRUCTIONS: &str = "Search and download icons from The Noun Project. Start with \
    search_icons, inspect a result with get_icon_details, then fetch it with download_icon. \
    Read documentation://getting-started for a walkthrough.";

pub struct RequestHandler {
    tools: Arc<ToolSystem>,
    server_info: Implementation,
}

impl RequestHandler {
    pub fn new(tools: Arc<ToolSystem>, server_name: impl Into<String>) -> Self {
        Self {
            tools,
            server_info: Implementation {
                name: server_name.into(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    /// Answer one request. `None` means the request was cancelled and gets
    /// no response.
    pub async fn handle(
        &self,
        request: &JsonRpcRequest,
        ctx: &CallContext,
    ) -> Option<JsonRpcResponse> {
        let id = request.id.clone();
        let params = request.params.clone().unwrap_or(Value::Null);

        let response = match request.method.as_str() {
            methods::INITIALIZE => self.initialize(id, params),
            methods::PING => JsonRpcResponse::success(id, json!({})),
            methods::TOOLS_LIST => self.tools_list(id),
            methods::TOOLS_CALL => return self.tools_call(id, params, ctx).await,
            methods::RESOURCES_LIST => self.resources_list(id),
            methods::RESOURCES_READ => self.resources_read(id, params),
            other => JsonRpcResponse::error(
                Some(id),
                error_codes::METHOD_NOT_FOUND,
                format!("method not found: {other}"),
            ),
        };
        Some(response)
    }

    fn initialize(&self, id: RequestId, params: Value) -> JsonRpcResponse {
        let params: InitializeParams = match decode_params(&id, params) {
            Ok(params) => params,
            Err(response) => return response,
        };

        let client = params
            .client_info
            .as_ref()
            .map(|info| format!("{} {}", info.name, info.version))
            .unwrap_or_else(|| "unknown".to_string());
        info!(
            client = %client,
            requested_version = %params.protocol_version,
            "client initializing"
        );

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ListChangedCapability::default()),
                resources: Some(ListChangedCapability::default()),
            },
            server_info: self.server_info.clone(),
            instructions: Some(INSTRUCTIONS.to_string()),
        };
        encode_result(id, &result)
    }

    fn tools_list(&self, id: RequestId) -> JsonRpcResponse {
        let result = ToolsListResult {
            tools: self
                .tools
                .describe_all()
                .iter()
                .map(|d| d.to_definition())
                .collect(),
        };
        encode_result(id, &result)
    }

    async fn tools_call(
        &self,
        id: RequestId,
        params: Value,
        ctx: &CallContext,
    ) -> Option<JsonRpcResponse> {
        let params: ToolsCallParams = match decode_params(&id, params) {
            Ok(params) => params,
            Err(response) => return Some(response),
        };
        let arguments = match params.arguments {
            Some(Value::Null) | None => json!({}),
            Some(arguments) => arguments,
        };

        debug!(tool = %params.name, request_id = %id, "tools/call");
        let outcome = self
            .tools
            .execute_tool(&params.name, &arguments, ctx)
            .await;

        if ctx.is_cancelled() {
            return None;
        }

        let result = match outcome {
            Ok(output) => output.into_call_result(),
            Err(ToolError::UnknownTool(name)) => {
                return Some(JsonRpcResponse::error(
                    Some(id),
                    error_codes::INVALID_PARAMS,
                    format!("unknown tool: {name}"),
                ))
            }
            Err(e) if e.is_cancelled() => return None,
            Err(e) => error_result(&e.to_payload()),
        };
        Some(encode_result(id, &result))
    }

    fn resources_list(&self, id: RequestId) -> JsonRpcResponse {
        let result = ResourcesListResult {
            resources: resources::RESOURCES.iter().map(|r| r.definition()).collect(),
        };
        encode_result(id, &result)
    }

    fn resources_read(&self, id: RequestId, params: Value) -> JsonRpcResponse {
        let params: ResourcesReadParams = match decode_params(&id, params) {
            Ok(params) => params,
            Err(response) => return response,
        };

        match resources::find(&params.uri) {
            Some(resource) => encode_result(
                id,
                &ResourcesReadResult {
                    contents: vec![resource.contents()],
                },
            ),
            None => JsonRpcResponse::error(
                Some(id),
                error_codes::INVALID_PARAMS,
                format!("unknown resource: {}", params.uri),
            ),
        }
    }
}

fn decode_params<T: DeserializeOwned>(id: &RequestId, params: Value) -> Result<T, JsonRpcResponse> {
    serde_json::from_value(params).map_err(|e| {
        JsonRpcResponse::error(
            Some(id.clone()),
            error_codes::INVALID_PARAMS,
            format!("invalid params: {e}"),
        )
    })
}

fn encode_result<T: Serialize>(id: RequestId, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(
            Some(id),
            error_codes::INTERNAL_ERROR,
            format!("failed to encode result: {e}"),
        ),
    }
}
