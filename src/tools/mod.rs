//! Tool layer exposing Noun Project operations to the MCP runtime
//!
//! Each operation is a [`Tool`] that describes its arguments with a JSON
//! schema. [`ToolSystem`] validates arguments against that schema before
//! dispatch, so tools only ever see well-shaped input.

use crate::client::{CallContext, NounProjectClient};
use crate::error::{ErrorKind, ErrorPayload, IconError};
use crate::protocol::{ContentItem, ToolDefinition, ToolsCallResult};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn, Instrument};

pub mod account;
pub mod collections;
pub mod icons;

pub use account::ApiUsageTool;
pub use collections::{GetCollectionDetailsTool, SearchCollectionsTool};
pub use icons::{AutocompleteTool, DownloadIconTool, GetIconDetailsTool, SearchIconsTool};

/// A callable operation
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, human description and JSON schema of the arguments
    fn describe(&self) -> ToolDescription;

    /// Run with arguments that already passed schema validation
    async fn execute(&self, parameters: &Value, ctx: &CallContext)
        -> Result<ToolOutput, ToolError>;
}

#[derive(Debug, Clone)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDescription {
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.parameters.clone(),
        }
    }
}

/// Successful tool result
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Json(Value),
    Image {
        data: Bytes,
        mime_type: String,
        metadata: Value,
    },
}

impl ToolOutput {
    pub fn into_call_result(self) -> ToolsCallResult {
        let content = match self {
            ToolOutput::Json(value) => vec![ContentItem::text(pretty(&value))],
            ToolOutput::Image {
                data,
                mime_type,
                metadata,
            } => vec![
                ContentItem::Image {
                    data: STANDARD.encode(&data),
                    mime_type,
                },
                ContentItem::text(pretty(&metadata)),
            ],
        };
        ToolsCallResult {
            content,
            is_error: false,
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Build the `isError` result carrying a structured error payload
pub fn error_result(payload: &ErrorPayload) -> ToolsCallResult {
    ToolsCallResult {
        content: vec![ContentItem::text(pretty(&json!({ "error": payload })))],
        is_error: true,
    }
}

/// Tool layer errors
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Schema error: {0}")]
    SchemaError(String),
    #[error(transparent)]
    Icon(#[from] IconError),
}

impl ToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::UnknownTool(_) => ErrorKind::InvalidArgument,
            // The registered tool set is broken, not the caller's input
            ToolError::SchemaError(_) => ErrorKind::ConfigurationError,
            ToolError::Icon(e) => e.kind(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ToolError::Icon(IconError::Cancelled))
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            ToolError::Icon(e) => e.to_payload(),
            other => ErrorPayload {
                kind: other.kind(),
                message: crate::error::sanitize_error_message(&other.to_string()),
                retry_after_secs: None,
            },
        }
    }
}

/// Descriptions of every Noun Project tool, without needing a client
pub fn noun_project_descriptions() -> Vec<ToolDescription> {
    vec![
        AutocompleteTool::description(),
        DownloadIconTool::description(),
        ApiUsageTool::description(),
        GetCollectionDetailsTool::description(),
        GetIconDetailsTool::description(),
        SearchCollectionsTool::description(),
        SearchIconsTool::description(),
    ]
}

/// Registry of named tools
pub struct ToolSystem {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolSystem {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry holding every Noun Project tool, all sharing one client
    pub fn with_noun_project(client: Arc<NounProjectClient>) -> Self {
        let mut system = Self::new();
        system.register(SearchIconsTool::new(client.clone()));
        system.register(GetIconDetailsTool::new(client.clone()));
        system.register(DownloadIconTool::new(client.clone()));
        system.register(AutocompleteTool::new(client.clone()));
        system.register(SearchCollectionsTool::new(client.clone()));
        system.register(GetCollectionDetailsTool::new(client.clone()));
        system.register(ApiUsageTool::new(client));
        system
    }

    /// Add a tool, replacing any tool with the same name
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.describe().name;
        debug!(tool = %name, "registering tool");
        self.tools.insert(name, Box::new(tool));
    }

    pub fn describe_tool(&self, tool_name: &str) -> Option<ToolDescription> {
        self.tools.get(tool_name).map(|tool| tool.describe())
    }

    /// Descriptions of every tool, ordered by name
    pub fn describe_all(&self) -> Vec<ToolDescription> {
        let mut descriptions: Vec<_> = self.tools.values().map(|t| t.describe()).collect();
        descriptions.sort_by(|a, b| a.name.cmp(&b.name));
        descriptions
    }

    pub fn list_tools(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Validate `parameters` against the tool's schema, then run it
    pub async fn execute_tool(
        &self,
        tool_name: &str,
        parameters: &Value,
        ctx: &CallContext,
    ) -> Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| ToolError::UnknownTool(tool_name.to_string()))?;

        let span = crate::tool_span!(tool = %tool_name);
        async {
            Self::validate_parameters(&tool.describe(), parameters)?;

            let result = tool.execute(parameters, ctx).await;
            match &result {
                Ok(_) => info!("tool call succeeded"),
                Err(e) if e.is_cancelled() => info!("tool call cancelled"),
                Err(e) => warn!(kind = %e.kind(), error = %e, "tool call failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    fn validate_parameters(
        description: &ToolDescription,
        parameters: &Value,
    ) -> Result<(), ToolError> {
        let validator = jsonschema::validator_for(&description.parameters)
            .map_err(|e| ToolError::SchemaError(format!("Schema compilation error: {e}")))?;

        validator.validate(parameters).map_err(|errors| {
            let messages: Vec<String> = errors
                .map(|e| format!("At '{}': {}", e.instance_path, e))
                .collect();
            IconError::invalid_argument(messages.join("; ")).into()
        })
    }
}

impl Default for ToolSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Deserialize validated tool arguments into a typed struct
pub(crate) fn parse_arguments<T: DeserializeOwned>(parameters: &Value) -> Result<T, IconError> {
    T::deserialize(parameters).map_err(|e| IconError::invalid_argument(e.to_string()))
}

/// Identifier argument given either as a JSON string or an integer
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum IdArgument {
    Text(String),
    Number(u64),
}

impl IdArgument {
    pub(crate) fn into_string(self) -> String {
        match self {
            IdArgument::Text(s) => s,
            IdArgument::Number(n) => n.to_string(),
        }
    }
}

/// Schema fragment for an id accepted as string or integer
pub(crate) fn id_schema(description: &str) -> Value {
    json!({
        "type": ["string", "integer"],
        "minLength": 1,
        "minimum": 0,
        "description": description
    })
}

pub(crate) fn thumbnail_size_schema() -> Value {
    json!({
        "type": "integer",
        "enum": crate::client::types::THUMBNAIL_SIZES,
        "description": "Thumbnail edge length in pixels (42, 84 or 200)"
    })
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value)
        .map_err(|e| IconError::malformed_response(format!("result encoding: {e}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn describe(&self) -> ToolDescription {
            ToolDescription {
                name: "echo".to_string(),
                description: "Echo the message back".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "message": {"type": "string", "minLength": 1}
                    },
                    "required": ["message"],
                    "additionalProperties": false
                }),
            }
        }

        async fn execute(
            &self,
            parameters: &Value,
            ctx: &CallContext,
        ) -> Result<ToolOutput, ToolError> {
            if ctx.is_cancelled() {
                return Err(IconError::Cancelled.into());
            }
            Ok(ToolOutput::Json(parameters.clone()))
        }
    }

    #[tokio::test]
    async fn test_tool_system_creation() {
        let tool_system = ToolSystem::new();
        assert!(tool_system.list_tools().is_empty());
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let tool_system = ToolSystem::new();
        let result = tool_system
            .execute_tool("unknown", &json!({}), &CallContext::new())
            .await;
        assert!(matches!(result, Err(ToolError::UnknownTool(_))));
    }

    #[tokio::test]
    async fn test_schema_violation_is_invalid_argument() {
        let mut tool_system = ToolSystem::new();
        tool_system.register(EchoTool);

        let result = tool_system
            .execute_tool("echo", &json!({"message": ""}), &CallContext::new())
            .await;
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("/message"));

        let result = tool_system
            .execute_tool("echo", &json!({"other": 1}), &CallContext::new())
            .await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    struct BrokenSchemaTool;

    #[async_trait]
    impl Tool for BrokenSchemaTool {
        fn describe(&self) -> ToolDescription {
            ToolDescription {
                name: "broken".to_string(),
                description: "Tool with a schema that does not compile".to_string(),
                parameters: json!({"type": 12}),
            }
        }

        async fn execute(&self, _: &Value, _: &CallContext) -> Result<ToolOutput, ToolError> {
            panic!("must not run with an uncompilable schema");
        }
    }

    #[tokio::test]
    async fn test_uncompilable_schema_is_configuration_error() {
        let mut tool_system = ToolSystem::new();
        tool_system.register(BrokenSchemaTool);

        let err = tool_system
            .execute_tool("broken", &json!({}), &CallContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::SchemaError(_)));

        let payload = err.to_payload();
        assert_eq!(payload.kind, ErrorKind::ConfigurationError);
        assert_eq!(payload.retry_after_secs, None);
    }

    #[tokio::test]
    async fn test_valid_call_reaches_tool() {
        let mut tool_system = ToolSystem::new();
        tool_system.register(EchoTool);

        let output = tool_system
            .execute_tool("echo", &json!({"message": "hi"}), &CallContext::new())
            .await
            .unwrap();
        assert_eq!(output, ToolOutput::Json(json!({"message": "hi"})));
    }

    #[test]
    fn test_image_output_becomes_image_then_text() {
        let output = ToolOutput::Image {
            data: Bytes::from_static(b"\x89PNG"),
            mime_type: "image/png".to_string(),
            metadata: json!({"size_bytes": 4}),
        };
        let result = output.into_call_result();
        assert!(!result.is_error);
        assert_eq!(result.content.len(), 2);
        assert!(matches!(
            &result.content[0],
            ContentItem::Image { data, mime_type } if data == "iVBORw==" && mime_type == "image/png"
        ));
        assert!(matches!(&result.content[1], ContentItem::Text { text } if text.contains("size_bytes")));
    }

    #[test]
    fn test_error_result_shape() {
        let payload = IconError::RateLimited {
            message: "slow down".to_string(),
            retry_after: Some(std::time::Duration::from_secs(30)),
        }
        .to_payload();
        let result = error_result(&payload);
        assert!(result.is_error);

        let ContentItem::Text { text } = &result.content[0] else {
            panic!("expected text content");
        };
        let value: Value = serde_json::from_str(text).unwrap();
        assert_eq!(value["error"]["kind"], "RateLimited");
        assert_eq!(value["error"]["retry_after_secs"], 30);
    }

    #[test]
    fn test_every_schema_compiles() {
        let descriptions = noun_project_descriptions();
        assert_eq!(descriptions.len(), 7);
        for description in descriptions {
            assert!(
                jsonschema::validator_for(&description.parameters).is_ok(),
                "{} has an invalid schema",
                description.name
            );
        }
    }

    #[test]
    fn test_id_argument_accepts_string_or_number() {
        let id: IdArgument = serde_json::from_value(json!(12345)).unwrap();
        assert_eq!(id.into_string(), "12345");
        let id: IdArgument = serde_json::from_value(json!("abc")).unwrap();
        assert_eq!(id.into_string(), "abc");
    }
}
