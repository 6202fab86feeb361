//! Wire protocol spoken on stdio: JSON-RPC 2.0 framing carrying MCP methods

pub mod jsonrpc;
pub mod mcp;

pub use jsonrpc::{
    error_codes, IncomingMessage, JsonRpcError, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, RequestId,
};
pub use mcp::{ContentItem, ToolDefinition, ToolsCallResult, PROTOCOL_VERSION};
