//! Observability for the MCP server
//!
//! Structured logging through `tracing`, with span macros for tool calls,
//! upstream requests and protocol sessions.

pub mod logging;

pub use logging::{init_default_logging, init_logging, parse_level, LogFormat};

// Span macros for structured logging
pub use logging::{session_span, tool_span, upstream_span};
