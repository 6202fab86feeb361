//! Noun Project MCP server
//!
//! Exposes The Noun Project icon API as Model Context Protocol tools over
//! stdio.
//!
//! # Overview
//!
//! - [`client`]: OAuth1-signed client for the v2 REST API with typed errors
//! - [`tools`]: one schema-described tool per API operation
//! - [`server`]: JSON-RPC 2.0 stdio server with per-request cancellation
//! - [`config`]: TOML settings and credential resolution
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use noun_project_mcp::client::{CallContext, ClientConfig, NounProjectClient, SearchQuery};
//! use noun_project_mcp::config::Credentials;
//!
//! # async fn run() -> Result<(), noun_project_mcp::IconError> {
//! let client = NounProjectClient::new(
//!     ClientConfig::default(),
//!     Credentials::new("api-key", "api-secret"),
//! )?;
//!
//! let query = SearchQuery::new("bicycle").with_limit(5);
//! for icon in client.search_icons(&query, &CallContext::new()).await? {
//!     println!("{} {}", icon.id, icon.preview_url);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod observability;
pub mod protocol;
pub mod server;
pub mod testing;
pub mod tools;

pub use client::{CallContext, NounProjectClient};
pub use config::{ConfigError, Credentials, ServerConfig};
pub use error::{ErrorKind, ErrorPayload, IconError, IconResult};
pub use server::McpServer;
pub use tools::{Tool, ToolDescription, ToolError, ToolOutput, ToolSystem};
