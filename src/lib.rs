//! # Cal.com MCP
//!
//! A Model Context Protocol (MCP) server that exposes the Cal.com v2 API
//! (schedules, verified emails and phones, webhooks) as tools.
//!
//! ## Architecture
//!
//! - [`credential`]: per-request scoping of the caller's Cal.com token
//! - [`client`]: authenticated HTTP access to the Cal.com API
//! - [`tools`]: tool handlers, argument parsing and the tool catalog
//! - [`mcp`]: dispatcher, JSON-RPC handling and the SSE, streamable HTTP and
//!   stdio transports
//! - [`config`]: configuration management

pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod mcp;
pub mod tools;

// Re-export commonly used types
pub use client::CalClient;
pub use credential::AuthToken;
pub use error::ToolError;
pub use mcp::{Dispatcher, McpServer};
pub use tools::{catalog, ToolRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
