//! MCP (Model Context Protocol) server for Bugsnag.
//!
//! Exposes Bugsnag organizations, projects and events to AI assistants as
//! MCP resources and tools, over stdio or streaming HTTP.

pub mod error;
pub mod handlers;
pub mod ids;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod shutdown;
pub mod tools;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
pub use server::McpServer;
pub use shutdown::ShutdownCoordinator;
pub use transport::TransportMode;
