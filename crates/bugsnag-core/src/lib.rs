//! Core traits, types, and error handling for bugsnag-mcp.
//!
//! This crate provides the foundational abstractions shared by the API client
//! and the MCP server: the [`IncidentProvider`] trait, the Bugsnag domain
//! types, configuration loading and the common error type.

pub mod config;
pub mod error;
pub mod provider;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use provider::IncidentProvider;
pub use types::{Event, Exception, Organization, Project, StackFrame};
