//! Bugsnag provider implementation for bugsnag-mcp.
//!
//! This crate provides integration with the Bugsnag Data Access API for
//! organizations, projects and events.

mod client;

pub use client::BugsnagClient;

/// Default Bugsnag API URL.
pub const DEFAULT_BUGSNAG_URL: &str = bugsnag_core::config::DEFAULT_ENDPOINT;

/// Data Access API version sent in the `X-Version` header.
pub const API_VERSION: &str = "2";
