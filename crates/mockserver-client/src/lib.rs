//! Typed client for the MockServer REST API.
//!
//! This crate is used by `unrelated-mockserver-mcp` (the MCP tool front end). It contains the
//! wire model, a single-path HTTP client, and the closed error taxonomy every caller branches
//! on. It intentionally contains **no** tool schemas and **no** text formatting.

pub mod client;
pub mod error;
pub mod model;

pub use client::{ClientConfig, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TIMEOUT, MockServerClient};
pub use error::{ErrorKind, MockServerError, Result};
