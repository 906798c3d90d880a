//! MockServer exposed as MCP tools.
//!
//! The binary (`unrelated-mockserver-mcp`) serves [`server::MockServerTools`] over stdio. All
//! HTTP and error-classification logic lives in `unrelated-mockserver-client`; this crate only
//! adds tool schemas, argument validation, result summaries, and process configuration.

pub mod config;
pub mod params;
pub mod server;
pub mod summary;
pub mod validate;

pub use server::MockServerTools;
