//! MCP server module
//!
//! Exposes the service-layer tools over the Model Context Protocol.

mod server;

pub use server::NutritrackService;
