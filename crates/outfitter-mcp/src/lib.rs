//! MCP server binder for Outfitter actions
//!
//! Compiles an action registry into Model Context Protocol tools and serves
//! them as JSON-RPC 2.0 over newline-delimited stdio.
//!
//! ```text
//! [ MCP client ]
//!      | (JSON-RPC)
//!      v
//! [ McpServer ] --tools/call--> [ ActionSpec::invoke ] --> handler
//!      |                               |
//!      +<-- notifications/progress ----+
//! ```
//!
//! # Surfaces
//!
//! - Tools: every action whose surfaces include `mcp`
//! - Resources and resource templates with async readers
//! - Prompts with argument completion
//! - Log forwarding via `logging/setLevel`
//!
//! Capabilities advertised on `initialize` follow from what was registered.
//! Registration is closed once [`McpServerBuilder::build`] returns.

pub mod builtin;
pub mod error;
pub mod notify;
pub mod prompts;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod tools;

pub use builtin::builtin_builder;
pub use error::{Error, Result};
pub use notify::{McpLogger, Notifier, ProgressReporter};
pub use prompts::{PromptArgument, PromptMessage, PromptSpec};
pub use resources::{ResourceContents, ResourceRequest, ResourceSpec, ResourceTemplateSpec, UriTemplate};
pub use server::{McpServer, McpServerBuilder};
pub use tools::{ToolContent, ToolDefinition, ToolResult, tool_definition, wrap_error, wrap_success};
