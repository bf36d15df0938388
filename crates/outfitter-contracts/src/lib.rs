//! Shared contracts for Outfitter surfaces
//!
//! This crate holds everything the CLI and MCP binders agree on:
//!
//! - [`error`]: the closed error taxonomy and its exit-code/HTTP tables
//! - [`validation`]: JSON Schema input validation
//! - [`context`]: the per-invocation [`HandlerContext`]
//! - [`action`] and [`registry`]: action declarations and the registry
//! - [`envelope`]: success/error envelopes
//! - [`logging`] and [`config`]: the ambient logger adapter and environment

pub mod action;
pub mod cli_spec;
pub mod config;
pub mod context;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod registry;
pub mod validation;

pub use action::{
    ActionCliInputContext, ActionHandler, ActionSpec, CliOption, CliSpec, HandlerFn, McpSpec,
    ResolvedCli, ResolvedOption, Surface,
};
pub use cli_spec::{ArgSpec, CommandSpec, FlagSpec, FlagValue};
pub use config::{
    EnvSnapshot, Environment, EnvironmentDefaults, ErrorDetail, OutfitterConfig, env_snapshot,
    resolve_verbose,
};
pub use context::{HandlerContext, HandlerContextBuilder, ProgressSink, ProgressUpdate};
pub use envelope::{
    Envelope, EnvelopeMeta, EnvelopeOptions, HttpResponse, to_envelope, to_http_response,
};
pub use error::{
    ErrorCategory, ErrorKind, OutfitterError, Result, ResultExt, SerializedError, SpecError,
};
pub use logging::{LogLevel, Logger, LoggerConfig, create_logger, init_tracing};
pub use registry::{ActionRegistry, ActionSource, create_action_registry};
pub use validation::{InputSchema, JsonType, number_value};
