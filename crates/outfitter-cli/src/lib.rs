//! CLI binder for Outfitter actions
//!
//! [`CliProgram`] compiles every CLI-surface action of a registry into a
//! clap command tree and dispatches argv through it. Output modes, human
//! rendering, and value coercion live in their own modules so the MCP
//! binder and tests can reuse them.

pub mod binder;
pub mod coerce;
pub mod error;
pub mod output;
pub mod render;

pub use binder::{CliBuilder, CliProgram, Invocation};
pub use coerce::coerce_value;
pub use error::{CliError, Result};
pub use output::{OutputFlags, OutputMode, resolve_output_mode, write_line};
pub use render::{render_error, render_human};
