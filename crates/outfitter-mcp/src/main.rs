//! Outfitter MCP Server
//!
//! Serves the built-in action registry over the Model Context Protocol.
//!
//! # Usage
//!
//! ```bash
//! outfitter-mcp [--root <path>]
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Control log verbosity (default: `info`)
//! - `OUTFITTER_ENV`: Profile (`development`, `production`, `test`)
//! - `OUTFITTER_VERBOSE`: Force debug logging
//!
//! JSON-RPC frames go over stdout; logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use outfitter_contracts::{Environment, OutfitterConfig, env_snapshot, init_tracing, resolve_verbose};
use outfitter_mcp::builtin_builder;

/// MCP server for Outfitter actions
#[derive(Parser)]
#[command(name = "outfitter-mcp")]
#[command(about = "MCP server for Outfitter actions")]
#[command(version)]
struct Args {
    /// Workspace root handed to handlers as their working directory
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let env = env_snapshot();
    let verbose = resolve_verbose(args.verbose, &env, Environment::from_env(&env));
    init_tracing(verbose, "info").map_err(|e| -> Box<dyn std::error::Error> { e })?;

    let root = std::path::absolute(&args.root)?;
    let config = OutfitterConfig::load(&root)?;
    let name = config.mcp.name.unwrap_or_else(|| "outfitter".to_string());

    tracing::info!(root = %root.display(), server = %name, "Starting outfitter-mcp server");

    let registry = Arc::new(outfitter_actions::builtin_registry()?);
    let server = builtin_builder(name, registry)?.env(env).cwd(root).build()?;
    server.serve(tokio::io::stdin(), tokio::io::stdout()).await?;

    Ok(())
}
