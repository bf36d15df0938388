//! Outfitter CLI
//!
//! Exposes the built-in action registry as a command-line program.

use std::io::IsTerminal;

use colored::Colorize;
use outfitter_cli::{CliProgram, Invocation};
use outfitter_contracts::{Environment, ErrorCategory, env_snapshot, init_tracing, resolve_verbose};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let code = run().await;
    std::process::exit(code);
}

async fn run() -> i32 {
    let argv: Vec<String> = std::env::args().collect();
    let env = env_snapshot();

    let verbose_flag = argv
        .iter()
        .skip(1)
        .take_while(|arg| arg.as_str() != "--")
        .any(|arg| arg == "-v" || arg == "--verbose");
    let verbose = resolve_verbose(verbose_flag, &env, Environment::from_env(&env));
    if let Err(e) = init_tracing(verbose, "warn") {
        eprintln!("{}: failed to initialize logging: {}", "warning".yellow().bold(), e);
    }

    // Introspection actions read the registry, so it lives until exit.
    let registry = match outfitter_actions::builtin_registry() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            return ErrorCategory::Internal.exit_code();
        }
    };
    let program = match CliProgram::builder("outfitter")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Run Outfitter actions from the command line")
        .build(&registry)
    {
        Ok(program) => program,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            return ErrorCategory::Internal.exit_code();
        }
    };

    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(e) => {
            eprintln!("{}: cannot read current directory: {}", "error".red().bold(), e);
            return ErrorCategory::Internal.exit_code();
        }
    };

    let signal = CancellationToken::new();
    let interrupt = signal.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("Interrupt received, cancelling");
            interrupt.cancel();
        }
    });

    let color = std::io::stderr().is_terminal() && !env.contains_key("NO_COLOR");
    let invocation = Invocation::new(env, cwd).signal(signal).color(color);

    let mut stdout = tokio::io::stdout();
    let mut stderr = tokio::io::stderr();
    program.run(argv, invocation, &mut stdout, &mut stderr).await
}
