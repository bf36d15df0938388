//! Compile actions into a clap command tree and dispatch invocations
//!
//! Each CLI-exposed action becomes one subcommand. Actions sharing a `group`
//! become subcommands of a parent command; a grouped action without its own
//! command name is the group's base and runs when the group is invoked
//! without a subcommand.
//!
//! Every invocation goes through the same pipeline: gather raw flags and
//! positionals, coerce them against the input schema, apply `map_input`,
//! validate, run the handler, then render the result in the resolved output
//! mode.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::error::ErrorKind as ClapErrorKind;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use clap_complete::Shell;
use outfitter_contracts::{
    ActionCliInputContext, ActionSource, ActionSpec, EnvSnapshot, EnvelopeOptions, Environment,
    ErrorCategory, ErrorDetail, FlagValue, HandlerContext, LogLevel, LoggerConfig, OutfitterError,
    ResolvedCli, Surface, create_logger, resolve_verbose, to_envelope,
};
use serde_json::{Map, Value};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::coerce::coerce_value;
use crate::error::{CliError, Result};
use crate::output::{OutputFlags, OutputMode, resolve_output_mode, write_line};
use crate::render::{render_error, render_human};

const COMPLETION_COMMAND: &str = "completion";
const HELP_COMMAND: &str = "help";

/// Value clap stores for an optional-value flag given without a value
const BARE_FLAG: &str = "\u{0}";

struct Binding {
    action: Arc<ActionSpec>,
    cli: ResolvedCli,
}

enum Route {
    Action(Binding),
    Group {
        name: String,
        base: Option<Binding>,
        children: Vec<(String, Binding)>,
    },
}

/// Process-level inputs to one CLI run
#[derive(Debug, Clone)]
pub struct Invocation {
    pub env: EnvSnapshot,
    pub cwd: PathBuf,
    /// Cancelled on SIGINT by the binary
    pub signal: CancellationToken,
    /// Colorize human-mode errors
    pub color: bool,
}

impl Invocation {
    pub fn new(env: EnvSnapshot, cwd: impl Into<PathBuf>) -> Self {
        Self {
            env,
            cwd: cwd.into(),
            signal: CancellationToken::new(),
            color: false,
        }
    }

    pub fn signal(mut self, signal: CancellationToken) -> Self {
        self.signal = signal;
        self
    }

    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}

/// Builder for [`CliProgram`]
#[derive(Debug, Clone)]
pub struct CliBuilder {
    name: String,
    version: Option<String>,
    about: Option<String>,
}

impl CliBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            about: None,
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    /// Compile every CLI-surface action of `source` into a command tree.
    ///
    /// Fails on duplicate names or aliases at one level, on a second base
    /// action for a group, and on a group whose name is already a top-level
    /// command.
    pub fn build<S: ActionSource + ?Sized>(self, source: &S) -> Result<CliProgram> {
        let mut routes: Vec<Route> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut groups: HashMap<String, usize> = HashMap::new();
        let mut taken: HashSet<String> =
            [COMPLETION_COMMAND, HELP_COMMAND].into_iter().map(String::from).collect();

        for action in source.actions_for(Surface::Cli) {
            let Some(cli) = action.resolve_cli()? else {
                continue;
            };
            let binding = Binding { action, cli };

            let Some(group) = binding.cli.group.clone() else {
                let name = binding.cli.name.clone().unwrap_or_default();
                if groups.contains_key(&name) {
                    return Err(CliError::GroupCollision { name });
                }
                claim(&mut taken, Some(&name), &binding.cli.aliases, &self.name)?;
                index.insert(name, routes.len());
                routes.push(Route::Action(binding));
                continue;
            };

            let slot = match groups.get(&group) {
                Some(slot) => *slot,
                None => {
                    if taken.contains(&group) {
                        return Err(CliError::GroupCollision { name: group });
                    }
                    taken.insert(group.clone());
                    let slot = routes.len();
                    groups.insert(group.clone(), slot);
                    index.insert(group.clone(), slot);
                    routes.push(Route::Group {
                        name: group.clone(),
                        base: None,
                        children: Vec::new(),
                    });
                    slot
                }
            };

            let Route::Group { base, children, .. } = &mut routes[slot] else {
                continue;
            };
            match binding.cli.name.clone() {
                None => {
                    if let Some(first) = base {
                        return Err(CliError::DuplicateBase {
                            group,
                            first: first.action.id().to_string(),
                            second: binding.action.id().to_string(),
                        });
                    }
                    claim(&mut taken, None, &binding.cli.aliases, &self.name)?;
                    *base = Some(binding);
                }
                Some(name) => {
                    let mut local: HashSet<String> = children
                        .iter()
                        .flat_map(|(n, b)| std::iter::once(n.clone()).chain(b.cli.aliases.clone()))
                        .collect();
                    local.insert(HELP_COMMAND.to_string());
                    claim(&mut local, Some(&name), &binding.cli.aliases, &group)?;
                    children.push((name, binding));
                }
            }
        }

        let command = self.command(&routes);
        tracing::debug!(commands = routes.len(), "Built command tree");
        Ok(CliProgram {
            name: self.name,
            command,
            routes,
            index,
        })
    }

    fn command(&self, routes: &[Route]) -> Command {
        let mut root = Command::new(self.name.clone())
            .subcommand_required(true)
            .arg_required_else_help(true)
            .args(global_args())
            .subcommand(
                Command::new(COMPLETION_COMMAND)
                    .about("Generate shell completion scripts")
                    .arg(
                        Arg::new("shell")
                            .required(true)
                            .value_parser(value_parser!(Shell))
                            .help("Target shell"),
                    ),
            );
        if let Some(version) = &self.version {
            root = root.version(version.clone());
        }
        if let Some(about) = &self.about {
            root = root.about(about.clone());
        }

        for route in routes {
            let sub = match route {
                Route::Action(binding) => {
                    bound_command(binding.cli.name.clone().unwrap_or_default(), binding)
                }
                Route::Group {
                    name,
                    base,
                    children,
                } => {
                    let mut cmd = match base {
                        Some(binding) => {
                            bound_command(name.clone(), binding).subcommand_negates_reqs(true)
                        }
                        None => Command::new(name.clone())
                            .about(format!("{name} commands"))
                            .subcommand_required(true)
                            .arg_required_else_help(true),
                    };
                    for (child, binding) in children {
                        cmd = cmd.subcommand(bound_command(child.clone(), binding));
                    }
                    cmd
                }
            };
            root = root.subcommand(sub);
        }
        root
    }
}

/// Reserve `name` and its aliases in `taken`.
fn claim(
    taken: &mut HashSet<String>,
    name: Option<&str>,
    aliases: &[String],
    parent: &str,
) -> Result<()> {
    for candidate in name.into_iter().chain(aliases.iter().map(String::as_str)) {
        if !taken.insert(candidate.to_string()) {
            return Err(CliError::DuplicateCommand {
                name: candidate.to_string(),
                parent: parent.to_string(),
            });
        }
    }
    Ok(())
}

fn global_args() -> [Arg; 4] {
    [
        Arg::new("output")
            .long("output")
            .value_name("MODE")
            .global(true)
            .help("Output mode: human, json, or jsonl"),
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .global(true)
            .help("Shorthand for --output json"),
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .global(true)
            .help("Shorthand for --output jsonl"),
        Arg::new("verbose")
            .short('v')
            .long("verbose")
            .action(ArgAction::SetTrue)
            .global(true)
            .help("Enable debug logging"),
    ]
}

fn display_default(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn bound_command(name: String, binding: &Binding) -> Command {
    let schema = binding.action.input();
    let mut cmd = Command::new(name).about(binding.action.description().to_string());
    for alias in &binding.cli.aliases {
        cmd = cmd.visible_alias(alias.clone());
    }

    for (position, arg) in binding.cli.command.args.iter().enumerate() {
        let key = arg.key();
        let mut clap_arg = Arg::new(key.clone())
            .index(position + 1)
            .value_name(arg.name.clone())
            .required(arg.required);
        if arg.variadic {
            clap_arg = clap_arg.action(ArgAction::Append).num_args(1..);
        }
        if let Some(help) = schema.property_description(&key) {
            clap_arg = clap_arg.help(help.to_string());
        }
        cmd = cmd.arg(clap_arg);
    }

    for resolved in &binding.cli.options {
        let flag = &resolved.flag;
        let option = &resolved.option;
        let mut help = option.description.clone();
        if let Some(default) = &option.default {
            help.push_str(&format!(" [default: {}]", display_default(default)));
        }

        let mut clap_arg = Arg::new(flag.key.clone()).long(flag.long.clone()).help(help);
        if let Some(short) = flag.short {
            clap_arg = clap_arg.short(short);
        }
        if let Some(value_name) = &flag.value_name {
            clap_arg = clap_arg.value_name(value_name.clone());
        }
        let repeated = if flag.variadic {
            ArgAction::Append
        } else {
            ArgAction::Set
        };
        clap_arg = match flag.value {
            FlagValue::None if flag.negated => clap_arg.action(ArgAction::SetFalse),
            FlagValue::None => clap_arg.action(ArgAction::SetTrue),
            FlagValue::Required if flag.variadic => clap_arg.action(repeated).num_args(1..),
            FlagValue::Required => clap_arg.action(repeated).num_args(1),
            FlagValue::Optional => clap_arg
                .action(repeated)
                .num_args(0..=1)
                .default_missing_value(BARE_FLAG),
        };
        if option.required && option.default.is_none() && flag.takes_value() {
            clap_arg = clap_arg.required(true);
        }
        cmd = cmd.arg(clap_arg);
    }
    cmd
}

fn given(matches: &ArgMatches, key: &str) -> bool {
    matches.value_source(key) == Some(ValueSource::CommandLine)
}

fn flag_text(value: &String) -> Value {
    if value == BARE_FLAG {
        Value::Bool(true)
    } else {
        Value::String(value.clone())
    }
}

/// Collect raw option and positional values for `binding` from `matches`.
///
/// Option values are coerced by their input key; options that were not given
/// fall back to their declared default. A negated switch defaults to `true`.
fn gather(binding: &Binding, matches: &ArgMatches) -> ActionCliInputContext {
    let schema = binding.action.input();
    let mut input = ActionCliInputContext::default();

    for arg in &binding.cli.command.args {
        let key = arg.key();
        let raw = if arg.variadic {
            matches
                .get_many::<String>(&key)
                .map(|values| Value::Array(values.cloned().map(Value::String).collect()))
        } else {
            matches.get_one::<String>(&key).cloned().map(Value::String)
        };
        input
            .args
            .push(raw.map(|v| coerce_value(schema, &key, v)).unwrap_or(Value::Null));
    }

    for resolved in &binding.cli.options {
        let flag = &resolved.flag;
        let key = flag.key.as_str();
        let raw = if !given(matches, key) {
            None
        } else {
            match flag.value {
                FlagValue::None => Some(Value::Bool(!flag.negated)),
                _ if flag.variadic => matches
                    .get_many::<String>(key)
                    .map(|values| Value::Array(values.map(flag_text).collect())),
                _ => matches.get_one::<String>(key).map(flag_text),
            }
        };
        let value = match raw {
            Some(value) => Some(coerce_value(schema, key, value)),
            None => resolved
                .option
                .default
                .clone()
                .or_else(|| flag.negated.then_some(Value::Bool(true))),
        };
        if let Some(value) = value {
            input.flags.insert(key.to_string(), value);
        }
    }
    input
}

/// Default input mapping: option values plus every positional that was given.
fn merge(binding: &Binding, input: &ActionCliInputContext) -> Value {
    let mut map: Map<String, Value> = input.flags.clone();
    for (arg, value) in binding.cli.command.args.iter().zip(&input.args) {
        if !value.is_null() {
            map.insert(arg.key(), value.clone());
        }
    }
    Value::Object(map)
}

/// A compiled command tree bound to its actions
pub struct CliProgram {
    name: String,
    command: Command,
    routes: Vec<Route>,
    index: HashMap<String, usize>,
}

impl std::fmt::Debug for CliProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliProgram")
            .field("name", &self.name)
            .field("commands", &self.index.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CliProgram {
    pub fn builder(name: impl Into<String>) -> CliBuilder {
        CliBuilder::new(name)
    }

    /// The clap command tree, for help rendering and completions.
    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Run one invocation and return the process exit code.
    ///
    /// `argv` includes the program name. Results go to `stdout`; errors,
    /// diagnostics, and parse failures go to `stderr`.
    pub async fn run<I, T, O, E>(
        &self,
        argv: I,
        invocation: Invocation,
        stdout: &mut O,
        stderr: &mut E,
    ) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
        O: AsyncWrite + Unpin + ?Sized,
        E: AsyncWrite + Unpin + ?Sized,
    {
        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        match self.dispatch(&argv, &invocation, stdout, stderr).await {
            Ok(code) => code,
            Err(err) => {
                tracing::error!(error = %err, "Failed to write command output");
                ErrorCategory::Internal.exit_code()
            }
        }
    }

    async fn dispatch<O, E>(
        &self,
        argv: &[String],
        invocation: &Invocation,
        stdout: &mut O,
        stderr: &mut E,
    ) -> io::Result<i32>
    where
        O: AsyncWrite + Unpin + ?Sized,
        E: AsyncWrite + Unpin + ?Sized,
    {
        let profile = Environment::from_env(&invocation.env);
        let detail = profile.defaults().error_detail;

        let matches = match self.command.clone().try_get_matches_from(argv) {
            Ok(matches) => matches,
            Err(err) => return self.report_parse_error(err, argv, invocation, detail, stdout, stderr).await,
        };

        let Some((name, sub)) = matches.subcommand() else {
            let error = OutfitterError::validation("No command given");
            write_line(stderr, &render_error(&error, detail, invocation.color)).await?;
            return Ok(error.exit_code());
        };
        if name == COMPLETION_COMMAND {
            return self.write_completion(sub, stdout).await;
        }

        let Some((binding, leaf)) = self.resolve(name, sub) else {
            let error = OutfitterError::internal(format!("No action bound to command '{name}'"));
            write_line(stderr, &render_error(&error, detail, invocation.color)).await?;
            return Ok(error.exit_code());
        };

        let flags = OutputFlags {
            output: leaf.get_one::<String>("output").cloned(),
            json: leaf.get_flag("json"),
            jsonl: leaf.get_flag("jsonl"),
        };
        let mode = resolve_output_mode(None, &flags, &invocation.env);
        let verbose = resolve_verbose(leaf.get_flag("verbose"), &invocation.env, profile);

        let request_id = Uuid::new_v4().to_string();
        let level = if verbose {
            Some(LogLevel::Debug)
        } else {
            profile.defaults().log_level
        };
        let logger = create_logger(
            LoggerConfig::new(binding.action.id())
                .level(level)
                .field("requestId", request_id.clone()),
        );
        let ctx = HandlerContext::builder()
            .request_id(request_id.clone())
            .cwd(invocation.cwd.clone())
            .env(invocation.env.clone())
            .logger(logger)
            .signal(invocation.signal.clone())
            .build();

        let started = Instant::now();
        let result = execute(binding, leaf, ctx).await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let options = EnvelopeOptions::default()
            .request_id(request_id)
            .duration_ms(duration_ms);
        let cli = binding.action.cli_spec();

        match result {
            Ok(value) => {
                let code = cli
                    .and_then(|c| c.exit_code.as_ref())
                    .map_or(0, |exit_code| exit_code(&value));
                match mode {
                    OutputMode::Human => {
                        let text = match cli.and_then(|c| c.render.as_ref()) {
                            Some(render) => render(&value),
                            None => render_human(&value),
                        };
                        if !text.is_empty() {
                            write_line(stdout, &text).await?;
                        }
                    }
                    OutputMode::Json => {
                        let envelope = to_envelope(Ok(value), options);
                        write_line(stdout, &serde_json::to_string_pretty(&envelope)?).await?;
                    }
                    OutputMode::Jsonl => {
                        let envelope = to_envelope(Ok(value), options);
                        write_line(stdout, &serde_json::to_string(&envelope)?).await?;
                    }
                }
                Ok(code)
            }
            Err(error) => {
                tracing::debug!(action = binding.action.id(), tag = error.tag(), "Action failed");
                write_error(&error, mode, detail, options, invocation.color, stderr).await?;
                Ok(error.exit_code())
            }
        }
    }

    fn resolve<'m>(&self, name: &str, matches: &'m ArgMatches) -> Option<(&Binding, &'m ArgMatches)> {
        match self.routes.get(*self.index.get(name)?)? {
            Route::Action(binding) => Some((binding, matches)),
            Route::Group { base, children, .. } => match matches.subcommand() {
                Some((child, leaf)) => children
                    .iter()
                    .find(|(name, _)| name == child)
                    .map(|(_, binding)| (binding, leaf)),
                None => base.as_ref().map(|binding| (binding, matches)),
            },
        }
    }

    async fn report_parse_error<O, E>(
        &self,
        err: clap::Error,
        argv: &[String],
        invocation: &Invocation,
        detail: ErrorDetail,
        stdout: &mut O,
        stderr: &mut E,
    ) -> io::Result<i32>
    where
        O: AsyncWrite + Unpin + ?Sized,
        E: AsyncWrite + Unpin + ?Sized,
    {
        let rendered = err.render().to_string();
        let message = match err.kind() {
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => {
                write_line(stdout, &rendered).await?;
                return Ok(0);
            }
            ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                "Missing command".to_string()
            }
            _ => rendered
                .lines()
                .next()
                .unwrap_or("Invalid arguments")
                .trim_start_matches("error: ")
                .to_string(),
        };

        let flags = OutputFlags::scan(argv.get(1..).unwrap_or_default());
        let mode = resolve_output_mode(None, &flags, &invocation.env);
        let error = OutfitterError::validation(message);
        if mode.is_json() {
            write_error(&error, mode, detail, EnvelopeOptions::default(), invocation.color, stderr)
                .await?;
        } else {
            write_line(stderr, rendered.trim_end()).await?;
        }
        Ok(error.exit_code())
    }

    async fn write_completion<O>(&self, matches: &ArgMatches, stdout: &mut O) -> io::Result<i32>
    where
        O: AsyncWrite + Unpin + ?Sized,
    {
        let Some(shell) = matches.get_one::<Shell>("shell").copied() else {
            return Ok(ErrorCategory::Validation.exit_code());
        };
        let mut command = self.command.clone();
        let mut script = Vec::new();
        clap_complete::generate(shell, &mut command, self.name.clone(), &mut script);
        stdout.write_all(&script).await?;
        stdout.flush().await?;
        Ok(0)
    }
}

async fn execute(binding: &Binding, matches: &ArgMatches, ctx: HandlerContext) -> outfitter_contracts::Result<Value> {
    let gathered = gather(binding, matches);
    let raw = match binding.action.cli_spec().and_then(|c| c.map_input.as_ref()) {
        Some(map_input) => map_input(&gathered)?,
        None => merge(binding, &gathered),
    };
    let input = binding.action.validate_input(raw)?;
    tracing::debug!(
        action = binding.action.id(),
        request_id = ctx.request_id(),
        "Dispatching action"
    );
    binding.action.handle(input, ctx).await
}

async fn write_error<E>(
    error: &OutfitterError,
    mode: OutputMode,
    detail: ErrorDetail,
    options: EnvelopeOptions,
    color: bool,
    stderr: &mut E,
) -> io::Result<()>
where
    E: AsyncWrite + Unpin + ?Sized,
{
    match mode {
        OutputMode::Human => write_line(stderr, &render_error(error, detail, color)).await,
        OutputMode::Json => {
            let envelope = to_envelope::<Value>(Err(error.clone()), options);
            write_line(stderr, &serde_json::to_string_pretty(&envelope)?).await
        }
        OutputMode::Jsonl => {
            let envelope = to_envelope::<Value>(Err(error.clone()), options);
            write_line(stderr, &serde_json::to_string(&envelope)?).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outfitter_contracts::{ActionRegistry, CliOption, CliSpec, InputSchema};
    use serde_json::json;

    fn echo(id: &str, cli: CliSpec) -> ActionSpec {
        let schema = InputSchema::new(json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "count": {"type": "integer"},
                "force": {"type": "boolean"},
                "tags": {"type": "array", "items": {"type": "string"}}
            }
        }))
        .unwrap();
        ActionSpec::new(id, "Echo input", schema, |input: Value, _ctx: HandlerContext| async move {
            Ok(input)
        })
        .cli(cli)
    }

    fn build(actions: Vec<ActionSpec>) -> Result<CliProgram> {
        let registry = ActionRegistry::new().extend(actions).unwrap();
        CliProgram::builder("test").version("0.0.0").build(&registry)
    }

    fn matches_for<'a>(program: &'a CliProgram, argv: &[&str]) -> (&'a Binding, ArgMatches) {
        let matches = program.command.clone().try_get_matches_from(argv).unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        let (binding, _) = program.resolve(name, sub).unwrap();
        let leaf = match sub.subcommand() {
            Some((_, leaf)) => leaf.clone(),
            None => sub.clone(),
        };
        (binding, leaf)
    }

    #[test]
    fn command_tree_debug_asserts_pass() {
        let program = build(vec![
            echo("demo.echo", CliSpec::new().command("echo <name>").alias("e")),
            echo("demo.base", CliSpec::new().group("demo").command("[name]")),
            echo("demo.child", CliSpec::new().group("demo").command("child")),
        ])
        .unwrap();
        program.command().clone().debug_assert();
    }

    #[test]
    fn gather_applies_defaults_and_coercion() {
        let program = build(vec![echo(
            "demo.echo",
            CliSpec::new()
                .command("echo <name>")
                .option(CliOption::new("-c, --count <n>", "Count").default_value(1))
                .option(CliOption::new("--no-force", "Skip force")),
        )])
        .unwrap();

        let (binding, leaf) = matches_for(&program, &["test", "echo", "bob", "--count", "3"]);
        let input = gather(binding, &leaf);
        assert_eq!(input.args, vec![json!("bob")]);
        assert_eq!(input.flags.get("count"), Some(&json!(3)));
        assert_eq!(input.flags.get("force"), Some(&json!(true)));

        let (binding, leaf) = matches_for(&program, &["test", "echo", "bob", "--no-force"]);
        let input = gather(binding, &leaf);
        assert_eq!(input.flags.get("count"), Some(&json!(1)));
        assert_eq!(input.flags.get("force"), Some(&json!(false)));
    }

    #[test]
    fn gather_handles_variadic_and_bare_optional() {
        let program = build(vec![echo(
            "demo.echo",
            CliSpec::new()
                .command("echo [tags...]")
                .option(CliOption::new("--name [value]", "Name")),
        )])
        .unwrap();

        let (binding, leaf) = matches_for(&program, &["test", "echo", "a", "b", "--name"]);
        let input = gather(binding, &leaf);
        assert_eq!(input.args, vec![json!(["a", "b"])]);
        assert_eq!(input.flags.get("name"), Some(&json!(true)));
        assert_eq!(merge(binding, &input), json!({"name": true, "tags": ["a", "b"]}));
    }

    #[test]
    fn group_without_subcommand_resolves_base() {
        let program = build(vec![
            echo("demo.base", CliSpec::new().group("demo").command("[name]")),
            echo("demo.child", CliSpec::new().group("demo").command("child")),
        ])
        .unwrap();

        let (binding, _) = matches_for(&program, &["test", "demo", "x"]);
        assert_eq!(binding.action.id(), "demo.base");
        let (binding, _) = matches_for(&program, &["test", "demo", "child"]);
        assert_eq!(binding.action.id(), "demo.child");
    }

    #[test]
    fn duplicate_base_is_rejected() {
        let err = build(vec![
            echo("demo.one", CliSpec::new().group("demo")),
            echo("demo.two", CliSpec::new().group("demo")),
        ])
        .unwrap_err();
        assert!(matches!(err, CliError::DuplicateBase { .. }));
    }

    #[test]
    fn duplicate_alias_is_rejected() {
        let err = build(vec![
            echo("a.one", CliSpec::new().command("one").alias("x")),
            echo("a.two", CliSpec::new().command("two").alias("x")),
        ])
        .unwrap_err();
        assert!(matches!(err, CliError::DuplicateCommand { name, .. } if name == "x"));
    }

    #[test]
    fn group_colliding_with_command_is_rejected() {
        let err = build(vec![
            echo("a.surface", CliSpec::new().command("surface")),
            echo("surface.show", CliSpec::new().group("surface").command("show")),
        ])
        .unwrap_err();
        assert!(matches!(err, CliError::GroupCollision { name } if name == "surface"));
    }

    #[test]
    fn completion_name_is_reserved() {
        let err = build(vec![echo("a.completion", CliSpec::new().command("completion"))]).unwrap_err();
        assert!(matches!(err, CliError::DuplicateCommand { .. }));
    }
}
