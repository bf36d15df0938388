//! Action specifications
//!
//! An [`ActionSpec`] is declared once and exposed on every surface it lists.
//! The handler is written against a typed input; [`ActionSpec`] erases it behind
//! [`ActionHandler`] so binders can dispatch raw JSON.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cli_spec::{CommandSpec, FlagSpec};
use crate::context::HandlerContext;
use crate::error::{OutfitterError, Result, ResultExt, SpecError};
use crate::validation::{InputSchema, deserialize_input};

/// A dispatch mechanism an action can be invoked through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Cli,
    Mcp,
    Api,
    Server,
}

impl Surface {
    pub const ALL: [Surface; 4] = [Surface::Cli, Surface::Mcp, Surface::Api, Surface::Server];

    /// Surfaces used when an action does not declare any.
    pub const DEFAULT: [Surface; 2] = [Surface::Cli, Surface::Mcp];

    pub fn as_str(self) -> &'static str {
        match self {
            Surface::Cli => "cli",
            Surface::Mcp => "mcp",
            Surface::Api => "api",
            Surface::Server => "server",
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Surface {
    type Err = OutfitterError;

    fn from_str(s: &str) -> Result<Self> {
        Surface::ALL
            .into_iter()
            .find(|surface| surface.as_str() == s)
            .ok_or_else(|| OutfitterError::validation_field("surface", format!("Unknown surface: {s}")))
    }
}

/// Type-erased handler invoked by binders with validated JSON input
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn call(&self, input: Value, ctx: HandlerContext) -> Result<Value>;
}

/// Async function usable as a typed handler: `Fn(I, HandlerContext) -> impl Future<Output = Result<O>>`
pub trait HandlerFn<I>: Send + Sync + 'static {
    type Output: Serialize;
    type Future: Future<Output = Result<Self::Output>> + Send;

    fn invoke(&self, input: I, ctx: HandlerContext) -> Self::Future;
}

impl<I, O, F, Fut> HandlerFn<I> for F
where
    F: Fn(I, HandlerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O>> + Send,
    O: Serialize,
{
    type Output = O;
    type Future = Fut;

    fn invoke(&self, input: I, ctx: HandlerContext) -> Self::Future {
        self(input, ctx)
    }
}

struct TypedHandler<I, F> {
    f: F,
    _input: PhantomData<fn(I)>,
}

#[async_trait]
impl<I, F> ActionHandler for TypedHandler<I, F>
where
    I: DeserializeOwned + Send + 'static,
    F: HandlerFn<I>,
{
    async fn call(&self, input: Value, ctx: HandlerContext) -> Result<Value> {
        let input: I = deserialize_input(input)?;
        let output = self.f.invoke(input, ctx).await?;
        serde_json::to_value(output).or_internal("Failed to serialize handler output")
    }
}

/// Raw flag and argument values gathered by the CLI binder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionCliInputContext {
    /// Positional values in declaration order; variadic arguments are arrays
    pub args: Vec<Value>,
    /// Option values keyed by camelCase input key
    pub flags: Map<String, Value>,
}

pub type MapInputFn = Arc<dyn Fn(&ActionCliInputContext) -> Result<Value> + Send + Sync>;
pub type RenderFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;
pub type ExitCodeFn = Arc<dyn Fn(&Value) -> i32 + Send + Sync>;

/// One CLI option declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliOption {
    pub flags: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub required: bool,
}

impl CliOption {
    pub fn new(flags: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            flags: flags.into(),
            description: description.into(),
            default: None,
            required: false,
        }
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// CLI projection of an action
#[derive(Clone, Default)]
pub struct CliSpec {
    /// Command spec string, e.g. `"copy <src> [dest]"` or `"[directory]"`
    pub command: Option<String>,
    pub group: Option<String>,
    pub aliases: Vec<String>,
    pub options: Vec<CliOption>,
    pub map_input: Option<MapInputFn>,
    /// Human-mode renderer for the success value
    pub render: Option<RenderFn>,
    /// Exit code for a successful result; 0 when absent
    pub exit_code: Option<ExitCodeFn>,
}

impl CliSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn option(mut self, option: CliOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn map_input<F>(mut self, f: F) -> Self
    where
        F: Fn(&ActionCliInputContext) -> Result<Value> + Send + Sync + 'static,
    {
        self.map_input = Some(Arc::new(f));
        self
    }

    pub fn render<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        self.render = Some(Arc::new(f));
        self
    }

    pub fn exit_code<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> i32 + Send + Sync + 'static,
    {
        self.exit_code = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for CliSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliSpec")
            .field("command", &self.command)
            .field("group", &self.group)
            .field("aliases", &self.aliases)
            .field("options", &self.options)
            .field("map_input", &self.map_input.is_some())
            .field("render", &self.render.is_some())
            .field("exit_code", &self.exit_code.is_some())
            .finish()
    }
}

/// MCP projection of an action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpSpec {
    pub tool: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub defer_loading: bool,
}

impl McpSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn defer_loading(mut self, defer: bool) -> Self {
        self.defer_loading = defer;
        self
    }
}

/// A CLI option with its parsed flag string
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOption {
    pub option: CliOption,
    pub flag: FlagSpec,
}

/// The CLI shape of an action after parsing and defaulting
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCli {
    pub group: Option<String>,
    /// Subcommand name; `None` for a group's base action
    pub name: Option<String>,
    pub command: CommandSpec,
    pub aliases: Vec<String>,
    pub options: Vec<ResolvedOption>,
}

impl ResolvedCli {
    pub fn is_base(&self) -> bool {
        self.name.is_none()
    }

    /// Canonical command string as shown in manifests.
    pub fn command_string(&self) -> String {
        self.command.to_string()
    }
}

/// Flags every command carries; actions may not redeclare them.
pub const RESERVED_LONG_FLAGS: [&str; 6] = ["output", "json", "jsonl", "verbose", "help", "version"];
pub const RESERVED_SHORT_FLAGS: [char; 3] = ['h', 'v', 'V'];

/// A declared action
#[derive(Clone)]
pub struct ActionSpec {
    id: String,
    description: String,
    input: InputSchema,
    handler: Arc<dyn ActionHandler>,
    surfaces: Option<BTreeSet<Surface>>,
    cli: Option<CliSpec>,
    mcp: Option<McpSpec>,
}

impl ActionSpec {
    /// Declare an action with a typed handler.
    ///
    /// # Example
    ///
    /// ```
    /// use outfitter_contracts::{ActionSpec, HandlerContext, InputSchema};
    /// use serde::Deserialize;
    /// use serde_json::json;
    ///
    /// #[derive(Deserialize)]
    /// struct Greet {
    ///     name: String,
    /// }
    ///
    /// let schema = InputSchema::new(json!({
    ///     "type": "object",
    ///     "properties": {"name": {"type": "string"}},
    ///     "required": ["name"]
    /// }))
    /// .unwrap();
    ///
    /// let action = ActionSpec::new("greet", "Say hello", schema, |input: Greet, _ctx: HandlerContext| async move {
    ///     Ok(json!({"greeting": format!("hello {}", input.name)}))
    /// });
    /// assert_eq!(action.id(), "greet");
    /// ```
    pub fn new<I, F>(
        id: impl Into<String>,
        description: impl Into<String>,
        input: InputSchema,
        handler: F,
    ) -> Self
    where
        I: DeserializeOwned + Send + 'static,
        F: HandlerFn<I>,
    {
        Self::from_handler(
            id,
            description,
            input,
            Arc::new(TypedHandler {
                f: handler,
                _input: PhantomData,
            }),
        )
    }

    /// Declare an action from an already type-erased handler.
    pub fn from_handler(
        id: impl Into<String>,
        description: impl Into<String>,
        input: InputSchema,
        handler: Arc<dyn ActionHandler>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            input,
            handler,
            surfaces: None,
            cli: None,
            mcp: None,
        }
    }

    pub fn surfaces(mut self, surfaces: impl IntoIterator<Item = Surface>) -> Self {
        self.surfaces = Some(surfaces.into_iter().collect());
        self
    }

    pub fn cli(mut self, cli: CliSpec) -> Self {
        self.cli = Some(cli);
        self
    }

    pub fn mcp(mut self, mcp: McpSpec) -> Self {
        self.mcp = Some(mcp);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn input(&self) -> &InputSchema {
        &self.input
    }

    pub fn cli_spec(&self) -> Option<&CliSpec> {
        self.cli.as_ref()
    }

    pub fn mcp_spec(&self) -> Option<&McpSpec> {
        self.mcp.as_ref()
    }

    /// Declared surfaces, or `{cli, mcp}` when none were declared.
    pub fn surface_set(&self) -> BTreeSet<Surface> {
        self.surfaces
            .clone()
            .unwrap_or_else(|| Surface::DEFAULT.into_iter().collect())
    }

    pub fn supports(&self, surface: Surface) -> bool {
        match &self.surfaces {
            Some(set) => set.contains(&surface),
            None => Surface::DEFAULT.contains(&surface),
        }
    }

    /// MCP tool name: the declared tool name or the action id.
    pub fn tool_name(&self) -> &str {
        self.mcp
            .as_ref()
            .and_then(|m| m.tool.as_deref())
            .unwrap_or(&self.id)
    }

    pub fn tool_description(&self) -> &str {
        self.mcp
            .as_ref()
            .and_then(|m| m.description.as_deref())
            .unwrap_or(&self.description)
    }

    pub fn defer_loading(&self) -> bool {
        self.mcp.as_ref().is_some_and(|m| m.defer_loading)
    }

    /// Parse and check the CLI projection.
    ///
    /// Returns `None` when the action is not exposed on the CLI. An action on
    /// the CLI surface without a [`CliSpec`] becomes an argument-less command
    /// named after the last `.`-segment of its id.
    pub fn resolve_cli(&self) -> std::result::Result<Option<ResolvedCli>, SpecError> {
        if !self.supports(Surface::Cli) {
            return Ok(None);
        }
        let default_cli = CliSpec::default();
        let cli = self.cli.as_ref().unwrap_or(&default_cli);

        let command = CommandSpec::parse(cli.command.as_deref().unwrap_or(""))?;
        let name = match (&command.name, &cli.group) {
            (Some(name), _) => Some(name.clone()),
            (None, Some(_)) => None,
            (None, None) => Some(self.default_command_name().to_string()),
        };

        let mut keys = HashSet::new();
        for arg in &command.args {
            let key = arg.key();
            if RESERVED_LONG_FLAGS.contains(&key.as_str()) {
                return Err(SpecError::InvalidCommand {
                    spec: command.to_string(),
                    reason: format!("argument name '{}' is reserved by the CLI", arg.name),
                });
            }
            if !keys.insert(key) {
                return Err(self.duplicate_key(&arg.key()));
            }
        }

        let mut shorts = HashSet::new();
        let mut options = Vec::with_capacity(cli.options.len());
        for option in &cli.options {
            let flag = FlagSpec::parse(&option.flags)?;
            if RESERVED_LONG_FLAGS.contains(&flag.long.as_str())
                || RESERVED_LONG_FLAGS.contains(&flag.key.as_str())
                || flag.short.is_some_and(|c| RESERVED_SHORT_FLAGS.contains(&c))
            {
                return Err(SpecError::InvalidFlags {
                    flags: option.flags.clone(),
                    reason: "reserved by the CLI".into(),
                });
            }
            if let Some(short) = flag.short {
                if !shorts.insert(short) {
                    return Err(SpecError::InvalidFlags {
                        flags: option.flags.clone(),
                        reason: format!("short flag -{short} is declared twice in action {}", self.id),
                    });
                }
            }
            if !keys.insert(flag.key.clone()) {
                return Err(self.duplicate_key(&flag.key));
            }
            options.push(ResolvedOption {
                option: option.clone(),
                flag,
            });
        }

        Ok(Some(ResolvedCli {
            group: cli.group.clone(),
            name,
            command,
            aliases: cli.aliases.clone(),
            options,
        }))
    }

    fn default_command_name(&self) -> &str {
        self.id.rsplit('.').next().unwrap_or(&self.id)
    }

    fn duplicate_key(&self, key: &str) -> SpecError {
        SpecError::InvalidCommand {
            spec: self.cli.as_ref().and_then(|c| c.command.clone()).unwrap_or_default(),
            reason: format!("input key '{key}' is declared twice in action {}", self.id),
        }
    }

    /// Validate raw input and return it ready for [`handle`](Self::handle).
    ///
    /// `null` is treated as the empty object.
    pub fn validate_input(&self, raw: Value) -> Result<Value> {
        let input = match raw {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        self.input.validate(&input)?;
        Ok(input)
    }

    /// Run the handler on already validated input.
    pub async fn handle(&self, input: Value, ctx: HandlerContext) -> Result<Value> {
        self.handler.call(input, ctx).await
    }

    /// Validate then run. The handler is never entered with invalid input.
    pub async fn invoke(&self, raw: Value, ctx: HandlerContext) -> Result<Value> {
        let input = self.validate_input(raw)?;
        self.handle(input, ctx).await
    }
}

impl fmt::Debug for ActionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionSpec")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("surfaces", &self.surface_set())
            .field("cli", &self.cli)
            .field("mcp", &self.mcp)
            .finish_non_exhaustive()
    }
}
