//! MCP server: catalog, request dispatch, and the stdio transport
//!
//! Registration happens on [`McpServerBuilder`]; [`McpServerBuilder::build`]
//! freezes the catalog. Advertised capabilities are derived from that frozen
//! catalog, so a client never sees a category with nothing behind it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use outfitter_contracts::{
    ActionSource, ActionSpec, EnvSnapshot, Environment, ErrorCategory, HandlerContext, LoggerConfig,
    OutfitterError, Surface, create_logger, env_snapshot,
};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::notify::{ClientLogLevel, McpLogger, Notifier, ProgressReporter, parse_client_level};
use crate::prompts::PromptSpec;
use crate::protocol::{
    CancelledParams, CompleteParams, CompletionReference, EmptyCapability, GetPromptParams,
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, InitializeParams, InitializeResult,
    JSONRPC_VERSION, JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND, PARSE_ERROR,
    PromptsCapability, RESOURCE_NOT_FOUND, ReadResourceParams, ResourcesCapability,
    ServerCapabilities, ServerInfo, SetLevelParams, ToolCallParams, ToolsCapability,
    negotiate_version,
};
use crate::resources::{ResourceSpec, ResourceTemplateSpec};
use crate::tools::{ToolDefinition, tool_definition, wrap_error, wrap_success};

/// Maximum number of values returned by `completion/complete`
const MAX_COMPLETIONS: usize = 100;

/// Collects actions, resources, and prompts before the server starts
pub struct McpServerBuilder {
    name: String,
    version: String,
    instructions: Option<String>,
    actions: Vec<Arc<ActionSpec>>,
    resources: Vec<ResourceSpec>,
    templates: Vec<ResourceTemplateSpec>,
    prompts: Vec<PromptSpec>,
    logging: bool,
    env: Option<EnvSnapshot>,
    cwd: Option<PathBuf>,
}

impl McpServerBuilder {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            instructions: None,
            actions: Vec::new(),
            resources: Vec::new(),
            templates: Vec::new(),
            prompts: Vec::new(),
            logging: true,
            env: None,
            cwd: None,
        }
    }

    /// Register every action in `source` that is exposed on MCP.
    pub fn actions<S: ActionSource + ?Sized>(mut self, source: &S) -> Self {
        self.actions.extend(source.actions_for(Surface::Mcp));
        self
    }

    /// Register one action. Actions without the MCP surface are skipped.
    pub fn action(mut self, action: impl Into<Arc<ActionSpec>>) -> Self {
        let action = action.into();
        if action.supports(Surface::Mcp) {
            self.actions.push(action);
        } else {
            tracing::debug!(action = action.id(), "Skipping action not exposed on MCP");
        }
        self
    }

    pub fn resource(mut self, resource: ResourceSpec) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn resource_template(mut self, template: ResourceTemplateSpec) -> Self {
        self.templates.push(template);
        self
    }

    pub fn prompt(mut self, prompt: PromptSpec) -> Self {
        self.prompts.push(prompt);
        self
    }

    /// Enable or disable `logging/setLevel` and log forwarding (default on).
    pub fn logging(mut self, enabled: bool) -> Self {
        self.logging = enabled;
        self
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Environment handed to handlers instead of the process environment.
    pub fn env(mut self, env: EnvSnapshot) -> Self {
        self.env = Some(env);
        self
    }

    /// Working directory handed to handlers instead of the process cwd.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Freeze the catalog.
    pub fn build(self) -> Result<McpServer> {
        let mut tools = Vec::with_capacity(self.actions.len());
        let mut tool_index: HashMap<String, usize> = HashMap::new();
        for action in self.actions {
            let definition = tool_definition(&action);
            if let Some(&existing) = tool_index.get(&definition.name) {
                let first: &Tool = &tools[existing];
                return Err(Error::DuplicateTool {
                    name: definition.name,
                    first: first.action.id().to_string(),
                    second: action.id().to_string(),
                });
            }
            tool_index.insert(definition.name.clone(), tools.len());
            tools.push(Tool { definition, action });
        }

        let mut uris = std::collections::HashSet::new();
        for uri in self
            .resources
            .iter()
            .map(|r| r.uri().to_string())
            .chain(self.templates.iter().map(|t| t.template().to_string()))
        {
            if !uris.insert(uri.clone()) {
                return Err(Error::DuplicateResource { uri });
            }
        }

        let mut prompt_names = std::collections::HashSet::new();
        for prompt in &self.prompts {
            if !prompt_names.insert(prompt.name()) {
                return Err(Error::DuplicatePrompt {
                    name: prompt.name().to_string(),
                });
            }
        }

        let env = self.env.unwrap_or_else(env_snapshot);
        let cwd = match self.cwd {
            Some(cwd) => cwd,
            None => std::env::current_dir()?,
        };

        tracing::debug!(
            tools = tools.len(),
            resources = self.resources.len(),
            templates = self.templates.len(),
            prompts = self.prompts.len(),
            "MCP catalog frozen"
        );

        Ok(McpServer {
            info: ServerInfo {
                name: self.name,
                version: self.version,
            },
            instructions: self.instructions,
            tools,
            tool_index,
            resources: self.resources,
            templates: self.templates,
            prompts: self.prompts,
            logging: self.logging,
            profile: Environment::from_env(&env),
            env: Arc::new(env),
            cwd,
            client_level: ClientLogLevel::default(),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        })
    }
}

struct Tool {
    definition: ToolDefinition,
    action: Arc<ActionSpec>,
}

type InFlight = Arc<Mutex<HashMap<String, CancellationToken>>>;

fn cancel_request(in_flight: &InFlight, params: Value) {
    let params: CancelledParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed cancellation");
            return;
        }
    };
    let key = params.request_id.to_string();
    let token = in_flight
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .cloned();
    match token {
        Some(token) => {
            tracing::info!(request = %key, reason = ?params.reason, "Cancelling request");
            token.cancel();
        }
        None => tracing::debug!(request = %key, "Cancellation for unknown or finished request"),
    }
}

/// Running MCP server over a frozen catalog
pub struct McpServer {
    info: ServerInfo,
    instructions: Option<String>,
    tools: Vec<Tool>,
    tool_index: HashMap<String, usize>,
    resources: Vec<ResourceSpec>,
    templates: Vec<ResourceTemplateSpec>,
    prompts: Vec<PromptSpec>,
    logging: bool,
    profile: Environment,
    env: Arc<EnvSnapshot>,
    cwd: PathBuf,
    client_level: ClientLogLevel,
    in_flight: InFlight,
}

impl McpServer {
    pub fn builder(name: impl Into<String>, version: impl Into<String>) -> McpServerBuilder {
        McpServerBuilder::new(name, version)
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Tool descriptors in registration order
    pub fn tools(&self) -> Vec<&ToolDefinition> {
        self.tools.iter().map(|t| &t.definition).collect()
    }

    /// Capabilities derived from what is registered.
    pub fn capabilities(&self) -> ServerCapabilities {
        let completions = self.prompts.iter().any(PromptSpec::has_completions)
            || self.templates.iter().any(ResourceTemplateSpec::has_completions);
        ServerCapabilities {
            tools: (!self.tools.is_empty()).then(ToolsCapability::default),
            resources: (!self.resources.is_empty() || !self.templates.is_empty())
                .then(ResourcesCapability::default),
            prompts: (!self.prompts.is_empty()).then(PromptsCapability::default),
            completions: completions.then(EmptyCapability::default),
            logging: self.logging.then(EmptyCapability::default),
        }
    }

    /// Handle one JSON-RPC message.
    ///
    /// Returns the serialized response, or an empty string for notifications.
    /// Notifications raised while handling (progress, log messages) go out
    /// through `notifier`.
    pub async fn handle_message(&self, message: &str, notifier: &Notifier) -> Result<String> {
        let value: Value = match serde_json::from_str(message) {
            Ok(value) => value,
            Err(e) => {
                let response = JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {e}"));
                return Ok(serde_json::to_string(&response)?);
            }
        };
        let id = value.get("id").cloned().filter(|id| !id.is_null());
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                let response = JsonRpcResponse::error(id, INVALID_REQUEST, format!("Invalid request: {e}"));
                return Ok(serde_json::to_string(&response)?);
            }
        };
        if request.jsonrpc != JSONRPC_VERSION {
            let response = JsonRpcResponse::error(
                id,
                INVALID_REQUEST,
                format!("Unsupported jsonrpc version: {}", request.jsonrpc),
            );
            return Ok(serde_json::to_string(&response)?);
        }

        let id = request.id.filter(|id| !id.is_null());
        let notification = id.is_none();
        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id, request.params),
            "initialized" | "notifications/initialized" => return Ok(String::new()),
            "notifications/cancelled" => {
                cancel_request(&self.in_flight, request.params);
                return Ok(String::new());
            }
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_tools_list(id)?,
            "tools/call" => self.handle_tools_call(id, request.params, notifier).await,
            "resources/list" => self.handle_resources_list(id)?,
            "resources/templates/list" => self.handle_templates_list(id)?,
            "resources/read" => self.handle_resources_read(id, request.params).await?,
            "prompts/list" => self.handle_prompts_list(id)?,
            "prompts/get" => self.handle_prompts_get(id, request.params).await?,
            "completion/complete" => self.handle_complete(id, request.params),
            "logging/setLevel" if self.logging => self.handle_set_level(id, request.params),
            method if notification => {
                tracing::debug!(method, "Ignoring unknown notification");
                return Ok(String::new());
            }
            method => JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {method}")),
        };

        if notification {
            return Ok(String::new());
        }
        serde_json::to_string(&response).map_err(Error::from)
    }

    fn handle_initialize(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        let params: InitializeParams = serde_json::from_value(params).unwrap_or_default();
        if let Some(client) = &params.client_info {
            tracing::info!(client = %client.name, version = ?client.version, "Client connected");
        }
        let result = InitializeResult {
            protocol_version: negotiate_version(params.protocol_version.as_deref()).to_string(),
            capabilities: self.capabilities(),
            server_info: self.info.clone(),
            instructions: self.instructions.clone(),
        };
        match serde_json::to_value(result) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
        }
    }

    fn handle_tools_list(&self, id: Option<Value>) -> Result<JsonRpcResponse> {
        let tools = serde_json::to_value(self.tools())?;
        Ok(JsonRpcResponse::success(id, json!({ "tools": tools })))
    }

    /// Validate, run, and wrap one tool call.
    ///
    /// Handler and validation failures are tool results with `isError: true`;
    /// only malformed params are JSON-RPC errors.
    async fn handle_tools_call(&self, id: Option<Value>, params: Value, notifier: &Notifier) -> JsonRpcResponse {
        let params: ToolCallParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {e}")),
        };
        let Some(tool) = self.tool_index.get(&params.name).map(|&i| &self.tools[i]) else {
            let error = OutfitterError::not_found("tool", &params.name);
            return JsonRpcResponse::success(id, wrap_error(&error));
        };

        let token = CancellationToken::new();
        let key = id.as_ref().map(Value::to_string);
        if let Some(key) = &key {
            self.in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key.clone(), token.clone());
        }

        let progress_token = params.meta.and_then(|m| m.progress_token);
        let ctx = self.context(&tool.action, token, progress_token, notifier);
        let request_id = ctx.request_id().to_string();

        let started = Instant::now();
        let result = tool.action.invoke(params.arguments, ctx).await;

        if let Some(key) = &key {
            self.in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(key);
        }

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let body = match result {
            Ok(value) => {
                tracing::debug!(tool = %params.name, %request_id, elapsed_ms, "Tool call succeeded");
                wrap_success(value)
            }
            Err(error) => {
                tracing::debug!(
                    tool = %params.name,
                    %request_id,
                    elapsed_ms,
                    tag = error.tag(),
                    "Tool call failed"
                );
                wrap_error(&error)
            }
        };
        JsonRpcResponse::success(id, body)
    }

    fn context(
        &self,
        action: &ActionSpec,
        token: CancellationToken,
        progress_token: Option<Value>,
        notifier: &Notifier,
    ) -> HandlerContext {
        let request_id = Uuid::new_v4().to_string();
        let inner = create_logger(
            LoggerConfig::new(action.id())
                .level(self.profile.defaults().log_level)
                .field("requestId", request_id.clone()),
        );
        let logger = McpLogger::new(inner, self.info.name.clone(), self.client_level.clone(), notifier.clone());

        let builder = HandlerContext::builder()
            .request_id(request_id)
            .cwd(self.cwd.clone())
            .env(Arc::clone(&self.env))
            .logger(Arc::new(logger))
            .signal(token);
        match progress_token {
            Some(progress) => builder
                .progress(Arc::new(ProgressReporter::new(progress, notifier.clone())))
                .build(),
            None => builder.build(),
        }
    }

    fn handle_resources_list(&self, id: Option<Value>) -> Result<JsonRpcResponse> {
        let resources: Vec<_> = self.resources.iter().map(ResourceSpec::descriptor).collect();
        Ok(JsonRpcResponse::success(
            id,
            json!({ "resources": serde_json::to_value(resources)? }),
        ))
    }

    fn handle_templates_list(&self, id: Option<Value>) -> Result<JsonRpcResponse> {
        let templates: Vec<_> = self
            .templates
            .iter()
            .map(ResourceTemplateSpec::descriptor)
            .collect();
        Ok(JsonRpcResponse::success(
            id,
            json!({ "resourceTemplates": serde_json::to_value(templates)? }),
        ))
    }

    async fn handle_resources_read(&self, id: Option<Value>, params: Value) -> Result<JsonRpcResponse> {
        let params: ReadResourceParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => return Ok(JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {e}"))),
        };

        let mut read = None;
        if let Some(resource) = self.resources.iter().find(|r| r.uri() == params.uri) {
            read = Some(resource.read().await);
        } else {
            for template in &self.templates {
                if let Some(result) = template.read(&params.uri).await {
                    read = Some(result);
                    break;
                }
            }
        }

        let response = match read {
            Some(Ok(contents)) => {
                JsonRpcResponse::success(id, json!({ "contents": [serde_json::to_value(contents)?] }))
            }
            Some(Err(error)) => {
                let code = match error.category() {
                    ErrorCategory::NotFound => RESOURCE_NOT_FOUND,
                    _ => INTERNAL_ERROR,
                };
                JsonRpcResponse::error_with_data(
                    id,
                    code,
                    error.message(),
                    Some(serde_json::to_value(error.serialize_error())?),
                )
            }
            None => JsonRpcResponse::error_with_data(
                id,
                RESOURCE_NOT_FOUND,
                format!("Resource not found: {}", params.uri),
                Some(json!({ "uri": params.uri })),
            ),
        };
        Ok(response)
    }

    fn handle_prompts_list(&self, id: Option<Value>) -> Result<JsonRpcResponse> {
        let prompts: Vec<_> = self.prompts.iter().map(PromptSpec::descriptor).collect();
        Ok(JsonRpcResponse::success(
            id,
            json!({ "prompts": serde_json::to_value(prompts)? }),
        ))
    }

    async fn handle_prompts_get(&self, id: Option<Value>, params: Value) -> Result<JsonRpcResponse> {
        let params: GetPromptParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => return Ok(JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {e}"))),
        };
        let Some(prompt) = self.prompts.iter().find(|p| p.name() == params.name) else {
            return Ok(JsonRpcResponse::error(
                id,
                INVALID_PARAMS,
                format!("Unknown prompt: {}", params.name),
            ));
        };

        let response = match prompt.get(params.arguments).await {
            Ok(messages) => {
                let mut result = json!({ "messages": serde_json::to_value(messages)? });
                if let Some(description) = prompt.descriptor().description {
                    result["description"] = Value::String(description);
                }
                JsonRpcResponse::success(id, result)
            }
            Err(error) => {
                let code = match error.category() {
                    ErrorCategory::Validation | ErrorCategory::NotFound => INVALID_PARAMS,
                    _ => INTERNAL_ERROR,
                };
                JsonRpcResponse::error(id, code, error.message())
            }
        };
        Ok(response)
    }

    fn handle_complete(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        let params: CompleteParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {e}")),
        };

        let candidates = match &params.reference {
            CompletionReference::Prompt { name } => self
                .prompts
                .iter()
                .find(|p| p.name() == name)
                .map(|p| p.completions(&params.argument.name)),
            CompletionReference::Resource { uri } => self
                .templates
                .iter()
                .find(|t| t.template().as_str() == uri)
                .map(|t| t.completions(&params.argument.name)),
        };
        let Some(candidates) = candidates else {
            return JsonRpcResponse::error(id, INVALID_PARAMS, "Unknown completion reference");
        };

        let matching: Vec<&String> = candidates
            .iter()
            .filter(|c| c.starts_with(&params.argument.value))
            .collect();
        let total = matching.len();
        let values: Vec<&String> = matching.into_iter().take(MAX_COMPLETIONS).collect();
        JsonRpcResponse::success(
            id,
            json!({
                "completion": {
                    "values": values,
                    "total": total,
                    "hasMore": total > MAX_COMPLETIONS
                }
            }),
        )
    }

    fn handle_set_level(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        let level = serde_json::from_value::<SetLevelParams>(params)
            .ok()
            .and_then(|p| parse_client_level(&p.level));
        match level {
            Some(level) => {
                self.client_level.set(level);
                tracing::debug!(%level, "Client log level set");
                JsonRpcResponse::success(id, json!({}))
            }
            None => JsonRpcResponse::error(id, INVALID_PARAMS, "Invalid log level"),
        }
    }

    /// Serve newline-delimited JSON-RPC until `reader` reaches EOF.
    ///
    /// Lines are read on a separate task so `notifications/cancelled` takes
    /// effect while a handler is running. Requests are handled one at a time
    /// in arrival order. Responses and notifications share one writer task.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (notifier, mut outgoing) = Notifier::channel();
        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            while let Some(line) = outgoing.recv().await {
                writer.write_all(line.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
            Ok::<_, std::io::Error>(())
        });

        let (requests_tx, mut requests) = mpsc::unbounded_channel::<String>();
        let in_flight = Arc::clone(&self.in_flight);
        let reader_task = tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            while let Some(line) = lines.next_line().await? {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                tracing::debug!(request = %line, "Received message");
                match serde_json::from_str::<JsonRpcRequest>(line) {
                    Ok(request) if request.method == "notifications/cancelled" => {
                        cancel_request(&in_flight, request.params);
                        continue;
                    }
                    _ => {}
                }
                if requests_tx.send(line.to_string()).is_err() {
                    break;
                }
            }
            // Client went away: anything still running is abandoned.
            for token in in_flight.lock().unwrap_or_else(PoisonError::into_inner).values() {
                token.cancel();
            }
            Ok::<_, std::io::Error>(())
        });

        tracing::info!(server = %self.info.name, "MCP server ready, listening on stdio");

        while let Some(line) = requests.recv().await {
            let response = match self.handle_message(&line, &notifier).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to handle message");
                    let response = JsonRpcResponse::error(None, INTERNAL_ERROR, format!("Internal error: {e}"));
                    serde_json::to_string(&response)?
                }
            };
            if response.is_empty() {
                continue;
            }
            let Some(tx) = notifier.sender() else {
                break;
            };
            if tx.send(response).is_err() {
                tracing::warn!("Transport closed before response was written");
                break;
            }
        }
        drop(notifier);

        reader_task
            .await
            .map_err(|e| Error::Transport(e.to_string()))??;
        writer_task
            .await
            .map_err(|e| Error::Transport(e.to_string()))??;
        tracing::info!("MCP server stopped");
        Ok(())
    }
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer")
            .field("info", &self.info)
            .field("tools", &self.tool_index.len())
            .field("resources", &self.resources.len())
            .field("templates", &self.templates.len())
            .field("prompts", &self.prompts.len())
            .finish_non_exhaustive()
    }
}
