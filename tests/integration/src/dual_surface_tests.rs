//! One action, every surface
//!
//! Each test registers a single action once and drives it through the CLI
//! binder, the MCP server, and the HTTP envelope helpers, checking that the
//! surfaces agree on validation, error categories, and filtering.

use outfitter_cli::{CliProgram, Invocation};
use outfitter_contracts::{
    ActionRegistry, ActionSpec, EnvelopeOptions, ErrorCategory, HandlerContext, OutfitterError,
    Surface, to_http_response,
};
use outfitter_mcp::{McpServer, Notifier};
use outfitter_schema::{ManifestOptions, generate_manifest};
use outfitter_test_utils::{CallCounter, counting_add_action, env_from, failing_action};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

struct Surfaces {
    registry: ActionRegistry,
    cli: CliProgram,
    mcp: McpServer,
}

impl Surfaces {
    fn new(actions: Vec<ActionSpec>) -> Self {
        let registry = ActionRegistry::new().extend(actions).unwrap();
        let cli = CliProgram::builder("outfitter").build(&registry).unwrap();
        let mcp = McpServer::builder("outfitter", "0.0.0")
            .env(env_from(&[("OUTFITTER_ENV", "test")]))
            .cwd(std::env::temp_dir())
            .actions(&registry)
            .build()
            .unwrap();
        Self { registry, cli, mcp }
    }

    /// Exit code, stdout, stderr
    async fn cli(&self, argv: &[&str]) -> (i32, String, String) {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let invocation = Invocation::new(env_from(&[("OUTFITTER_ENV", "test")]), std::env::temp_dir());
        let mut full = vec!["outfitter"];
        full.extend_from_slice(argv);
        let code = self.cli.run(full, invocation, &mut stdout, &mut stderr).await;
        (
            code,
            String::from_utf8(stdout).unwrap(),
            String::from_utf8(stderr).unwrap(),
        )
    }

    /// The `result` of a `tools/call`
    async fn mcp(&self, tool: &str, arguments: Value) -> Value {
        let message = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": tool, "arguments": arguments}
        });
        let response = self
            .mcp
            .handle_message(&message.to_string(), &Notifier::disabled())
            .await
            .unwrap();
        let response: Value = serde_json::from_str(&response).unwrap();
        response["result"].clone()
    }

    /// Direct invocation wrapped for HTTP
    async fn http(&self, id: &str, input: Value) -> (u16, Value) {
        let action = self.registry.get(id).unwrap();
        let result = action.invoke(input, HandlerContext::builder().build()).await;
        let response = to_http_response(result, EnvelopeOptions::default().request_id("req-1"));
        (response.status, serde_json::to_value(&response.body).unwrap())
    }
}

fn error_payload(result: &Value) -> Value {
    serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn valid_input_same_result_everywhere() {
    let counter = CallCounter::new();
    let surfaces = Surfaces::new(vec![counting_add_action(counter.clone())]);

    let (code, stdout, _) = surfaces.cli(&["add", "--a", "2", "--b", "3"]).await;
    assert_eq!(code, 0);
    assert_eq!(stdout, "sum: 5\n");

    let (code, stdout, _) = surfaces.cli(&["add", "--a", "2", "--b", "3", "--json"]).await;
    assert_eq!(code, 0);
    let envelope: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(envelope["ok"], json!(true));
    assert_eq!(envelope["data"], json!({"sum": 5}));

    let result = surfaces.mcp("add", json!({"a": 2, "b": 3})).await;
    assert_eq!(result["structuredContent"], json!({"sum": 5}));
    assert_eq!(result["content"][0]["text"], "{\"sum\":5}");

    let (status, body) = surfaces.http("math.add", json!({"a": 2, "b": 3})).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"], json!({"sum": 5}));
    assert_eq!(body["meta"]["requestId"], "req-1");

    assert_eq!(counter.count(), 4);
}

#[tokio::test]
async fn invalid_input_never_reaches_handler() {
    let counter = CallCounter::new();
    let surfaces = Surfaces::new(vec![counting_add_action(counter.clone())]);

    let (code, _, stderr) = surfaces.cli(&["add", "--a", "bad", "--b", "3"]).await;
    assert_eq!(code, 1);
    assert!(stderr.starts_with("ValidationError"));

    let result = surfaces.mcp("add", json!({"a": "bad"})).await;
    assert_eq!(result["isError"], json!(true));
    assert_eq!(error_payload(&result)["category"], "validation");

    let (status, body) = surfaces.http("math.add", json!({"a": "bad"})).await;
    assert_eq!(status, 400);
    assert_eq!(body["ok"], json!(false));

    assert_eq!(counter.count(), 0);
}

#[tokio::test]
async fn not_found_maps_per_surface() {
    let counter = CallCounter::new();
    let error = OutfitterError::not_found("file", "notes.txt");
    let surfaces = Surfaces::new(vec![failing_action("files.read", error, counter.clone())]);

    let (code, _, stderr) = surfaces.cli(&["read"]).await;
    assert_eq!(code, 2);
    assert_eq!(stderr.lines().next(), Some("NotFoundError: file not found: notes.txt"));

    let result = surfaces.mcp("files.read", json!({})).await;
    assert_eq!(result["isError"], json!(true));
    let payload = error_payload(&result);
    assert_eq!(payload["_tag"], "NotFoundError");
    assert_eq!(payload["code"], json!(2));

    let (status, body) = surfaces.http("files.read", json!({})).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["_tag"], "NotFoundError");

    assert_eq!(counter.count(), 3);
}

#[rstest]
#[case(OutfitterError::conflict("stale"), 3, 409)]
#[case(OutfitterError::permission("denied"), 4, 403)]
#[case(OutfitterError::timeout("fetch", 100), 5, 504)]
#[case(OutfitterError::rate_limited("slow down", Some(3)), 6, 429)]
#[case(OutfitterError::network("unreachable"), 7, 502)]
#[case(OutfitterError::internal("boom"), 8, 500)]
#[case(OutfitterError::auth("no token"), 9, 401)]
#[case(OutfitterError::cancelled("stopped"), 130, 499)]
#[tokio::test]
async fn error_categories_agree(#[case] error: OutfitterError, #[case] exit: i32, #[case] http: u16) {
    let tag = error.tag();
    let surfaces = Surfaces::new(vec![failing_action("demo.fail", error, CallCounter::new())]);

    let (code, _, _) = surfaces.cli(&["fail"]).await;
    assert_eq!(code, exit);

    let result = surfaces.mcp("demo.fail", json!({})).await;
    let payload = error_payload(&result);
    assert_eq!(payload["_tag"], tag);
    assert_eq!(payload["code"], json!(exit));

    let (status, _) = surfaces.http("demo.fail", json!({})).await;
    assert_eq!(status, http);
}

#[tokio::test]
async fn surfaces_filter_dispatch() {
    let api_only = failing_action("api.only", OutfitterError::internal("x"), CallCounter::new())
        .surfaces([Surface::Api]);
    let mcp_only = failing_action("mcp.only", OutfitterError::internal("x"), CallCounter::new())
        .surfaces([Surface::Mcp]);
    let surfaces = Surfaces::new(vec![api_only, mcp_only]);

    let (code, _, _) = surfaces.cli(&["only"]).await;
    assert_eq!(code, ErrorCategory::Validation.exit_code());

    let tools: Vec<&str> = surfaces.mcp.tools().into_iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tools, vec!["mcp.only"]);
    let result = surfaces.mcp("api.only", json!({})).await;
    assert_eq!(error_payload(&result)["_tag"], "NotFoundError");

    let api = generate_manifest(&surfaces.registry, ManifestOptions::default().surface(Surface::Api)).unwrap();
    let ids: Vec<&str> = api.actions.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["api.only"]);
}

#[tokio::test]
async fn builtin_registry_is_consistent_across_surfaces() {
    let registry = outfitter_actions::builtin_registry().unwrap();
    let manifest = generate_manifest(&registry, ManifestOptions::default()).unwrap();

    let server = McpServer::builder("outfitter", "0.0.0")
        .env(env_from(&[]))
        .cwd(std::env::temp_dir())
        .actions(&registry)
        .build()
        .unwrap();
    let tools: Vec<String> = server.tools().iter().map(|t| t.name.clone()).collect();
    let manifest_tools: Vec<String> = manifest
        .actions
        .iter()
        .filter_map(|a| a.mcp.as_ref().map(|m| m.tool.clone()))
        .collect();
    assert_eq!(tools, manifest_tools);

    let program = CliProgram::builder("outfitter").build(&registry).unwrap();
    let help = program.command().clone().render_help().to_string();
    for entry in manifest.actions.iter().filter_map(|a| a.cli.as_ref()) {
        let top = entry.group.as_deref().unwrap_or(entry.command.split(' ').next().unwrap());
        assert!(help.contains(top), "{top} missing from help");
    }
}
