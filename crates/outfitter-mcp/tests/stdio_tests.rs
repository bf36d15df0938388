//! End-to-end tests over the newline-delimited transport with the built-in
//! server.

use std::sync::Arc;
use std::time::Duration;

use outfitter_mcp::{McpServer, builtin_builder};
use outfitter_test_utils::{TestWorkspace, env_from};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};
use tokio::task::JoinHandle;

fn server(ws: &TestWorkspace) -> McpServer {
    let registry = Arc::new(outfitter_actions::builtin_registry().unwrap());
    builtin_builder("outfitter", registry)
        .unwrap()
        .env(env_from(&[("OUTFITTER_ENV", "test")]))
        .cwd(ws.root())
        .build()
        .unwrap()
}

struct Client {
    writer: DuplexStream,
    lines: Lines<BufReader<DuplexStream>>,
    server: JoinHandle<outfitter_mcp::Result<()>>,
}

impl Client {
    fn connect(server: McpServer) -> Self {
        let (writer, server_in) = tokio::io::duplex(64 * 1024);
        let (server_out, client_in) = tokio::io::duplex(64 * 1024);
        let server = tokio::spawn(async move { server.serve(server_in, server_out).await });
        Self {
            writer,
            lines: BufReader::new(client_in).lines(),
            server,
        }
    }

    async fn send(&mut self, message: Value) {
        self.send_raw(&message.to_string()).await;
    }

    async fn send_raw(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn recv(&mut self) -> Value {
        let line = tokio::time::timeout(Duration::from_secs(10), self.lines.next_line())
            .await
            .expect("timed out waiting for server output")
            .unwrap()
            .expect("server closed the stream");
        serde_json::from_str(&line).unwrap()
    }

    /// Read until the response for `id`, collecting notifications on the way.
    async fn response(&mut self, id: Value) -> (Value, Vec<Value>) {
        let mut notifications = Vec::new();
        loop {
            let message = self.recv().await;
            if message.get("id") == Some(&id) {
                return (message, notifications);
            }
            notifications.push(message);
        }
    }

    async fn request(&mut self, id: i64, method: &str, params: Value) -> Value {
        self.send(json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}))
            .await;
        self.response(json!(id)).await.0
    }

    async fn close(self) {
        drop(self.writer);
        self.server.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn initialize_advertises_registered_categories() {
    let ws = TestWorkspace::new();
    let mut client = Client::connect(server(&ws));

    let response = client
        .request(1, "initialize", json!({"protocolVersion": "2025-03-26", "capabilities": {}}))
        .await;
    let result = &response["result"];
    assert_eq!(result["protocolVersion"], "2025-03-26");
    assert_eq!(result["serverInfo"]["name"], "outfitter");
    let capabilities = result["capabilities"].as_object().unwrap();
    let mut keys: Vec<&str> = capabilities.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["completions", "logging", "prompts", "resources", "tools"]);

    client
        .send(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .await;
    let pong = client.request(2, "ping", json!({})).await;
    assert_eq!(pong["result"], json!({}));

    client.close().await;
}

#[tokio::test]
async fn tools_list_exposes_mcp_actions_only() {
    let ws = TestWorkspace::new();
    let mut client = Client::connect(server(&ws));

    let response = client.request(1, "tools/list", json!({})).await;
    let tools = response["result"]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        vec!["add", "list_actions", "surface_show", "surface_generate", "surface_diff", "countdown"]
    );

    let countdown = tools.iter().find(|t| t["name"] == "countdown").unwrap();
    assert_eq!(countdown["_meta"], json!({"deferLoading": true}));
    let add = tools.iter().find(|t| t["name"] == "add").unwrap();
    assert!(add.get("_meta").is_none());

    client.close().await;
}

#[tokio::test]
async fn tool_call_round_trip_and_parse_error() {
    let ws = TestWorkspace::new();
    let mut client = Client::connect(server(&ws));

    client.send_raw("{not json").await;
    let parse_error = client.recv().await;
    assert_eq!(parse_error["id"], Value::Null);
    assert_eq!(parse_error["error"]["code"], json!(-32700));

    let response = client
        .request(2, "tools/call", json!({"name": "add", "arguments": {"a": 2, "b": 3}}))
        .await;
    assert_eq!(response["result"]["structuredContent"], json!({"sum": 5}));

    let response = client
        .request(3, "tools/call", json!({"name": "add", "arguments": {"a": "bad"}}))
        .await;
    assert_eq!(response["result"]["isError"], json!(true));

    client.close().await;
}

#[tokio::test]
async fn progress_streams_during_call() {
    let ws = TestWorkspace::new();
    let mut client = Client::connect(server(&ws));

    client
        .send(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {
                "name": "countdown",
                "arguments": {"steps": 2, "delayMs": 0},
                "_meta": {"progressToken": "cd"}
            }
        }))
        .await;
    let (response, notifications) = client.response(json!(1)).await;

    assert_eq!(response["result"]["structuredContent"], json!({"completed": 2}));
    let progress: Vec<&Value> = notifications
        .iter()
        .filter(|n| n["method"] == "notifications/progress")
        .map(|n| &n["params"]["progress"])
        .collect();
    assert_eq!(progress, vec![&json!(0), &json!(1), &json!(2)]);
    assert!(notifications.iter().all(|n| n["params"]["progressToken"] == "cd"));

    client.close().await;
}

#[tokio::test]
async fn cancellation_notice_stops_running_handler() {
    let ws = TestWorkspace::new();
    let mut client = Client::connect(server(&ws));

    client
        .send(json!({
            "jsonrpc": "2.0",
            "id": "long",
            "method": "tools/call",
            "params": {
                "name": "countdown",
                "arguments": {"steps": 50, "delayMs": 5000},
                "_meta": {"progressToken": 1}
            }
        }))
        .await;

    // The first progress report means the handler is running.
    let first = client.recv().await;
    assert_eq!(first["method"], "notifications/progress");

    client
        .send(json!({
            "jsonrpc": "2.0",
            "method": "notifications/cancelled",
            "params": {"requestId": "long", "reason": "user abort"}
        }))
        .await;

    let (response, _) = client.response(json!("long")).await;
    let result = &response["result"];
    assert_eq!(result["isError"], json!(true));
    let error: Value = serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(error["_tag"], "CancelledError");
    assert_eq!(error["code"], json!(130));

    client.close().await;
}

#[tokio::test]
async fn requests_are_answered_in_arrival_order() {
    let ws = TestWorkspace::new();
    let mut client = Client::connect(server(&ws));

    for id in 1..=3 {
        client
            .send(json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": "tools/call",
                "params": {"name": "add", "arguments": {"a": id, "b": 0}}
            }))
            .await;
    }
    for id in 1..=3 {
        let response = client.recv().await;
        assert_eq!(response["id"], json!(id));
        assert_eq!(response["result"]["structuredContent"]["sum"], json!(id));
    }

    client.close().await;
}
