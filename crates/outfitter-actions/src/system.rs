//! Service-only actions

use outfitter_contracts::{ActionSpec, HandlerContext, InputSchema, Result, Surface};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
}

async fn health(_input: Value, _ctx: HandlerContext) -> Result<Health> {
    Ok(Health { status: "ok" })
}

/// `system.health`: liveness probe for HTTP-style surfaces. Not exposed on
/// the CLI or MCP.
pub fn health_action() -> ActionSpec {
    ActionSpec::new("system.health", "Report service health", InputSchema::empty(), health)
        .surfaces([Surface::Api, Surface::Server])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn health_is_ok_and_service_only() {
        let action = health_action();
        assert!(!action.supports(Surface::Cli));
        assert!(!action.supports(Surface::Mcp));
        let out = action
            .invoke(Value::Null, HandlerContext::builder().build())
            .await
            .unwrap();
        assert_eq!(out, json!({"status": "ok"}));
    }
}
