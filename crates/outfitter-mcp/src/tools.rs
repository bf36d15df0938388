//! Tool descriptors and result wrapping
//!
//! Actions become tools one-to-one. Handler output is wrapped into the
//! protocol's content-block shape; errors become `isError` results so the
//! server never fails a `tools/call` at the JSON-RPC level for handler
//! failures.

use outfitter_contracts::{ActionSpec, OutfitterError};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Tool definition as returned by `tools/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl ToolDefinition {
    pub fn is_deferred(&self) -> bool {
        self.meta
            .as_ref()
            .and_then(|m| m.get("deferLoading"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Project an action into its tool descriptor.
pub fn tool_definition(action: &ActionSpec) -> ToolDefinition {
    ToolDefinition {
        name: action.tool_name().to_string(),
        description: action.tool_description().to_string(),
        input_schema: action.input().to_json_schema(),
        meta: action
            .defer_loading()
            .then(|| json!({"deferLoading": true})),
    }
}

/// One content block in a tool result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
}

/// Result of a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            structured_content: None,
            is_error: false,
        }
    }
}

fn is_protocol_shaped(value: &Value) -> bool {
    value.get("content").is_some_and(Value::is_array)
}

/// Wrap a handler's success value.
///
/// A value that already carries a `content` array passes through unchanged.
/// Anything else becomes one text block; objects are also attached as
/// `structuredContent`.
pub fn wrap_success(value: Value) -> Value {
    if is_protocol_shaped(&value) {
        return value;
    }
    let text = match &value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let mut result = ToolResult::text(text);
    if value.is_object() {
        result.structured_content = Some(value);
    }
    serde_json::to_value(result).unwrap_or_else(|_| json!({"content": []}))
}

/// Wrap a handler failure as an `isError` result carrying the serialized error.
pub fn wrap_error(error: &OutfitterError) -> Value {
    let serialized = serde_json::to_string(&error.serialize_error())
        .unwrap_or_else(|_| format!("{}: {}", error.tag(), error.message()));
    let result = ToolResult {
        is_error: true,
        ..ToolResult::text(serialized)
    };
    serde_json::to_value(result).unwrap_or_else(|_| json!({"content": [], "isError": true}))
}
