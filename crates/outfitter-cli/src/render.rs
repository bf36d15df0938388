//! Human-readable rendering of results and errors

use colored::Colorize;
use outfitter_contracts::{ErrorDetail, OutfitterError};
use serde_json::Value;

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Default human renderer.
///
/// Objects print one `key: value` line per top-level field; arrays print one
/// line per element; `null` prints nothing.
pub fn render_human(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| format!("{key}: {}", scalar(value)))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Array(items) => items.iter().map(scalar).collect::<Vec<_>>().join("\n"),
        other => scalar(other),
    }
}

/// `<_tag>: <message>`, plus indented context lines when `detail` is full.
pub fn render_error(error: &OutfitterError, detail: ErrorDetail, color: bool) -> String {
    let tag = if color {
        error.tag().red().bold().to_string()
    } else {
        error.tag().to_string()
    };
    let mut out = format!("{tag}: {}", error.message());

    if detail == ErrorDetail::Full {
        if let Some(context) = error.context() {
            for (key, value) in context {
                out.push_str(&format!("\n  {key}: {}", scalar(value)));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_lines() {
        assert_eq!(render_human(&json!({"sum": 5})), "sum: 5");
        assert_eq!(
            render_human(&json!({"a": "x", "b": [1, 2]})),
            "a: x\nb: [1,2]"
        );
    }

    #[test]
    fn arrays_and_scalars() {
        assert_eq!(render_human(&json!(["one", 2])), "one\n2");
        assert_eq!(render_human(&json!("plain")), "plain");
        assert_eq!(render_human(&Value::Null), "");
    }

    #[test]
    fn error_line() {
        let err = OutfitterError::not_found("action", "x").with_context("hint", "run list");
        assert_eq!(
            render_error(&err, ErrorDetail::Message, false),
            "NotFoundError: action not found: x"
        );
        assert_eq!(
            render_error(&err, ErrorDetail::Full, false),
            "NotFoundError: action not found: x\n  hint: run list"
        );
    }
}
