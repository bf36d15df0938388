//! Schema-guided coercion of CLI strings
//!
//! Everything arrives from argv as text. Before validation, values for
//! properties declared as `number`, `integer`, `boolean`, or `array` are
//! converted. Values that do not parse are left untouched so the validator
//! reports them against the schema.

use outfitter_contracts::{InputSchema, JsonType, number_value};
use serde_json::Value;

fn coerce_scalar(value: Value, ty: Option<JsonType>) -> Value {
    let Value::String(text) = &value else {
        return value;
    };
    let text = text.trim();
    let coerced = match ty {
        Some(JsonType::Number) => text.parse::<f64>().ok().and_then(number_value),
        Some(JsonType::Integer) => text.parse::<i64>().ok().map(Value::from),
        Some(JsonType::Boolean) => match text.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(Value::Bool(true)),
            "false" | "0" | "no" | "off" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    };
    coerced.unwrap_or(value)
}

/// Coerce the CLI value for `key` according to `schema`.
pub fn coerce_value(schema: &InputSchema, key: &str, value: Value) -> Value {
    match schema.property_type(key) {
        Some(JsonType::Array) => {
            let item = schema.item_type(key);
            let items = match value {
                Value::Array(items) => items,
                Value::Null => return Value::Null,
                other => vec![other],
            };
            Value::Array(items.into_iter().map(|v| coerce_scalar(v, item)).collect())
        }
        ty => coerce_scalar(value, ty),
    }
}
