//! Input schemas and validation
//!
//! An [`InputSchema`] wraps a JSON Schema (draft 2020-12) document compiled
//! once when the action is declared. Validation never panics: every
//! violation becomes one line of a single [`ValidationError`](crate::ErrorKind::Validation).

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use jsonschema::{Draft, Validator};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::error::{OutfitterError, Result, SpecError};

/// JSON Schema primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Null,
}

impl JsonType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(JsonType::String),
            "number" => Some(JsonType::Number),
            "integer" => Some(JsonType::Integer),
            "boolean" => Some(JsonType::Boolean),
            "array" => Some(JsonType::Array),
            "object" => Some(JsonType::Object),
            "null" => Some(JsonType::Null),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JsonType::String => "string",
            JsonType::Number => "number",
            JsonType::Integer => "integer",
            JsonType::Boolean => "boolean",
            JsonType::Array => "array",
            JsonType::Object => "object",
            JsonType::Null => "null",
        }
    }

    /// Read the `type` keyword of a schema. For a type union the first
    /// non-null member wins.
    pub fn of_schema(schema: &Value) -> Option<Self> {
        match schema.get("type")? {
            Value::String(s) => Self::parse(s),
            Value::Array(types) => types
                .iter()
                .filter_map(Value::as_str)
                .filter_map(Self::parse)
                .find(|t| *t != JsonType::Null),
            _ => None,
        }
    }
}

fn compile(schema: &Value) -> std::result::Result<Validator, String> {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| err.to_string())
}

/// Compiled input schema for one action
#[derive(Clone)]
pub struct InputSchema {
    schema: Value,
    validator: Arc<Validator>,
    properties: Arc<Vec<(String, Validator)>>,
    root_rules: Arc<Validator>,
}

impl InputSchema {
    /// Compile `schema`.
    ///
    /// `null` is treated as the empty object schema. Object schemas without a
    /// `type` are normalized to `"type": "object"` with an empty `properties`
    /// map so the tool schema derived from them is always well-formed.
    pub fn new(schema: Value) -> std::result::Result<Self, SpecError> {
        let schema = normalize(schema)?;
        let validator = compile(&schema).map_err(|message| SpecError::InvalidSchema { message })?;

        // Property validators give per-field messages. Properties whose
        // subschema cannot stand alone (e.g. local `$ref`s) fall back to the
        // root validator.
        let properties: Vec<(String, Validator)> = schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .filter_map(|(name, sub)| compile(sub).ok().map(|v| (name.clone(), v)))
                    .collect()
            })
            .unwrap_or_default();
        let root_rules = compile(&root_rules(&schema, &properties))
            .map_err(|message| SpecError::InvalidSchema { message })?;

        Ok(Self {
            schema,
            validator: Arc::new(validator),
            properties: Arc::new(properties),
            root_rules: Arc::new(root_rules),
        })
    }

    /// Schema accepting any object.
    pub fn empty() -> Self {
        Self::new(json!({"type": "object", "properties": {}}))
            .unwrap_or_else(|_| unreachable!("the empty object schema always compiles"))
    }

    /// The normalized schema document.
    pub fn as_json(&self) -> &Value {
        &self.schema
    }

    /// JSON Schema suitable for an MCP tool descriptor or manifest entry.
    pub fn to_json_schema(&self) -> Value {
        self.schema.clone()
    }

    fn property(&self, name: &str) -> Option<&Value> {
        self.schema.get("properties")?.get(name)
    }

    /// Declared property names.
    pub fn property_names(&self) -> Vec<&str> {
        self.schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| props.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn required(&self) -> Vec<&str> {
        self.schema
            .get("required")
            .and_then(Value::as_array)
            .map(|req| req.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required().contains(&name)
    }

    pub fn property_type(&self, name: &str) -> Option<JsonType> {
        self.property(name).and_then(JsonType::of_schema)
    }

    /// Element type of an array property.
    pub fn item_type(&self, name: &str) -> Option<JsonType> {
        self.property(name)?
            .get("items")
            .and_then(JsonType::of_schema)
    }

    pub fn property_description(&self, name: &str) -> Option<&str> {
        self.property(name)?.get("description")?.as_str()
    }

    pub fn property_default(&self, name: &str) -> Option<&Value> {
        self.property(name)?.get("default")
    }

    pub fn property_enum(&self, name: &str) -> Option<&[Value]> {
        self.property(name)?
            .get("enum")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
    }

    /// Check `input` against the schema.
    ///
    /// Lines are `<field>: is required`, `<field>: <message>`, or
    /// `input: <message>` for violations not tied to one declared property,
    /// joined with `; `.
    pub fn validate(&self, input: &Value) -> Result<()> {
        if self.validator.is_valid(input) {
            return Ok(());
        }

        let mut lines = Vec::new();
        let mut fields = BTreeSet::new();

        if let Value::Object(map) = input {
            for name in self.required() {
                if !map.contains_key(name) {
                    lines.push(format!("{name}: is required"));
                    fields.insert(name.to_string());
                }
            }
            for (name, validator) in self.properties.iter() {
                if let Some(value) = map.get(name) {
                    for err in validator.iter_errors(value) {
                        lines.push(format!("{name}: {err}"));
                        fields.insert(name.clone());
                    }
                }
            }
        }

        lines.extend(
            self.root_rules
                .iter_errors(input)
                .map(|err| format!("input: {err}")),
        );

        let message = lines.join("; ");
        let error = match fields.len() {
            1 => {
                let field = fields.into_iter().next().unwrap_or_default();
                OutfitterError::validation_field(field, message)
            }
            _ => OutfitterError::validation(message),
        };
        Err(error.with_context(
            "issues",
            Value::Array(lines.into_iter().map(Value::String).collect()),
        ))
    }
}

impl fmt::Debug for InputSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputSchema")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// The schema minus what the per-field pass already reports: `required` and
/// every property that has its own validator.
fn root_rules(schema: &Value, properties: &[(String, Validator)]) -> Value {
    let mut rules = schema.clone();
    if let Value::Object(map) = &mut rules {
        map.remove("required");
        if let Some(Value::Object(props)) = map.get_mut("properties") {
            for (name, _) in properties {
                props.insert(name.clone(), Value::Bool(true));
            }
        }
    }
    rules
}

fn normalize(schema: Value) -> std::result::Result<Value, SpecError> {
    let mut map = match schema {
        Value::Null => Map::new(),
        Value::Object(map) => map,
        other => {
            return Err(SpecError::InvalidSchema {
                message: format!("input schema must be an object, got {other}"),
            });
        }
    };

    match map.get("type") {
        None => {
            map.insert("type".into(), Value::String("object".into()));
        }
        Some(Value::String(t)) if t == "object" => {}
        Some(other) => {
            return Err(SpecError::InvalidSchema {
                message: format!("input schema must have type \"object\", got {other}"),
            });
        }
    }
    map.entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));

    Ok(Value::Object(map))
}

/// Convert `f64` to a JSON number, keeping integral values integral so that
/// `5.0` serializes as `5`. Non-finite values yield `None`.
pub fn number_value(n: f64) -> Option<Value> {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        return Some(Value::from(n as i64));
    }
    serde_json::Number::from_f64(n).map(Value::Number)
}

/// Deserialize validated input into the handler's typed input.
///
/// Failure is a validation error so the handler body is never entered with a
/// value it cannot represent.
pub fn deserialize_input<I: DeserializeOwned>(input: Value) -> Result<I> {
    serde_json::from_value(input).map_err(|e| OutfitterError::validation(format!("input: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCategory, ErrorKind};
    use pretty_assertions::assert_eq;

    fn add_schema() -> InputSchema {
        InputSchema::new(json!({
            "type": "object",
            "properties": {
                "a": {"type": "number", "description": "First operand"},
                "b": {"type": "number"}
            },
            "required": ["a", "b"]
        }))
        .unwrap()
    }

    #[test]
    fn accepts_valid_input() {
        assert!(add_schema().validate(&json!({"a": 1, "b": 2.5})).is_ok());
    }

    #[test]
    fn reports_missing_required_fields() {
        let err = add_schema().validate(&json!({"a": 1})).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.message(), "b: is required");
        assert_eq!(
            err.kind(),
            &ErrorKind::Validation {
                field: Some("b".into())
            }
        );
    }

    #[test]
    fn reports_type_violations_per_field() {
        let err = add_schema().validate(&json!({"a": "bad", "b": 1})).unwrap_err();
        assert!(err.message().starts_with("a: "), "{}", err.message());
        assert!(err.message().contains("number"));
    }

    #[test]
    fn aggregates_multiple_lines() {
        let err = add_schema().validate(&json!({"a": "bad"})).unwrap_err();
        assert!(err.message().contains("b: is required"));
        assert!(err.message().contains("; "));
        let issues = err.context().unwrap()["issues"].as_array().unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(err.kind(), &ErrorKind::Validation { field: None });
    }

    #[test]
    fn non_object_input_is_root_violation() {
        let err = add_schema().validate(&json!([1, 2])).unwrap_err();
        assert!(err.message().starts_with("input: "), "{}", err.message());
    }

    #[test]
    fn reports_root_rules_alongside_field_violations() {
        let schema = InputSchema::new(json!({
            "properties": {"a": {"type": "number"}},
            "additionalProperties": false
        }))
        .unwrap();

        let err = schema.validate(&json!({"a": "x", "extra": 1})).unwrap_err();
        let issues = err.context().unwrap()["issues"].as_array().unwrap();
        assert_eq!(issues.len(), 2, "{}", err.message());
        assert!(issues[0].as_str().unwrap().starts_with("a: "));
        assert!(issues[1].as_str().unwrap().starts_with("input: "));
        assert!(err.message().contains("extra"), "{}", err.message());

        let err = schema.validate(&json!({"a": 1, "extra": 1})).unwrap_err();
        assert!(err.message().starts_with("input: "), "{}", err.message());
        assert!(!err.message().contains("; "));
    }

    #[test]
    fn schema_level_rules_are_not_duplicated_per_field() {
        let schema = InputSchema::new(json!({
            "properties": {"a": {"type": "number"}, "b": {"type": "number"}},
            "required": ["a"],
            "minProperties": 2
        }))
        .unwrap();

        let err = schema.validate(&json!({"b": "x"})).unwrap_err();
        let issues: Vec<&str> = err.context().unwrap()["issues"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(issues.len(), 3, "{issues:?}");
        assert_eq!(issues[0], "a: is required");
        assert!(issues[1].starts_with("b: "));
        assert!(issues[2].starts_with("input: "));
    }

    #[test]
    fn null_schema_is_empty_object() {
        let schema = InputSchema::new(Value::Null).unwrap();
        assert_eq!(
            schema.to_json_schema(),
            json!({"type": "object", "properties": {}})
        );
        assert!(schema.validate(&json!({"anything": true})).is_ok());
    }

    #[test]
    fn rejects_non_object_schemas() {
        assert!(matches!(
            InputSchema::new(json!({"type": "string"})),
            Err(SpecError::InvalidSchema { .. })
        ));
        assert!(InputSchema::new(json!(42)).is_err());
    }

    #[test]
    fn rejects_uncompilable_schemas() {
        let result = InputSchema::new(json!({
            "type": "object",
            "properties": {"name": {"type": "string", "pattern": "("}}
        }));
        assert!(matches!(result, Err(SpecError::InvalidSchema { .. })));
    }

    #[test]
    fn property_introspection() {
        let schema = InputSchema::new(json!({
            "properties": {
                "tags": {"type": "array", "items": {"type": "string"}},
                "mode": {"type": ["string", "null"], "enum": ["a", "b"], "default": "a"},
                "count": {"type": "integer"}
            },
            "required": ["count"]
        }))
        .unwrap();

        assert_eq!(schema.property_type("tags"), Some(JsonType::Array));
        assert_eq!(schema.item_type("tags"), Some(JsonType::String));
        assert_eq!(schema.property_type("mode"), Some(JsonType::String));
        assert_eq!(schema.property_default("mode"), Some(&json!("a")));
        assert_eq!(schema.property_enum("mode").map(<[Value]>::len), Some(2));
        assert!(schema.is_required("count"));
        assert!(!schema.is_required("tags"));
        let mut names = schema.property_names();
        names.sort_unstable();
        assert_eq!(names, vec!["count", "mode", "tags"]);
    }

    #[test]
    fn integral_floats_stay_integral() {
        assert_eq!(number_value(5.0), Some(json!(5)));
        assert_eq!(number_value(0.5), Some(json!(0.5)));
        assert_eq!(number_value(f64::NAN), None);
    }

    #[test]
    fn deserialize_failure_is_validation() {
        #[derive(Debug, serde::Deserialize)]
        struct Input {
            #[allow(dead_code)]
            a: u8,
        }
        let err = deserialize_input::<Input>(json!({"a": 1000})).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
    }
}
