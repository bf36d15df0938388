//! Action fixtures for dispatch tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use outfitter_contracts::{
    ActionSpec, CliOption, CliSpec, HandlerContext, InputSchema, McpSpec, OutfitterError,
    number_value,
};
use serde::Deserialize;
use serde_json::{Value, json};

/// Counts handler invocations across clones.
#[derive(Debug, Default, Clone)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Deserialize)]
struct AddInput {
    a: f64,
    b: f64,
}

/// `math.add` with `{a: number, b: number}` input that bumps `counter` on
/// every handler call.
///
/// CLI: `add --a <n> --b <n>`; MCP tool: `add`.
pub fn counting_add_action(counter: CallCounter) -> ActionSpec {
    let schema = InputSchema::new(json!({
        "type": "object",
        "properties": {
            "a": {"type": "number", "description": "First operand"},
            "b": {"type": "number", "description": "Second operand"}
        },
        "required": ["a", "b"]
    }))
    .unwrap();

    ActionSpec::new("math.add", "Add two numbers", schema, move |input: AddInput, _ctx: HandlerContext| {
        let counter = counter.clone();
        async move {
            counter.hit();
            let sum = number_value(input.a + input.b).unwrap_or(Value::Null);
            Ok(json!({"sum": sum}))
        }
    })
    .cli(
        CliSpec::new()
            .command("add")
            .option(CliOption::new("--a <n>", "First operand").required())
            .option(CliOption::new("--b <n>", "Second operand").required()),
    )
    .mcp(McpSpec::new().tool("add"))
}

/// Action whose handler always fails with `error`, counting calls.
pub fn failing_action(id: &str, error: OutfitterError, counter: CallCounter) -> ActionSpec {
    ActionSpec::new(id, "Always fails", InputSchema::empty(), move |_: Value, _ctx: HandlerContext| {
        let error = error.clone();
        let counter = counter.clone();
        async move {
            counter.hit();
            Err::<Value, _>(error)
        }
    })
}
