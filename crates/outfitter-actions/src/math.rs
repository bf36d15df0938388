//! Arithmetic actions

use outfitter_contracts::{
    ActionSpec, CliOption, CliSpec, HandlerContext, InputSchema, McpSpec, OutfitterError, Result,
    SpecError, number_value,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
struct AddInput {
    a: f64,
    b: f64,
}

#[derive(Debug, Serialize)]
struct AddOutput {
    sum: Value,
}

async fn add(input: AddInput, _ctx: HandlerContext) -> Result<AddOutput> {
    let sum = number_value(input.a + input.b)
        .ok_or_else(|| OutfitterError::validation("Sum is not a finite number"))?;
    Ok(AddOutput { sum })
}

/// `math.add`: `{a, b}` to `{sum}`.
pub fn add_action() -> Result<ActionSpec, SpecError> {
    let schema = InputSchema::new(json!({
        "type": "object",
        "properties": {
            "a": {"type": "number", "description": "First operand"},
            "b": {"type": "number", "description": "Second operand"}
        },
        "required": ["a", "b"]
    }))?;

    Ok(ActionSpec::new("math.add", "Add two numbers", schema, add)
        .cli(
            CliSpec::new()
                .command("add")
                .option(CliOption::new("--a <n>", "First operand").required())
                .option(CliOption::new("--b <n>", "Second operand").required()),
        )
        .mcp(McpSpec::new().tool("add")))
}
