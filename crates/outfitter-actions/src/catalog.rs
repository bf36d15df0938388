//! Late-bound view of the registry and the `actions.list` action

use std::sync::{Arc, OnceLock, Weak};

use outfitter_contracts::{
    ActionSource, ActionSpec, CliOption, CliSpec, HandlerContext, InputSchema, McpSpec, Result,
    SpecError, Surface,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Handle to the action list of a registry that is still being assembled
///
/// Actions that describe the registry hold a clone; the owner binds it once
/// the registry is complete. Until then it reads as empty.
///
/// The handle only holds weak references: the actions it lists own clones of
/// it, and the registry owns the actions.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    actions: Arc<OnceLock<Vec<Weak<ActionSpec>>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to the final action list. Only the first call has an effect.
    pub fn bind(&self, actions: &[Arc<ActionSpec>]) {
        if self.actions.set(actions.iter().map(Arc::downgrade).collect()).is_err() {
            tracing::warn!("Action catalog is already bound; ignoring rebind");
        }
    }

    pub fn is_bound(&self) -> bool {
        self.actions.get().is_some()
    }

    /// The bound actions that are still alive, in registry order.
    pub fn snapshot(&self) -> Vec<Arc<ActionSpec>> {
        self.actions
            .get()
            .map(|actions| actions.iter().filter_map(Weak::upgrade).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct ListInput {
    surface: Option<Surface>,
}

#[derive(Debug, Serialize)]
struct ActionSummary {
    id: String,
    description: String,
    surfaces: Vec<Surface>,
}

#[derive(Debug, Serialize)]
struct ListOutput {
    actions: Vec<ActionSummary>,
}

async fn list(catalog: Catalog, input: ListInput, ctx: HandlerContext) -> Result<ListOutput> {
    let actions = catalog.snapshot();
    let actions = match input.surface {
        Some(surface) => actions.actions_for(surface),
        None => actions,
    };
    ctx.logger().debug(&format!("Listing {} actions", actions.len()));
    Ok(ListOutput {
        actions: actions
            .iter()
            .map(|action| ActionSummary {
                id: action.id().to_string(),
                description: action.description().to_string(),
                surfaces: action.surface_set().into_iter().collect(),
            })
            .collect(),
    })
}

fn render_list(value: &Value) -> String {
    let Some(actions) = value.get("actions").and_then(Value::as_array) else {
        return String::new();
    };
    let id = |a: &Value| a.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    let width = actions.iter().map(|a| id(a).len()).max().unwrap_or(0);
    actions
        .iter()
        .map(|a| {
            let description = a.get("description").and_then(Value::as_str).unwrap_or_default();
            format!("{:<width$}  {description}", id(a))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `actions.list`: the registered actions, optionally filtered by surface.
pub fn list_action(catalog: Catalog) -> Result<ActionSpec, SpecError> {
    let schema = InputSchema::new(json!({
        "type": "object",
        "properties": {
            "surface": {
                "type": "string",
                "enum": Surface::ALL.map(Surface::as_str),
                "description": "Only list actions exposed on this surface"
            }
        }
    }))?;

    Ok(ActionSpec::new(
        "actions.list",
        "List registered actions",
        schema,
        move |input: ListInput, ctx: HandlerContext| list(catalog.clone(), input, ctx),
    )
    .cli(
        CliSpec::new()
            .command("list")
            .alias("ls")
            .option(CliOption::new("-s, --surface <surface>", "Only list actions exposed on this surface"))
            .render(render_list),
    )
    .mcp(McpSpec::new().tool("list_actions")))
}
