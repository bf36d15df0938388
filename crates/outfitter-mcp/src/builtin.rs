//! The built-in server: actions plus surface resources and prompts

use std::collections::BTreeMap;
use std::sync::Arc;

use outfitter_contracts::{ActionRegistry, OutfitterError, ResultExt};
use outfitter_schema::{ManifestOptions, generate_manifest, manifest_entry};

use crate::error::Result;
use crate::prompts::{PromptArgument, PromptMessage, PromptSpec};
use crate::resources::{ResourceContents, ResourceRequest, ResourceSpec, ResourceTemplateSpec};
use crate::server::McpServerBuilder;

pub const SURFACE_URI: &str = "outfitter://surface";
pub const ACTION_TEMPLATE: &str = "outfitter://actions/{id}";
pub const DESCRIBE_PROMPT: &str = "describe-action";

const JSON_MIME: &str = "application/json";

async fn read_surface(
    registry: Arc<ActionRegistry>,
    request: ResourceRequest,
) -> std::result::Result<ResourceContents, OutfitterError> {
    let manifest = generate_manifest(registry.as_ref(), ManifestOptions::default())?;
    Ok(ResourceContents {
        uri: request.uri,
        mime_type: Some(JSON_MIME.to_string()),
        text: serde_json::to_string_pretty(&manifest).or_internal("Failed to encode manifest")?,
    })
}

fn describe(registry: &ActionRegistry, id: &str) -> std::result::Result<String, OutfitterError> {
    let action = registry
        .get(id)
        .ok_or_else(|| OutfitterError::not_found("action", id))?;
    let entry = manifest_entry(action, None)?;
    serde_json::to_string_pretty(&entry).or_internal("Failed to encode manifest entry")
}

async fn read_action(
    registry: Arc<ActionRegistry>,
    request: ResourceRequest,
) -> std::result::Result<ResourceContents, OutfitterError> {
    let id = request.variables.get("id").map(String::as_str).unwrap_or_default();
    Ok(ResourceContents {
        text: describe(&registry, id)?,
        uri: request.uri,
        mime_type: Some(JSON_MIME.to_string()),
    })
}

async fn describe_action(
    registry: Arc<ActionRegistry>,
    arguments: BTreeMap<String, String>,
) -> std::result::Result<Vec<PromptMessage>, OutfitterError> {
    let id = arguments.get("id").map(String::as_str).unwrap_or_default();
    let entry = describe(&registry, id)?;
    Ok(vec![PromptMessage::user(format!(
        "Explain what the `{id}` action does, which surfaces expose it, and how to call it.\n\n```json\n{entry}\n```"
    ))])
}

/// Builder preloaded with `registry`'s MCP actions, the surface resource,
/// the per-action template, and the `describe-action` prompt.
pub fn builtin_builder(name: impl Into<String>, registry: Arc<ActionRegistry>) -> Result<McpServerBuilder> {
    let ids: Vec<String> = registry.ids().map(str::to_string).collect();

    let surface = {
        let registry = Arc::clone(&registry);
        ResourceSpec::new(SURFACE_URI, "surface", move |request: ResourceRequest| {
            read_surface(Arc::clone(&registry), request)
        })
        .description("Live action manifest for every registered action")
        .mime_type(JSON_MIME)
    };

    let action = {
        let registry = Arc::clone(&registry);
        ResourceTemplateSpec::new(ACTION_TEMPLATE, "action", move |request: ResourceRequest| {
            read_action(Arc::clone(&registry), request)
        })?
        .description("Manifest entry for one action")
        .mime_type(JSON_MIME)
        .complete("id", ids.clone())
    };

    let prompt = {
        let registry = Arc::clone(&registry);
        PromptSpec::new(DESCRIBE_PROMPT, move |arguments: BTreeMap<String, String>| {
            describe_action(Arc::clone(&registry), arguments)
        })
        .description("Ask for an explanation of one registered action")
        .argument(
            PromptArgument::new("id")
                .description("Action id")
                .required()
                .complete(ids),
        )
    };

    Ok(McpServerBuilder::new(name, env!("CARGO_PKG_VERSION"))
        .instructions("Outfitter actions. Call list_actions to see what is registered.")
        .actions(registry.as_ref())
        .resource(surface)
        .resource_template(action)
        .prompt(prompt))
}
