//! Surface introspection: show, snapshot, and drift-check the manifest

use std::path::PathBuf;

use outfitter_contracts::{
    ActionSpec, CliOption, CliSpec, HandlerContext, InputSchema, McpSpec, OutfitterConfig,
    OutfitterError, Result, ResultExt, SpecError, Surface,
};
use outfitter_schema::{
    ActionManifest, ManifestOptions, SurfaceDiff, diff_surface_maps, generate_manifest,
    read_snapshot, write_snapshot,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::catalog::Catalog;

const GROUP: &str = "surface";

/// Run filesystem work on the blocking pool.
async fn blocking<T, F>(op: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .or_internal("Snapshot I/O task failed")?
}

/// Snapshot location: `explicit` relative to the working directory, or the
/// configured path.
async fn snapshot_path(ctx: &HandlerContext, explicit: Option<&str>) -> Result<PathBuf> {
    let cwd = ctx.cwd().to_path_buf();
    match explicit {
        Some(path) => Ok(cwd.join(path)),
        None => blocking(move || Ok(OutfitterConfig::load(&cwd)?.surface_path(&cwd))).await,
    }
}

fn path_schema() -> Value {
    json!({
        "type": "string",
        "description": "Snapshot path, relative to the working directory"
    })
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

// show

#[derive(Debug, Deserialize)]
struct ShowInput {
    surface: Option<Surface>,
}

async fn show(catalog: Catalog, input: ShowInput, _ctx: HandlerContext) -> Result<ActionManifest> {
    let options = match input.surface {
        Some(surface) => ManifestOptions::default().surface(surface),
        None => ManifestOptions::default(),
    };
    Ok(generate_manifest(&catalog.snapshot(), options)?)
}

fn render_show(value: &Value) -> String {
    let actions = value
        .get("actions")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let mut lines = vec![format!(
        "Surface manifest {} ({} actions)",
        str_field(value, "version"),
        actions.len()
    )];
    for action in actions {
        let surfaces: Vec<&str> = action
            .get("surfaces")
            .and_then(Value::as_array)
            .map(|s| s.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        lines.push(format!("  {} [{}]", str_field(action, "id"), surfaces.join(", ")));
    }
    lines.join("\n")
}

/// `surface.show`: the live manifest, base action of the `surface` group.
pub fn show_action(catalog: Catalog) -> Result<ActionSpec, SpecError> {
    let schema = InputSchema::new(json!({
        "type": "object",
        "properties": {
            "surface": {
                "type": "string",
                "enum": Surface::ALL.map(Surface::as_str),
                "description": "Only include actions exposed on this surface"
            }
        }
    }))?;

    Ok(ActionSpec::new(
        "surface.show",
        "Show the live action manifest",
        schema,
        move |input: ShowInput, ctx: HandlerContext| show(catalog.clone(), input, ctx),
    )
    .cli(CliSpec::new().group(GROUP).command("[surface]").render(render_show))
    .mcp(McpSpec::new().tool("surface_show")))
}

// generate

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateInput {
    path: Option<String>,
    #[serde(default)]
    dry_run: bool,
}

#[derive(Debug, Serialize)]
struct GenerateOutput {
    path: String,
    actions: usize,
    written: bool,
}

async fn generate(catalog: Catalog, input: GenerateInput, ctx: HandlerContext) -> Result<GenerateOutput> {
    let path = snapshot_path(&ctx, input.path.as_deref()).await?;
    let manifest = generate_manifest(&catalog.snapshot(), ManifestOptions::default())?;
    let actions = manifest.actions.len();
    if input.dry_run {
        ctx.logger().info("Dry run; snapshot not written");
    } else {
        let target = path.clone();
        blocking(move || write_snapshot(&target, &manifest).map_err(OutfitterError::from)).await?;
        ctx.logger().info(&format!("Wrote surface snapshot to {}", path.display()));
    }
    Ok(GenerateOutput {
        path: path.display().to_string(),
        actions,
        written: !input.dry_run,
    })
}

fn render_generate(value: &Value) -> String {
    let verb = if value.get("written").and_then(Value::as_bool).unwrap_or(false) {
        "Wrote"
    } else {
        "Would write"
    };
    let count = value.get("actions").and_then(Value::as_u64).unwrap_or(0);
    format!("{verb} {count} actions to {}", str_field(value, "path"))
}

/// `surface.generate`: write the live manifest to the snapshot file.
pub fn generate_action(catalog: Catalog) -> Result<ActionSpec, SpecError> {
    let schema = InputSchema::new(json!({
        "type": "object",
        "properties": {
            "path": path_schema(),
            "dryRun": {"type": "boolean", "description": "Report without writing"}
        }
    }))?;

    Ok(ActionSpec::new(
        "surface.generate",
        "Write the action manifest snapshot",
        schema,
        move |input: GenerateInput, ctx: HandlerContext| generate(catalog.clone(), input, ctx),
    )
    .cli(
        CliSpec::new()
            .group(GROUP)
            .command("generate")
            .alias("gen")
            .option(CliOption::new("-p, --path <path>", "Snapshot path"))
            .option(CliOption::new("--dry-run", "Report without writing"))
            .render(render_generate),
    )
    .mcp(McpSpec::new().tool("surface_generate")))
}

// diff

#[derive(Debug, Deserialize)]
struct DiffInput {
    path: Option<String>,
}

#[derive(Debug, Serialize)]
struct DiffOutput {
    path: String,
    #[serde(flatten)]
    diff: SurfaceDiff,
}

async fn diff(catalog: Catalog, input: DiffInput, ctx: HandlerContext) -> Result<DiffOutput> {
    let path = snapshot_path(&ctx, input.path.as_deref()).await?;
    let source = path.clone();
    let committed = blocking(move || read_snapshot(&source).map_err(OutfitterError::from)).await?;
    let live = generate_manifest(&catalog.snapshot(), ManifestOptions::default())?;
    let diff = diff_surface_maps(&committed, &live);
    if diff.has_changes {
        ctx.logger().warn(&format!("Surface drift against {}", path.display()));
    }
    Ok(DiffOutput {
        path: path.display().to_string(),
        diff,
    })
}

fn has_drift(value: &Value) -> bool {
    value.get("hasChanges").and_then(Value::as_bool).unwrap_or(false)
}

fn render_diff(value: &Value) -> String {
    let path = str_field(value, "path");
    if !has_drift(value) {
        return format!("Surface matches {path}");
    }
    let ids = |key: &str| -> Vec<String> {
        value
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).map(String::from).collect())
            .unwrap_or_default()
    };

    let mut lines = vec![format!("Surface drift against {path}")];
    lines.extend(ids("added").into_iter().map(|id| format!("  + {id}")));
    lines.extend(ids("removed").into_iter().map(|id| format!("  - {id}")));
    for modified in value.get("modified").and_then(Value::as_array).into_iter().flatten() {
        let fields: Vec<&str> = modified
            .get("fields")
            .and_then(Value::as_array)
            .map(|f| f.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        lines.push(format!("  ~ {} ({})", str_field(modified, "id"), fields.join(", ")));
    }
    for change in value
        .get("metadataChanges")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        lines.push(format!("  * {}", str_field(change, "field")));
    }
    lines.join("\n")
}

/// `surface.diff`: compare the snapshot with the live manifest. Exits 1 on
/// the CLI when they differ.
pub fn diff_action(catalog: Catalog) -> Result<ActionSpec, SpecError> {
    let schema = InputSchema::new(json!({
        "type": "object",
        "properties": {"path": path_schema()}
    }))?;

    Ok(ActionSpec::new(
        "surface.diff",
        "Compare the manifest snapshot with the live surface",
        schema,
        move |input: DiffInput, ctx: HandlerContext| diff(catalog.clone(), input, ctx),
    )
    .cli(
        CliSpec::new()
            .group(GROUP)
            .command("diff")
            .option(CliOption::new("-p, --path <path>", "Snapshot path"))
            .render(render_diff)
            .exit_code(|value| i32::from(has_drift(value))),
    )
    .mcp(McpSpec::new().tool("surface_diff")))
}
