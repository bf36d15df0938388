//! Action manifest generation
//!
//! A manifest is the serializable projection of every registered action:
//! handlers and mapping functions are dropped, leaving only the shapes each
//! surface exposes.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{SecondsFormat, Utc};
use outfitter_contracts::{ActionSource, ActionSpec, ArgSpec, ErrorCategory, Surface};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Manifest format version
pub const MANIFEST_VERSION: &str = "1.0.0";

/// Output modes every CLI command understands
pub const OUTPUT_MODES: [&str; 3] = ["human", "json", "jsonl"];

/// Exit code, HTTP status, and retry hint of one error category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorCategoryInfo {
    pub exit_code: i32,
    pub http_status: u16,
    pub retryable: bool,
}

/// One CLI option as recorded in the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliOptionManifest {
    pub flags: String,
    pub key: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    pub required: bool,
    pub takes_value: bool,
}

/// Resolved CLI projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliManifest {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Subcommand name; absent for a group's base action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub arguments: Vec<ArgSpec>,
    #[serde(default)]
    pub options: Vec<CliOptionManifest>,
}

/// Resolved MCP projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpManifest {
    pub tool: String,
    pub description: String,
    pub defer_loading: bool,
    pub input_schema: Value,
}

/// One action in the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionManifestEntry {
    pub id: String,
    pub description: String,
    pub surfaces: Vec<Surface>,
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cli: Option<CliManifest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp: Option<McpManifest>,
}

/// Serializable snapshot of a registry's surfaces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionManifest {
    pub version: String,
    pub generated_at: String,
    pub surfaces: Vec<Surface>,
    pub actions: Vec<ActionManifestEntry>,
    pub errors: BTreeMap<ErrorCategory, ErrorCategoryInfo>,
    pub output_modes: Vec<String>,
}

impl ActionManifest {
    pub fn action(&self, id: &str) -> Option<&ActionManifestEntry> {
        self.actions.iter().find(|a| a.id == id)
    }
}

/// Options for [`generate_manifest`]
#[derive(Debug, Clone, Default)]
pub struct ManifestOptions {
    /// Only include actions exposed on this surface
    pub surface: Option<Surface>,
    /// Fixed `generatedAt`; the current time when `None`
    pub generated_at: Option<String>,
}

impl ManifestOptions {
    pub fn surface(mut self, surface: Surface) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn generated_at(mut self, generated_at: impl Into<String>) -> Self {
        self.generated_at = Some(generated_at.into());
        self
    }
}

/// The process-wide error category table.
pub fn error_table() -> BTreeMap<ErrorCategory, ErrorCategoryInfo> {
    ErrorCategory::ALL
        .into_iter()
        .map(|category| {
            (
                category,
                ErrorCategoryInfo {
                    exit_code: category.exit_code(),
                    http_status: category.http_status(),
                    retryable: category.is_retryable(),
                },
            )
        })
        .collect()
}

/// Build the manifest for every action in `source`.
///
/// Fails only when an action's CLI projection cannot be resolved, which the
/// registry already rules out for registered actions.
pub fn generate_manifest<S>(source: &S, options: ManifestOptions) -> Result<ActionManifest>
where
    S: ActionSource + ?Sized,
{
    let actions: Vec<_> = source
        .actions()
        .iter()
        .filter(|action| options.surface.is_none_or(|s| action.supports(s)))
        .map(|action| manifest_entry(action, options.surface))
        .collect::<Result<_>>()?;

    let surfaces: BTreeSet<Surface> = match options.surface {
        Some(surface) => BTreeSet::from([surface]),
        None => actions.iter().flat_map(|a| a.surfaces.iter().copied()).collect(),
    };

    tracing::debug!(actions = actions.len(), "Generated action manifest");

    Ok(ActionManifest {
        version: MANIFEST_VERSION.to_string(),
        generated_at: options
            .generated_at
            .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        surfaces: surfaces.into_iter().collect(),
        actions,
        errors: error_table(),
        output_modes: OUTPUT_MODES.iter().map(ToString::to_string).collect(),
    })
}

fn wanted(filter: Option<Surface>, surface: Surface) -> bool {
    filter.is_none_or(|f| f == surface)
}

/// Manifest entry for one action, optionally restricted to one surface.
pub fn manifest_entry(action: &ActionSpec, filter: Option<Surface>) -> Result<ActionManifestEntry> {
    let cli = match action.resolve_cli()? {
        Some(resolved) if wanted(filter, Surface::Cli) => Some(CliManifest {
            command: resolved.command_string(),
            group: resolved.group.clone(),
            name: resolved.name.clone(),
            aliases: resolved.aliases.clone(),
            arguments: resolved.command.args.clone(),
            options: resolved
                .options
                .iter()
                .map(|o| CliOptionManifest {
                    flags: o.option.flags.clone(),
                    key: o.flag.key.clone(),
                    description: o.option.description.clone(),
                    default: o.option.default.clone(),
                    required: o.option.required,
                    takes_value: o.flag.takes_value(),
                })
                .collect(),
        }),
        _ => None,
    };

    let mcp = (action.supports(Surface::Mcp) && wanted(filter, Surface::Mcp)).then(|| McpManifest {
        tool: action.tool_name().to_string(),
        description: action.tool_description().to_string(),
        defer_loading: action.defer_loading(),
        input_schema: action.input().to_json_schema(),
    });

    Ok(ActionManifestEntry {
        id: action.id().to_string(),
        description: action.description().to_string(),
        surfaces: action.surface_set().into_iter().collect(),
        input: action.input().to_json_schema(),
        cli,
        mcp,
    })
}
