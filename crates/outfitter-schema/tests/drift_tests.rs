//! Snapshot-and-diff workflow: commit a manifest, evolve the registry, and
//! check what the drift report flags.

use std::path::Path;

use outfitter_contracts::{
    ActionRegistry, ActionSpec, CliOption, CliSpec, ErrorCategory, HandlerContext, InputSchema,
    McpSpec, OutfitterError, Surface,
};
use outfitter_schema::{
    ManifestOptions, ModifiedAction, diff_surface_maps, generate_manifest, read_snapshot,
    write_snapshot,
};
use outfitter_test_utils::TestWorkspace;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

fn action_with_input(id: &str, description: &str, input: InputSchema) -> ActionSpec {
    ActionSpec::new(id, description, input, |input: Value, _ctx: HandlerContext| async move {
        Ok(input)
    })
}

fn action(id: &str, description: &str) -> ActionSpec {
    action_with_input(id, description, InputSchema::empty())
}

fn committed_actions() -> Vec<ActionSpec> {
    vec![
        action("notes.add", "Add a note").cli(CliSpec::new().command("add <text>")),
        action("notes.list", "List notes"),
        action("notes.purge", "Delete every note"),
    ]
}

fn committed_registry() -> ActionRegistry {
    ActionRegistry::new().extend(committed_actions()).unwrap()
}

fn snapshot(registry: &ActionRegistry, path: &Path) {
    let manifest = generate_manifest(registry, ManifestOptions::default()).unwrap();
    write_snapshot(path, &manifest).unwrap();
}

#[test]
fn unchanged_registry_has_no_drift() {
    let ws = TestWorkspace::new();
    let path = ws.root().join(".outfitter/surface.json");
    snapshot(&committed_registry(), &path);

    let committed = read_snapshot(&path).unwrap();
    let live = generate_manifest(&committed_registry(), ManifestOptions::default()).unwrap();
    let diff = diff_surface_maps(&committed, &live);

    assert!(!diff.has_changes);
    assert!(diff.added.is_empty() && diff.removed.is_empty() && diff.modified.is_empty());
}

#[test]
fn evolved_registry_reports_each_change() {
    let ws = TestWorkspace::new();
    let path = ws.root().join("surface.json");
    snapshot(&committed_registry(), &path);

    let live_registry = ActionRegistry::new()
        .extend([
            action("notes.add", "Add a note").cli(
                CliSpec::new()
                    .command("add <text>")
                    .option(CliOption::new("--pin", "Pin the note")),
            ),
            action("notes.list", "List every note").mcp(McpSpec::new().tool("list_notes")),
            action("notes.export", "Export notes").surfaces([Surface::Api]),
        ])
        .unwrap();
    let live = generate_manifest(&live_registry, ManifestOptions::default()).unwrap();
    let diff = diff_surface_maps(&read_snapshot(&path).unwrap(), &live);

    assert!(diff.has_changes);
    assert_eq!(diff.added, vec!["notes.export"]);
    assert_eq!(diff.removed, vec!["notes.purge"]);
    assert_eq!(
        diff.modified,
        vec![
            ModifiedAction {
                id: "notes.add".into(),
                fields: vec!["cli".into()],
            },
            ModifiedAction {
                id: "notes.list".into(),
                fields: vec!["description".into(), "mcp".into()],
            },
        ]
    );
    // The api surface is new to the manifest as a whole.
    assert_eq!(diff.metadata_changes.len(), 1);
    assert_eq!(diff.metadata_changes[0].field, "surfaces");
}

#[test]
fn diff_report_serializes_camel_case() {
    let committed = generate_manifest(&committed_registry(), ManifestOptions::default()).unwrap();
    let live = generate_manifest(
        &ActionRegistry::new().extend([action("notes.add", "Add a note")]).unwrap(),
        ManifestOptions::default(),
    )
    .unwrap();
    let value = serde_json::to_value(diff_surface_maps(&committed, &live)).unwrap();

    assert_eq!(value["hasChanges"], json!(true));
    assert_eq!(value["removed"], json!(["notes.list", "notes.purge"]));
    assert_eq!(value["modified"][0]["id"], "notes.add");
    assert!(value.get("metadataChanges").is_some());
}

#[test]
fn missing_snapshot_is_not_found() {
    let ws = TestWorkspace::new();
    let err: OutfitterError = read_snapshot(&ws.root().join("absent.json")).unwrap_err().into();
    assert_eq!(err.category(), ErrorCategory::NotFound);
    assert_eq!(err.exit_code(), 2);
}

fn reworded_list() -> ActionSpec {
    action("notes.list", "List all notes")
}

fn renamed_list_tool() -> ActionSpec {
    action("notes.list", "List notes").mcp(McpSpec::new().tool("list_notes"))
}

fn filtered_list() -> ActionSpec {
    let input = InputSchema::new(json!({"properties": {"tag": {"type": "string"}}})).unwrap();
    action_with_input("notes.list", "List notes", input)
}

fn cli_only_list() -> ActionSpec {
    action("notes.list", "List notes").surfaces([Surface::Cli])
}

fn pinned_add() -> ActionSpec {
    action("notes.add", "Add a note").cli(
        CliSpec::new()
            .command("add <text>")
            .option(CliOption::new("--pin", "Pin the note")),
    )
}

#[rstest]
#[case::description(reworded_list, &["description", "mcp"])]
#[case::tool_name(renamed_list_tool, &["mcp"])]
#[case::input(filtered_list, &["input", "mcp"])]
#[case::surfaces(cli_only_list, &["mcp", "surfaces"])]
#[case::cli_option(pinned_add, &["cli"])]
fn single_change_is_classified(#[case] evolve: fn() -> ActionSpec, #[case] expected: &[&str]) {
    let changed = evolve();
    let id = changed.id().to_string();
    let mut actions: Vec<ActionSpec> = committed_actions()
        .into_iter()
        .filter(|a| a.id() != id)
        .collect();
    actions.push(changed);

    let committed = generate_manifest(&committed_registry(), ManifestOptions::default()).unwrap();
    let live = generate_manifest(
        &ActionRegistry::new().extend(actions).unwrap(),
        ManifestOptions::default(),
    )
    .unwrap();
    let diff = diff_surface_maps(&committed, &live);

    assert!(diff.has_changes);
    assert!(diff.added.is_empty() && diff.removed.is_empty());
    assert!(diff.metadata_changes.is_empty());
    assert_eq!(
        diff.modified,
        vec![ModifiedAction {
            id,
            fields: expected.iter().map(|f| f.to_string()).collect(),
        }]
    );
}
