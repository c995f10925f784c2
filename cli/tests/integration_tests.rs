use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const ROOT_DOC: &str = "# Atomic Azure CLI Commands

## Groups

- [vm](/Commands/vm/readme.md)
: Manage virtual machines.
";

const VM_DOC: &str = "# [Group] _vm_

Manage virtual machines.

## Commands

- [start](/Commands/vm/_start.md)
: Start a stopped VM.
";

const START_DOC: &str = "# [Command] _vm start_

Start a stopped VM.

## Versions

### [2022-11-01](/Resources/x) **Stable**

<!-- mgmt-plane /subscriptions/{}/resourcegroups/{}/providers/microsoft.compute/virtualmachines/{}/start 2022-11-01 -->
";

fn catalog(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_catalog"))
        .args(args)
        .output()
        .expect("failed to run catalog")
}

fn write(root: &Path, relative: &str, text: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, text).unwrap();
    path
}

fn write_catalogue(root: &Path) {
    write(root, "Commands/readme.md", ROOT_DOC);
    write(root, "Commands/vm/readme.md", VM_DOC);
    write(root, "Commands/vm/_start.md", START_DOC);
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ---------------------------------------------------------------------------
// Catalogue commands
// ---------------------------------------------------------------------------

#[test]
fn verify_accepts_complete_catalogue() {
    let dir = tempfile::tempdir().unwrap();
    write_catalogue(dir.path());

    let output = catalog(&["verify", "--aaz-path", dir.path().to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Verified 1 command group(s) and 1 command(s)."));
}

#[test]
fn verify_reports_missing_summaries() {
    let dir = tempfile::tempdir().unwrap();
    write_catalogue(dir.path());
    write(dir.path(), "Commands/vm/readme.md", &VM_DOC.replace("Manage virtual machines.\n\n## Commands", "## Commands"));

    let output = catalog(&["verify", "--aaz-path", dir.path().to_str().unwrap()]);
    assert!(!output.status.success());
    let violations: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(violations["vm"]["type"], "commandGroup");
    assert_eq!(violations["vm"]["message"], "Miss short summary.");
    assert!(stderr(&output).contains("error: Verification failed for 1 node(s)"));

    let output = catalog(&[
        "verify",
        "--skip-groups",
        "--aaz-path",
        dir.path().to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
}

#[test]
fn verify_reads_config_file() {
    let dir = tempfile::tempdir().unwrap();
    write_catalogue(dir.path());
    let config = write(
        dir.path(),
        "catalog.yml",
        &format!(
            "version: \"1.0\"\naaz_path: {}\nverify:\n  require_group_help: false\n",
            dir.path().display()
        ),
    );

    let output = catalog(&["verify", "--config", config.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
}

#[test]
fn missing_catalogue_location_is_an_error() {
    let output = catalog(&["verify"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("--aaz-path or --config"));
}

#[test]
fn show_command_and_group() {
    let dir = tempfile::tempdir().unwrap();
    write_catalogue(dir.path());
    let root = dir.path().to_str().unwrap();

    let output = catalog(&["show", "--aaz-path", root, "vm", "start"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let command: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(command["names"], serde_json::json!(["vm", "start"]));
    assert_eq!(command["versions"][0]["name"], "2022-11-01");
    assert!(command["versions"][0].get("stage").is_none());

    let output = catalog(&["show", "--aaz-path", root, "vm"]);
    let group: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(group["help"]["short"], "Manage virtual machines.");
    assert_eq!(group["commands"]["start"]["help"]["short"], "Start a stopped VM.");

    let output = catalog(&["show", "--aaz-path", root, "vm", "stop"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("'vm stop' not found"));
}

#[test]
fn tree_writes_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    write_catalogue(dir.path());
    let out = dir.path().join("out").join("tree.json");

    let output = catalog(&[
        "tree",
        "--aaz-path",
        dir.path().to_str().unwrap(),
        "--output",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Wrote 1 command group(s) and 1 command(s)"));

    let tree: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(tree["root"]["names"], serde_json::json!(["aaz"]));
    assert_eq!(
        tree["root"]["commandGroups"]["vm"]["commands"]["start"]["versions"][0]["resources"][0]["plane"],
        "mgmt-plane"
    );
}

#[test]
fn tree_prefers_index() {
    let dir = tempfile::tempdir().unwrap();
    write_catalogue(dir.path());
    let index = serde_json::json!({
        "root": {
            "names": ["aaz"],
            "commandGroups": {
                "vm": {
                    "names": ["vm"],
                    "help": { "short": "Indexed." }
                }
            }
        }
    });
    write(dir.path(), "Commands/tree.json", &index.to_string());
    let root = dir.path().to_str().unwrap();

    let output = catalog(&["tree", "--aaz-path", root]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let tree: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(tree["root"]["commandGroups"]["vm"]["help"]["short"], "Indexed.");

    let output = catalog(&["tree", "--no-patch", "--aaz-path", root]);
    let tree: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(
        tree["root"]["commandGroups"]["vm"]["help"]["short"],
        "Manage virtual machines."
    );
}

// ---------------------------------------------------------------------------
// Schema commands
// ---------------------------------------------------------------------------

fn tag_schema() -> serde_json::Value {
    serde_json::json!({
        "kind": "object",
        "cls": "Tag",
        "props": [
            { "name": "key", "kind": "scalar", "type": "string", "required": true },
            { "name": "value", "kind": "scalar", "type": "string" }
        ]
    })
}

#[test]
fn normalize_replaces_repeated_classes() {
    let dir = tempfile::tempdir().unwrap();
    let mut first = tag_schema();
    first["name"] = "tag".into();
    let mut second = tag_schema();
    second["name"] = "backupTag".into();
    let schema = serde_json::json!({ "kind": "object", "props": [first, second] });
    let input = write(dir.path(), "schema.json", &schema.to_string());

    let output = catalog(&["normalize", "--check", input.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let normalized: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(normalized["props"][0]["cls"], "Tag");
    assert_eq!(normalized["props"][1]["kind"], "cls");
    assert_eq!(normalized["props"][1]["class"], "Tag");
    assert_eq!(normalized["props"][1]["name"], "backupTag");
}

#[test]
fn normalize_check_rejects_dangling_reference() {
    let dir = tempfile::tempdir().unwrap();
    let schema = serde_json::json!({
        "kind": "object",
        "props": [{ "name": "tag", "kind": "cls", "class": "Tag" }]
    });
    let input = write(dir.path(), "schema.json", &schema.to_string());

    let output = catalog(&["normalize", input.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let output = catalog(&["normalize", "--check", input.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Tag"));
}

#[test]
fn diff_reports_by_level() {
    let dir = tempfile::tempdir().unwrap();
    let old = serde_json::json!({
        "kind": "object",
        "props": [
            { "name": "name", "kind": "scalar", "type": "string", "required": true },
            { "name": "note", "kind": "scalar", "type": "string" }
        ]
    });
    let new = serde_json::json!({
        "kind": "object",
        "props": [
            { "name": "note", "kind": "scalar", "type": "string" },
            { "name": "extra", "kind": "scalar", "type": "string" }
        ]
    });
    let old = write(dir.path(), "old.json", &old.to_string());
    let new = write(dir.path(), "new.json", &new.to_string());
    let (old, new) = (old.to_str().unwrap(), new.to_str().unwrap());

    let output = catalog(&["diff", old, new]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let diff: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(diff["props.name"], "Miss required property");
    assert!(diff.get("props.extra").is_none());

    let output = catalog(&["diff", "--level", "associate", old, new]);
    let diff: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(diff["props.extra"], "New property");

    let output = catalog(&["diff", "--level", "nope", old, new]);
    assert!(!output.status.success());
}

#[test]
fn diff_identical_schemas_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write(dir.path(), "schema.json", &tag_schema().to_string());
    let path = schema.to_str().unwrap();

    let output = catalog(&["diff", "--level", "associate", path, path]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "{}");
}
