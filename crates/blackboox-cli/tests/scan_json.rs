//! Integration tests for `blackboox scan --json` and `blackboox transform --json`.

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-q", "-p", "blackboox-cli", "--bin", "blackboox", "--"]);
    cmd
}

fn write(dir: &Path, rel: &str, contents: &str) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn run_json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let output = cargo_bin()
        .args(args)
        .args(["--json", "--cwd"])
        .arg(dir)
        .output()
        .expect("Failed to run command");
    assert!(output.status.success(), "command failed: {output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("stdout should be valid JSON")
}

#[test]
fn test_scan_services_lists_exactly_the_services() {
    let dir = tempdir().unwrap();
    write(dir.path(), "app/services/foo.ts", "export function foo() {}\n");
    write(dir.path(), "app/services/bar.ts", "export default { ping() {} }\n");

    let json = run_json(dir.path(), &["scan", "--services"]);
    assert_eq!(json["ok"], true);
    let names: Vec<&str> = json["registries"]["services"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["bar", "foo"]);
    assert!(json["registries"].get("host").is_none());
    assert!(json["registries"].get("client").is_none());
}

#[test]
fn test_scan_reports_parse_errors() {
    let dir = tempdir().unwrap();
    write(dir.path(), "app/services/broken.ts", "export const = 1\n");

    let output = cargo_bin()
        .args(["scan", "--json", "--cwd"])
        .arg(dir.path())
        .output()
        .expect("Failed to run scan command");
    assert!(!output.status.success());
    let json: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(json["error"]["code"], "SCAN_FAILED");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("broken.ts"));
}

#[test]
fn test_transform_injects_client_import() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("app/services")).unwrap();
    write(
        dir.path(),
        "blackboox.config.json",
        r#"{ "client": { "dirs": ["composables"] } }"#,
    );
    write(
        dir.path(),
        "composables/foo.ts",
        "export function useFoo() { return 1 }\n",
    );
    write(
        dir.path(),
        "pages/home.ts",
        "export const a = useFoo()\nexport const b = useFoo() + useFoo()\n",
    );

    let json = run_json(dir.path(), &["transform", "pages/home.ts"]);
    assert_eq!(json["pipeline"], "client");
    assert_eq!(json["changed"], true);
    let code = json["code"].as_str().unwrap();
    assert_eq!(code.matches("import { useFoo }").count(), 1);

    // The host pipeline knows nothing about UI composables
    let json = run_json(dir.path(), &["transform", "--host", "pages/home.ts"]);
    assert_eq!(json["changed"], false);
    assert!(json.get("code").is_none());
}
