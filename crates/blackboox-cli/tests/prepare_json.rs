//! Integration tests for `blackboox prepare --json` and `blackboox build --json`.

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

fn fixture(dir: &Path) {
    write(
        dir,
        "app/services/auth.ts",
        "export const auth = { login(user: string, pass: string) { return user } }\n",
    );
    write(
        dir,
        "app/services/files.ts",
        "export default { read(path: string) { return path } }\n",
    );
}

#[test]
fn test_prepare_json_writes_all_artifacts() {
    let dir = tempdir().unwrap();
    fixture(dir.path());

    let output = cargo_bin()
        .args(["prepare", "--json", "--cwd"])
        .arg(dir.path())
        .output()
        .expect("Failed to run prepare command");
    assert!(output.status.success(), "prepare failed: {output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("stdout should be valid JSON");

    assert_eq!(json["ok"], true);
    assert_eq!(
        json["report"]["services"],
        serde_json::json!(["auth", "files"])
    );
    assert!(json["report"]["collisions"].as_array().unwrap().is_empty());

    let build = dir.path().join(".blackboox");
    for rel in [
        "tsconfig.json",
        "blackboox.d.ts",
        "source/preload.cjs",
        "types/services.d.ts",
        "types/electron.d.ts",
        "auto-imports.d.ts",
        "dev/electron/index.ts",
        "dev/client/useService.mjs",
    ] {
        assert!(build.join(rel).exists(), "missing {rel}");
    }

    let proxy = fs::read_to_string(build.join("dev/client/useService.mjs")).unwrap();
    assert!(proxy.contains(r#""login": (...args) => callService("auth", "login", ...args),"#));
    assert!(proxy.contains(r#""read": (...args) => callService("files", "read", ...args),"#));
}

#[test]
fn test_build_json_without_package_json_fails_cleanly() {
    let dir = tempdir().unwrap();
    fixture(dir.path());

    let output = cargo_bin()
        .args(["build", "--json", "--cwd"])
        .arg(dir.path())
        .output()
        .expect("Failed to run build command");
    assert!(!output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("stdout should be valid JSON");
    assert_eq!(json["ok"], false);
    assert_eq!(json["error"]["code"], "CONFIG_READ_FAILED");
}

#[test]
fn test_build_json_runs_both_pipelines() {
    let dir = tempdir().unwrap();
    fixture(dir.path());
    write(
        dir.path(),
        "package.json",
        r#"{"name": "desk", "version": "0.1.0", "dependencies": {"vue": "^3.4.0"}}"#,
    );

    let output = cargo_bin()
        .args(["build", "--json", "--cwd"])
        .arg(dir.path())
        .output()
        .expect("Failed to run build command");
    assert!(output.status.success(), "build failed: {output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("stdout should be valid JSON");
    let pipelines = json["pipelines"].as_array().unwrap();
    assert_eq!(pipelines.len(), 2);
    assert_eq!(pipelines[0]["pipeline"], "client");
    assert_eq!(pipelines[0]["reused"], false);
    assert_eq!(pipelines[1]["pipeline"], "host");
    assert_eq!(pipelines[1]["reused"], true);
    assert_eq!(pipelines[0]["fingerprint"], pipelines[1]["fingerprint"]);

    let manifest: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join(".blackboox/source/package.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(manifest["name"], "desk");
    assert_eq!(manifest["main"], "app/index.cjs");

    // The host bundle needs the bridge the client proxy calls into
    let build = dir.path().join(".blackboox");
    for rel in ["source/preload.cjs", "tsconfig.json", "blackboox.d.ts"] {
        assert!(build.join(rel).exists(), "{rel} missing after build");
    }
}
