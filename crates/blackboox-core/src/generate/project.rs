//! Project-level files: tsconfig, root declaration, preload bridge, package manifest.

use crate::config::ProjectPaths;
use crate::version::GENERATED_HEADER;
use blackboox_proto::{BRIDGE_GLOBAL, SERVICE_CALL_CHANNEL};
use blackboox_util::fs::{relative_path, to_slash};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;

use super::paths;

fn rel(from: &Path, to: &Path) -> String {
    to_slash(&relative_path(from, to))
}

/// `tsconfig.json` for editors, with the project path aliases.
#[must_use]
pub fn render_tsconfig(project: &ProjectPaths) -> String {
    let root_from_build = rel(&project.build, &project.root);

    let mut include = vec![
        Value::from(format!("./{}", paths::ROOT_DECLARATION)),
        Value::from(format!("{root_from_build}/**/*")),
    ];
    if project.src != project.root {
        include.push(Value::from(format!(
            "{}/**/*",
            rel(&project.build, &project.src)
        )));
    }

    let aliases = [
        ("~~", project.src.clone()),
        ("@@", project.src.clone()),
        ("~", project.src.clone()),
        ("@", project.src.clone()),
        ("#app", project.src.join("app")),
        ("#build", project.build.clone()),
    ];
    let mut alias_paths = Map::new();
    for (alias, target) in aliases {
        let relative = rel(&project.root, &target);
        if target.is_dir() {
            alias_paths.insert(format!("{alias}/*"), json!([format!("{relative}/*")]));
        }
        alias_paths.insert(alias.to_string(), json!([relative]));
    }

    let tsconfig = json!({
        "compilerOptions": {
            "baseUrl": root_from_build,
            "jsx": "preserve",
            "target": "ESNext",
            "module": "ESNext",
            "moduleResolution": "Node",
            "skipLibCheck": true,
            "strict": true,
            "allowJs": true,
            "noEmit": true,
            "resolveJsonModule": true,
            "allowSyntheticDefaultImports": true,
            "isolatedModules": true,
            "esModuleInterop": true,
            "preserveSymlinks": true,
            "types": ["node"],
            "paths": alias_paths,
        },
        "include": include,
    });

    let mut out = serde_json::to_string_pretty(&tsconfig).unwrap_or_default();
    out.push('\n');
    out
}

/// `blackboox.d.ts`: references to every generated declaration file.
#[must_use]
pub fn render_root_declaration() -> String {
    let mut out = String::new();
    out.push_str(GENERATED_HEADER);
    out.push('\n');
    out.push_str("/// <reference types=\"vite/client\" />\n");
    for path in [
        paths::CLIENT_DECLARATION,
        paths::SERVICES_DECLARATION,
        paths::HOST_DECLARATION,
    ] {
        let _ = writeln!(out, "/// <reference path=\"{path}\" />");
    }
    out.push_str("\nexport {}\n");
    out
}

/// `source/preload.cjs`: the restricted bridge. Exposes `callService` and nothing else.
#[must_use]
pub fn render_preload() -> String {
    format!(
        r"{GENERATED_HEADER}
const {{ contextBridge, ipcRenderer }} = require('electron')
const __blackboox__ = {{
  ipcRenderer: {{
    callService: (service, functionName, ...args) =>
      ipcRenderer.invoke('{SERVICE_CALL_CHANNEL}', service, functionName, ...args),
  }},
}}
contextBridge.exposeInMainWorld('{BRIDGE_GLOBAL}', __blackboox__)
"
    )
}

#[derive(Serialize)]
struct PackageManifest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    license: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a Value>,
    main: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    dependencies: BTreeMap<&'a str, &'a Value>,
}

/// `source/package.json`: the subset of the project manifest the packaged
/// host needs. Only dependencies listed in `external` are kept.
#[must_use]
pub fn render_package_manifest(original: &Value, external: &[String]) -> String {
    let field = |key: &str| original.get(key).filter(|v| !v.is_null());
    let dependencies: BTreeMap<&str, &Value> = original
        .get("dependencies")
        .and_then(Value::as_object)
        .map(|deps| {
            deps.iter()
                .filter(|(name, _)| external.iter().any(|e| e == *name))
                .map(|(name, version)| (name.as_str(), version))
                .collect()
        })
        .unwrap_or_default();

    let manifest = PackageManifest {
        name: field("name"),
        author: field("author"),
        version: field("version"),
        license: field("license"),
        description: field("description"),
        main: "app/index.cjs",
        kind: "module",
        dependencies,
    };

    let mut out = serde_json::to_string_pretty(&manifest).unwrap_or_default();
    out.push('\n');
    out
}
