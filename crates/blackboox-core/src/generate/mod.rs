//! Generated artifacts.
//!
//! Everything under the build directory is derived: each pass renders the
//! full contents from the current registries and overwrites the previous
//! files. Nothing here is merged with existing content.

pub mod artifact;
pub mod declarations;
pub mod project;
pub mod services;

pub use artifact::{Artifact, ArtifactSet, CommitSummary};

use crate::config::ProjectPaths;
use crate::registry::Registry;
use serde_json::Value;

/// Artifact locations, relative to the build directory.
pub mod paths {
    pub const SERVICES_DECLARATION: &str = "types/services.d.ts";
    pub const HOST_ENTRY: &str = "dev/electron/index.ts";
    pub const CLIENT_ENTRY: &str = "dev/client/useService.mjs";
    pub const HOST_DECLARATION: &str = "types/electron.d.ts";
    pub const CLIENT_DECLARATION: &str = "auto-imports.d.ts";
    pub const TSCONFIG: &str = "tsconfig.json";
    pub const ROOT_DECLARATION: &str = "blackboox.d.ts";
    pub const PRELOAD: &str = "source/preload.cjs";
    pub const PACKAGE_MANIFEST: &str = "source/package.json";
}

/// Service declarations, host dispatcher and client proxy from one services snapshot.
#[must_use]
pub fn service_artifacts(project: &ProjectPaths, services: &Registry) -> ArtifactSet {
    let declarations = project.build.join(paths::SERVICES_DECLARATION);
    let host_entry = project.build.join(paths::HOST_ENTRY);
    let client_entry = project.build.join(paths::CLIENT_ENTRY);

    let mut set = ArtifactSet::new();
    set.push(Artifact::new(
        &declarations,
        services::render_service_declarations(services, parent(&declarations)),
    ));
    set.push(Artifact::new(
        &host_entry,
        services::render_host_entry(services, parent(&host_entry)),
    ));
    set.push(Artifact::new(
        &client_entry,
        services::render_client_proxy(services),
    ));
    set
}

/// Auto-import declarations for both pipelines. Service names are declared
/// by the services declaration file and skipped here.
#[must_use]
pub fn declaration_artifacts(
    project: &ProjectPaths,
    services: &Registry,
    host: &Registry,
    client: &Registry,
) -> ArtifactSet {
    let host_path = project.build.join(paths::HOST_DECLARATION);
    let client_path = project.build.join(paths::CLIENT_DECLARATION);

    let mut set = ArtifactSet::new();
    set.push(Artifact::new(
        &host_path,
        declarations::render_declarations(host, services, parent(&host_path)),
    ));
    set.push(Artifact::new(
        &client_path,
        declarations::render_declarations(client, services, parent(&client_path)),
    ));
    set
}

/// tsconfig, root declaration and preload bridge.
#[must_use]
pub fn project_artifacts(project: &ProjectPaths) -> ArtifactSet {
    let mut set = ArtifactSet::new();
    set.push(Artifact::new(
        project.build.join(paths::TSCONFIG),
        project::render_tsconfig(project),
    ));
    set.push(Artifact::new(
        project.build.join(paths::ROOT_DECLARATION),
        project::render_root_declaration(),
    ));
    set.push(Artifact::new(
        project.build.join(paths::PRELOAD),
        project::render_preload(),
    ));
    set
}

/// The package manifest subset, rendered from the project's `package.json` contents.
#[must_use]
pub fn package_manifest_artifact(project: &ProjectPaths, original: &Value, external: &[String]) -> Artifact {
    Artifact::new(
        project.build.join(paths::PACKAGE_MANIFEST),
        project::render_package_manifest(original, external),
    )
}

fn parent(path: &std::path::Path) -> &std::path::Path {
    path.parent().unwrap_or(path)
}
