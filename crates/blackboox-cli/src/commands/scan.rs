//! `blackboox scan`: print the registries of a fresh build.

use super::{display, fail, load, print_json};
use blackboox_core::{Config, ImportEntry, NameCollision, PipelineKind, Registry};
use miette::Result;
use serde::Serialize;
use std::path::Path;

/// Which registries to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    All,
    Services,
    Host,
    Client,
}

impl Selection {
    pub fn from_flags(services: bool, host: bool, client: bool) -> Self {
        match (services, host, client) {
            (true, _, _) => Self::Services,
            (_, true, _) => Self::Host,
            (_, _, true) => Self::Client,
            _ => Self::All,
        }
    }

    fn includes(self, other: Self) -> bool {
        self == Self::All || self == other
    }
}

#[derive(Serialize, Default)]
struct Registries<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    services: Option<&'a [ImportEntry]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<&'a [ImportEntry]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client: Option<&'a [ImportEntry]>,
}

#[derive(Serialize)]
struct ScanResult<'a> {
    ok: bool,
    generation: u64,
    fingerprint: &'a str,
    registries: Registries<'a>,
    collisions: &'a [NameCollision],
}

pub fn run(config: &Config, selection: Selection) -> Result<()> {
    let json = config.json_logs;
    let coordinator = match load(config) {
        Ok(coordinator) => coordinator,
        Err(e) => return fail(e, json),
    };
    // Host and client registries include the generated modules, so a full pass runs
    let report = match coordinator.build_start(PipelineKind::Client) {
        Ok(report) => report,
        Err(e) => return fail(e, json),
    };
    let Some(snapshot) = coordinator.snapshot() else {
        return fail(blackboox_core::Error::other("no registry was published"), json);
    };

    let mut registries = Registries::default();
    if selection.includes(Selection::Services) {
        registries.services = Some(snapshot.services.all());
    }
    if selection.includes(Selection::Host) {
        registries.host = Some(snapshot.host.all());
    }
    if selection.includes(Selection::Client) {
        registries.client = Some(snapshot.client.all());
    }

    if json {
        return print_json(&ScanResult {
            ok: true,
            generation: report.generation,
            fingerprint: &report.fingerprint,
            registries,
            collisions: &report.collisions,
        });
    }

    let root = &coordinator.paths().root;
    for (title, registry) in [
        ("services", Selection::Services, &snapshot.services),
        ("host", Selection::Host, &snapshot.host),
        ("client", Selection::Client, &snapshot.client),
    ]
    .into_iter()
    .filter(|(_, kind, _)| selection.includes(*kind))
    .map(|(title, _, registry)| (title, registry))
    {
        print_registry(root, title, registry);
    }
    for collision in &report.collisions {
        eprintln!(
            "warning: `{}` is exported by both {} and {}",
            collision.name, collision.previous, collision.replacement
        );
    }
    Ok(())
}

fn print_registry(root: &Path, title: &str, registry: &Registry) {
    println!("{title} ({})", registry.len());
    let width = registry.names().map(str::len).max().unwrap_or(0);
    for entry in registry.all() {
        let export = if entry.is_default_export { "default" } else { "named" };
        println!(
            "  {:width$}  {:7}  {:7}  {}",
            entry.name,
            export,
            entry.shape.kind(),
            display(root, &entry.source),
        );
    }
}
