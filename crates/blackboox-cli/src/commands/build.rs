//! `blackboox build`: package manifest plus one build-start per pipeline.
//!
//! The UI pipeline runs first; the host pipeline adopts the same snapshot,
//! so both compile against one registry state.

use super::{display, fail, load, print_json, print_report};
use blackboox_core::{BuildReport, Config, PipelineKind};
use miette::Result;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct BuildResult {
    ok: bool,
    manifest: Vec<PathBuf>,
    pipelines: Vec<BuildReport>,
}

pub fn run(config: &Config) -> Result<()> {
    let json = config.json_logs;
    let coordinator = match load(config) {
        Ok(coordinator) => coordinator,
        Err(e) => return fail(e, json),
    };

    let manifest = match coordinator.package_manifest() {
        Ok(summary) => summary,
        Err(e) => return fail(e, json),
    };

    let mut pipelines = Vec::with_capacity(2);
    for kind in [PipelineKind::Client, PipelineKind::Host] {
        match coordinator.build_start(kind) {
            Ok(report) => pipelines.push(report),
            Err(e) => return fail(e, json),
        }
    }

    if json {
        return print_json(&BuildResult {
            ok: true,
            manifest: manifest.written,
            pipelines,
        });
    }

    let root = &coordinator.paths().root;
    for path in &manifest.written {
        println!("  wrote {}", display(root, path));
    }
    for report in &pipelines {
        print_report(root, report);
    }
    println!("Build ready ({} services)", pipelines[0].services.len());
    Ok(())
}
