//! `blackboox prepare`: fresh build directory with every generated file.

use super::{display, fail, load, print_json, print_report};
use blackboox_core::generate::paths;
use blackboox_core::{BuildReport, Config};
use miette::Result;
use serde::Serialize;

#[derive(Serialize)]
struct PrepareResult<'a> {
    ok: bool,
    build_dir: String,
    tsconfig: String,
    report: &'a BuildReport,
}

pub fn run(config: &Config) -> Result<()> {
    let json = config.json_logs;
    let coordinator = match load(config) {
        Ok(coordinator) => coordinator,
        Err(e) => return fail(e, json),
    };
    let report = match coordinator.prepare() {
        Ok(report) => report,
        Err(e) => return fail(e, json),
    };

    let project = coordinator.paths();
    let tsconfig = project.build.join(paths::TSCONFIG);
    if json {
        return print_json(&PrepareResult {
            ok: true,
            build_dir: project.build.display().to_string(),
            tsconfig: tsconfig.display().to_string(),
            report: &report,
        });
    }

    print_report(&project.root, &report);
    println!(
        "Types generated in {}",
        display(&project.root, &project.build.join(paths::ROOT_DECLARATION))
    );
    println!(
        "Extend {} from your tsconfig.json to pick them up",
        display(&project.root, &tsconfig)
    );
    Ok(())
}
