pub mod build;
pub mod dev;
pub mod prepare;
pub mod scan;
pub mod transform;
pub mod version;

use blackboox_core::{BuildCoordinator, BuildReport, Config, Error};
use blackboox_util::fs::{relative_path, to_slash};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::Path;

/// Error body of every `--json` failure.
#[derive(Serialize)]
struct ErrorJson {
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorResult {
    ok: bool,
    error: ErrorJson,
}

/// Stable code for an engine error.
pub fn error_code(error: &Error) -> &'static str {
    match error {
        Error::ConfigRead { .. } => "CONFIG_READ_FAILED",
        Error::ConfigParse { .. } => "CONFIG_INVALID",
        Error::Scan(_) => "SCAN_FAILED",
        Error::Generation(_) => "GENERATION_WRITE_FAILED",
        Error::Io(_) => "IO_ERROR",
        Error::Other(_) => "INTERNAL_ERROR",
    }
}

/// Report `error` and exit, or hand it to miette for the human output.
pub fn fail(error: Error, json: bool) -> Result<()> {
    if json {
        let result = ErrorResult {
            ok: false,
            error: ErrorJson {
                code: error_code(&error),
                message: error.to_string(),
            },
        };
        print_json(&result)?;
        std::process::exit(1);
    }
    Err(error).into_diagnostic()
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

pub fn load(config: &Config) -> std::result::Result<BuildCoordinator, Error> {
    BuildCoordinator::load(&config.cwd)
}

/// `path` relative to `root`, slash separated.
pub fn display(root: &Path, path: &Path) -> String {
    to_slash(&relative_path(root, path))
}

/// Human lines shared by every command that runs a pass.
pub fn print_report(root: &Path, report: &BuildReport) {
    if report.reused {
        println!("  {} pipeline: reusing build {}", report.pipeline, report.generation);
        return;
    }
    println!(
        "  {} pipeline: {} services, {} host symbols, {} client symbols",
        report.pipeline,
        report.services.len(),
        report.host_symbols,
        report.client_symbols
    );
    for path in &report.written {
        println!("    wrote {}", display(root, path));
    }
    for collision in &report.collisions {
        eprintln!(
            "  warning: `{}` is exported by both {} and {}; using {}",
            collision.name, collision.previous, collision.replacement, collision.replacement
        );
    }
}
