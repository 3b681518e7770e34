//! `blackboox transform <file>`: run one pipeline's transform hook on a file.

use super::{fail, load, print_json};
use blackboox_core::{AutoImportPlugin, Config, PipelineKind, PluginContainer};
use blackboox_util::fs::read_to_string_lossy;
use miette::{miette, IntoDiagnostic, Result, WrapErr};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

#[derive(Serialize)]
struct TransformJson<'a> {
    ok: bool,
    file: String,
    pipeline: PipelineKind,
    changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
}

pub fn run(config: &Config, file: &Path, host: bool) -> Result<()> {
    let json = config.json_logs;
    let kind = if host {
        PipelineKind::Host
    } else {
        PipelineKind::Client
    };
    let coordinator = match load(config) {
        Ok(coordinator) => Arc::new(coordinator),
        Err(e) => return fail(e, json),
    };

    let path = config.cwd.join(file);
    let code = read_to_string_lossy(&path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Cannot read {}", path.display()))?;

    let mut container = PluginContainer::new(config.cwd.clone());
    container.add(Box::new(
        AutoImportPlugin::new(coordinator, kind).map_err(|e| miette!("{e}"))?,
    ));
    container.build_start().map_err(|e| miette!("{e}"))?;

    let id = path.to_string_lossy();
    let result = container.transform(&code, &id).map_err(|e| miette!("{e}"))?;
    container.build_end().map_err(|e| miette!("{e}"))?;

    if json {
        return print_json(&TransformJson {
            ok: true,
            file: path.display().to_string(),
            pipeline: kind,
            changed: result.is_some(),
            code: result.as_ref().map(|r| r.code.as_str()),
        });
    }

    match result {
        Some(result) => print!("{}", result.code),
        None => eprintln!("unchanged: {}", path.display()),
    }
    Ok(())
}
