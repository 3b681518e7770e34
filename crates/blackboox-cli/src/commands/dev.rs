//! `blackboox dev`: build once, then rebuild on every source change.
//!
//! Every batch of changes invalidates the build and reruns the full pass;
//! there is no incremental path. Changes under the build directory are the
//! pass's own output and never trigger a rebuild.

use super::{display, fail, load, print_report};
use blackboox_core::config::CONFIG_FILE;
use blackboox_core::scan::SCRIPT_EXTENSIONS;
use blackboox_core::{BuildCoordinator, Config, PipelineKind};
use miette::{IntoDiagnostic, Result};
use notify::{Config as WatchConfig, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub fn run(config: &Config, debounce_ms: u64) -> Result<()> {
    let json = config.json_logs;
    let coordinator = match load(config) {
        Ok(coordinator) => Arc::new(coordinator),
        Err(e) => return fail(e, json),
    };

    if let Err(e) = rebuild(&coordinator) {
        return fail(e, json);
    }

    let root = coordinator.paths().src.clone();
    let build_dir = coordinator.paths().build.clone();
    println!("Watching {}", root.display());

    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    runtime.block_on(async move {
        let (change_tx, mut change_rx) = mpsc::channel::<Vec<PathBuf>>(16);
        let debounce = Duration::from_millis(debounce_ms);

        std::thread::spawn(move || {
            if let Err(e) = watch_files(&root, &build_dir, debounce, change_tx) {
                error!(error = %e, "file watcher stopped");
            }
        });

        while let Some(changed) = change_rx.recv().await {
            let project_root = coordinator.paths().root.clone();
            for path in &changed {
                println!("  changed {}", display(&project_root, path));
            }
            if changed.iter().any(|p| p.file_name().is_some_and(|n| n == CONFIG_FILE)) {
                warn!("{CONFIG_FILE} changed; restart `blackboox dev` to apply it");
            }

            coordinator.invalidate();
            let pass = Arc::clone(&coordinator);
            match tokio::task::spawn_blocking(move || rebuild(&pass)).await {
                Ok(Ok(())) => {}
                // The previous artifacts stay in place; the next change retries
                Ok(Err(e)) => eprintln!("  error: {e}"),
                Err(e) => error!(error = %e, "rebuild task failed"),
            }
        }
    });

    Ok(())
}

/// Both pipelines' build-start: the first runs the pass, the second adopts it.
fn rebuild(coordinator: &BuildCoordinator) -> std::result::Result<(), blackboox_core::Error> {
    let root = coordinator.paths().root.clone();
    for kind in [PipelineKind::Client, PipelineKind::Host] {
        let report = coordinator.build_start(kind)?;
        print_report(&root, &report);
        if !report.reused {
            info!(generation = report.generation, fingerprint = %report.fingerprint, "rebuilt");
        }
    }
    Ok(())
}

/// Whether a change to `path` can affect a registry.
fn is_relevant(path: &Path, build_dir: &Path) -> bool {
    if path.starts_with(build_dir) {
        return false;
    }
    if path
        .components()
        .any(|c| matches!(c.as_os_str().to_str(), Some("node_modules" | ".git")))
    {
        return false;
    }
    if path.file_name().is_some_and(|n| n == CONFIG_FILE) {
        return true;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SCRIPT_EXTENSIONS.contains(&ext))
}

/// Forward batches of relevant changes, each sent once `debounce` passed without a new event.
fn watch_files(
    root: &Path,
    build_dir: &Path,
    debounce: Duration,
    change_tx: mpsc::Sender<Vec<PathBuf>>,
) -> notify::Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher = RecommendedWatcher::new(tx, WatchConfig::default())?;
    watcher.watch(root, RecursiveMode::Recursive)?;

    let mut pending: BTreeSet<PathBuf> = BTreeSet::new();
    loop {
        let event = if pending.is_empty() {
            match rx.recv() {
                Ok(event) => event,
                Err(_) => break,
            }
        } else {
            match rx.recv_timeout(debounce) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => {
                    let batch: Vec<PathBuf> = std::mem::take(&mut pending).into_iter().collect();
                    if change_tx.blocking_send(batch).is_err() {
                        break;
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        };

        match event {
            Ok(event) => pending.extend(
                event
                    .paths
                    .into_iter()
                    .filter(|p| is_relevant(p, build_dir)),
            ),
            Err(e) => warn!(error = %e, "watch error"),
        }
    }

    Ok(())
}
