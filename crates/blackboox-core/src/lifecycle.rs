//! Build lifecycle coordination for the UI and host pipelines.
//!
//! Each pipeline reports its build-start through [`BuildCoordinator::build_start`].
//! The first call of a logical build runs the full pass:
//!
//! 1. scan the services directory and the host and client auto-import directories
//! 2. render the project files, dispatcher, proxy and declarations, scanning
//!    the generated modules from their rendered text
//! 3. commit every artifact as one set
//! 4. publish an immutable [`BuildSnapshot`]
//!
//! Nothing is written until every scan succeeded, so a failed pass leaves the
//! previous artifacts in place. The other pipeline adopts the published
//! snapshot. Transforms only ever read a published snapshot, so they never
//! observe a registry mid-scan.

use crate::config::{ProjectConfig, ProjectPaths};
use crate::error::{Error, ScanError, TransformError};
use crate::generate::{self, paths, ArtifactSet, CommitSummary};
use crate::registry::{BuildSnapshot, ImportEntry, NameCollision, Registry};
use crate::scan::{scan, scan_module, DirectorySource};
use crate::transform::{inject_imports, TransformOutcome};
use blackboox_util::fs::reset_dir;
use blackboox_util::hash::Fingerprint;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// One of the two bundler pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    /// The sandboxed UI bundle.
    Client,
    /// The privileged host bundle.
    Host,
}

impl PipelineKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Host => "host",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Client => 0,
            Self::Host => 1,
        }
    }
}

impl std::fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a pipeline is in its build-start pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    #[default]
    Idle,
    Scanning,
    Generating,
    Writing,
}

/// Outcome of one build-start.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub pipeline: PipelineKind,
    pub generation: u64,
    /// `true` when the pipeline adopted a snapshot another call already built.
    pub reused: bool,
    /// Service names, in dispatcher order.
    pub services: Vec<String>,
    pub host_symbols: usize,
    pub client_symbols: usize,
    pub collisions: Vec<NameCollision>,
    /// Generated files whose contents changed.
    pub written: Vec<PathBuf>,
    pub unchanged: usize,
    /// Digest of all three registries.
    pub fingerprint: String,
}

impl BuildReport {
    fn new(
        pipeline: PipelineKind,
        snapshot: &BuildSnapshot,
        reused: bool,
        collisions: Vec<NameCollision>,
        summary: CommitSummary,
    ) -> Self {
        Self {
            pipeline,
            generation: snapshot.generation,
            reused,
            services: snapshot.services.names().map(str::to_string).collect(),
            host_symbols: snapshot.host.len(),
            client_symbols: snapshot.client.len(),
            collisions,
            written: summary.written,
            unchanged: summary.unchanged,
            fingerprint: fingerprint(snapshot),
        }
    }
}

fn fingerprint(snapshot: &BuildSnapshot) -> String {
    let mut fp = Fingerprint::new();
    fp.field(&snapshot.services.fingerprint())
        .field(&snapshot.host.fingerprint())
        .field(&snapshot.client.fingerprint());
    fp.finish()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns the registries of one project and sequences every pass that builds them.
///
/// Shared by both pipelines (wrap it in an [`Arc`]). Passes are serialised;
/// transforms run concurrently against the published snapshot.
#[derive(Debug)]
pub struct BuildCoordinator {
    config: ProjectConfig,
    paths: ProjectPaths,
    generation: AtomicU64,
    pass: Mutex<()>,
    snapshot: RwLock<Option<Arc<BuildSnapshot>>>,
    states: Mutex<[PipelineState; 2]>,
}

impl BuildCoordinator {
    #[must_use]
    pub fn new(config: ProjectConfig, cwd: &Path) -> Self {
        let paths = config.resolve(cwd);
        Self {
            config,
            paths,
            generation: AtomicU64::new(0),
            pass: Mutex::new(()),
            snapshot: RwLock::new(None),
            states: Mutex::new([PipelineState::Idle; 2]),
        }
    }

    /// Load `blackboox.config.json` from `cwd` and build a coordinator for it.
    pub fn load(cwd: &Path) -> Result<Self, Error> {
        let config = ProjectConfig::load(cwd)?;
        Ok(Self::new(config, cwd))
    }

    #[must_use]
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    #[must_use]
    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    /// Current logical build.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn state(&self, kind: PipelineKind) -> PipelineState {
        lock(&self.states)[kind.index()]
    }

    /// The last published snapshot, if any pass completed.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<BuildSnapshot>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Start a new logical build. The next `build_start` rescans everything.
    ///
    /// The published snapshot stays readable until the new pass replaces it.
    pub fn invalidate(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, "build invalidated");
        generation
    }

    /// Build-start hook of one pipeline.
    ///
    /// Returns once every generated file of the current build is on disk, so
    /// the host pipeline never compiles against a stale dispatcher.
    pub fn build_start(&self, kind: PipelineKind) -> Result<BuildReport, Error> {
        let _pass = lock(&self.pass);
        let generation = self.generation();

        if let Some(snapshot) = self.snapshot().filter(|s| s.generation == generation) {
            debug!(pipeline = %kind, generation, "adopting published snapshot");
            return Ok(BuildReport::new(
                kind,
                &snapshot,
                true,
                Vec::new(),
                CommitSummary::default(),
            ));
        }

        let result = self.run_pass(kind, generation);
        self.set_state(kind, PipelineState::Idle);
        result
    }

    /// Transform hook of one pipeline.
    pub fn transform(
        &self,
        kind: PipelineKind,
        code: &str,
        id: &str,
    ) -> Result<TransformOutcome, TransformError> {
        let snapshot = self.snapshot().ok_or(TransformError::NotStarted {
            pipeline: kind.as_str(),
        })?;
        inject_imports(code, id, snapshot.registry(kind))
    }

    /// Fresh build directory, then a full pass.
    pub fn prepare(&self) -> Result<BuildReport, Error> {
        reset_dir(&self.paths.build)?;
        debug!(build = %self.paths.build.display(), "build directory reset");

        self.invalidate();
        self.build_start(PipelineKind::Client)
    }

    /// Write the package manifest subset from the project's `package.json`.
    pub fn package_manifest(&self) -> Result<CommitSummary, Error> {
        let path = self.paths.root.join("package.json");
        let source = std::fs::read_to_string(&path).map_err(|source| Error::ConfigRead {
            path: path.clone(),
            source,
        })?;
        let original = serde_json::from_str(&source)
            .map_err(|source| Error::ConfigParse { path, source })?;

        let mut set = generate::ArtifactSet::new();
        set.push(generate::package_manifest_artifact(
            &self.paths,
            &original,
            &self.config.electron.external,
        ));
        Ok(set.commit()?)
    }

    /// Configured directories whose exports are auto-imported into host code.
    ///
    /// The generated host entry is added by the pass itself.
    #[must_use]
    pub fn host_sources(&self) -> Vec<DirectorySource> {
        self.config
            .electron
            .dirs
            .iter()
            .map(|d| self.paths.in_src(d))
            .collect()
    }

    /// Configured directories whose exports are auto-imported into UI code.
    ///
    /// The generated client proxy is added by the pass itself.
    #[must_use]
    pub fn client_sources(&self) -> Vec<DirectorySource> {
        self.config
            .client
            .dirs
            .iter()
            .map(|d| self.paths.in_src(d))
            .collect()
    }

    #[must_use]
    pub fn services_source(&self) -> DirectorySource {
        self.paths.in_src(&self.config.services)
    }

    /// Exports of the generated module at `rel`, read from its rendered contents.
    fn generated_entries(
        &self,
        artifacts: &ArtifactSet,
        dir: PathBuf,
        rel: &str,
    ) -> Result<Vec<ImportEntry>, ScanError> {
        let path = self.paths.build.join(rel);
        let Some(artifact) = artifacts.get(&path) else {
            return Ok(Vec::new());
        };
        scan_module(&DirectorySource::new(dir), &path, &artifact.contents)
    }

    fn set_state(&self, kind: PipelineKind, state: PipelineState) {
        let mut states = lock(&self.states);
        if states[kind.index()] != state {
            debug!(pipeline = %kind, from = ?states[kind.index()], to = ?state, "pipeline state");
            states[kind.index()] = state;
        }
    }

    fn run_pass(&self, kind: PipelineKind, generation: u64) -> Result<BuildReport, Error> {
        self.set_state(kind, PipelineState::Scanning);
        let mut services = Registry::new();
        let mut collisions = services.register(scan(&[self.services_source()])?);
        let host_scanned = scan(&self.host_sources())?;
        let client_scanned = scan(&self.client_sources())?;

        self.set_state(kind, PipelineState::Generating);
        let generated = generate::service_artifacts(&self.paths, &services);

        // Generated modules first so configured directories win on collision
        let mut host = Registry::from_entries(services.all().iter().cloned());
        collisions.extend(host.register(self.generated_entries(
            &generated,
            self.paths.host_entry_dir(),
            paths::HOST_ENTRY,
        )?));
        collisions.extend(host.register(host_scanned));
        let mut client = Registry::new();
        collisions.extend(client.register(self.generated_entries(
            &generated,
            self.paths.client_entry_dir(),
            paths::CLIENT_ENTRY,
        )?));
        collisions.extend(client.register(client_scanned));

        let mut artifacts = generate::project_artifacts(&self.paths);
        artifacts.extend(generated);
        artifacts.extend(generate::declaration_artifacts(
            &self.paths,
            &services,
            &host,
            &client,
        ));

        self.set_state(kind, PipelineState::Writing);
        let summary = artifacts.commit()?;

        for collision in &collisions {
            warn!(
                name = %collision.name,
                previous = %collision.previous,
                replacement = %collision.replacement,
                "duplicate export name, the later scan wins"
            );
        }

        let snapshot = Arc::new(BuildSnapshot {
            generation,
            services,
            host,
            client,
        });
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&snapshot));

        let report = BuildReport::new(kind, &snapshot, false, collisions, summary);
        info!(
            pipeline = %kind,
            generation,
            services = report.services.len(),
            host = report.host_symbols,
            client = report.client_symbols,
            written = report.written.len(),
            "build-start pass complete"
        );
        Ok(report)
    }
}
