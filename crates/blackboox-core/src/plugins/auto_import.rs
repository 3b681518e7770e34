//! Auto-import plugin for one pipeline.
//!
//! `build_start` hands off to the shared [`BuildCoordinator`]; `transform`
//! injects imports from that pipeline's registry for every module id the
//! configured filter accepts.
//!
//! ## Usage
//!
//! ```ignore
//! let coordinator = Arc::new(BuildCoordinator::load(&cwd)?);
//! let mut host = PluginContainer::new(cwd.clone());
//! host.add(Box::new(AutoImportPlugin::new(Arc::clone(&coordinator), PipelineKind::Host)?));
//! host.build_start()?;
//! ```

use crate::lifecycle::{BuildCoordinator, PipelineKind};
use crate::plugin::{FileFilter, HookResult, Plugin, PluginContext, PluginEnforce, PluginError, TransformResult};
use std::sync::Arc;
use tracing::debug;

pub struct AutoImportPlugin {
    coordinator: Arc<BuildCoordinator>,
    kind: PipelineKind,
    filter: FileFilter,
}

impl AutoImportPlugin {
    /// Plugin for `kind`, filtering module ids with the project's transform patterns.
    pub fn new(coordinator: Arc<BuildCoordinator>, kind: PipelineKind) -> Result<Self, PluginError> {
        let filter = FileFilter::from_config(&coordinator.config().transform)
            .map_err(|e| PluginError::new(plugin_name(kind), "filter", e))?;
        Ok(Self {
            coordinator,
            kind,
            filter,
        })
    }

    #[must_use]
    pub fn kind(&self) -> PipelineKind {
        self.kind
    }
}

fn plugin_name(kind: PipelineKind) -> &'static str {
    match kind {
        PipelineKind::Client => "blackboox:auto-import:client",
        PipelineKind::Host => "blackboox:auto-import:host",
    }
}

impl Plugin for AutoImportPlugin {
    fn name(&self) -> &str {
        plugin_name(self.kind)
    }

    // Imports must exist before any other plugin compiles the module
    fn enforce(&self) -> PluginEnforce {
        PluginEnforce::Pre
    }

    fn build_start(&self, _ctx: &PluginContext) -> HookResult<()> {
        let report = self
            .coordinator
            .build_start(self.kind)
            .map_err(|e| PluginError::new(self.name(), "build_start", e))?;
        debug!(
            pipeline = %self.kind,
            generation = report.generation,
            reused = report.reused,
            "auto-import registry ready"
        );
        Ok(())
    }

    fn transform(
        &self,
        code: &str,
        id: &str,
        _ctx: &PluginContext,
    ) -> HookResult<Option<TransformResult>> {
        if !self.filter.matches(id) {
            return Ok(None);
        }
        let outcome = self
            .coordinator
            .transform(self.kind, code, id)
            .map_err(|e| PluginError::new(self.name(), "transform", e))?;
        if !outcome.changed {
            return Ok(None);
        }
        Ok(Some(TransformResult {
            code: outcome.code,
            map: outcome.map,
        }))
    }
}
