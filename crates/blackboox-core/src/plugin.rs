//! Bundler hook interface.
//!
//! The bundler drives the engine through two hooks: `build_start` once per
//! build, before any module is compiled, and `transform` once per module id
//! accepted by the plugin's [`FileFilter`].
//!
//! ## Example
//!
//! ```ignore
//! use blackboox_core::plugin::{HookResult, Plugin, PluginContext, TransformResult};
//!
//! struct Banner;
//!
//! impl Plugin for Banner {
//!     fn name(&self) -> &str { "banner" }
//!
//!     fn transform(&self, code: &str, _id: &str, _ctx: &PluginContext) -> HookResult<Option<TransformResult>> {
//!         Ok(Some(TransformResult::code(format!("// banner\n{code}"))))
//!     }
//! }
//! ```

use crate::config::TransformConfig;
use regex_lite::Regex;
use std::path::PathBuf;

/// Result type for plugin hooks.
pub type HookResult<T> = Result<T, PluginError>;

/// Error from a plugin hook.
#[derive(Debug)]
pub struct PluginError {
    /// Plugin name that caused the error.
    pub plugin: String,
    /// Hook that failed.
    pub hook: &'static str,
    /// Error message.
    pub message: String,
}

impl PluginError {
    pub fn new(plugin: impl Into<String>, hook: &'static str, message: impl ToString) -> Self {
        Self {
            plugin: plugin.into(),
            hook,
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for PluginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.plugin, self.hook, self.message)
    }
}

impl std::error::Error for PluginError {}

/// Context passed to plugin hooks.
#[derive(Debug, Default)]
pub struct PluginContext {
    /// Project working directory.
    pub cwd: PathBuf,
}

/// Result of the transform hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformResult {
    /// Transformed code.
    pub code: String,
    /// Optional source map.
    pub map: Option<String>,
}

impl TransformResult {
    /// Create a transform result with code only.
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            map: None,
        }
    }
}

/// When a plugin runs relative to the others.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum PluginEnforce {
    Pre,
    #[default]
    Normal,
    Post,
}

/// A bundler plugin.
///
/// Every hook has a no-op default. `transform` returning `Ok(None)` means
/// the module passes through untouched.
pub trait Plugin: Send + Sync {
    /// Plugin name (for error messages and logs).
    fn name(&self) -> &str;

    fn enforce(&self) -> PluginEnforce {
        PluginEnforce::Normal
    }

    /// Called once per build, before any transform.
    fn build_start(&self, _ctx: &PluginContext) -> HookResult<()> {
        Ok(())
    }

    /// Transform one module.
    fn transform(
        &self,
        _code: &str,
        _id: &str,
        _ctx: &PluginContext,
    ) -> HookResult<Option<TransformResult>> {
        Ok(None)
    }

    /// Called after every module was emitted.
    fn build_end(&self, _ctx: &PluginContext) -> HookResult<()> {
        Ok(())
    }
}

/// Ordered plugins for one pipeline.
pub struct PluginContainer {
    plugins: Vec<Box<dyn Plugin>>,
    ctx: PluginContext,
}

impl PluginContainer {
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            plugins: Vec::new(),
            ctx: PluginContext { cwd },
        }
    }

    /// Add a plugin, keeping `Pre -> Normal -> Post` order.
    ///
    /// The sort is stable, so insertion order holds within each level.
    pub fn add(&mut self, plugin: Box<dyn Plugin>) {
        let needs_sort = plugin.enforce() != PluginEnforce::Normal;
        self.plugins.push(plugin);
        if needs_sort {
            self.plugins.sort_by_key(|p| p.enforce());
        }
    }

    /// Plugin names in execution order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|p| p.name())
    }

    /// Call `build_start` on all plugins. The first failure stops the build.
    pub fn build_start(&self) -> HookResult<()> {
        for plugin in &self.plugins {
            plugin.build_start(&self.ctx)?;
        }
        Ok(())
    }

    /// Transform code through all plugins.
    ///
    /// Each plugin's output is passed to the next. Returns `None` when no
    /// plugin changed the module.
    pub fn transform(&self, code: &str, id: &str) -> HookResult<Option<TransformResult>> {
        let mut current: Option<TransformResult> = None;
        for plugin in &self.plugins {
            let input = current.as_ref().map_or(code, |r| r.code.as_str());
            if let Some(result) = plugin.transform(input, id, &self.ctx)? {
                current = Some(result);
            }
        }
        Ok(current)
    }

    /// Call `build_end` on all plugins.
    pub fn build_end(&self) -> HookResult<()> {
        for plugin in &self.plugins {
            plugin.build_end(&self.ctx)?;
        }
        Ok(())
    }
}

/// Include/exclude filter over module ids.
///
/// An id passes when it matches at least one include pattern and no exclude
/// pattern. Query strings (`?vue&type=script`) are part of the id.
#[derive(Debug, Clone)]
pub struct FileFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl FileFilter {
    /// Compile the given patterns.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, regex_lite::Error> {
        let compile = |patterns: &[String]| {
            patterns
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    pub fn from_config(config: &TransformConfig) -> Result<Self, regex_lite::Error> {
        Self::new(&config.include, &config.exclude)
    }

    #[must_use]
    pub fn matches(&self, id: &str) -> bool {
        let normalized = id.replace('\\', "/");
        self.include.iter().any(|re| re.is_match(&normalized))
            && !self.exclude.iter().any(|re| re.is_match(&normalized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Append {
        name: &'static str,
        enforce: PluginEnforce,
        suffix: Option<&'static str>,
    }

    impl Plugin for Append {
        fn name(&self) -> &str {
            self.name
        }

        fn enforce(&self) -> PluginEnforce {
            self.enforce
        }

        fn transform(
            &self,
            code: &str,
            _id: &str,
            _ctx: &PluginContext,
        ) -> HookResult<Option<TransformResult>> {
            Ok(self
                .suffix
                .map(|suffix| TransformResult::code(format!("{code}{suffix}"))))
        }
    }

    fn append(name: &'static str, enforce: PluginEnforce, suffix: Option<&'static str>) -> Box<dyn Plugin> {
        Box::new(Append {
            name,
            enforce,
            suffix,
        })
    }

    #[test]
    fn test_enforce_order_is_stable() {
        let mut container = PluginContainer::new(PathBuf::from("/p"));
        container.add(append("normal-a", PluginEnforce::Normal, None));
        container.add(append("post", PluginEnforce::Post, None));
        container.add(append("pre", PluginEnforce::Pre, None));
        container.add(append("normal-b", PluginEnforce::Normal, None));

        let names: Vec<_> = container.names().collect();
        assert_eq!(names, vec!["pre", "normal-a", "normal-b", "post"]);
    }

    #[test]
    fn test_transform_chains_results() {
        let mut container = PluginContainer::new(PathBuf::from("/p"));
        container.add(append("b", PluginEnforce::Normal, Some("b")));
        container.add(append("skip", PluginEnforce::Normal, None));
        container.add(append("a", PluginEnforce::Pre, Some("a")));

        let result = container.transform("x", "/p/main.ts").unwrap().unwrap();
        assert_eq!(result.code, "xab");
    }

    #[test]
    fn test_transform_without_changes_is_none() {
        let mut container = PluginContainer::new(PathBuf::from("/p"));
        container.add(append("skip", PluginEnforce::Normal, None));
        assert!(container.transform("x", "/p/main.ts").unwrap().is_none());
    }

    struct Counting(Arc<AtomicUsize>);

    impl Plugin for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn build_start(&self, ctx: &PluginContext) -> HookResult<()> {
            assert_eq!(ctx.cwd, PathBuf::from("/p"));
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    impl Plugin for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn build_start(&self, _ctx: &PluginContext) -> HookResult<()> {
            Err(PluginError::new("failing", "build_start", "boom"))
        }
    }

    #[test]
    fn test_build_start_stops_at_first_failure() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut container = PluginContainer::new(PathBuf::from("/p"));
        container.add(Box::new(Counting(Arc::clone(&count))));
        container.add(Box::new(Failing));
        container.add(Box::new(Counting(Arc::clone(&count))));

        let err = container.build_start().unwrap_err();
        assert_eq!(err.to_string(), "[failing] build_start: boom");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    struct Ending(Arc<AtomicUsize>);

    impl Plugin for Ending {
        fn name(&self) -> &str {
            "ending"
        }

        fn build_end(&self, ctx: &PluginContext) -> HookResult<()> {
            assert_eq!(ctx.cwd, PathBuf::from("/p"));
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_build_end_reaches_every_plugin() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut container = PluginContainer::new(PathBuf::from("/p"));
        container.add(Box::new(Ending(Arc::clone(&count))));
        container.add(append("skip", PluginEnforce::Post, None));
        container.add(Box::new(Ending(Arc::clone(&count))));

        container.build_end().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_default_filter() {
        let filter = FileFilter::from_config(&TransformConfig::default()).unwrap();
        assert!(filter.matches("/p/app/main.ts"));
        assert!(filter.matches("/p/components/List.tsx"));
        assert!(filter.matches("/p/lib/util.mjs"));
        assert!(filter.matches("/p/App.vue"));
        assert!(filter.matches("/p/App.vue?vue&type=script&lang=ts"));
        assert!(filter.matches("/p/Card.svelte"));
        assert!(!filter.matches("/p/styles/main.css"));
        assert!(!filter.matches("/p/node_modules/vue/index.js"));
        assert!(!filter.matches(r"C:\p\node_modules\vue\index.js"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(FileFilter::new(&["(".to_string()], &[]).is_err());
    }
}
