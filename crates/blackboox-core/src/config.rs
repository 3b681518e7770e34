//! Runtime and project configuration.
//!
//! The project config lives in `blackboox.config.json` at the project root:
//!
//! ```json
//! {
//!   "srcDir": ".",
//!   "buildDir": ".blackboox",
//!   "services": "app/services",
//!   "client": { "dirs": ["composables"] },
//!   "electron": { "external": ["better-sqlite3"] }
//! }
//! ```
//!
//! Every key is optional.

use crate::error::Error;
use crate::scan::DirectorySource;
use blackboox_util::fs::normalize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file name looked up in the project root.
pub const CONFIG_FILE: &str = "blackboox.config.json";

/// Runtime configuration for the blackboox CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}

/// Project configuration loaded from [`CONFIG_FILE`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectConfig {
    /// Project root, relative to the working directory.
    pub root_dir: PathBuf,
    /// Source directory, relative to the root.
    pub src_dir: PathBuf,
    /// Directory receiving every generated file, relative to the root.
    pub build_dir: PathBuf,
    /// Directory whose exports become remotely callable services, relative to `src_dir`.
    pub services: DirectorySource,
    pub electron: ElectronConfig,
    pub client: ClientConfig,
    pub transform: TransformConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            src_dir: PathBuf::from("."),
            build_dir: PathBuf::from(".blackboox"),
            services: DirectorySource::new("app/services"),
            electron: ElectronConfig::default(),
            client: ClientConfig::default(),
            transform: TransformConfig::default(),
        }
    }
}

/// Host-process settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElectronConfig {
    /// Packages kept out of the host bundle; they are copied into the
    /// generated package manifest instead.
    pub external: Vec<String>,
    /// Extra directories auto-imported into host code, relative to `src_dir`.
    pub dirs: Vec<DirectorySource>,
}

/// UI-process settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// Extra directories auto-imported into UI code, relative to `src_dir`.
    pub dirs: Vec<DirectorySource>,
}

/// File filter for the transform hook, as regular expressions over module ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            include: vec![
                r"\.[jt]sx?$".to_string(),
                r"\.m[jt]s$".to_string(),
                r"\.c[jt]s$".to_string(),
                r"\.vue$".to_string(),
                r"\.vue\?vue".to_string(),
                r"\.svelte$".to_string(),
            ],
            exclude: vec![
                r"[\\/]node_modules[\\/]".to_string(),
                r"[\\/]\.git[\\/]".to_string(),
            ],
        }
    }
}

impl ProjectConfig {
    /// Load `blackboox.config.json` from `root`, falling back to defaults when absent.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load a specific config file.
    pub fn load_from(path: &Path) -> Result<Self, Error> {
        let source = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&source).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve the configured directories against the working directory.
    #[must_use]
    pub fn resolve(&self, cwd: &Path) -> ProjectPaths {
        let root = normalize(&cwd.join(&self.root_dir));
        let src = normalize(&root.join(&self.src_dir));
        let build = normalize(&root.join(&self.build_dir));
        ProjectPaths { root, src, build }
    }
}

/// Absolute project directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub src: PathBuf,
    pub build: PathBuf,
}

impl ProjectPaths {
    /// Directory holding the generated host-side modules (`dev/electron`).
    #[must_use]
    pub fn host_entry_dir(&self) -> PathBuf {
        self.build.join("dev").join("electron")
    }

    /// Directory holding the generated UI-side modules (`dev/client`).
    #[must_use]
    pub fn client_entry_dir(&self) -> PathBuf {
        self.build.join("dev").join("client")
    }

    /// Anchor a configured directory source at the source directory.
    #[must_use]
    pub fn in_src(&self, source: &DirectorySource) -> DirectorySource {
        source.anchored(&self.src)
    }
}
