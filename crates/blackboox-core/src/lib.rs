#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod generate;
pub mod lifecycle;
pub mod plugin;
pub mod plugins;
pub mod registry;
pub mod scan;
pub mod syntax;
pub mod transform;
pub mod version;

pub use config::{Config, ProjectConfig, ProjectPaths};
pub use dispatch::{
    Dispatcher, DispatcherBuilder, RemoteError, ServiceChannel, ServiceClient, ServiceHandle,
    ServiceObject, ServiceSource,
};
pub use error::{DispatchError, Error, GenerationWriteError, ScanError, TransformError};
pub use lifecycle::{BuildCoordinator, BuildReport, PipelineKind, PipelineState};
pub use plugin::{FileFilter, Plugin, PluginContainer, PluginError};
pub use plugins::AutoImportPlugin;
pub use registry::{BuildSnapshot, ExportShape, ImportEntry, NameCollision, Registry};
pub use scan::{scan, DirectorySource};
pub use transform::{inject_imports, TransformOutcome};
pub use version::VERSION;
