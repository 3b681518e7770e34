//! Built-in plugins.

pub mod auto_import;

pub use auto_import::AutoImportPlugin;
