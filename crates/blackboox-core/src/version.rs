use std::fmt::Write;

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// First line of every generated script or declaration file.
pub const GENERATED_HEADER: &str = "// Generated by blackboox";

/// Returns a formatted version string including build metadata if available.
#[must_use]
pub fn version_string() -> String {
    let mut s = format!("blackboox {VERSION}");

    if let Some(hash) = option_env!("BLACKBOOX_BUILD_GIT_HASH") {
        let _ = write!(s, " ({hash})");
    }

    s
}
