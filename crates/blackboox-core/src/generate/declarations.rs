//! Ambient type declarations for auto-imported symbols.

use crate::registry::{ImportEntry, Registry};
use crate::version::GENERATED_HEADER;
use blackboox_util::fs::{relative_path, to_slash};
use std::fmt::Write;
use std::path::Path;

/// Module specifier of `entry` as seen from a file in `from_dir`.
///
/// Always relative (`./x` or `../x`) and without the script extension.
#[must_use]
pub fn relative_specifier(from_dir: &Path, entry: &ImportEntry) -> String {
    let target = entry.source.with_extension("");
    let rel = to_slash(&relative_path(from_dir, &target));
    if rel.starts_with("../") || rel == ".." {
        rel
    } else {
        format!("./{rel}")
    }
}

/// `typeof import('../x')['name']` for an entry.
pub(crate) fn type_of_import(from_dir: &Path, entry: &ImportEntry) -> String {
    let export = if entry.is_default_export {
        "default"
    } else {
        entry.name.as_str()
    };
    format!(
        "typeof import('{}')['{export}']",
        relative_specifier(from_dir, entry)
    )
}

/// Global declarations for every entry of `registry` whose name is not
/// claimed by `skip`, for a declaration file living in `declaration_dir`.
#[must_use]
pub fn render_declarations(registry: &Registry, skip: &Registry, declaration_dir: &Path) -> String {
    let mut out = String::new();
    out.push_str(GENERATED_HEADER);
    out.push_str("\nexport {}\ndeclare global {\n");
    for entry in registry.all() {
        if skip.resolve(&entry.name).is_some() {
            continue;
        }
        let _ = writeln!(
            out,
            "  const {}: {}",
            entry.name,
            type_of_import(declaration_dir, entry)
        );
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ImportEntry;
    use std::path::PathBuf;

    fn entry(name: &str, source: &str) -> ImportEntry {
        let mut entry = ImportEntry::named(name, source.trim_end_matches(".ts"));
        entry.source = PathBuf::from(source);
        entry
    }

    #[test]
    fn test_relative_specifier() {
        let e = entry("useFoo", "/p/composables/foo.ts");
        assert_eq!(
            relative_specifier(Path::new("/p/.blackboox"), &e),
            "../composables/foo"
        );
        let local = entry("defineService", "/p/.blackboox/dev/electron/index.ts");
        assert_eq!(
            relative_specifier(Path::new("/p/.blackboox/types"), &local),
            "../dev/electron/index"
        );
        assert_eq!(
            relative_specifier(Path::new("/p/.blackboox"), &local),
            "./dev/electron/index"
        );
    }

    #[test]
    fn test_render_declarations() {
        let registry = Registry::from_entries([
            entry("useFoo", "/p/composables/foo.ts"),
            entry("files", "/p/services/files.ts").as_default(),
        ]);
        let skip = Registry::from_entries([entry("files", "/p/services/files.ts")]);

        let out = render_declarations(&registry, &skip, Path::new("/p/.blackboox"));
        assert_eq!(
            out,
            "// Generated by blackboox\nexport {}\ndeclare global {\n  const useFoo: typeof import('../composables/foo')['useFoo']\n}\n"
        );
    }

    #[test]
    fn test_empty_registry_is_still_a_module() {
        let out = render_declarations(&Registry::new(), &Registry::new(), Path::new("/p"));
        assert!(out.contains("export {}"));
        assert!(out.ends_with("declare global {\n}\n"));
    }
}
