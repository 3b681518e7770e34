//! Auto-import injection.
//!
//! Free identifiers of a module that resolve in a [`Registry`] get an import
//! statement; the module is then re-emitted whole. Modules with nothing to
//! import come back with `changed == false` and their original text.

use crate::error::TransformError;
use crate::registry::{ImportEntry, Registry};
use crate::syntax::{ParsedModule, SourceKind};
use std::fmt::Write;
use std::path::Path;

/// Result of running the transform on one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutcome {
    /// `false` means `code` is the input, untouched.
    pub changed: bool,
    pub code: String,
    pub map: Option<String>,
    /// Names that received an import, in order of first use.
    pub imported: Vec<String>,
}

impl TransformOutcome {
    fn unchanged(code: &str) -> Self {
        Self {
            changed: false,
            code: code.to_string(),
            map: None,
            imported: Vec::new(),
        }
    }
}

/// Inject imports for every free identifier of `code` known to `registry`.
///
/// Identifiers the registry does not know are left alone. Ids that are not
/// plain script modules (`.vue`, `.svelte`, ...) pass through unchanged.
/// Safe to call concurrently for different modules against a shared registry.
pub fn inject_imports(
    code: &str,
    id: &str,
    registry: &Registry,
) -> Result<TransformOutcome, TransformError> {
    if SourceKind::from_id(id).is_none() || registry.is_empty() {
        return Ok(TransformOutcome::unchanged(code));
    }
    // Cheap pre-check before paying for a parse
    if !registry.names().any(|name| code.contains(name)) {
        return Ok(TransformOutcome::unchanged(code));
    }

    let mut parsed = ParsedModule::parse(code, id).map_err(|failure| TransformError::Parse {
        id: id.to_string(),
        line: failure.line,
        message: failure.message,
    })?;

    let file = Path::new(id.split('?').next().unwrap_or(id));
    let matched: Vec<&ImportEntry> = parsed
        .free_identifiers()
        .iter()
        .filter_map(|name| registry.resolve(name))
        .filter(|entry| entry.source != file)
        .collect();

    if matched.is_empty() {
        return Ok(TransformOutcome::unchanged(code));
    }

    parsed
        .insert_imports(&render_imports(&matched))
        .map_err(|failure| TransformError::Emit {
            id: id.to_string(),
            message: failure.message,
        })?;
    let emitted = parsed.emit().map_err(|message| TransformError::Emit {
        id: id.to_string(),
        message,
    })?;

    Ok(TransformOutcome {
        changed: true,
        code: emitted.code,
        map: emitted.map,
        imported: matched.iter().map(|e| e.name.clone()).collect(),
    })
}

/// One import declaration per module, default binding first:
/// `import files, { read } from "/app/services/files";`
fn render_imports(entries: &[&ImportEntry]) -> String {
    let mut modules: Vec<(&str, Vec<&str>, Vec<&str>)> = Vec::new();
    for entry in entries {
        let slot = match modules
            .iter()
            .position(|(spec, _, _)| *spec == entry.module_specifier)
        {
            Some(slot) => slot,
            None => {
                modules.push((entry.module_specifier.as_str(), Vec::new(), Vec::new()));
                modules.len() - 1
            }
        };
        if entry.is_default_export {
            modules[slot].1.push(entry.name.as_str());
        } else {
            modules[slot].2.push(entry.name.as_str());
        }
    }

    let mut out = String::new();
    for (spec, defaults, named) in modules {
        let from = serde_json::to_string(spec).unwrap_or_else(|_| format!("\"{spec}\""));
        let mut defaults = defaults.into_iter();
        let first_default = defaults.next();

        match (first_default, named.is_empty()) {
            (Some(default), true) => {
                let _ = writeln!(out, "import {default} from {from};");
            }
            (Some(default), false) => {
                let _ = writeln!(out, "import {default}, {{ {} }} from {from};", named.join(", "));
            }
            (None, false) => {
                let _ = writeln!(out, "import {{ {} }} from {from};", named.join(", "));
            }
            (None, true) => {}
        }
        // A module has one default export; extra names come from overrides
        for default in defaults {
            let _ = writeln!(out, "import {default} from {from};");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ImportEntry;

    fn registry() -> Registry {
        Registry::from_entries([
            ImportEntry::named("useFoo", "/p/composables/foo"),
            ImportEntry::named("useBar", "/p/composables/foo"),
            ImportEntry::named("files", "/p/services/files").as_default(),
            ImportEntry::named("read", "/p/services/files"),
        ])
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn test_import_injected_once_for_repeated_use() {
        let code = "const a = useFoo();\nconst b = useFoo(a);\nexport default () => useFoo(b);\n";
        let out = inject_imports(code, "/p/pages/index.ts", &registry()).unwrap();

        assert!(out.changed);
        assert_eq!(out.imported, vec!["useFoo"]);
        assert_eq!(count(&out.code, "/p/composables/foo"), 1);
        assert_eq!(count(&out.code, "import"), 1);
        assert_eq!(count(&out.code, "useFoo("), 3);
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let inputs = [
            "useFoo(); useBar();\n",
            "export const x = files.read(read('a'));\n",
            "console.log(window.location);\n",
            "import { useFoo } from 'elsewhere';\nuseFoo();\n",
            "",
        ];
        for input in inputs {
            let first = inject_imports(input, "/p/a.ts", &registry()).unwrap();
            let second = inject_imports(&first.code, "/p/a.ts", &registry()).unwrap();
            assert!(!second.changed, "not idempotent for {input:?}: {}", first.code);
            assert_eq!(second.code, first.code);
        }
    }

    #[test]
    fn test_unknown_identifiers_pass_through() {
        let code = "useFoo;\nundefinedThing();\n";
        let out = inject_imports(code, "/p/a.js", &registry()).unwrap();
        assert_eq!(out.imported, vec!["useFoo"]);
        assert!(out.code.contains("undefinedThing()"));
    }

    #[test]
    fn test_no_match_returns_input_verbatim() {
        let code = "const   useFoo = 1;   // local\nconsole.log(useFoo)\n";
        let out = inject_imports(code, "/p/a.ts", &registry()).unwrap();
        assert!(!out.changed);
        assert_eq!(out.code, code);
        assert!(out.map.is_none());
    }

    #[test]
    fn test_default_and_named_share_one_declaration() {
        let code = "files().read(read);\n";
        let out = inject_imports(code, "/p/a.ts", &registry()).unwrap();
        assert_eq!(out.imported, vec!["files", "read"]);
        assert_eq!(count(&out.code, "/p/services/files"), 1);
        assert!(out.code.contains("import files, {"));
    }

    #[test]
    fn test_non_script_ids_are_skipped() {
        let code = "useFoo()";
        for id in ["/p/App.vue", "/p/App.vue?vue&type=style", "/p/Page.svelte"] {
            assert!(!inject_imports(code, id, &registry()).unwrap().changed);
        }
    }

    #[test]
    fn test_module_never_imports_itself() {
        let mut entry = ImportEntry::named("useFoo", "/p/composables/foo");
        entry.source = "/p/composables/foo.ts".into();
        let registry = Registry::from_entries([entry]);
        let out = inject_imports("export const x = () => useFoo;\n", "/p/composables/foo.ts", &registry)
            .unwrap();
        assert!(!out.changed);
    }

    #[test]
    fn test_parse_error() {
        let err = inject_imports("useFoo(\n\n)))", "/p/a.ts", &registry()).unwrap_err();
        assert!(matches!(err, TransformError::Parse { .. }));
    }

    #[test]
    fn test_render_imports() {
        let default = ImportEntry::named("files", "/p/files").as_default();
        let named = ImportEntry::named("read", "/p/files");
        let other = ImportEntry::named("useFoo", "/p/foo");
        let out = render_imports(&[&other, &default, &named]);
        assert_eq!(
            out,
            "import { useFoo } from \"/p/foo\";\nimport files, { read } from \"/p/files\";\n"
        );
    }
}
