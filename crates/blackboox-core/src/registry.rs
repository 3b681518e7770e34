//! Symbol registry: exported name -> defining module.
//!
//! A registry lives for one logical build and is rebuilt from a full scan on
//! every build-start. There is no removal; a file deleted during a watch
//! session simply does not appear in the next scan.

use crate::lifecycle::PipelineKind;
use blackboox_util::hash::Fingerprint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Statically derived form of an exported value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExportShape {
    /// An object literal. Its members are the callable methods.
    Object { methods: Option<Vec<String>> },
    /// A zero-argument factory (`() => ({ ... })`, `defineService({ ... })`).
    Factory { methods: Option<Vec<String>> },
    /// Anything the scanner could not classify.
    Opaque,
}

impl ExportShape {
    /// Statically known member names, if the member set could be determined.
    #[must_use]
    pub fn methods(&self) -> Option<&[String]> {
        match self {
            Self::Object { methods } | Self::Factory { methods } => methods.as_deref(),
            Self::Opaque => None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Object { .. } => "object",
            Self::Factory { .. } => "factory",
            Self::Opaque => "opaque",
        }
    }
}

/// One importable symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportEntry {
    /// Name the symbol is imported under. Unique within a registry.
    pub name: String,
    /// Absolute module specifier (forward slashes, script extension dropped).
    pub module_specifier: String,
    pub is_default_export: bool,
    pub is_async: bool,
    /// File the entry was scanned from.
    pub source: PathBuf,
    pub shape: ExportShape,
}

impl ImportEntry {
    /// A named export with an unknown shape.
    #[must_use]
    pub fn named(name: impl Into<String>, module_specifier: impl Into<String>) -> Self {
        let module_specifier = module_specifier.into();
        Self {
            name: name.into(),
            source: PathBuf::from(&module_specifier),
            module_specifier,
            is_default_export: false,
            is_async: false,
            shape: ExportShape::Opaque,
        }
    }

    #[must_use]
    pub fn as_default(mut self) -> Self {
        self.is_default_export = true;
        self
    }

    #[must_use]
    pub fn with_shape(mut self, shape: ExportShape) -> Self {
        self.shape = shape;
        self
    }
}

/// Two scanned entries claimed the same name; the later one won.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NameCollision {
    pub name: String,
    /// Module specifier of the shadowed entry.
    pub previous: String,
    /// Module specifier of the entry now registered.
    pub replacement: String,
}

/// Ordered map from symbol name to [`ImportEntry`].
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<ImportEntry>,
    index: HashMap<String, usize>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from scanned entries, discarding collisions.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = ImportEntry>) -> Self {
        let mut registry = Self::new();
        registry.register(entries);
        registry
    }

    /// Merge entries by name. Last write wins.
    ///
    /// An overwritten entry keeps its original position so the order of
    /// [`Registry::all`] only depends on when a name was first seen.
    /// Returns the collisions between different modules.
    pub fn register(&mut self, entries: impl IntoIterator<Item = ImportEntry>) -> Vec<NameCollision> {
        let mut collisions = Vec::new();
        for entry in entries {
            match self.index.get(&entry.name) {
                Some(&slot) => {
                    let previous = &self.entries[slot];
                    if previous.module_specifier != entry.module_specifier {
                        collisions.push(NameCollision {
                            name: entry.name.clone(),
                            previous: previous.module_specifier.clone(),
                            replacement: entry.module_specifier.clone(),
                        });
                    }
                    self.entries[slot] = entry;
                }
                None => {
                    self.index.insert(entry.name.clone(), self.entries.len());
                    self.entries.push(entry);
                }
            }
        }
        collisions
    }

    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&ImportEntry> {
        self.index.get(name).map(|&slot| &self.entries[slot])
    }

    /// Every entry, in scan order.
    #[must_use]
    pub fn all(&self) -> &[ImportEntry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Digest of the ordered entries. Equal fingerprints produce equal generated output.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut fp = Fingerprint::new();
        for entry in &self.entries {
            fp.field(&entry.name)
                .field(&entry.module_specifier)
                .field(if entry.is_default_export { "default" } else { "named" })
                .field(if entry.is_async { "async" } else { "sync" })
                .field(entry.shape.kind());
            if let Some(methods) = entry.shape.methods() {
                for method in methods {
                    fp.field(method);
                }
            }
            fp.field("");
        }
        fp.finish()
    }
}

/// Immutable registries of one logical build, shared by both pipelines.
#[derive(Debug, Default)]
pub struct BuildSnapshot {
    /// Logical build this snapshot belongs to.
    pub generation: u64,
    /// Entries scanned from the services directory.
    pub services: Registry,
    /// Symbols auto-imported into host code.
    pub host: Registry,
    /// Symbols auto-imported into UI code.
    pub client: Registry,
}

impl BuildSnapshot {
    /// The auto-import registry a pipeline's transform hook reads.
    #[must_use]
    pub fn registry(&self, kind: PipelineKind) -> &Registry {
        match kind {
            PipelineKind::Client => &self.client,
            PipelineKind::Host => &self.host,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, module: &str) -> ImportEntry {
        ImportEntry::named(name, module)
    }

    #[test]
    fn test_resolve_missing() {
        let registry = Registry::new();
        assert!(registry.resolve("auth").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_last_write_wins_over_any_sequence() {
        let sequences: Vec<Vec<Vec<(&str, &str)>>> = vec![
            vec![vec![("a", "/x"), ("a", "/y")]],
            vec![vec![("a", "/x")], vec![("b", "/z")], vec![("a", "/y")]],
            vec![vec![("a", "/x"), ("b", "/y")], vec![("b", "/x"), ("a", "/z")]],
            vec![vec![], vec![("a", "/x")], vec![("a", "/x")]],
        ];

        for calls in sequences {
            let mut registry = Registry::new();
            let mut expected: HashMap<&str, &str> = HashMap::new();
            for call in &calls {
                registry.register(call.iter().map(|(n, m)| entry(n, m)));
                for (n, m) in call {
                    expected.insert(*n, *m);
                }
            }
            for (name, module) in expected {
                assert_eq!(
                    registry.resolve(name).unwrap().module_specifier,
                    module,
                    "sequence {calls:?}"
                );
            }
        }
    }

    #[test]
    fn test_overwrite_keeps_first_position() {
        let mut registry = Registry::new();
        registry.register([entry("auth", "/a"), entry("files", "/f")]);
        let collisions = registry.register([entry("auth", "/b")]);

        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["auth", "files"]);
        assert_eq!(registry.resolve("auth").unwrap().module_specifier, "/b");
        assert_eq!(
            collisions,
            vec![NameCollision {
                name: "auth".to_string(),
                previous: "/a".to_string(),
                replacement: "/b".to_string(),
            }]
        );
    }

    #[test]
    fn test_reregistering_same_module_is_not_a_collision() {
        let mut registry = Registry::new();
        registry.register([entry("auth", "/a")]);
        assert!(registry.register([entry("auth", "/a")]).is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_fingerprint_tracks_contents_and_order() {
        let a = Registry::from_entries([entry("auth", "/a"), entry("files", "/f")]);
        let b = Registry::from_entries([entry("auth", "/a"), entry("files", "/f")]);
        let reordered = Registry::from_entries([entry("files", "/f"), entry("auth", "/a")]);
        let reshaped = Registry::from_entries([
            entry("auth", "/a").with_shape(ExportShape::Object {
                methods: Some(vec!["login".to_string()]),
            }),
            entry("files", "/f"),
        ]);

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), reordered.fingerprint());
        assert_ne!(a.fingerprint(), reshaped.fingerprint());
    }

    #[test]
    fn test_shape_methods() {
        let factory = ExportShape::Factory {
            methods: Some(vec!["read".to_string()]),
        };
        assert_eq!(factory.methods(), Some(&["read".to_string()][..]));
        assert_eq!(ExportShape::Opaque.methods(), None);
    }
}
