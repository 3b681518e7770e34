//! Directory export scanner.
//!
//! Discovers the exported symbols of every script module in a set of
//! directories from static export declarations alone. Modules are never
//! executed: host-side service modules may have side effects.
//!
//! ## Naming
//! - Named exports keep their exported name.
//! - A default export is named after its file: the camelCased stem, or the
//!   parent directory for `index` files. [`DirectorySource::names`] overrides it.
//! - `export * from "./x"` pulls in the named exports of `./x` (never its default).

use crate::error::ScanError;
use crate::registry::{ExportShape, ImportEntry};
use crate::syntax::ParsedModule;
use blackboox_util::fs::{read_to_string_lossy, to_slash};
use glob::{MatchOptions, Pattern};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use swc_ecma_ast::{
    BlockStmtOrExpr, Callee, Decl, DefaultDecl, Expr, Function, ModuleDecl, ModuleExportName,
    ModuleItem, ObjectLit, ObjectPatProp, Pat, Prop, PropName, PropOrSpread, Stmt,
};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Extensions of the modules the scanner reads.
pub const SCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

/// Directories never descended into.
const IGNORED_DIRS: &[&str] = &["node_modules", ".git"];

/// A directory to scan plus its file filter.
///
/// Deserializes from either a bare path string or a full object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DirectorySourceRepr")]
pub struct DirectorySource {
    pub path: PathBuf,
    /// Globs over paths relative to `path`. Empty means the top-level
    /// script files plus `*/index.*`.
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// Default-export names keyed by relative module path without extension
    /// (`files`, `billing/index` or `billing`).
    pub names: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DirectorySourceRepr {
    Path(PathBuf),
    Full {
        path: PathBuf,
        #[serde(default)]
        include: Vec<String>,
        #[serde(default)]
        exclude: Vec<String>,
        #[serde(default)]
        names: BTreeMap<String, String>,
    },
}

impl From<DirectorySourceRepr> for DirectorySource {
    fn from(repr: DirectorySourceRepr) -> Self {
        match repr {
            DirectorySourceRepr::Path(path) => Self::new(path),
            DirectorySourceRepr::Full {
                path,
                include,
                exclude,
                names,
            } => Self {
                path,
                include,
                exclude,
                names,
            },
        }
    }
}

impl DirectorySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            include: Vec::new(),
            exclude: Vec::new(),
            names: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_include(mut self, pattern: impl Into<String>) -> Self {
        self.include.push(pattern.into());
        self
    }

    #[must_use]
    pub fn with_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude.push(pattern.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, module: impl Into<String>, name: impl Into<String>) -> Self {
        self.names.insert(module.into(), name.into());
        self
    }

    /// Resolve a relative `path` against `base`.
    #[must_use]
    pub fn anchored(&self, base: &Path) -> Self {
        Self {
            path: base.join(&self.path),
            ..self.clone()
        }
    }

    fn filter(&self) -> Result<FileFilter, ScanError> {
        let include = if self.include.is_empty() {
            SCRIPT_EXTENSIONS
                .iter()
                .flat_map(|ext| [format!("*.{ext}"), format!("*/index.{ext}")])
                .collect()
        } else {
            self.include.clone()
        };
        Ok(FileFilter {
            include: compile(&include)?,
            exclude: compile(&self.exclude)?,
        })
    }
}

struct FileFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl FileFilter {
    const OPTIONS: MatchOptions = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    fn matches(&self, rel: &str) -> bool {
        self.include.iter().any(|p| p.matches_with(rel, Self::OPTIONS))
            && !self.exclude.iter().any(|p| p.matches_with(rel, Self::OPTIONS))
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>, ScanError> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|e| ScanError::Pattern {
                pattern: p.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

/// Scan every directory and return the discovered entries.
///
/// Order is deterministic: directories in the given order, files sorted by
/// path, exports in declaration order. A missing directory contributes
/// nothing; an unreadable one or an unparsable file aborts the scan.
pub fn scan(directories: &[DirectorySource]) -> Result<Vec<ImportEntry>, ScanError> {
    let mut entries = Vec::new();
    for source in directories {
        let files = list_files(source)?;
        debug!(dir = %source.path.display(), files = files.len(), "scanning directory");

        let scanned: Vec<Result<Vec<ImportEntry>, ScanError>> = files
            .par_iter()
            .map(|(path, rel)| scan_file(source, path, rel))
            .collect();
        for result in scanned {
            entries.extend(result?);
        }
    }
    Ok(entries)
}

/// Files of `source` passing its filter, as (absolute, relative) pairs sorted by path.
fn list_files(source: &DirectorySource) -> Result<Vec<(PathBuf, String)>, ScanError> {
    let root = &source.path;
    match std::fs::metadata(root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(ScanError::DirectoryUnreadable {
                path: root.clone(),
                source: io::Error::other("not a directory"),
            })
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(dir = %root.display(), "directory does not exist, nothing to scan");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(ScanError::DirectoryUnreadable {
                path: root.clone(),
                source,
            })
        }
    }

    let filter = source.filter()?;
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !(e.file_type().is_dir()
                    && IGNORED_DIRS.iter().any(|d| e.file_name() == *d))
        })
    {
        let entry = entry.map_err(|e| ScanError::DirectoryUnreadable {
            path: e.path().map_or_else(|| root.clone(), Path::to_path_buf),
            source: e
                .into_io_error()
                .unwrap_or_else(|| io::Error::other("filesystem loop")),
        })?;

        if !entry.file_type().is_file() || !is_script_module(entry.path()) {
            continue;
        }

        let rel = to_slash(entry.path().strip_prefix(root).unwrap_or(entry.path()));
        if filter.matches(&rel) {
            files.push((entry.path().to_path_buf(), rel));
        }
    }

    files.sort();
    Ok(files)
}

fn is_script_module(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if [".d.ts", ".d.mts", ".d.cts"].iter().any(|s| name.ends_with(s)) {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SCRIPT_EXTENSIONS.contains(&e))
}

fn scan_file(source: &DirectorySource, path: &Path, rel: &str) -> Result<Vec<ImportEntry>, ScanError> {
    let mut visited = HashSet::new();
    let exports = module_exports(path, &mut visited)?;
    Ok(entries_for(source, path, rel, exports))
}

/// Entries of a module that is not on disk yet, named as if it lived in `source`.
///
/// Relative `export *` targets are still read from disk.
pub fn scan_module(source: &DirectorySource, path: &Path, code: &str) -> Result<Vec<ImportEntry>, ScanError> {
    let mut visited = HashSet::from([path.to_path_buf()]);
    let exports = exports_of(path, code, &mut visited)?;
    let rel = to_slash(path.strip_prefix(&source.path).unwrap_or(path));
    Ok(entries_for(source, path, &rel, exports))
}

fn entries_for(source: &DirectorySource, path: &Path, rel: &str, exports: Vec<ModuleExport>) -> Vec<ImportEntry> {
    let specifier = module_specifier(path);
    let mut entries = Vec::with_capacity(exports.len());
    for export in exports {
        let name = if export.is_default {
            default_name(source, rel)
        } else {
            export.name
        };
        // Every name ends up as a binding in generated code
        if !is_identifier(&name) {
            warn!(file = %path.display(), name = %name, "skipping export that is not a valid identifier");
            continue;
        }
        entries.push(ImportEntry {
            name,
            module_specifier: specifier.clone(),
            is_default_export: export.is_default,
            is_async: export.is_async,
            source: path.to_path_buf(),
            shape: export.shape,
        });
    }
    entries
}

const RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Whether `name` can be used as a JavaScript binding.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        && !RESERVED_WORDS.contains(&name)
}

/// Absolute, forward-slashed module path with the script extension dropped.
#[must_use]
pub fn module_specifier(path: &Path) -> String {
    to_slash(&path.with_extension(""))
}

/// Name given to the default export of the module at `rel` (relative, slash-separated).
fn default_name(source: &DirectorySource, rel: &str) -> String {
    let stem_path = rel.rsplit_once('.').map_or(rel, |(stem, _)| stem);
    if let Some(name) = source.names.get(stem_path) {
        return name.clone();
    }

    let (dir, stem) = stem_path.rsplit_once('/').unwrap_or(("", stem_path));
    if stem == "index" && !dir.is_empty() {
        if let Some(name) = source.names.get(dir) {
            return name.clone();
        }
        let parent = dir.rsplit('/').next().unwrap_or(dir);
        return camel_case(parent);
    }
    camel_case(stem)
}

/// `user-profile` -> `userProfile`, `Files` -> `files`.
#[must_use]
pub fn camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = false;
    for c in s.chars() {
        if c == '-' || c == '_' || c == '.' || c == ' ' {
            upper_next = !out.is_empty();
        } else if out.is_empty() {
            out.extend(c.to_lowercase());
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

struct ModuleExport {
    name: String,
    is_default: bool,
    is_async: bool,
    shape: ExportShape,
}

impl ModuleExport {
    fn named(name: impl Into<String>, (shape, is_async): (ExportShape, bool)) -> Self {
        Self {
            name: name.into(),
            is_default: false,
            is_async,
            shape,
        }
    }

    fn default_export((shape, is_async): (ExportShape, bool)) -> Self {
        Self {
            name: "default".to_string(),
            is_default: true,
            is_async,
            shape,
        }
    }
}

fn module_exports(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<Vec<ModuleExport>, ScanError> {
    if !visited.insert(path.to_path_buf()) {
        return Ok(Vec::new());
    }

    let code = read_to_string_lossy(path).map_err(|source| ScanError::DirectoryUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    exports_of(path, &code, visited)
}

fn exports_of(path: &Path, code: &str, visited: &mut HashSet<PathBuf>) -> Result<Vec<ModuleExport>, ScanError> {
    let parsed =
        ParsedModule::parse(code, &path.to_string_lossy()).map_err(|failure| ScanError::Parse {
            path: path.to_path_buf(),
            line: failure.line,
            message: failure.message,
        })?;
    let body = &parsed.module().body;
    let locals = local_bindings(body);

    let mut exports = Vec::new();
    for item in body {
        let ModuleItem::ModuleDecl(decl) = item else {
            continue;
        };
        match decl {
            ModuleDecl::ExportDecl(export) => match &export.decl {
                Decl::Var(var) => {
                    for declarator in &var.decls {
                        if let Pat::Ident(binding) = &declarator.name {
                            let shape = declarator
                                .init
                                .as_deref()
                                .map_or((ExportShape::Opaque, false), |e| shape_of_expr(e, &locals));
                            exports.push(ModuleExport::named(binding.id.sym.to_string(), shape));
                        } else {
                            // `export const { a, b: [c] } = ...`
                            let mut names = Vec::new();
                            binding_names(&declarator.name, &mut names);
                            exports.extend(
                                names
                                    .into_iter()
                                    .map(|name| ModuleExport::named(name, (ExportShape::Opaque, false))),
                            );
                        }
                    }
                }
                Decl::Fn(f) => {
                    exports.push(ModuleExport::named(
                        f.ident.sym.to_string(),
                        shape_of_function(&f.function),
                    ));
                }
                Decl::Class(c) => {
                    exports.push(ModuleExport::named(
                        c.ident.sym.to_string(),
                        (ExportShape::Opaque, false),
                    ));
                }
                Decl::TsEnum(e) => {
                    exports.push(ModuleExport::named(
                        e.id.sym.to_string(),
                        (ExportShape::Opaque, false),
                    ));
                }
                _ => {}
            },
            ModuleDecl::ExportNamed(named) if !named.type_only => {
                for spec in &named.specifiers {
                    match spec {
                        swc_ecma_ast::ExportSpecifier::Named(s) if !s.is_type_only => {
                            let local = export_name(&s.orig);
                            let exported = s.exported.as_ref().map_or_else(|| local.clone(), export_name);
                            let shape = if named.src.is_none() {
                                locals
                                    .get(&local)
                                    .cloned()
                                    .unwrap_or((ExportShape::Opaque, false))
                            } else {
                                (ExportShape::Opaque, false)
                            };
                            if exported == "default" {
                                exports.push(ModuleExport::default_export(shape));
                            } else {
                                exports.push(ModuleExport::named(exported, shape));
                            }
                        }
                        swc_ecma_ast::ExportSpecifier::Namespace(ns) => {
                            exports.push(ModuleExport::named(
                                export_name(&ns.name),
                                (ExportShape::Opaque, false),
                            ));
                        }
                        swc_ecma_ast::ExportSpecifier::Default(d) => {
                            exports.push(ModuleExport::named(
                                d.exported.sym.to_string(),
                                (ExportShape::Opaque, false),
                            ));
                        }
                        swc_ecma_ast::ExportSpecifier::Named(_) => {}
                    }
                }
            }
            ModuleDecl::ExportDefaultDecl(default) => match &default.decl {
                DefaultDecl::Fn(f) => exports.push(ModuleExport::default_export(shape_of_function(&f.function))),
                DefaultDecl::Class(_) => exports.push(ModuleExport::default_export((ExportShape::Opaque, false))),
                DefaultDecl::TsInterfaceDecl(_) => {}
            },
            ModuleDecl::ExportDefaultExpr(default) => {
                exports.push(ModuleExport::default_export(shape_of_expr(&default.expr, &locals)));
            }
            ModuleDecl::ExportAll(all) if !all.type_only => {
                let specifier = all.src.value.to_string();
                match resolve_relative(path, &specifier) {
                    Some(target) => {
                        let nested = module_exports(&target, visited)?;
                        exports.extend(nested.into_iter().filter(|e| !e.is_default));
                    }
                    None => {
                        debug!(
                            file = %path.display(),
                            specifier = %specifier,
                            "skipping re-export that is not a local module"
                        );
                    }
                }
            }
            _ => {}
        }
    }

    Ok(exports)
}

/// Names bound by a declaration pattern, in source order.
fn binding_names(pat: &Pat, out: &mut Vec<String>) {
    match pat {
        Pat::Ident(binding) => out.push(binding.id.sym.to_string()),
        Pat::Array(array) => {
            for elem in array.elems.iter().flatten() {
                binding_names(elem, out);
            }
        }
        Pat::Object(object) => {
            for prop in &object.props {
                match prop {
                    ObjectPatProp::KeyValue(kv) => binding_names(&kv.value, out),
                    ObjectPatProp::Assign(assign) => out.push(assign.key.sym.to_string()),
                    ObjectPatProp::Rest(rest) => binding_names(&rest.arg, out),
                }
            }
        }
        Pat::Rest(rest) => binding_names(&rest.arg, out),
        Pat::Assign(assign) => binding_names(&assign.left, out),
        _ => {}
    }
}

fn export_name(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::Ident(ident) => ident.sym.to_string(),
        ModuleExportName::Str(s) => s.value.to_string(),
    }
}

/// Resolve `./x` against the importing file, trying script extensions and `index` files.
fn resolve_relative(from: &Path, specifier: &str) -> Option<PathBuf> {
    if !(specifier.starts_with("./") || specifier.starts_with("../")) {
        return None;
    }
    let base = blackboox_util::fs::normalize(&from.parent()?.join(specifier));
    if base.is_file() && is_script_module(&base) {
        return Some(base);
    }
    for ext in SCRIPT_EXTENSIONS {
        let mut candidate = base.clone().into_os_string();
        candidate.push(format!(".{ext}"));
        let candidate = PathBuf::from(candidate);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    for ext in SCRIPT_EXTENSIONS {
        let candidate = base.join(format!("index.{ext}"));
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Top-level `const`/`let`/`var`/`function` bindings, exported or not.
fn local_bindings(body: &[ModuleItem]) -> HashMap<String, (ExportShape, bool)> {
    let empty = HashMap::new();
    let mut locals = HashMap::new();
    for item in body {
        let decl = match item {
            ModuleItem::Stmt(Stmt::Decl(decl)) => decl,
            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => &export.decl,
            _ => continue,
        };
        match decl {
            Decl::Var(var) => {
                for declarator in &var.decls {
                    if let (Pat::Ident(binding), Some(init)) = (&declarator.name, &declarator.init) {
                        locals.insert(binding.id.sym.to_string(), shape_of_expr(init, &empty));
                    }
                }
            }
            Decl::Fn(f) => {
                locals.insert(f.ident.sym.to_string(), shape_of_function(&f.function));
            }
            _ => {}
        }
    }
    locals
}

/// Shape and async flag of an exported expression.
fn shape_of_expr(expr: &Expr, locals: &HashMap<String, (ExportShape, bool)>) -> (ExportShape, bool) {
    match expr {
        Expr::Object(obj) => (
            ExportShape::Object {
                methods: object_members(obj),
            },
            false,
        ),
        Expr::Arrow(arrow) => {
            let returned = match &*arrow.body {
                BlockStmtOrExpr::Expr(e) => Some(&**e),
                BlockStmtOrExpr::BlockStmt(block) => returned_expr(&block.stmts),
            };
            (
                ExportShape::Factory {
                    methods: returned.and_then(returned_members),
                },
                arrow.is_async,
            )
        }
        Expr::Fn(f) => shape_of_function(&f.function),
        Expr::Call(call) => {
            let is_define_service = matches!(
                &call.callee,
                Callee::Expr(callee) if matches!(&**callee, Expr::Ident(i) if &*i.sym == "defineService")
            );
            if is_define_service {
                let methods = call
                    .args
                    .first()
                    .filter(|arg| arg.spread.is_none())
                    .and_then(|arg| returned_members(&arg.expr));
                (ExportShape::Factory { methods }, false)
            } else {
                (ExportShape::Opaque, false)
            }
        }
        Expr::Paren(p) => shape_of_expr(&p.expr, locals),
        Expr::TsAs(e) => shape_of_expr(&e.expr, locals),
        Expr::TsSatisfies(e) => shape_of_expr(&e.expr, locals),
        Expr::TsConstAssertion(e) => shape_of_expr(&e.expr, locals),
        Expr::Ident(ident) => locals
            .get(&*ident.sym)
            .cloned()
            .unwrap_or((ExportShape::Opaque, false)),
        _ => (ExportShape::Opaque, false),
    }
}

fn shape_of_function(function: &Function) -> (ExportShape, bool) {
    let methods = function
        .body
        .as_ref()
        .and_then(|body| returned_expr(&body.stmts))
        .and_then(returned_members);
    (ExportShape::Factory { methods }, function.is_async)
}

fn returned_expr(stmts: &[Stmt]) -> Option<&Expr> {
    stmts.iter().find_map(|stmt| match stmt {
        Stmt::Return(ret) => ret.arg.as_deref(),
        _ => None,
    })
}

/// Members of an object literal, looking through parentheses and type assertions.
fn returned_members(expr: &Expr) -> Option<Vec<String>> {
    match expr {
        Expr::Object(obj) => object_members(obj),
        Expr::Paren(p) => returned_members(&p.expr),
        Expr::TsAs(e) => returned_members(&e.expr),
        Expr::TsSatisfies(e) => returned_members(&e.expr),
        _ => None,
    }
}

/// Statically named members. `None` as soon as a spread or computed key appears.
fn object_members(obj: &ObjectLit) -> Option<Vec<String>> {
    let mut names = Vec::with_capacity(obj.props.len());
    for prop in &obj.props {
        let PropOrSpread::Prop(prop) = prop else {
            return None;
        };
        let key = match &**prop {
            Prop::Shorthand(ident) => ident.sym.to_string(),
            Prop::KeyValue(kv) => prop_name(&kv.key)?,
            Prop::Method(m) => prop_name(&m.key)?,
            Prop::Getter(g) => prop_name(&g.key)?,
            Prop::Setter(s) => prop_name(&s.key)?,
            Prop::Assign(_) => continue,
        };
        if !names.contains(&key) {
            names.push(key);
        }
    }
    Some(names)
}

fn prop_name(key: &PropName) -> Option<String> {
    match key {
        PropName::Ident(ident) => Some(ident.sym.to_string()),
        PropName::Str(s) => Some(s.value.to_string()),
        PropName::Num(n) => Some(n.value.to_string()),
        PropName::Computed(_) | PropName::BigInt(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn names(entries: &[ImportEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("files"), "files");
        assert_eq!(camel_case("user-profile"), "userProfile");
        assert_eq!(camel_case("user_settings.store"), "userSettingsStore");
        assert_eq!(camel_case("Billing"), "billing");
    }

    #[test]
    fn test_named_and_default_round_trip() {
        let dir = tempdir().unwrap();
        write(dir.path(), "foo.ts", "export const foo = () => 1;\n");
        write(dir.path(), "bar.ts", "export default function () { return 2 }\n");

        let entries = scan(&[DirectorySource::new(dir.path())]).unwrap();
        assert_eq!(names(&entries), vec!["bar", "foo"]);

        let bar = &entries[0];
        assert!(bar.is_default_export);
        assert_eq!(bar.module_specifier, module_specifier(&dir.path().join("bar.ts")));
        assert!(!entries[1].is_default_export);
    }

    #[test]
    fn test_destructured_exports() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "stores.ts",
            "export const { useCart, user: useUser, ...rest } = makeStores();\nexport const [useFirst, , [useNested = 1]] = pair();\n",
        );

        let entries = scan(&[DirectorySource::new(dir.path())]).unwrap();
        assert_eq!(
            names(&entries),
            vec!["useCart", "useUser", "rest", "useFirst", "useNested"]
        );
        assert!(entries.iter().all(|e| e.shape == ExportShape::Opaque));
    }

    #[test]
    fn test_names_that_are_not_identifiers_are_skipped() {
        let dir = tempdir().unwrap();
        write(dir.path(), "2fa.ts", "export default { verify() {} }\n");
        write(
            dir.path(),
            "totp.ts",
            "const totp = {};\nconst check = () => 1;\nexport { totp, check as \"check-code\", check as class };\n",
        );

        let entries = scan(&[DirectorySource::new(dir.path())]).unwrap();
        assert_eq!(names(&entries), vec!["totp"]);

        let renamed = DirectorySource::new(dir.path()).with_name("2fa", "twoFactor");
        let entries = scan(&[renamed]).unwrap();
        assert_eq!(names(&entries), vec!["twoFactor", "totp"]);
    }

    #[test]
    fn test_is_identifier() {
        for name in ["auth", "_private", "$store", "useFoo2", "café"] {
            assert!(is_identifier(name), "{name}");
        }
        for name in ["", "2fa", "a-b", "default", "class", "a b"] {
            assert!(!is_identifier(name), "{name}");
        }
    }

    #[test]
    fn test_scan_module_reads_code_from_memory() {
        let dir = tempdir().unwrap();
        write(dir.path(), "gen/shared.ts", "export const shared = 1;\n");
        let source = DirectorySource::new(dir.path().join("gen"));
        let path = dir.path().join("gen/index.ts");

        let entries = scan_module(
            &source,
            &path,
            "export function useService() {}\nexport * from './shared';\n",
        )
        .unwrap();
        assert!(!path.exists());
        assert_eq!(names(&entries), vec!["useService", "shared"]);
        assert_eq!(entries[0].module_specifier, module_specifier(&path));

        let err = scan_module(&source, &path, "export const = 1;\n").unwrap_err();
        assert!(matches!(err, ScanError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_service_shapes() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "auth.ts",
            "export const auth = defineService({\n  async login(user: string, pass: string) { return user === pass },\n})\n",
        );
        write(
            dir.path(),
            "files.ts",
            "export default {\n  read(path: string) { return path },\n}\n",
        );
        write(
            dir.path(),
            "settings.ts",
            "const store = () => ({ get: () => 1, set(v) {} });\nexport { store as settings };\n",
        );
        write(dir.path(), "opaque.ts", "export const opaque = makeIt();\n");

        let entries = scan(&[DirectorySource::new(dir.path())]).unwrap();
        let by_name: HashMap<_, _> = entries.iter().map(|e| (e.name.as_str(), e)).collect();

        assert_eq!(
            by_name["auth"].shape,
            ExportShape::Factory {
                methods: Some(vec!["login".to_string()])
            }
        );
        assert_eq!(
            by_name["files"].shape,
            ExportShape::Object {
                methods: Some(vec!["read".to_string()])
            }
        );
        assert_eq!(
            by_name["settings"].shape.methods(),
            Some(&["get".to_string(), "set".to_string()][..])
        );
        assert_eq!(by_name["opaque"].shape, ExportShape::Opaque);
    }

    #[test]
    fn test_async_flag() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "api.js",
            "export async function load() {}\nexport const save = async () => {};\nexport function sync() {}\n",
        );

        let entries = scan(&[DirectorySource::new(dir.path())]).unwrap();
        let flags: Vec<_> = entries.iter().map(|e| (e.name.as_str(), e.is_async)).collect();
        assert_eq!(flags, vec![("load", true), ("save", true), ("sync", false)]);
    }

    #[test]
    fn test_type_only_exports_are_skipped() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "types.ts",
            "export interface User { id: string }\nexport type Id = string;\nconst x = 1;\nexport type { User as U };\nexport { x };\n",
        );

        let entries = scan(&[DirectorySource::new(dir.path())]).unwrap();
        assert_eq!(names(&entries), vec!["x"]);
    }

    #[test]
    fn test_index_files_and_name_overrides() {
        let dir = tempdir().unwrap();
        write(dir.path(), "user-profile/index.ts", "export default {}\n");
        write(dir.path(), "billing/index.ts", "export default {}\n");
        write(dir.path(), "billing/helpers.ts", "export const hidden = 1\n");
        write(dir.path(), "files.ts", "export default {}\n");
        write(dir.path(), "types.d.ts", "export declare const ignored: number\n");

        let source = DirectorySource::new(dir.path()).with_name("files", "storage");
        let entries = scan(&[source]).unwrap();
        assert_eq!(names(&entries), vec!["billing", "storage", "userProfile"]);
    }

    #[test]
    fn test_include_and_exclude_patterns() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.ts", "export const a = 1\n");
        write(dir.path(), "a.test.ts", "export const aTest = 1\n");
        write(dir.path(), "nested/deep/b.ts", "export const b = 1\n");

        let source = DirectorySource::new(dir.path())
            .with_include("**/*.ts")
            .with_exclude("*.test.ts");
        let entries = scan(&[source]).unwrap();
        assert_eq!(names(&entries), vec!["a", "b"]);
    }

    #[test]
    fn test_export_star_is_recursive_and_cycle_safe() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "index.ts",
            "export * from './lib/a';\nexport * from 'some-package';\n",
        );
        write(
            dir.path(),
            "lib/a.ts",
            "export const one = 1;\nexport * from './b';\nexport default 5;\n",
        );
        write(dir.path(), "lib/b.ts", "export const two = 2;\nexport * from './a';\n");

        let source = DirectorySource::new(dir.path()).with_include("index.ts");
        let entries = scan(&[source]).unwrap();
        assert_eq!(names(&entries), vec!["one", "two"]);
        assert!(entries
            .iter()
            .all(|e| e.module_specifier == module_specifier(&dir.path().join("index.ts"))));
    }

    #[test]
    fn test_parse_error_aborts_with_location() {
        let dir = tempdir().unwrap();
        write(dir.path(), "good.ts", "export const ok = 1\n");
        write(dir.path(), "broken.ts", "export const = ;\n");

        let err = scan(&[DirectorySource::new(dir.path())]).unwrap_err();
        match err {
            ScanError::Parse { path, line, .. } => {
                assert!(path.ends_with("broken.ts"));
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let entries = scan(&[DirectorySource::new(dir.path().join("absent"))]).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_invalid_pattern() {
        let dir = tempdir().unwrap();
        let source = DirectorySource::new(dir.path()).with_include("[");
        assert!(matches!(
            scan(&[source]).unwrap_err(),
            ScanError::Pattern { .. }
        ));
    }

    #[test]
    fn test_deserialize_string_or_object() {
        let short: DirectorySource = serde_json::from_str(r#""app/services""#).unwrap();
        assert_eq!(short, DirectorySource::new("app/services"));

        let full: DirectorySource =
            serde_json::from_str(r#"{ "path": "composables", "exclude": ["*.test.ts"] }"#).unwrap();
        assert_eq!(full.path, PathBuf::from("composables"));
        assert_eq!(full.exclude, vec!["*.test.ts"]);
        assert!(full.include.is_empty());
    }

    #[test]
    fn test_node_modules_is_never_scanned() {
        let dir = tempdir().unwrap();
        write(dir.path(), "node_modules/pkg/index.ts", "export default {}\n");
        write(dir.path(), "ok.ts", "export const ok = 1\n");

        let source = DirectorySource::new(dir.path()).with_include("**/*.ts");
        let entries = scan(&[source]).unwrap();
        assert_eq!(names(&entries), vec!["ok"]);
    }
}
