//! Parsing, scope analysis and re-emission of script modules (SWC).
//!
//! Everything here is single-threaded: a [`ParsedModule`] owns its own source
//! map and comment store and must stay on the thread that parsed it.

#![allow(clippy::default_trait_access)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use swc_common::{
    comments::SingleThreadedComments, sync::Lrc, FileName, Globals, Mark, SourceMap, Span,
    Spanned, SyntaxContext, GLOBALS,
};
use swc_ecma_ast::{EsVersion, Expr, Ident, JSXElementName, Module, ModuleDecl, ModuleItem, Prop, Stmt};
use swc_ecma_codegen::{text_writer::JsWriter, Emitter};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax, TsSyntax};
use swc_ecma_transforms_base::resolver;
use swc_ecma_visit::{Visit, VisitMutWith, VisitWith};

/// Script flavour of a module id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    TypeScript,
    Tsx,
    JavaScript,
    Jsx,
}

impl SourceKind {
    /// Classify a module id by extension. The query string (`?vue&type=...`) is ignored.
    ///
    /// Returns `None` for anything that is not a plain script module.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        let path = id.split('?').next().unwrap_or(id);
        let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "ts" | "mts" | "cts" => Some(Self::TypeScript),
            "tsx" => Some(Self::Tsx),
            "js" | "mjs" | "cjs" => Some(Self::JavaScript),
            "jsx" => Some(Self::Jsx),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_typescript(self) -> bool {
        matches!(self, Self::TypeScript | Self::Tsx)
    }

    fn syntax(self) -> Syntax {
        match self {
            Self::TypeScript | Self::Tsx => Syntax::Typescript(TsSyntax {
                tsx: self == Self::Tsx,
                decorators: true,
                ..Default::default()
            }),
            Self::JavaScript | Self::Jsx => Syntax::Es(EsSyntax {
                jsx: self == Self::Jsx,
                decorators: true,
                ..Default::default()
            }),
        }
    }
}

/// A module that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxFailure {
    /// 1-based line of the first error, 0 when unknown.
    pub line: usize,
    pub message: String,
}

/// Output of [`ParsedModule::emit`].
#[derive(Debug, Clone)]
pub struct Emitted {
    pub code: String,
    /// JSON source map.
    pub map: Option<String>,
}

/// A parsed script module together with its source map and comments.
pub struct ParsedModule {
    cm: Lrc<SourceMap>,
    comments: SingleThreadedComments,
    kind: SourceKind,
    module: Module,
}

impl std::fmt::Debug for ParsedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedModule")
            .field("kind", &self.kind)
            .field("items", &self.module.body.len())
            .finish_non_exhaustive()
    }
}

impl ParsedModule {
    /// Parse `source` as an ES module of the flavour implied by `id`.
    pub fn parse(source: &str, id: &str) -> Result<Self, SyntaxFailure> {
        let kind = SourceKind::from_id(id).ok_or_else(|| SyntaxFailure {
            line: 0,
            message: format!("`{id}` is not a script module"),
        })?;
        Self::parse_as(source, id, kind)
    }

    /// Parse `source` with an explicit flavour.
    pub fn parse_as(source: &str, id: &str, kind: SourceKind) -> Result<Self, SyntaxFailure> {
        let cm: Lrc<SourceMap> = Default::default();
        let comments = SingleThreadedComments::default();
        let module = parse_into(&cm, &comments, kind, PathBuf::from(id), source)?;
        Ok(Self {
            cm,
            comments,
            kind,
            module,
        })
    }

    #[must_use]
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    #[must_use]
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// 1-based line of a span inside this module.
    #[must_use]
    pub fn line_of(&self, span: Span) -> usize {
        line_of(&self.cm, span)
    }

    /// Identifiers referenced as values but bound nowhere in the module, in
    /// order of first appearance.
    ///
    /// Covers plain references, shorthand properties (`{ useFoo }`) and
    /// capitalised JSX element names. Lower-case JSX tags are intrinsic
    /// elements and never reported.
    #[must_use]
    pub fn free_identifiers(&self) -> Vec<String> {
        let mut module = self.module.clone();
        let typescript = self.kind.is_typescript();

        GLOBALS.set(&Globals::default(), || {
            let unresolved_mark = Mark::new();
            let top_level_mark = Mark::new();
            module.visit_mut_with(&mut resolver(unresolved_mark, top_level_mark, typescript));

            let mut collector = FreeIdentifiers {
                unresolved: SyntaxContext::empty().apply_mark(unresolved_mark),
                seen: HashSet::new(),
                names: Vec::new(),
            };
            module.visit_with(&mut collector);
            collector.names
        })
    }

    /// Parse `snippet` (import declarations) and splice its items in after the
    /// module's leading directives and imports.
    pub fn insert_imports(&mut self, snippet: &str) -> Result<usize, SyntaxFailure> {
        let parsed = parse_into(
            &self.cm,
            &self.comments,
            SourceKind::TypeScript,
            PathBuf::from("<blackboox:imports>"),
            snippet,
        )?;
        let count = parsed.body.len();

        let at = self
            .module
            .body
            .iter()
            .position(|item| !is_directive_or_import(item))
            .unwrap_or(self.module.body.len());
        let tail = self.module.body.split_off(at);
        self.module.body.extend(parsed.body);
        self.module.body.extend(tail);

        Ok(count)
    }

    /// Re-emit the whole module, comments included, with a JSON source map.
    pub fn emit(&self) -> Result<Emitted, String> {
        let mut buf = Vec::new();
        let mut src_map_buf = Vec::new();

        {
            let writer = JsWriter::new(self.cm.clone(), "\n", &mut buf, Some(&mut src_map_buf));

            let mut emitter = Emitter {
                cfg: swc_ecma_codegen::Config::default().with_target(EsVersion::EsNext),
                cm: self.cm.clone(),
                comments: Some(&self.comments),
                wr: writer,
            };

            emitter
                .emit_module(&self.module)
                .map_err(|e| format!("Failed to emit: {e}"))?;
        }

        let code = String::from_utf8(buf).map_err(|e| format!("Invalid UTF-8 output: {e}"))?;

        let srcmap = self.cm.build_source_map(&src_map_buf);
        let mut map_buf = Vec::new();
        let map = match srcmap.to_writer(&mut map_buf) {
            Ok(()) => String::from_utf8(map_buf).ok(),
            Err(_) => None,
        };

        Ok(Emitted { code, map })
    }
}

fn parse_into(
    cm: &Lrc<SourceMap>,
    comments: &SingleThreadedComments,
    kind: SourceKind,
    name: PathBuf,
    source: &str,
) -> Result<Module, SyntaxFailure> {
    let fm = cm.new_source_file(Lrc::new(FileName::Real(name)), source.to_string());
    let lexer = Lexer::new(
        kind.syntax(),
        EsVersion::EsNext,
        StringInput::from(&*fm),
        Some(comments),
    );

    let mut parser = Parser::new_from(lexer);
    let module = parser.parse_module().map_err(|e| SyntaxFailure {
        line: line_of(cm, e.span()),
        message: e.kind().msg().into_owned(),
    })?;

    // Recoverable errors still mean the module is not valid source
    if let Some(e) = parser.take_errors().into_iter().next() {
        return Err(SyntaxFailure {
            line: line_of(cm, e.span()),
            message: e.kind().msg().into_owned(),
        });
    }

    Ok(module)
}

fn line_of(cm: &SourceMap, span: Span) -> usize {
    if span.is_dummy() {
        0
    } else {
        cm.lookup_char_pos(span.lo).line
    }
}

fn is_directive_or_import(item: &ModuleItem) -> bool {
    match item {
        ModuleItem::ModuleDecl(ModuleDecl::Import(_)) => true,
        ModuleItem::Stmt(Stmt::Expr(stmt)) => stmt.expr.is_lit(),
        _ => false,
    }
}

struct FreeIdentifiers {
    unresolved: SyntaxContext,
    seen: HashSet<String>,
    names: Vec<String>,
}

impl FreeIdentifiers {
    fn record(&mut self, ident: &Ident) {
        let (sym, ctxt) = ident.to_id();
        if ctxt != self.unresolved {
            return;
        }
        let name: &str = &sym;
        if self.seen.insert(name.to_string()) {
            self.names.push(name.to_string());
        }
    }
}

impl Visit for FreeIdentifiers {
    fn visit_expr(&mut self, expr: &Expr) {
        if let Expr::Ident(ident) = expr {
            self.record(ident);
        }
        expr.visit_children_with(self);
    }

    fn visit_prop(&mut self, prop: &Prop) {
        if let Prop::Shorthand(ident) = prop {
            self.record(ident);
        }
        prop.visit_children_with(self);
    }

    fn visit_jsx_element_name(&mut self, name: &JSXElementName) {
        if let JSXElementName::Ident(ident) = name {
            if ident.sym.starts_with(|c: char| c.is_ascii_uppercase()) {
                self.record(ident);
            }
        }
        name.visit_children_with(self);
    }
}
