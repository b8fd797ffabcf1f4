//! Parser module for JavaScript/TypeScript source code
//!
//! Integrates with SWC for parsing source files into AST. The source map is
//! kept alongside the AST so engine spans resolve to line/column positions.

use swc_common::sync::Lrc;
use swc_common::{FileName, SourceMap, Span, Spanned};
use swc_ecma_parser::{EsSyntax, Syntax, TsSyntax, parse_file_as_module};

use crate::report::Position;

pub use swc_ecma_ast::{EsVersion, Module};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    JavaScript,
    TypeScript,
    Jsx,
    Tsx,
}

pub fn detect_language(filename: &str) -> Language {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();

    match ext.as_str() {
        "ts" | "mts" | "cts" => Language::TypeScript,
        "tsx" => Language::Tsx,
        "jsx" => Language::Jsx,
        _ => Language::JavaScript,
    }
}

/// Blanks a leading shebang into a line comment. `#!` and `//` have the
/// same width, so spans and positions are unaffected.
fn neutralize_shebang(source: &str) -> Option<String> {
    source
        .starts_with("#!")
        .then(|| source.replacen("#!", "//", 1))
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} at {line}:{column}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub span_lo: u32,
    pub span_hi: u32,
    pub message: String,
}

#[derive(Debug)]
pub struct ParseResult {
    pub module: Option<Module>,
    pub errors: Vec<ParseError>,
}

pub struct ParsedFile {
    ast_module: Option<Module>,
    errors: Vec<ParseError>,
    source_map: Lrc<SourceMap>,
}

impl std::fmt::Debug for ParsedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedFile")
            .field("has_module", &self.ast_module.is_some())
            .field("error_count", &self.errors.len())
            .finish()
    }
}

impl ParsedFile {
    pub fn from_source(filename: &str, source: &str) -> Self {
        let parser = Parser::for_file(filename);

        let source_map: Lrc<SourceMap> = Default::default();
        let parse_input = match neutralize_shebang(source) {
            Some(rewritten) => rewritten,
            None => source.to_string(),
        };
        let parse_result = parser.parse_recovering(&source_map, filename, &parse_input);

        Self {
            ast_module: parse_result.module,
            errors: parse_result.errors,
            source_map,
        }
    }

    pub fn module(&self) -> Option<&Module> {
        self.ast_module.as_ref()
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Resolves a node span to a source position.
    pub fn position_of(&self, span: Span) -> Position {
        let loc = self.source_map.lookup_char_pos(span.lo);
        Position::new(loc.line, loc.col_display)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParserBuilder {
    jsx: bool,
    typescript: bool,
    decorators: bool,
}

impl ParserBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jsx(mut self, enabled: bool) -> Self {
        self.jsx = enabled;
        self
    }

    pub fn typescript(mut self, enabled: bool) -> Self {
        self.typescript = enabled;
        self
    }

    pub fn decorators(mut self, enabled: bool) -> Self {
        self.decorators = enabled;
        self
    }

    pub fn build(self) -> Parser {
        let syntax = if self.typescript {
            Syntax::Typescript(TsSyntax {
                tsx: self.jsx,
                decorators: self.decorators,
                ..Default::default()
            })
        } else {
            Syntax::Es(EsSyntax {
                jsx: self.jsx,
                decorators: self.decorators,
                ..Default::default()
            })
        };

        Parser { syntax }
    }
}

#[derive(Debug, Clone)]
pub struct Parser {
    syntax: Syntax,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            syntax: Syntax::Es(Default::default()),
        }
    }

    pub fn for_file(filename: &str) -> Self {
        let language = detect_language(filename);
        match language {
            Language::JavaScript => Self::new(),
            Language::TypeScript => Self::builder().typescript(true).build(),
            Language::Jsx => Self::builder().jsx(true).build(),
            Language::Tsx => Self::builder().typescript(true).jsx(true).build(),
        }
    }

    pub fn builder() -> ParserBuilder {
        ParserBuilder::new()
    }

    /// Parses in error-recovering mode. Recoverable errors are collected
    /// alongside a best-effort AST; a fatal error leaves `module` empty.
    pub fn parse_recovering(
        &self,
        source_map: &Lrc<SourceMap>,
        filename: &str,
        code: &str,
    ) -> ParseResult {
        let fm = source_map
            .new_source_file(FileName::Custom(filename.into()).into(), code.to_string());

        let mut recovered_errors = Vec::new();

        let result = parse_file_as_module(
            &fm,
            self.syntax,
            EsVersion::latest(),
            None,
            &mut recovered_errors,
        );

        let to_parse_error = |e: swc_ecma_parser::error::Error| {
            let span = e.span();
            let loc = source_map.lookup_char_pos(span.lo);
            ParseError {
                line: loc.line,
                column: loc.col_display,
                span_lo: span.lo.0,
                span_hi: span.hi.0,
                message: e.kind().msg().to_string(),
            }
        };

        let mut errors: Vec<ParseError> =
            recovered_errors.into_iter().map(to_parse_error).collect();

        match result {
            Ok(module) => ParseResult {
                module: Some(module),
                errors,
            },
            Err(e) => {
                errors.push(to_parse_error(e));
                ParseResult {
                    module: None,
                    errors,
                }
            }
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}
