pub mod analysis;
pub mod api;
pub mod ast;
pub mod codegen;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod hash;
pub mod hir;
pub mod reactive;
pub mod runtime;
pub mod syntax;

// Short `memoc::X` paths for the CLI and tests
pub use config::project;
pub use syntax::format;
pub use syntax::lexeme;
pub use syntax::lexer;
pub use syntax::parser;
pub use syntax::span;

// Public API: `memoc::compile_program()` etc.
pub use api::*;

use diagnostic::{render_diagnostics, Diagnostic};
use lexer::{Comment, Lexer};
use parser::Parser;

/// Parse a source file, rendering any diagnostics to stderr.
pub fn parse_source(source: &str, filename: &str) -> Result<ast::Program, Vec<Diagnostic>> {
    parse_source_silent(source, filename).inspect_err(|errors| {
        render_diagnostics(errors, filename, source);
    })
}

pub fn parse_source_silent(source: &str, filename: &str) -> Result<ast::Program, Vec<Diagnostic>> {
    parse_source_with_comments(source, filename).map(|(program, _)| program)
}

/// Parse a source file and keep its comments (for formatting).
pub fn parse_source_with_comments(
    source: &str,
    _filename: &str,
) -> Result<(ast::Program, Vec<Comment>), Vec<Diagnostic>> {
    let (tokens, comments, lex_errors) = Lexer::new(source, 0).tokenize();
    if !lex_errors.is_empty() {
        return Err(lex_errors);
    }
    let program = Parser::new(tokens, source).parse_program()?;
    Ok((program, comments))
}
