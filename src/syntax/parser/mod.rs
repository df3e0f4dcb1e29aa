mod expr;
mod items;
mod stmts;

#[cfg(test)]
mod tests;

use crate::ast::*;
use crate::diagnostic::Diagnostic;
use crate::syntax::lexeme::Lexeme;
use crate::syntax::span::{Span, Spanned};

const MAX_NESTING_DEPTH: u32 = 256;

pub struct Parser<'src> {
    tokens: Vec<Spanned<Lexeme>>,
    source: &'src str,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
    depth: u32,
    /// Set while parsing a `for (init; …)` head, where `in` is not an operator.
    no_in: bool,
}

impl<'src> Parser<'src> {
    pub fn new(tokens: Vec<Spanned<Lexeme>>, source: &'src str) -> Self {
        Self {
            tokens,
            source,
            pos: 0,
            diagnostics: Vec::new(),
            depth: 0,
            no_in: false,
        }
    }

    fn enter_nesting(&mut self) -> bool {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            self.error_with_help(
                "nesting depth exceeded (maximum 256 levels)",
                "simplify the program by extracting deeply nested code into functions",
            );
            // Skip to EOF to abort parsing entirely.
            while !self.at(&Lexeme::Eof) {
                self.advance();
            }
            return false;
        }
        true
    }

    fn exit_nesting(&mut self) {
        self.depth -= 1;
    }

    pub fn parse_program(mut self) -> Result<Program, Vec<Diagnostic>> {
        let mut items = Vec::new();
        while !self.at(&Lexeme::Eof) {
            let before = self.pos;
            items.push(self.parse_item());
            if self.pos == before {
                // No progress: the error is recorded, skip the token.
                self.advance();
            }
        }

        if !self.diagnostics.is_empty() {
            return Err(self.diagnostics);
        }
        Ok(Program { items })
    }

    // --- Utility methods ---

    fn peek(&self) -> &Lexeme {
        &self.tokens[self.pos].node
    }

    fn peek_nth(&self, n: usize) -> &Lexeme {
        let index = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[index].node
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn prev_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            self.current_span()
        }
    }

    fn advance(&mut self) -> &Spanned<Lexeme> {
        let tok = &self.tokens[self.pos];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, token: &Lexeme) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    fn at_ident(&self, name: &str) -> bool {
        matches!(self.peek(), Lexeme::Ident(n) if n == name)
    }

    fn eat(&mut self, token: &Lexeme) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Lexeme) -> Span {
        if self.at(token) {
            let span = self.current_span();
            self.advance();
            span
        } else {
            self.error_at_current(&format!(
                "expected {}, found {}",
                token.description(),
                self.peek().description()
            ));
            self.current_span()
        }
    }

    fn expect_ident(&mut self) -> Spanned<String> {
        if let Lexeme::Ident(name) = self.peek().clone() {
            let span = self.current_span();
            self.advance();
            Spanned::new(name, span)
        } else {
            self.error_at_current(&format!(
                "expected identifier, found {}",
                self.peek().description()
            ));
            Spanned::new("_error_".to_string(), self.current_span())
        }
    }

    /// Identifier or keyword used as a property name.
    fn expect_property_name(&mut self) -> Spanned<String> {
        if let Some(text) = self.peek().keyword_text() {
            let span = self.current_span();
            self.advance();
            return Spanned::new(text.to_string(), span);
        }
        self.expect_ident()
    }

    /// Whether a line terminator separates the previous token from the current one.
    fn newline_before(&self) -> bool {
        if self.pos == 0 {
            return false;
        }
        let start = self.prev_span().end as usize;
        let end = self.current_span().start as usize;
        self.source
            .get(start..end)
            .is_some_and(|between| between.contains('\n'))
    }

    /// Statement terminator with automatic semicolon insertion.
    fn consume_semicolon(&mut self) {
        if self.eat(&Lexeme::Semicolon) {
            return;
        }
        if self.at(&Lexeme::RBrace) || self.at(&Lexeme::Eof) || self.newline_before() {
            return;
        }
        self.error_at_current(&format!(
            "expected ';', found {}",
            self.peek().description()
        ));
    }

    fn error_at_current(&mut self, msg: &str) {
        self.diagnostics
            .push(Diagnostic::error(msg.to_string(), self.current_span()));
    }

    fn error_at(&mut self, msg: &str, span: Span) {
        self.diagnostics.push(Diagnostic::error(msg.to_string(), span));
    }

    fn error_with_help(&mut self, msg: &str, help: &str) {
        self.diagnostics.push(
            Diagnostic::error(msg.to_string(), self.current_span()).with_help(help.to_string()),
        );
    }
}
