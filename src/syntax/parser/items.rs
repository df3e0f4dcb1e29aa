use crate::ast::*;
use crate::syntax::lexeme::Lexeme;
use crate::syntax::span::Spanned;

use super::Parser;

impl Parser<'_> {
    pub(super) fn parse_item(&mut self) -> Spanned<Item> {
        let start = self.current_span();
        if self.at(&Lexeme::Import) && !matches!(self.peek_nth(1), Lexeme::LParen | Lexeme::Dot) {
            let import = self.parse_import();
            let span = start.merge(self.prev_span());
            return Spanned::new(Item::Import(import), span);
        }

        if self.eat(&Lexeme::Export) {
            let export = if self.eat(&Lexeme::Default) {
                Export::Default
            } else {
                Export::Named
            };
            let next = self.peek().clone();
            let stmt = match (export, &next) {
                (Export::Default, Lexeme::Function) | (Export::Default, Lexeme::Async) => {
                    let function = self.parse_function_declaration(true);
                    let span = function.span;
                    Spanned::new(Stmt::FunctionDecl(function), span)
                }
                (Export::Default, _) => {
                    let expr = self.parse_assign();
                    self.consume_semicolon();
                    let span = expr.span;
                    Spanned::new(Stmt::Expr(expr), span)
                }
                (_, Lexeme::Function | Lexeme::Async | Lexeme::Const | Lexeme::Let | Lexeme::Var) => {
                    self.parse_stmt()
                }
                _ => {
                    self.error_with_help(
                        &format!(
                            "expected declaration after 'export', found {}",
                            self.peek().description()
                        ),
                        "only `export function`, `export const` and `export default` are supported",
                    );
                    let span = self.current_span();
                    self.advance();
                    Spanned::new(Stmt::Empty, span)
                }
            };
            let span = start.merge(stmt.span);
            return Spanned::new(
                Item::Stmt {
                    export,
                    stmt,
                },
                span,
            );
        }

        let stmt = self.parse_stmt();
        let span = stmt.span;
        Spanned::new(
            Item::Stmt {
                export: Export::None,
                stmt,
            },
            span,
        )
    }

    fn parse_import(&mut self) -> ImportDecl {
        self.expect(&Lexeme::Import);

        // Side-effect import: `import "module";`
        if let Lexeme::Str(source) = self.peek().clone() {
            self.advance();
            self.consume_semicolon();
            return ImportDecl {
                default: None,
                specifiers: Vec::new(),
                source,
            };
        }

        let mut default = None;
        let mut specifiers = Vec::new();

        if matches!(self.peek(), Lexeme::Ident(_)) {
            default = Some(self.expect_ident());
            if !self.eat(&Lexeme::Comma) {
                return self.finish_import(default, specifiers);
            }
        }

        if self.at(&Lexeme::Star) {
            self.error_with_help(
                "namespace imports are not supported",
                "import the bindings you use by name: `import { a, b } from \"module\"`",
            );
            self.advance();
        }

        self.expect(&Lexeme::LBrace);
        while !self.at(&Lexeme::RBrace) && !self.at(&Lexeme::Eof) {
            let imported = self.expect_property_name();
            let local = if self.at_ident("as") {
                self.advance();
                self.expect_ident()
            } else {
                imported.clone()
            };
            specifiers.push(ImportSpecifier {
                imported: imported.node,
                local,
            });
            if !self.eat(&Lexeme::Comma) {
                break;
            }
        }
        self.expect(&Lexeme::RBrace);
        self.finish_import(default, specifiers)
    }

    fn finish_import(
        &mut self,
        default: Option<Spanned<String>>,
        specifiers: Vec<ImportSpecifier>,
    ) -> ImportDecl {
        if self.at_ident("from") {
            self.advance();
        } else {
            self.error_at_current(&format!(
                "expected 'from', found {}",
                self.peek().description()
            ));
        }
        let source = match self.peek().clone() {
            Lexeme::Str(source) => {
                self.advance();
                source
            }
            other => {
                self.error_at_current(&format!(
                    "expected module string, found {}",
                    other.description()
                ));
                String::new()
            }
        };
        self.consume_semicolon();
        ImportDecl {
            default,
            specifiers,
            source,
        }
    }

    /// `[async] function [*] name(params) { body }`. The name is optional
    /// only for `export default function`.
    pub(super) fn parse_function_declaration(&mut self, name_optional: bool) -> Function {
        let start = self.current_span();
        let is_async = self.eat(&Lexeme::Async);
        self.expect(&Lexeme::Function);
        let is_generator = self.eat(&Lexeme::Star);
        let name = if matches!(self.peek(), Lexeme::Ident(_)) || !name_optional {
            Some(self.expect_ident())
        } else {
            None
        };
        self.parse_function_rest(start, name, is_async, is_generator)
    }

    /// Parameters and block body of a non-arrow function.
    pub(super) fn parse_function_rest(
        &mut self,
        start: crate::syntax::span::Span,
        name: Option<Spanned<String>>,
        is_async: bool,
        is_generator: bool,
    ) -> Function {
        let params = self.parse_params();
        let body = self.parse_block_body();
        Function {
            name,
            params,
            body: FunctionBody::Block(body),
            is_arrow: false,
            is_async,
            is_generator,
            span: start.merge(self.prev_span()),
        }
    }

    pub(super) fn parse_params(&mut self) -> Vec<Spanned<Pattern>> {
        self.expect(&Lexeme::LParen);
        let mut params = Vec::new();
        while !self.at(&Lexeme::RParen) && !self.at(&Lexeme::Eof) {
            if self.at(&Lexeme::Ellipsis) {
                let start = self.current_span();
                self.advance();
                let target = self.parse_binding_target();
                let span = start.merge(target.span);
                params.push(Spanned::new(Pattern::Rest(Box::new(target)), span));
                break;
            }
            params.push(self.parse_binding_element());
            if !self.eat(&Lexeme::Comma) {
                break;
            }
        }
        self.expect(&Lexeme::RParen);
        params
    }

    /// `{ stmts }` as a function body.
    pub(super) fn parse_block_body(&mut self) -> Vec<Spanned<Stmt>> {
        self.expect(&Lexeme::LBrace);
        let stmts = self.parse_stmt_list(&Lexeme::RBrace);
        self.expect(&Lexeme::RBrace);
        stmts
    }
}
