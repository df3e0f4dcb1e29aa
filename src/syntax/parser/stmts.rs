use crate::ast::*;
use crate::syntax::lexeme::Lexeme;
use crate::syntax::span::Spanned;

use super::Parser;

impl Parser<'_> {
    /// Statements up to (not including) `end`.
    pub(super) fn parse_stmt_list(&mut self, end: &Lexeme) -> Vec<Spanned<Stmt>> {
        let mut stmts = Vec::new();
        while !self.at(end) && !self.at(&Lexeme::Eof) {
            let before = self.pos;
            stmts.push(self.parse_stmt());
            if self.pos == before {
                self.advance();
            }
        }
        stmts
    }

    /// Statement list of a `case` clause: stops at the next clause.
    fn parse_case_body(&mut self) -> Vec<Spanned<Stmt>> {
        let mut stmts = Vec::new();
        while !self.at(&Lexeme::Case)
            && !self.at(&Lexeme::Default)
            && !self.at(&Lexeme::RBrace)
            && !self.at(&Lexeme::Eof)
        {
            let before = self.pos;
            stmts.push(self.parse_stmt());
            if self.pos == before {
                self.advance();
            }
        }
        stmts
    }

    pub(super) fn parse_stmt(&mut self) -> Spanned<Stmt> {
        let start = self.current_span();
        if !self.enter_nesting() {
            return Spanned::new(Stmt::Empty, start);
        }
        let stmt = match self.peek().clone() {
            Lexeme::LBrace => {
                self.advance();
                let body = self.parse_stmt_list(&Lexeme::RBrace);
                self.expect(&Lexeme::RBrace);
                Stmt::Block(body)
            }
            Lexeme::Var | Lexeme::Let | Lexeme::Const => {
                let (kind, decls) = self.parse_var_decl();
                self.consume_semicolon();
                Stmt::VarDecl { kind, decls }
            }
            Lexeme::Function => Stmt::FunctionDecl(self.parse_function_declaration(false)),
            Lexeme::Async if matches!(self.peek_nth(1), Lexeme::Function) => {
                Stmt::FunctionDecl(self.parse_function_declaration(false))
            }
            Lexeme::If => self.parse_if(),
            Lexeme::For => self.parse_for(),
            Lexeme::While => {
                self.advance();
                self.expect(&Lexeme::LParen);
                let test = self.parse_expr();
                self.expect(&Lexeme::RParen);
                let body = Box::new(self.parse_stmt());
                Stmt::While { test, body }
            }
            Lexeme::Do => {
                self.advance();
                let body = Box::new(self.parse_stmt());
                self.expect(&Lexeme::While);
                self.expect(&Lexeme::LParen);
                let test = self.parse_expr();
                self.expect(&Lexeme::RParen);
                self.eat(&Lexeme::Semicolon);
                Stmt::DoWhile { body, test }
            }
            Lexeme::Switch => self.parse_switch(),
            Lexeme::Try => self.parse_try(),
            Lexeme::Return => {
                self.advance();
                let value = if self.at(&Lexeme::Semicolon)
                    || self.at(&Lexeme::RBrace)
                    || self.at(&Lexeme::Eof)
                    || self.newline_before()
                {
                    None
                } else {
                    Some(self.parse_expr())
                };
                self.consume_semicolon();
                Stmt::Return(value)
            }
            Lexeme::Throw => {
                self.advance();
                if self.newline_before() {
                    self.error_at_current("illegal newline after 'throw'");
                }
                let value = self.parse_expr();
                self.consume_semicolon();
                Stmt::Throw(value)
            }
            Lexeme::Break | Lexeme::Continue => {
                let is_break = self.at(&Lexeme::Break);
                self.advance();
                let label = if matches!(self.peek(), Lexeme::Ident(_)) && !self.newline_before() {
                    Some(self.expect_ident())
                } else {
                    None
                };
                self.consume_semicolon();
                if is_break {
                    Stmt::Break(label)
                } else {
                    Stmt::Continue(label)
                }
            }
            Lexeme::With => {
                self.advance();
                self.expect(&Lexeme::LParen);
                let object = self.parse_expr();
                self.expect(&Lexeme::RParen);
                let body = Box::new(self.parse_stmt());
                Stmt::With { object, body }
            }
            Lexeme::Debugger => {
                self.advance();
                self.consume_semicolon();
                Stmt::Debugger
            }
            Lexeme::Semicolon => {
                self.advance();
                Stmt::Empty
            }
            Lexeme::Class => {
                self.error_with_help(
                    "class declarations are not supported",
                    "use a function returning an object instead",
                );
                self.advance();
                Stmt::Empty
            }
            Lexeme::Ident(name) if matches!(self.peek_nth(1), Lexeme::Colon) => {
                let label = Spanned::new(name, start);
                self.advance();
                self.advance();
                let body = Box::new(self.parse_stmt());
                Stmt::Labeled { label, body }
            }
            _ => {
                let expr = self.parse_expr();
                self.consume_semicolon();
                Stmt::Expr(expr)
            }
        };
        self.exit_nesting();
        Spanned::new(stmt, start.merge(self.prev_span()))
    }

    /// `let a = 1, { b } = c` without the terminator.
    fn parse_var_decl(&mut self) -> (DeclKind, Vec<Declarator>) {
        let kind = match self.peek() {
            Lexeme::Var => DeclKind::Var,
            Lexeme::Let => DeclKind::Let,
            _ => DeclKind::Const,
        };
        self.advance();
        let mut decls = Vec::new();
        loop {
            let target = self.parse_binding_target();
            let init = if self.eat(&Lexeme::Eq) {
                Some(self.parse_assign())
            } else {
                None
            };
            decls.push(Declarator { target, init });
            if !self.eat(&Lexeme::Comma) {
                break;
            }
        }
        (kind, decls)
    }

    fn parse_if(&mut self) -> Stmt {
        self.expect(&Lexeme::If);
        self.expect(&Lexeme::LParen);
        let test = self.parse_expr();
        self.expect(&Lexeme::RParen);
        let consequent = Box::new(self.parse_stmt());
        let alternate = if self.eat(&Lexeme::Else) {
            Some(Box::new(self.parse_stmt()))
        } else {
            None
        };
        Stmt::If {
            test,
            consequent,
            alternate,
        }
    }

    fn parse_for(&mut self) -> Stmt {
        self.expect(&Lexeme::For);
        if self.at(&Lexeme::Await) {
            self.error_at_current("'for await' is not supported");
            self.advance();
        }
        self.expect(&Lexeme::LParen);

        let mut init = None;
        if matches!(self.peek(), Lexeme::Var | Lexeme::Let | Lexeme::Const) {
            let kind = match self.peek() {
                Lexeme::Var => DeclKind::Var,
                Lexeme::Let => DeclKind::Let,
                _ => DeclKind::Const,
            };
            // Single binding followed by `of`/`in` is a for-of/for-in head.
            let save = self.pos;
            self.advance();
            let target = self.parse_binding_target();
            if self.at_ident("of") || self.at(&Lexeme::In) {
                return self.parse_for_each(ForHead::Decl { kind, target });
            }
            self.pos = save;
            self.no_in = true;
            let (kind, decls) = self.parse_var_decl();
            self.no_in = false;
            init = Some(ForInit::VarDecl { kind, decls });
        } else if !self.at(&Lexeme::Semicolon) {
            self.no_in = true;
            let expr = self.parse_expr();
            self.no_in = false;
            if self.at_ident("of") || self.at(&Lexeme::In) {
                let target = self.expr_to_pattern(expr);
                return self.parse_for_each(ForHead::Target(target));
            }
            init = Some(ForInit::Expr(expr));
        }

        self.expect(&Lexeme::Semicolon);
        let test = if self.at(&Lexeme::Semicolon) {
            None
        } else {
            Some(self.parse_expr())
        };
        self.expect(&Lexeme::Semicolon);
        let update = if self.at(&Lexeme::RParen) {
            None
        } else {
            Some(self.parse_expr())
        };
        self.expect(&Lexeme::RParen);
        let body = Box::new(self.parse_stmt());
        Stmt::For {
            init,
            test,
            update,
            body,
        }
    }

    fn parse_for_each(&mut self, left: ForHead) -> Stmt {
        let is_of = self.at_ident("of");
        self.advance();
        let right = if is_of {
            self.parse_assign()
        } else {
            self.parse_expr()
        };
        self.expect(&Lexeme::RParen);
        let body = Box::new(self.parse_stmt());
        if is_of {
            Stmt::ForOf { left, right, body }
        } else {
            Stmt::ForIn { left, right, body }
        }
    }

    fn parse_switch(&mut self) -> Stmt {
        self.expect(&Lexeme::Switch);
        self.expect(&Lexeme::LParen);
        let discriminant = self.parse_expr();
        self.expect(&Lexeme::RParen);
        self.expect(&Lexeme::LBrace);
        let mut cases = Vec::new();
        let mut seen_default = false;
        while !self.at(&Lexeme::RBrace) && !self.at(&Lexeme::Eof) {
            let test = if self.eat(&Lexeme::Default) {
                if seen_default {
                    self.error_at(
                        "more than one 'default' clause in switch",
                        self.prev_span(),
                    );
                }
                seen_default = true;
                None
            } else {
                self.expect(&Lexeme::Case);
                Some(self.parse_expr())
            };
            self.expect(&Lexeme::Colon);
            let body = self.parse_case_body();
            cases.push(SwitchCase { test, body });
        }
        self.expect(&Lexeme::RBrace);
        Stmt::Switch {
            discriminant,
            cases,
        }
    }

    fn parse_try(&mut self) -> Stmt {
        self.expect(&Lexeme::Try);
        let block = self.parse_block_body();
        let handler = if self.eat(&Lexeme::Catch) {
            let param = if self.eat(&Lexeme::LParen) {
                let param = self.parse_binding_target();
                self.expect(&Lexeme::RParen);
                Some(param)
            } else {
                None
            };
            let body = self.parse_block_body();
            Some(CatchClause { param, body })
        } else {
            None
        };
        let finalizer = if self.eat(&Lexeme::Finally) {
            Some(self.parse_block_body())
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            self.error_at_current("missing catch or finally after try");
        }
        Stmt::Try {
            block,
            handler,
            finalizer,
        }
    }
}
