use crate::ast::*;
use crate::syntax::lexeme::{Lexeme, TemplatePart};
use crate::syntax::span::{Span, Spanned};

use super::Parser;

/// Binary and logical operators share one precedence ladder.
#[derive(Clone, Copy)]
enum Infix {
    Binary(BinOp),
    Logical(LogicalOp),
}

impl Infix {
    fn from_lexeme(lexeme: &Lexeme, no_in: bool) -> Option<Infix> {
        let op = match lexeme {
            Lexeme::PipePipe => return Some(Infix::Logical(LogicalOp::Or)),
            Lexeme::AmpAmp => return Some(Infix::Logical(LogicalOp::And)),
            Lexeme::QuestionQuestion => return Some(Infix::Logical(LogicalOp::Nullish)),
            Lexeme::Plus => BinOp::Add,
            Lexeme::Minus => BinOp::Sub,
            Lexeme::Star => BinOp::Mul,
            Lexeme::Slash => BinOp::Div,
            Lexeme::Percent => BinOp::Rem,
            Lexeme::StarStar => BinOp::Exp,
            Lexeme::EqEq => BinOp::Eq,
            Lexeme::BangEq => BinOp::NotEq,
            Lexeme::EqEqEq => BinOp::StrictEq,
            Lexeme::BangEqEq => BinOp::StrictNotEq,
            Lexeme::Lt => BinOp::Lt,
            Lexeme::LtEq => BinOp::LtEq,
            Lexeme::Gt => BinOp::Gt,
            Lexeme::GtEq => BinOp::GtEq,
            Lexeme::Shl => BinOp::Shl,
            Lexeme::Shr => BinOp::Shr,
            Lexeme::UShr => BinOp::UShr,
            Lexeme::Amp => BinOp::BitAnd,
            Lexeme::Pipe => BinOp::BitOr,
            Lexeme::Caret => BinOp::BitXor,
            Lexeme::In if !no_in => BinOp::In,
            Lexeme::Instanceof => BinOp::Instanceof,
            _ => return None,
        };
        Some(Infix::Binary(op))
    }

    /// Returns (left binding power, right binding power).
    fn binding_power(self) -> (u8, u8) {
        let prec = match self {
            Infix::Binary(op) => op.precedence(),
            Infix::Logical(op) => op.precedence(),
        };
        let left = prec * 2;
        match self {
            // Exponentiation is right-associative.
            Infix::Binary(BinOp::Exp) => (left, left),
            _ => (left, left + 1),
        }
    }
}

fn compound_op(lexeme: &Lexeme) -> Option<AssignOp> {
    let op = match lexeme {
        Lexeme::Plus => BinOp::Add,
        Lexeme::Minus => BinOp::Sub,
        Lexeme::Star => BinOp::Mul,
        Lexeme::Slash => BinOp::Div,
        Lexeme::Percent => BinOp::Rem,
        Lexeme::StarStar => BinOp::Exp,
        Lexeme::Shl => BinOp::Shl,
        Lexeme::Shr => BinOp::Shr,
        Lexeme::UShr => BinOp::UShr,
        Lexeme::Amp => BinOp::BitAnd,
        Lexeme::Pipe => BinOp::BitOr,
        Lexeme::Caret => BinOp::BitXor,
        Lexeme::AmpAmp => return Some(AssignOp::Logical(LogicalOp::And)),
        Lexeme::PipePipe => return Some(AssignOp::Logical(LogicalOp::Or)),
        Lexeme::QuestionQuestion => return Some(AssignOp::Logical(LogicalOp::Nullish)),
        _ => return None,
    };
    Some(AssignOp::Compound(op))
}

impl Parser<'_> {
    /// Expression including the comma operator.
    pub(super) fn parse_expr(&mut self) -> Spanned<Expr> {
        let first = self.parse_assign();
        if !self.at(&Lexeme::Comma) {
            return first;
        }
        let mut exprs = vec![first];
        while self.eat(&Lexeme::Comma) {
            exprs.push(self.parse_assign());
        }
        let span = exprs[0].span.merge(self.prev_span());
        Spanned::new(Expr::Sequence(exprs), span)
    }

    /// Assignment expression: arrows, `yield`, `=` and compound assignment.
    pub(super) fn parse_assign(&mut self) -> Spanned<Expr> {
        let start = self.current_span();
        if !self.enter_nesting() {
            return Spanned::new(Expr::Null, start);
        }
        let expr = self.parse_assign_inner(start);
        self.exit_nesting();
        expr
    }

    fn parse_assign_inner(&mut self, start: Span) -> Spanned<Expr> {
        if self.is_arrow_ahead() {
            return self.parse_arrow();
        }

        if self.at(&Lexeme::Yield) {
            self.advance();
            let arg = if self.at(&Lexeme::RParen)
                || self.at(&Lexeme::RBracket)
                || self.at(&Lexeme::RBrace)
                || self.at(&Lexeme::Comma)
                || self.at(&Lexeme::Semicolon)
                || self.newline_before()
            {
                None
            } else {
                Some(Box::new(self.parse_assign()))
            };
            return Spanned::new(Expr::Yield(arg), start.merge(self.prev_span()));
        }

        let lhs = self.parse_conditional();

        let op = match self.peek() {
            Lexeme::Eq => AssignOp::Assign,
            Lexeme::AssignOp(inner) => match compound_op(inner) {
                Some(op) => op,
                None => return lhs,
            },
            _ => return lhs,
        };
        self.advance();

        let target = match op {
            AssignOp::Assign => self.expr_to_pattern(lhs),
            _ => self.expr_to_simple_target(lhs),
        };
        let value = self.parse_assign();
        let span = target.span.merge(value.span);
        Spanned::new(
            Expr::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            span,
        )
    }

    fn parse_conditional(&mut self) -> Spanned<Expr> {
        let test = self.parse_binary(0);
        if !self.eat(&Lexeme::Question) {
            return test;
        }
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let consequent = self.parse_assign();
        self.no_in = saved_no_in;
        self.expect(&Lexeme::Colon);
        let alternate = self.parse_assign();
        let span = test.span.merge(alternate.span);
        Spanned::new(
            Expr::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            span,
        )
    }

    fn parse_binary(&mut self, min_bp: u8) -> Spanned<Expr> {
        let mut lhs = self.parse_unary();

        loop {
            let Some(op) = Infix::from_lexeme(self.peek(), self.no_in) else {
                break;
            };
            let (l_bp, r_bp) = op.binding_power();
            if l_bp < min_bp {
                break;
            }
            self.advance(); // consume operator
            let rhs = self.parse_binary(r_bp);
            let span = lhs.span.merge(rhs.span);
            let node = match op {
                Infix::Binary(op) => Expr::Binary {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
                Infix::Logical(op) => Expr::Logical {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
            };
            lhs = Spanned::new(node, span);
        }

        lhs
    }

    fn parse_unary(&mut self) -> Spanned<Expr> {
        let start = self.current_span();
        let op = match self.peek() {
            Lexeme::Bang => Some(UnaryOp::Not),
            Lexeme::Minus => Some(UnaryOp::Neg),
            Lexeme::Plus => Some(UnaryOp::Plus),
            Lexeme::Tilde => Some(UnaryOp::BitNot),
            Lexeme::Typeof => Some(UnaryOp::Typeof),
            Lexeme::Void => Some(UnaryOp::Void),
            Lexeme::Delete => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            if !self.enter_nesting() {
                return Spanned::new(Expr::Null, start);
            }
            let arg = self.parse_unary();
            self.exit_nesting();
            let span = start.merge(arg.span);
            return Spanned::new(
                Expr::Unary {
                    op,
                    arg: Box::new(arg),
                },
                span,
            );
        }

        if self.at(&Lexeme::Await) {
            self.advance();
            let arg = self.parse_unary();
            let span = start.merge(arg.span);
            return Spanned::new(Expr::Await(Box::new(arg)), span);
        }

        if self.at(&Lexeme::PlusPlus) || self.at(&Lexeme::MinusMinus) {
            let op = if self.at(&Lexeme::PlusPlus) {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            self.advance();
            let arg = self.parse_unary();
            let arg = self.check_update_target(arg);
            let span = start.merge(arg.span);
            return Spanned::new(
                Expr::Update {
                    op,
                    prefix: true,
                    arg: Box::new(arg),
                },
                span,
            );
        }

        let expr = self.parse_call_member();
        if (self.at(&Lexeme::PlusPlus) || self.at(&Lexeme::MinusMinus)) && !self.newline_before() {
            let op = if self.at(&Lexeme::PlusPlus) {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            self.advance();
            let arg = self.check_update_target(expr);
            let span = arg.span.merge(self.prev_span());
            return Spanned::new(
                Expr::Update {
                    op,
                    prefix: false,
                    arg: Box::new(arg),
                },
                span,
            );
        }
        expr
    }

    fn check_update_target(&mut self, expr: Spanned<Expr>) -> Spanned<Expr> {
        if !matches!(expr.node, Expr::Ident(_) | Expr::Member { .. }) {
            self.error_at("invalid update target", expr.span);
        }
        expr
    }

    /// Member access, calls, tagged templates and `new`, with optional chains.
    fn parse_call_member(&mut self) -> Spanned<Expr> {
        let start = self.current_span();
        let mut expr = if self.at(&Lexeme::New) {
            self.parse_new()
        } else {
            self.parse_primary()
        };

        let mut in_chain = false;
        loop {
            match self.peek().clone() {
                Lexeme::Dot => {
                    self.advance();
                    let name = self.expect_property_name();
                    expr = Spanned::new(
                        Expr::Member {
                            object: Box::new(expr),
                            property: MemberProp::Ident(name.node),
                            optional: false,
                        },
                        start.merge(self.prev_span()),
                    );
                }
                Lexeme::QuestionDot => {
                    self.advance();
                    in_chain = true;
                    let node = match self.peek() {
                        Lexeme::LParen => {
                            let args = self.parse_arguments();
                            Expr::Call {
                                callee: Box::new(expr),
                                args,
                                optional: true,
                            }
                        }
                        Lexeme::LBracket => {
                            self.advance();
                            let saved_no_in = std::mem::replace(&mut self.no_in, false);
                            let property = self.parse_expr();
                            self.no_in = saved_no_in;
                            self.expect(&Lexeme::RBracket);
                            Expr::Member {
                                object: Box::new(expr),
                                property: MemberProp::Computed(Box::new(property)),
                                optional: true,
                            }
                        }
                        _ => {
                            let name = self.expect_property_name();
                            Expr::Member {
                                object: Box::new(expr),
                                property: MemberProp::Ident(name.node),
                                optional: true,
                            }
                        }
                    };
                    expr = Spanned::new(node, start.merge(self.prev_span()));
                }
                Lexeme::LBracket => {
                    self.advance();
                    let saved_no_in = std::mem::replace(&mut self.no_in, false);
                    let property = self.parse_expr();
                    self.no_in = saved_no_in;
                    self.expect(&Lexeme::RBracket);
                    expr = Spanned::new(
                        Expr::Member {
                            object: Box::new(expr),
                            property: MemberProp::Computed(Box::new(property)),
                            optional: false,
                        },
                        start.merge(self.prev_span()),
                    );
                }
                Lexeme::LParen => {
                    let args = self.parse_arguments();
                    expr = Spanned::new(
                        Expr::Call {
                            callee: Box::new(expr),
                            args,
                            optional: false,
                        },
                        start.merge(self.prev_span()),
                    );
                }
                // A `Middle`/`Tail` piece continues an enclosing template.
                Lexeme::Template {
                    part: TemplatePart::Head | TemplatePart::Full,
                    ..
                } => {
                    if in_chain {
                        self.error_at_current("tagged template cannot be used in optional chain");
                    }
                    let (quasis, exprs) = self.parse_template();
                    expr = Spanned::new(
                        Expr::TaggedTemplate {
                            tag: Box::new(expr),
                            quasis,
                            exprs,
                        },
                        start.merge(self.prev_span()),
                    );
                }
                _ => break,
            }
        }

        if in_chain {
            let span = expr.span;
            expr = Spanned::new(Expr::Chain(Box::new(expr)), span);
        }
        expr
    }

    fn parse_new(&mut self) -> Spanned<Expr> {
        let start = self.expect(&Lexeme::New);
        let mut callee = if self.at(&Lexeme::New) {
            self.parse_new()
        } else {
            self.parse_primary()
        };
        // Member accesses bind to the constructor, the first call is `new`'s.
        loop {
            if self.eat(&Lexeme::Dot) {
                let name = self.expect_property_name();
                callee = Spanned::new(
                    Expr::member(callee, &name.node),
                    start.merge(self.prev_span()),
                );
            } else if self.eat(&Lexeme::LBracket) {
                let property = self.parse_expr();
                self.expect(&Lexeme::RBracket);
                callee = Spanned::new(
                    Expr::Member {
                        object: Box::new(callee),
                        property: MemberProp::Computed(Box::new(property)),
                        optional: false,
                    },
                    start.merge(self.prev_span()),
                );
            } else {
                break;
            }
        }
        let args = if self.at(&Lexeme::LParen) {
            self.parse_arguments()
        } else {
            Vec::new()
        };
        Spanned::new(
            Expr::New {
                callee: Box::new(callee),
                args,
            },
            start.merge(self.prev_span()),
        )
    }

    fn parse_arguments(&mut self) -> Vec<Argument> {
        self.expect(&Lexeme::LParen);
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let mut args = Vec::new();
        while !self.at(&Lexeme::RParen) && !self.at(&Lexeme::Eof) {
            if self.eat(&Lexeme::Ellipsis) {
                args.push(Argument::Spread(self.parse_assign()));
            } else {
                args.push(Argument::Expr(self.parse_assign()));
            }
            if !self.eat(&Lexeme::Comma) {
                break;
            }
        }
        self.no_in = saved_no_in;
        self.expect(&Lexeme::RParen);
        args
    }

    fn parse_primary(&mut self) -> Spanned<Expr> {
        let start = self.current_span();
        let node = match self.peek().clone() {
            Lexeme::Number(n) => {
                self.advance();
                Expr::Number(n)
            }
            Lexeme::Str(s) => {
                self.advance();
                Expr::Str(s)
            }
            Lexeme::True => {
                self.advance();
                Expr::Bool(true)
            }
            Lexeme::False => {
                self.advance();
                Expr::Bool(false)
            }
            Lexeme::Null => {
                self.advance();
                Expr::Null
            }
            Lexeme::This => {
                self.advance();
                Expr::This
            }
            Lexeme::Ident(name) => {
                self.advance();
                Expr::Ident(name)
            }
            Lexeme::Template { .. } => {
                let (quasis, exprs) = self.parse_template();
                Expr::Template { quasis, exprs }
            }
            Lexeme::LParen => {
                self.advance();
                let saved_no_in = std::mem::replace(&mut self.no_in, false);
                let inner = self.parse_expr();
                self.no_in = saved_no_in;
                self.expect(&Lexeme::RParen);
                // Parentheses only group; keep the inner node with the outer span.
                return Spanned::new(inner.node, start.merge(self.prev_span()));
            }
            Lexeme::LBracket => self.parse_array_literal(),
            Lexeme::LBrace => self.parse_object_literal(),
            Lexeme::Function | Lexeme::Async => {
                let is_async = self.eat(&Lexeme::Async);
                self.expect(&Lexeme::Function);
                let is_generator = self.eat(&Lexeme::Star);
                let name = if matches!(self.peek(), Lexeme::Ident(_)) {
                    Some(self.expect_ident())
                } else {
                    None
                };
                let function = self.parse_function_rest(start, name, is_async, is_generator);
                Expr::Function(Box::new(function))
            }
            Lexeme::Class => {
                self.error_with_help(
                    "class expressions are not supported",
                    "use a function returning an object instead",
                );
                self.advance();
                Expr::Null
            }
            other => {
                self.error_at_current(&format!("expected expression, found {}", other.description()));
                Expr::Null
            }
        };
        Spanned::new(node, start.merge(self.prev_span()))
    }

    fn parse_template(&mut self) -> (Vec<TemplateQuasi>, Vec<Spanned<Expr>>) {
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        let Lexeme::Template { cooked, raw, part } = self.peek().clone() else {
            self.error_at_current("expected template literal");
            return (quasis, exprs);
        };
        self.advance();
        quasis.push(TemplateQuasi { cooked, raw });
        if part == TemplatePart::Full {
            return (quasis, exprs);
        }
        loop {
            let saved_no_in = std::mem::replace(&mut self.no_in, false);
            exprs.push(self.parse_expr());
            self.no_in = saved_no_in;
            match self.peek().clone() {
                Lexeme::Template { cooked, raw, part } => {
                    self.advance();
                    quasis.push(TemplateQuasi { cooked, raw });
                    if part == TemplatePart::Tail {
                        break;
                    }
                }
                other => {
                    self.error_at_current(&format!(
                        "expected '}}' closing template substitution, found {}",
                        other.description()
                    ));
                    quasis.push(TemplateQuasi {
                        cooked: String::new(),
                        raw: String::new(),
                    });
                    break;
                }
            }
        }
        (quasis, exprs)
    }

    fn parse_array_literal(&mut self) -> Expr {
        self.expect(&Lexeme::LBracket);
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let mut elements = Vec::new();
        while !self.at(&Lexeme::RBracket) && !self.at(&Lexeme::Eof) {
            if self.eat(&Lexeme::Comma) {
                elements.push(ArrayElement::Hole);
                continue;
            }
            if self.eat(&Lexeme::Ellipsis) {
                elements.push(ArrayElement::Spread(self.parse_assign()));
            } else {
                elements.push(ArrayElement::Expr(self.parse_assign()));
            }
            if !self.eat(&Lexeme::Comma) {
                break;
            }
        }
        self.no_in = saved_no_in;
        self.expect(&Lexeme::RBracket);
        Expr::Array(elements)
    }

    fn parse_object_literal(&mut self) -> Expr {
        self.expect(&Lexeme::LBrace);
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let mut members = Vec::new();
        while !self.at(&Lexeme::RBrace) && !self.at(&Lexeme::Eof) {
            if self.eat(&Lexeme::Ellipsis) {
                members.push(ObjectMember::Spread(self.parse_assign()));
            } else {
                members.push(self.parse_object_property());
            }
            if !self.eat(&Lexeme::Comma) {
                break;
            }
        }
        self.no_in = saved_no_in;
        self.expect(&Lexeme::RBrace);
        Expr::Object(members)
    }

    fn parse_object_property(&mut self) -> ObjectMember {
        let start = self.current_span();
        let plain_key_follows = matches!(
            self.peek_nth(1),
            Lexeme::Colon | Lexeme::LParen | Lexeme::Comma | Lexeme::RBrace | Lexeme::Eq
        );
        let is_modifier = self.at_ident("get") || self.at_ident("set") || self.at(&Lexeme::Async);
        if (is_modifier && !plain_key_follows) || self.at(&Lexeme::Star) {
            self.error_with_help(
                "accessor, async and generator methods are not supported",
                "use a plain property holding a function",
            );
            self.advance();
        }

        let key = self.parse_prop_key();

        if self.at(&Lexeme::LParen) {
            let name = key.static_name().map(|n| Spanned::new(n, start));
            let function = self.parse_function_rest(start, name, false, false);
            return ObjectMember::Property {
                key,
                value: Spanned::new(Expr::Function(Box::new(function)), start.merge(self.prev_span())),
                shorthand: false,
                method: true,
            };
        }

        if self.eat(&Lexeme::Colon) {
            let value = self.parse_assign();
            return ObjectMember::Property {
                key,
                value,
                shorthand: false,
                method: false,
            };
        }

        // Shorthand `{ a }`, or `{ a = 1 }` which is only valid as a pattern.
        let PropKey::Ident(name) = &key else {
            self.error_at_current(&format!("expected ':', found {}", self.peek().description()));
            return ObjectMember::Property {
                key,
                value: Spanned::new(Expr::Null, start),
                shorthand: false,
                method: false,
            };
        };
        let mut value = Spanned::new(Expr::Ident(name.clone()), start);
        if self.eat(&Lexeme::Eq) {
            let default = self.parse_assign();
            let span = start.merge(default.span);
            value = Spanned::new(
                Expr::Assign {
                    op: AssignOp::Assign,
                    target: Box::new(Spanned::new(Pattern::Ident(name.clone()), start)),
                    value: Box::new(default),
                },
                span,
            );
        }
        ObjectMember::Property {
            key,
            value,
            shorthand: true,
            method: false,
        }
    }

    fn parse_prop_key(&mut self) -> PropKey {
        match self.peek().clone() {
            Lexeme::Str(s) => {
                self.advance();
                PropKey::Str(s)
            }
            Lexeme::Number(n) => {
                self.advance();
                PropKey::Number(n)
            }
            Lexeme::LBracket => {
                self.advance();
                let expr = self.parse_assign();
                self.expect(&Lexeme::RBracket);
                PropKey::Computed(Box::new(expr))
            }
            _ => PropKey::Ident(self.expect_property_name().node),
        }
    }

    // ─── Arrow functions ───────────────────────────────────────────

    /// `x =>`, `(…) =>`, `async x =>`, `async (…) =>`.
    fn is_arrow_ahead(&self) -> bool {
        let mut offset = 0;
        if matches!(self.peek(), Lexeme::Async)
            && matches!(self.peek_nth(1), Lexeme::Ident(_) | Lexeme::LParen)
        {
            offset = 1;
        }
        match self.peek_nth(offset) {
            Lexeme::Ident(_) => matches!(self.peek_nth(offset + 1), Lexeme::Arrow),
            Lexeme::LParen => {
                let mut depth = 0usize;
                let mut i = offset;
                loop {
                    match self.peek_nth(i) {
                        Lexeme::LParen | Lexeme::LBracket | Lexeme::LBrace => depth += 1,
                        Lexeme::RParen | Lexeme::RBracket | Lexeme::RBrace => {
                            depth = depth.saturating_sub(1);
                            if depth == 0 {
                                return matches!(self.peek_nth(i + 1), Lexeme::Arrow);
                            }
                        }
                        Lexeme::Template {
                            part: TemplatePart::Head,
                            ..
                        } => depth += 1,
                        Lexeme::Template {
                            part: TemplatePart::Tail,
                            ..
                        } => depth = depth.saturating_sub(1),
                        Lexeme::Eof => return false,
                        _ => {}
                    }
                    i += 1;
                }
            }
            _ => false,
        }
    }

    fn parse_arrow(&mut self) -> Spanned<Expr> {
        let start = self.current_span();
        let is_async = self.eat(&Lexeme::Async);
        let params = if matches!(self.peek(), Lexeme::Ident(_)) {
            let name = self.expect_ident();
            vec![name.map(Pattern::Ident)]
        } else {
            self.parse_params()
        };
        self.expect(&Lexeme::Arrow);
        let body = if self.at(&Lexeme::LBrace) {
            FunctionBody::Block(self.parse_block_body())
        } else {
            let saved_no_in = std::mem::replace(&mut self.no_in, false);
            let expr = self.parse_assign();
            self.no_in = saved_no_in;
            FunctionBody::Expr(Box::new(expr))
        };
        let span = start.merge(self.prev_span());
        Spanned::new(
            Expr::Function(Box::new(Function {
                name: None,
                params,
                body,
                is_arrow: true,
                is_async,
                is_generator: false,
                span,
            })),
            span,
        )
    }

    // ─── Patterns ──────────────────────────────────────────────────

    /// Binding identifier or destructuring pattern (no default).
    pub(super) fn parse_binding_target(&mut self) -> Spanned<Pattern> {
        let start = self.current_span();
        let node = match self.peek() {
            Lexeme::LBrace => self.parse_object_pattern(),
            Lexeme::LBracket => self.parse_array_pattern(),
            _ => Pattern::Ident(self.expect_ident().node),
        };
        Spanned::new(node, start.merge(self.prev_span()))
    }

    /// Binding target with an optional `= default`.
    pub(super) fn parse_binding_element(&mut self) -> Spanned<Pattern> {
        let target = self.parse_binding_target();
        if !self.eat(&Lexeme::Eq) {
            return target;
        }
        let default = self.parse_assign();
        let span = target.span.merge(default.span);
        Spanned::new(
            Pattern::Default {
                target: Box::new(target),
                default: Box::new(default),
            },
            span,
        )
    }

    fn parse_object_pattern(&mut self) -> Pattern {
        self.expect(&Lexeme::LBrace);
        let mut props = Vec::new();
        let mut rest = None;
        while !self.at(&Lexeme::RBrace) && !self.at(&Lexeme::Eof) {
            if self.eat(&Lexeme::Ellipsis) {
                rest = Some(Box::new(self.parse_binding_target()));
                break;
            }
            let start = self.current_span();
            let key = self.parse_prop_key();
            let (value, shorthand) = if self.eat(&Lexeme::Colon) {
                (self.parse_binding_element(), false)
            } else {
                let PropKey::Ident(name) = &key else {
                    self.error_at_current("expected ':' in object pattern");
                    break;
                };
                let mut value = Spanned::new(Pattern::Ident(name.clone()), start);
                if self.eat(&Lexeme::Eq) {
                    let default = self.parse_assign();
                    let span = start.merge(default.span);
                    value = Spanned::new(
                        Pattern::Default {
                            target: Box::new(value),
                            default: Box::new(default),
                        },
                        span,
                    );
                }
                (value, true)
            };
            props.push(ObjectPatternProp {
                key,
                value,
                shorthand,
            });
            if !self.eat(&Lexeme::Comma) {
                break;
            }
        }
        self.expect(&Lexeme::RBrace);
        Pattern::Object { props, rest }
    }

    fn parse_array_pattern(&mut self) -> Pattern {
        self.expect(&Lexeme::LBracket);
        let mut elements = Vec::new();
        let mut rest = None;
        while !self.at(&Lexeme::RBracket) && !self.at(&Lexeme::Eof) {
            if self.eat(&Lexeme::Comma) {
                elements.push(None);
                continue;
            }
            if self.eat(&Lexeme::Ellipsis) {
                rest = Some(Box::new(self.parse_binding_target()));
                break;
            }
            elements.push(Some(self.parse_binding_element()));
            if !self.eat(&Lexeme::Comma) {
                break;
            }
        }
        self.expect(&Lexeme::RBracket);
        Pattern::Array { elements, rest }
    }

    /// Reinterpret a parsed expression as an assignment pattern.
    pub(super) fn expr_to_pattern(&mut self, expr: Spanned<Expr>) -> Spanned<Pattern> {
        let span = expr.span;
        let node = match expr.node {
            Expr::Ident(name) => Pattern::Ident(name),
            Expr::Member { optional: false, .. } => Pattern::Member(Box::new(expr)),
            Expr::Array(elements) => {
                let mut patterns = Vec::new();
                let mut rest = None;
                let count = elements.len();
                for (i, element) in elements.into_iter().enumerate() {
                    match element {
                        ArrayElement::Hole => patterns.push(None),
                        ArrayElement::Expr(e) => patterns.push(Some(self.expr_to_pattern(e))),
                        ArrayElement::Spread(e) => {
                            if i + 1 != count {
                                self.error_at("rest element must be last", e.span);
                            }
                            rest = Some(Box::new(self.expr_to_pattern(e)));
                        }
                    }
                }
                Pattern::Array {
                    elements: patterns,
                    rest,
                }
            }
            Expr::Object(members) => {
                let mut props = Vec::new();
                let mut rest = None;
                for member in members {
                    match member {
                        ObjectMember::Property {
                            key,
                            value,
                            shorthand,
                            method: false,
                        } => {
                            let value = self.expr_to_pattern(value);
                            props.push(ObjectPatternProp {
                                key,
                                value,
                                shorthand,
                            });
                        }
                        ObjectMember::Property { value, .. } => {
                            self.error_at("invalid destructuring target", value.span);
                        }
                        ObjectMember::Spread(e) => {
                            rest = Some(Box::new(self.expr_to_pattern(e)));
                        }
                    }
                }
                Pattern::Object { props, rest }
            }
            Expr::Assign {
                op: AssignOp::Assign,
                target,
                value,
            } => Pattern::Default {
                target,
                default: value,
            },
            _ => {
                self.error_at("invalid assignment target", span);
                Pattern::Ident("_error_".to_string())
            }
        };
        Spanned::new(node, span)
    }

    /// Compound assignment only accepts identifiers and member expressions.
    fn expr_to_simple_target(&mut self, expr: Spanned<Expr>) -> Spanned<Pattern> {
        let span = expr.span;
        match expr.node {
            Expr::Ident(name) => Spanned::new(Pattern::Ident(name), span),
            Expr::Member { optional: false, .. } => {
                Spanned::new(Pattern::Member(Box::new(expr)), span)
            }
            _ => {
                self.error_at("invalid compound assignment target", span);
                Spanned::new(Pattern::Ident("_error_".to_string()), span)
            }
        }
    }
}
