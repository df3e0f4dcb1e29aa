//! Expression and pattern lowering.

use super::*;
use crate::ast::{Argument, ArrayElement, AssignOp, MemberProp, ObjectMember, PropKey};
use crate::hir::globals::{manual_memo_kind, ManualMemo};

/// One link of a member/call chain, applied to the value before it.
enum Link<'a> {
    Member(&'a MemberProp),
    Call(&'a [Argument]),
    Method(&'a MemberProp, &'a [Argument]),
}

struct ChainLink<'a> {
    link: Link<'a>,
    optional: bool,
    span: Span,
}

/// Leaf handling while building a destructuring pattern.
#[derive(Clone, Copy, PartialEq, Eq)]
enum LeafMode {
    /// Leaves are declared bindings.
    Declare,
    /// Every leaf is a fresh temporary, assigned afterwards.
    Temporary,
}

/// A pattern leaf that still needs a default and/or an assignment.
struct Deferred<'a> {
    temp: Place,
    target: &'a Spanned<Pattern>,
    default: Option<&'a Spanned<Expr>>,
}

impl HirBuilder<'_> {
    pub(super) fn lower_expr(&mut self, expr: &Spanned<Expr>) -> LowerResult<Place> {
        let span = expr.span;
        match &expr.node {
            Expr::Number(n) => Ok(self.primitive(Primitive::Number(*n), span)),
            Expr::Str(s) => Ok(self.primitive(Primitive::String(s.clone()), span)),
            Expr::Bool(b) => Ok(self.primitive(Primitive::Bool(*b), span)),
            Expr::Null => Ok(self.primitive(Primitive::Null, span)),
            Expr::Ident(name) => self.load_name(name, span),
            Expr::This => {
                if !self.ctx.this_allowed {
                    return Err(CompilerError::unsupported(
                        "`this` in a compiled function",
                        span,
                    ));
                }
                Ok(self.push(InstructionValue::LoadThis, span))
            }
            Expr::Template { quasis, exprs } => {
                let exprs = self.lower_exprs(exprs)?;
                Ok(self.push(
                    InstructionValue::TemplateLiteral {
                        quasis: quasis.clone(),
                        exprs,
                    },
                    span,
                ))
            }
            Expr::TaggedTemplate { tag, quasis, exprs } => {
                let tag = self.lower_expr(tag)?;
                let exprs = self.lower_exprs(exprs)?;
                Ok(self.push(
                    InstructionValue::TaggedTemplate {
                        tag,
                        quasis: quasis.clone(),
                        exprs,
                    },
                    span,
                ))
            }
            Expr::Array(elements) => {
                let mut items = Vec::new();
                for element in elements {
                    items.push(match element {
                        ArrayElement::Hole => ArrayItem::Hole,
                        ArrayElement::Expr(e) => ArrayItem::Place(self.lower_expr(e)?),
                        ArrayElement::Spread(e) => ArrayItem::Spread(self.lower_expr(e)?),
                    });
                }
                Ok(self.push(InstructionValue::ArrayExpression(items), span))
            }
            Expr::Object(members) => self.lower_object(members, span),
            Expr::Function(func) => self.lower_function_expr(func, span),
            Expr::Unary { op, arg } => self.lower_unary(*op, arg, span),
            Expr::Update { op, prefix, arg } => self.lower_update(*op, *prefix, arg, span),
            Expr::Binary { op, left, right } => {
                let left = self.lower_expr(left)?;
                let right = self.lower_expr(right)?;
                Ok(self.push(
                    InstructionValue::BinaryOp {
                        op: *op,
                        left,
                        right,
                    },
                    span,
                ))
            }
            Expr::Logical { op, left, right } => {
                let left = self.lower_expr(left)?;
                let right = self.value_block(|this| this.lower_expr(right))?;
                Ok(self.push(
                    InstructionValue::Logical {
                        op: *op,
                        left,
                        right,
                    },
                    span,
                ))
            }
            Expr::Assign { op, target, value } => self.lower_assign(*op, target, value, span),
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let test = self.lower_expr(test)?;
                let consequent = self.value_block(|this| this.lower_expr(consequent))?;
                let alternate = self.value_block(|this| this.lower_expr(alternate))?;
                Ok(self.push(
                    InstructionValue::Ternary {
                        test,
                        consequent,
                        alternate,
                    },
                    span,
                ))
            }
            Expr::Call {
                callee,
                args,
                optional: false,
            } => {
                if let Expr::Ident(name) = &callee.node {
                    if let Some(place) = self.lower_special_call(name, args, callee.span, span)? {
                        return Ok(place);
                    }
                }
                self.lower_chain(expr)
            }
            Expr::Call { .. } | Expr::Member { .. } => self.lower_chain(expr),
            Expr::Chain(inner) => self.lower_chain(inner),
            Expr::New { callee, args } => {
                let callee = self.lower_expr(callee)?;
                let args = self.lower_args(args)?;
                Ok(self.push(InstructionValue::New { callee, args }, span))
            }
            Expr::Sequence(exprs) => {
                let mut last = None;
                for e in exprs {
                    last = Some(self.lower_expr(e)?);
                }
                match last {
                    Some(place) => Ok(place),
                    None => Ok(self.primitive(Primitive::Undefined, span)),
                }
            }
            Expr::Await(value) => {
                if !self.ctx.await_allowed {
                    return Err(CompilerError::unsupported("`await` in a compiled function", span));
                }
                let value = self.lower_expr(value)?;
                Ok(self.push(InstructionValue::Await(value), span))
            }
            Expr::Yield(_) => Err(CompilerError::unsupported("`yield` expressions", span)),
        }
    }

    fn primitive(&mut self, value: Primitive, span: Span) -> Place {
        self.push(InstructionValue::Primitive(value), span)
    }

    fn lower_exprs(&mut self, exprs: &[Spanned<Expr>]) -> LowerResult<Vec<Place>> {
        exprs.iter().map(|e| self.lower_expr(e)).collect()
    }

    fn lower_args(&mut self, args: &[Argument]) -> LowerResult<Vec<CallArg>> {
        let mut out = Vec::new();
        for arg in args {
            out.push(match arg {
                Argument::Expr(e) => CallArg::Place(self.lower_expr(e)?),
                Argument::Spread(e) => CallArg::Spread(self.lower_expr(e)?),
            });
        }
        Ok(out)
    }

    // ─── Names ─────────────────────────────────────────────────────

    fn load_name(&mut self, name: &str, span: Span) -> LowerResult<Place> {
        if let Some(place) = self.lookup(name, span) {
            return Ok(self.push(InstructionValue::LoadLocal(place), span));
        }
        match name {
            "undefined" => Ok(self.primitive(Primitive::Undefined, span)),
            "arguments" if !self.ctx.this_allowed => Err(CompilerError::unsupported(
                "`arguments` in a compiled function",
                span,
            )),
            "eval" => Err(CompilerError::unsupported("`eval`", span)),
            _ => Ok(self.push(InstructionValue::LoadGlobal(name.to_string()), span)),
        }
    }

    /// Assign to a name; the result is the assignment expression's value.
    fn store_name(&mut self, name: &str, value: Place, target_span: Span, span: Span) -> Place {
        match self.lookup(name, target_span) {
            Some(target) => self.push(
                InstructionValue::StoreLocal {
                    kind: StoreKind::Reassign,
                    target,
                    value,
                },
                span,
            ),
            None => self.push(
                InstructionValue::StoreGlobal {
                    name: name.to_string(),
                    value,
                },
                span,
            ),
        }
    }

    // ─── Objects and functions ─────────────────────────────────────

    fn lower_object(&mut self, members: &[ObjectMember], span: Span) -> LowerResult<Place> {
        let mut props = Vec::new();
        for member in members {
            props.push(match member {
                ObjectMember::Property {
                    key, value, method, ..
                } => {
                    let key = self.lower_prop_key(key)?;
                    let value = self.lower_expr(value)?;
                    ObjectProperty::Property {
                        key,
                        value,
                        method: *method,
                    }
                }
                ObjectMember::Spread(e) => ObjectProperty::Spread(self.lower_expr(e)?),
            });
        }
        Ok(self.push(InstructionValue::ObjectExpression(props), span))
    }

    fn lower_prop_key(&mut self, key: &PropKey) -> LowerResult<PropertyKey> {
        match key {
            PropKey::Computed(e) => Ok(PropertyKey::Computed(self.lower_expr(e)?)),
            _ => Ok(PropertyKey::Named(key.static_name().unwrap_or_default())),
        }
    }

    /// Lower a nested function with its own builder sharing the identifier
    /// arena. Names it resolves in enclosing scopes become its context.
    pub(super) fn lower_function_expr(
        &mut self,
        func: &ast::Function,
        span: Span,
    ) -> LowerResult<Place> {
        if func.is_generator {
            return Err(CompilerError::unsupported("generator functions", span));
        }
        let ctx = FunctionContext {
            this_allowed: !func.is_arrow || self.ctx.this_allowed,
            await_allowed: func.is_async,
        };
        let scopes = self.scopes.clone();
        let (hir, captured) = HirBuilder::new(&mut *self.env, scopes, ctx).build(func)?;
        let mut context = Vec::new();
        for (place, scope_index) in captured {
            if scope_index < self.outer_scopes {
                self.capture(place, scope_index);
            }
            context.push(place);
        }
        Ok(self.push(
            InstructionValue::FunctionExpression {
                lowered: LoweredFunction {
                    func: Box::new(hir),
                    ast: Box::new(func.clone()),
                },
                context,
            },
            span,
        ))
    }

    // ─── Calls and member chains ───────────────────────────────────

    /// `useMemo` / `useCallback` with an inline callback, and `eval`.
    fn lower_special_call(
        &mut self,
        name: &str,
        args: &[Argument],
        callee_span: Span,
        span: Span,
    ) -> LowerResult<Option<Place>> {
        if self.scopes.iter().any(|s| s.bindings.contains_key(name)) {
            return Ok(None);
        }
        if name == "eval" {
            return Err(CompilerError::unsupported("`eval`", callee_span));
        }
        let Some(kind) = manual_memo_kind(name) else {
            return Ok(None);
        };
        let Some(Argument::Expr(callback)) = args.first() else {
            return Ok(None);
        };
        let Expr::Function(func) = &callback.node else {
            return Ok(None);
        };
        if !func.params.is_empty() || func.is_async || func.is_generator {
            return Ok(None);
        }
        match kind {
            ManualMemo::UseCallback => {
                let place = self.lower_function_expr(func, callback.span)?;
                self.manual_memos.push(place.identifier);
                Ok(Some(place))
            }
            ManualMemo::UseMemo => {
                if !self.value_blocks.is_empty() {
                    return Ok(None);
                }
                self.inline_memo_callback(func, span).map(Some)
            }
        }
    }

    /// Inline a `useMemo` callback body into a labeled block whose
    /// `return`s assign a synthesized binding and break out.
    fn inline_memo_callback(&mut self, func: &ast::Function, span: Span) -> LowerResult<Place> {
        let binding = Place::new(self.env.new_binding(None, span), span);
        self.push(
            InstructionValue::DeclareLocal {
                kind: StoreKind::Let,
                target: binding,
            },
            span,
        );
        let label = LabelName::Generated(self.next_label);
        self.next_label += 1;
        let id = self.env.next_instr_id();
        let block = self.reserve_block();
        let fallthrough = self.reserve_block();
        self.terminate(
            id,
            TerminalKind::Label {
                label: label.clone(),
                block,
                fallthrough,
            },
            span,
            block,
        );

        let saved_targets = std::mem::take(&mut self.targets);
        self.return_overrides.push(ReturnOverride {
            binding,
            label,
            exit: fallthrough,
        });
        self.push_scope();
        let result = match &func.body {
            FunctionBody::Block(stmts) => self.lower_stmts(stmts, true),
            FunctionBody::Expr(expr) => {
                self.begin_statement();
                self.lower_expr(expr).map(|value| {
                    self.push(
                        InstructionValue::StoreLocal {
                            kind: StoreKind::Reassign,
                            target: binding,
                            value,
                        },
                        expr.span,
                    );
                })
            }
        };
        self.pop_scope();
        self.return_overrides.pop();
        self.targets = saved_targets;
        result?;

        self.goto(fallthrough, GotoKind::Fallthrough, span, fallthrough);
        self.push_region(id, RegionKind::Label, None);
        self.begin_statement();
        self.manual_memos.push(binding.identifier);
        Ok(self.push(InstructionValue::LoadLocal(binding), span))
    }

    /// Lower a member/call chain, wrapping the part after each `?.` in an
    /// `Optional` instruction.
    fn lower_chain(&mut self, expr: &Spanned<Expr>) -> LowerResult<Place> {
        let mut links = Vec::new();
        let mut node = expr;
        loop {
            match &node.node {
                Expr::Member {
                    object,
                    property,
                    optional,
                } => {
                    links.push(ChainLink {
                        link: Link::Member(property),
                        optional: *optional,
                        span: node.span,
                    });
                    node = object.as_ref();
                }
                Expr::Call {
                    callee,
                    args,
                    optional,
                } => match &callee.node {
                    Expr::Member {
                        object,
                        property,
                        optional: member_optional,
                    } => {
                        if *optional {
                            return Err(CompilerError::unsupported(
                                "optional call of a method",
                                node.span,
                            ));
                        }
                        links.push(ChainLink {
                            link: Link::Method(property, args),
                            optional: *member_optional,
                            span: node.span,
                        });
                        node = object.as_ref();
                    }
                    _ => {
                        links.push(ChainLink {
                            link: Link::Call(args),
                            optional: *optional,
                            span: node.span,
                        });
                        node = callee.as_ref();
                    }
                },
                _ => break,
            }
        }
        links.reverse();
        let base = self.lower_expr(node)?;
        self.apply_links(base, &links, false)
    }

    fn apply_links(
        &mut self,
        mut place: Place,
        links: &[ChainLink<'_>],
        first_checked: bool,
    ) -> LowerResult<Place> {
        for (i, link) in links.iter().enumerate() {
            if link.optional && !(first_checked && i == 0) {
                let object = place;
                let rest = &links[i..];
                let chain = self.value_block(|this| this.apply_links(object, rest, true))?;
                let span = links.last().map_or(link.span, |l| l.span);
                return Ok(self.push(InstructionValue::Optional { object, chain }, span));
            }
            place = self.apply_link(place, &link.link, link.span)?;
        }
        Ok(place)
    }

    fn apply_link(&mut self, place: Place, link: &Link<'_>, span: Span) -> LowerResult<Place> {
        let value = match link {
            Link::Member(MemberProp::Ident(name)) => InstructionValue::PropertyLoad {
                object: place,
                property: name.clone(),
            },
            Link::Member(MemberProp::Computed(e)) => {
                let property = self.lower_expr(e)?;
                InstructionValue::ComputedLoad {
                    object: place,
                    property,
                }
            }
            Link::Call(args) => {
                let args = self.lower_args(args)?;
                InstructionValue::Call {
                    callee: place,
                    args,
                }
            }
            Link::Method(property, args) => {
                let property = match property {
                    MemberProp::Ident(name) => PropertyKey::Named(name.clone()),
                    MemberProp::Computed(e) => PropertyKey::Computed(self.lower_expr(e)?),
                };
                let args = self.lower_args(args)?;
                InstructionValue::MethodCall {
                    receiver: place,
                    property,
                    args,
                }
            }
        };
        Ok(self.push(value, span))
    }

    // ─── Operators ─────────────────────────────────────────────────

    fn lower_unary(
        &mut self,
        op: ast::UnaryOp,
        arg: &Spanned<Expr>,
        span: Span,
    ) -> LowerResult<Place> {
        if op != ast::UnaryOp::Delete {
            let operand = self.lower_expr(arg)?;
            return Ok(self.push(InstructionValue::UnaryOp { op, operand }, span));
        }
        let Expr::Member {
            object,
            property,
            optional: false,
        } = &arg.node
        else {
            return Err(CompilerError::unsupported(
                "`delete` of a non-member expression",
                span,
            ));
        };
        let object = self.lower_expr(object)?;
        let value = match property {
            MemberProp::Ident(name) => InstructionValue::PropertyDelete {
                object,
                property: name.clone(),
            },
            MemberProp::Computed(e) => InstructionValue::ComputedDelete {
                object,
                property: self.lower_expr(e)?,
            },
        };
        Ok(self.push(value, span))
    }

    fn lower_update(
        &mut self,
        op: ast::UpdateOp,
        prefix: bool,
        arg: &Spanned<Expr>,
        span: Span,
    ) -> LowerResult<Place> {
        if let Expr::Ident(name) = &arg.node {
            if let Some(target) = self.lookup(name, arg.span) {
                return Ok(self.push(InstructionValue::Update { op, prefix, target }, span));
            }
            let old = self.push(InstructionValue::LoadGlobal(name.clone()), arg.span);
            let (number, updated) = self.numeric_step(op, old, span);
            let stored = self.store_name(name, updated, arg.span, span);
            return Ok(if prefix { stored } else { number });
        }
        let mut target = self.lower_member_target(arg)?;
        let old = self.load_member(&mut target, span)?;
        let (number, updated) = self.numeric_step(op, old, span);
        let stored = self.store_member(&mut target, updated, span)?;
        Ok(if prefix { stored } else { number })
    }

    /// `+old` and `+old ± 1`.
    fn numeric_step(&mut self, op: ast::UpdateOp, old: Place, span: Span) -> (Place, Place) {
        let number = self.push(
            InstructionValue::UnaryOp {
                op: ast::UnaryOp::Plus,
                operand: old,
            },
            span,
        );
        let one = self.primitive(Primitive::Number(1.0), span);
        let op = match op {
            ast::UpdateOp::Increment => ast::BinOp::Add,
            ast::UpdateOp::Decrement => ast::BinOp::Sub,
        };
        let updated = self.push(
            InstructionValue::BinaryOp {
                op,
                left: number,
                right: one,
            },
            span,
        );
        (number, updated)
    }

    // ─── Assignment ────────────────────────────────────────────────

    fn lower_assign(
        &mut self,
        op: AssignOp,
        target: &Spanned<Pattern>,
        value: &Spanned<Expr>,
        span: Span,
    ) -> LowerResult<Place> {
        match (op, &target.node) {
            (AssignOp::Assign, Pattern::Ident(name)) => {
                let value = self.lower_expr(value)?;
                Ok(self.store_name(name, value, target.span, span))
            }
            (AssignOp::Assign, Pattern::Member(member)) => {
                let mut target = self.lower_member_target(member)?;
                let value = self.lower_expr(value)?;
                self.store_member(&mut target, value, span)
            }
            (AssignOp::Assign, _) => {
                let value = self.lower_expr(value)?;
                self.lower_assignment_pattern(target, value)?;
                Ok(value)
            }
            (AssignOp::Compound(bin), Pattern::Ident(name)) => {
                let current = self.load_name(name, target.span)?;
                let rhs = self.lower_expr(value)?;
                let result = self.push(
                    InstructionValue::BinaryOp {
                        op: bin,
                        left: current,
                        right: rhs,
                    },
                    span,
                );
                Ok(self.store_name(name, result, target.span, span))
            }
            (AssignOp::Compound(bin), Pattern::Member(member)) => {
                let mut target = self.lower_member_target(member)?;
                let current = self.load_member(&mut target, span)?;
                let rhs = self.lower_expr(value)?;
                let result = self.push(
                    InstructionValue::BinaryOp {
                        op: bin,
                        left: current,
                        right: rhs,
                    },
                    span,
                );
                self.store_member(&mut target, result, span)
            }
            (AssignOp::Logical(logical), Pattern::Ident(name)) => {
                let left = self.load_name(name, target.span)?;
                let right = self.value_block(|this| {
                    let value = this.lower_expr(value)?;
                    Ok(this.store_name(name, value, target.span, span))
                })?;
                Ok(self.push(
                    InstructionValue::Logical {
                        op: logical,
                        left,
                        right,
                    },
                    span,
                ))
            }
            (AssignOp::Logical(logical), Pattern::Member(member)) => {
                let mut target = self.lower_member_target(member)?;
                let left = self.load_member(&mut target, span)?;
                let right = self.value_block(|this| {
                    let value = this.lower_expr(value)?;
                    this.store_member(&mut target, value, span)
                })?;
                Ok(self.push(
                    InstructionValue::Logical {
                        op: logical,
                        left,
                        right,
                    },
                    span,
                ))
            }
            _ => Err(CompilerError::unsupported(
                "compound assignment to a pattern",
                span,
            )),
        }
    }

    /// Evaluate the object and key of a member target once. Names and
    /// literals are re-read at each use instead of being shared.
    fn lower_member_target<'e>(&mut self, expr: &'e Spanned<Expr>) -> LowerResult<MemberTarget<'e>> {
        let Expr::Member {
            object,
            property,
            optional: false,
        } = &expr.node
        else {
            return Err(CompilerError::unsupported("invalid assignment target", expr.span));
        };
        let object_place = self.lower_expr(object)?;
        let key = match property {
            MemberProp::Ident(name) => TargetKey::Named(name.clone()),
            MemberProp::Computed(e) => TargetKey::Computed(self.lower_expr(e)?, e),
        };
        Ok(MemberTarget {
            object: object_place,
            object_expr: object,
            key,
            used: false,
        })
    }

    /// The object place for the next use of a member target.
    fn target_object(&mut self, target: &MemberTarget<'_>) -> LowerResult<Place> {
        if target.used && is_rereadable(&target.object_expr.node) {
            return self.lower_expr(target.object_expr);
        }
        Ok(target.object)
    }

    fn target_key(&mut self, target: &MemberTarget<'_>) -> LowerResult<PropertyKey> {
        match &target.key {
            TargetKey::Named(name) => Ok(PropertyKey::Named(name.clone())),
            TargetKey::Computed(place, expr) => {
                if target.used && is_rereadable(&expr.node) {
                    Ok(PropertyKey::Computed(self.lower_expr(expr)?))
                } else {
                    Ok(PropertyKey::Computed(*place))
                }
            }
        }
    }

    fn load_member(&mut self, target: &mut MemberTarget<'_>, span: Span) -> LowerResult<Place> {
        let object = self.target_object(target)?;
        let key = self.target_key(target)?;
        target.used = true;
        let value = match key {
            PropertyKey::Named(property) => InstructionValue::PropertyLoad { object, property },
            PropertyKey::Computed(property) => InstructionValue::ComputedLoad { object, property },
        };
        Ok(self.push(value, span))
    }

    fn store_member(
        &mut self,
        target: &mut MemberTarget<'_>,
        value: Place,
        span: Span,
    ) -> LowerResult<Place> {
        let object = self.target_object(target)?;
        let key = self.target_key(target)?;
        target.used = true;
        let store = match key {
            PropertyKey::Named(property) => InstructionValue::PropertyStore {
                object,
                property,
                value,
            },
            PropertyKey::Computed(property) => InstructionValue::ComputedStore {
                object,
                property,
                value,
            },
        };
        Ok(self.push(store, span))
    }

    // ─── Patterns ──────────────────────────────────────────────────

    /// Bind a declaration pattern to `value`.
    pub(super) fn lower_binding_pattern(
        &mut self,
        pattern: &Spanned<Pattern>,
        kind: StoreKind,
        value: Place,
    ) -> LowerResult<()> {
        match &pattern.node {
            Pattern::Ident(name) => {
                let target = self.declare(name, pattern.span);
                self.push(InstructionValue::StoreLocal { kind, target, value }, pattern.span);
                Ok(())
            }
            Pattern::Default { target, default } => {
                let value = self.apply_default(value, default)?;
                self.lower_binding_pattern(target, kind, value)
            }
            Pattern::Rest(inner) => self.lower_binding_pattern(inner, kind, value),
            Pattern::Object { .. } | Pattern::Array { .. } => {
                let mut deferred = Vec::new();
                let hir = self.build_pattern(pattern, LeafMode::Declare, &mut deferred)?;
                self.push(
                    InstructionValue::Destructure {
                        kind,
                        pattern: hir,
                        value,
                    },
                    pattern.span,
                );
                for item in deferred {
                    let value = match item.default {
                        Some(default) => self.apply_default(item.temp, default)?,
                        None => item.temp,
                    };
                    self.lower_binding_pattern(item.target, kind, value)?;
                }
                Ok(())
            }
            Pattern::Member(_) => Err(CompilerError::unsupported(
                "member expression in a declaration",
                pattern.span,
            )),
        }
    }

    /// Assign an assignment pattern (`[a, b] = …`) from `value`.
    fn lower_assignment_pattern(
        &mut self,
        pattern: &Spanned<Pattern>,
        value: Place,
    ) -> LowerResult<()> {
        if let Some(hir) = self.simple_reassign_pattern(pattern) {
            self.push(
                InstructionValue::Destructure {
                    kind: StoreKind::Reassign,
                    pattern: hir,
                    value,
                },
                pattern.span,
            );
            return Ok(());
        }
        let mut deferred = Vec::new();
        let hir = self.build_pattern(pattern, LeafMode::Temporary, &mut deferred)?;
        self.push(
            InstructionValue::Destructure {
                kind: StoreKind::Const,
                pattern: hir,
                value,
            },
            pattern.span,
        );
        for item in deferred {
            let value = match item.default {
                Some(default) => self.apply_default(item.temp, default)?,
                None => item.temp,
            };
            self.assign_to(item.target, value)?;
        }
        Ok(())
    }

    fn assign_to(&mut self, target: &Spanned<Pattern>, value: Place) -> LowerResult<()> {
        match &target.node {
            Pattern::Ident(name) => {
                self.store_name(name, value, target.span, target.span);
                Ok(())
            }
            Pattern::Member(member) => {
                let mut member = self.lower_member_target(member)?;
                self.store_member(&mut member, value, target.span)?;
                Ok(())
            }
            Pattern::Default { target, default } => {
                let value = self.apply_default(value, default)?;
                self.assign_to(target, value)
            }
            Pattern::Rest(inner) => self.assign_to(inner, value),
            Pattern::Object { .. } | Pattern::Array { .. } => {
                self.lower_assignment_pattern(target, value)
            }
        }
    }

    /// A reassignment pattern whose leaves are all local bindings.
    fn simple_reassign_pattern(&mut self, pattern: &Spanned<Pattern>) -> Option<HirPattern> {
        match &pattern.node {
            Pattern::Ident(name) => self.lookup(name, pattern.span).map(HirPattern::Place),
            Pattern::Object { props, rest } => {
                let mut out = Vec::new();
                for prop in props {
                    let key = prop.key.static_name()?;
                    out.push((PropertyKey::Named(key), self.simple_reassign_pattern(&prop.value)?));
                }
                let rest = match rest {
                    Some(rest) => Some(self.simple_reassign_leaf(rest)?),
                    None => None,
                };
                Some(HirPattern::Object { props: out, rest })
            }
            Pattern::Array { elements, rest } => {
                let mut items = Vec::new();
                for element in elements {
                    items.push(match element {
                        Some(element) => Some(self.simple_reassign_pattern(element)?),
                        None => None,
                    });
                }
                let rest = match rest {
                    Some(rest) => Some(self.simple_reassign_leaf(rest)?),
                    None => None,
                };
                Some(HirPattern::Array { items, rest })
            }
            _ => None,
        }
    }

    fn simple_reassign_leaf(&mut self, pattern: &Spanned<Pattern>) -> Option<Place> {
        match &pattern.node {
            Pattern::Ident(name) => self.lookup(name, pattern.span),
            _ => None,
        }
    }

    /// Build the structural part of a pattern. Leaves that need a default
    /// or a later assignment become temporaries recorded in `deferred`.
    fn build_pattern<'p>(
        &mut self,
        pattern: &'p Spanned<Pattern>,
        mode: LeafMode,
        deferred: &mut Vec<Deferred<'p>>,
    ) -> LowerResult<HirPattern> {
        match &pattern.node {
            Pattern::Ident(name) if mode == LeafMode::Declare => {
                Ok(HirPattern::Place(self.declare(name, pattern.span)))
            }
            Pattern::Object { props, rest } => {
                let mut out = Vec::new();
                for prop in props {
                    let key = self.lower_prop_key(&prop.key)?;
                    out.push((key, self.build_pattern(&prop.value, mode, deferred)?));
                }
                let rest = match rest {
                    Some(rest) => Some(self.pattern_leaf(rest, mode, deferred)),
                    None => None,
                };
                Ok(HirPattern::Object { props: out, rest })
            }
            Pattern::Array { elements, rest } => {
                let mut items = Vec::new();
                for element in elements {
                    items.push(match element {
                        Some(element) => Some(self.build_pattern(element, mode, deferred)?),
                        None => None,
                    });
                }
                let rest = match rest {
                    Some(rest) => Some(self.pattern_leaf(rest, mode, deferred)),
                    None => None,
                };
                Ok(HirPattern::Array { items, rest })
            }
            Pattern::Default { target, default } => {
                let temp = self.temporary(pattern.span);
                deferred.push(Deferred {
                    temp,
                    target: target.as_ref(),
                    default: Some(default.as_ref()),
                });
                Ok(HirPattern::Place(temp))
            }
            Pattern::Rest(inner) => self.build_pattern(inner, mode, deferred),
            Pattern::Ident(_) | Pattern::Member(_) => {
                Ok(HirPattern::Place(self.pattern_leaf(pattern, mode, deferred)))
            }
        }
    }

    /// A rest target or plain leaf: a declared binding, or a temporary.
    fn pattern_leaf<'p>(
        &mut self,
        pattern: &'p Spanned<Pattern>,
        mode: LeafMode,
        deferred: &mut Vec<Deferred<'p>>,
    ) -> Place {
        if let (Pattern::Ident(name), LeafMode::Declare) = (&pattern.node, mode) {
            return self.declare(name, pattern.span);
        }
        let temp = self.temporary(pattern.span);
        deferred.push(Deferred {
            temp,
            target: pattern,
            default: None,
        });
        temp
    }

    /// `value === undefined ? default : value`
    fn apply_default(&mut self, value: Place, default: &Spanned<Expr>) -> LowerResult<Place> {
        let span = default.span;
        let undefined = self.primitive(Primitive::Undefined, span);
        let test = self.push(
            InstructionValue::BinaryOp {
                op: ast::BinOp::StrictEq,
                left: value,
                right: undefined,
            },
            span,
        );
        let consequent = self.value_block(|this| this.lower_expr(default))?;
        let alternate = ValueBlock {
            instructions: Vec::new(),
            result: value,
        };
        Ok(self.push(
            InstructionValue::Ternary {
                test,
                consequent,
                alternate,
            },
            span,
        ))
    }
}

enum TargetKey<'e> {
    Named(String),
    Computed(Place, &'e Spanned<Expr>),
}

struct MemberTarget<'e> {
    object: Place,
    object_expr: &'e Spanned<Expr>,
    key: TargetKey<'e>,
    used: bool,
}

/// Expressions that read the same value when evaluated twice in a row.
fn is_rereadable(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Ident(_) | Expr::Number(_) | Expr::Str(_) | Expr::Bool(_) | Expr::Null | Expr::This
    )
}
