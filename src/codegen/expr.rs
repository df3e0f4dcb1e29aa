//! Instructions back to expressions.

use super::*;
use crate::ast::{
    Argument, ArrayElement, ObjectMember, ObjectPatternProp, PropKey, UnaryOp,
};
use crate::hir::{
    ArrayItem, CallArg, HirPattern, ObjectProperty, Place, Primitive, PropertyKey, StoreKind,
};

impl Codegen<'_> {
    /// Emit one instruction: as a statement, as a pending expression for
    /// its single reader, or as a variable.
    pub(super) fn instruction(
        &mut self,
        instr: &Instruction,
        out: &mut Out<'_>,
    ) -> Result<(), CompilerError> {
        use InstructionValue as V;
        let declared = match &instr.value {
            V::StoreLocal {
                kind,
                target,
                value,
            } if kind.is_declaration() => {
                let init = self.take(*value)?;
                self.declare(*kind, &HirPattern::Place(*target), Some(init), out)?;
                Some(*target)
            }
            V::DeclareLocal { kind, target } => {
                self.declare(*kind, &HirPattern::Place(*target), None, out)?;
                Some(*target)
            }
            V::Destructure {
                kind,
                pattern,
                value,
            } if kind.is_declaration() => {
                let init = self.take(*value)?;
                self.declare(*kind, pattern, Some(init), out)?;
                pattern.places().first().copied()
            }
            _ => None,
        };
        if let Some(target) = declared {
            let uses = self.uses(instr.lvalue.identifier);
            if uses > 0 {
                let name = self.name(target.identifier);
                self.pending.push(Pending {
                    id: instr.lvalue.identifier,
                    expr: Expr::Ident(name),
                    remaining: uses,
                });
            }
            return Ok(());
        }

        let expr = self.expression(&instr.value)?;
        let id = instr.lvalue.identifier;
        let uses = self.uses(id);
        if self.is_variable(id) {
            self.flush(out);
            self.write_variable(id, expr, out);
        } else if uses == 0 {
            if has_effects(&instr.value) {
                self.effect(expr, out);
            }
        } else if uses == 1 || is_duplicable(&instr.value) {
            self.pending.push(Pending {
                id,
                expr,
                remaining: uses,
            });
        } else {
            self.variables.insert(id);
            self.flush(out);
            self.write_variable(id, expr, out);
        }
        Ok(())
    }

    /// `const x = v;`, `let x;`, a function declaration, or, when a target
    /// was hoisted by a scope, an assignment.
    fn declare(
        &mut self,
        kind: StoreKind,
        pattern: &HirPattern,
        init: Option<Expr>,
        out: &mut Out<'_>,
    ) -> Result<(), CompilerError> {
        self.flush(out);
        let leaves = pattern.places();
        let in_block = matches!(out, Out::Block(_));
        let any_hoisted = leaves.iter().any(|p| self.hoisted.contains(&p.identifier));
        if in_block && !any_hoisted {
            let target = self.pattern(pattern)?;
            if let (StoreKind::Function, Some(Expr::Function(func)), Pattern::Ident(name)) =
                (kind, &init, &target)
            {
                if func.name_str() == Some(name.as_str()) {
                    return self.push_stmt(Stmt::FunctionDecl((**func).clone()), out);
                }
            }
            let kind = match kind {
                StoreKind::Const => DeclKind::Const,
                _ => DeclKind::Let,
            };
            return self.push_stmt(
                Stmt::VarDecl {
                    kind,
                    decls: vec![Declarator {
                        target: sp(target),
                        init: init.map(sp),
                    }],
                },
                out,
            );
        }

        let mut fresh = Vec::new();
        for leaf in &leaves {
            if self.hoisted.insert(leaf.identifier) {
                fresh.push(self.name(leaf.identifier));
            }
        }
        if !fresh.is_empty() {
            match out {
                Out::Block(stmts) => stmts.push(sp(Stmt::VarDecl {
                    kind: DeclKind::Let,
                    decls: fresh
                        .into_iter()
                        .map(|name| Declarator {
                            target: sp(Pattern::Ident(name)),
                            init: None,
                        })
                        .collect(),
                })),
                Out::Sequence(_) => self.function_lets.extend(fresh),
            }
        }
        if let Some(init) = init {
            let target = self.pattern(pattern)?;
            out.push_expr(Expr::assign(target, sp(init)));
        }
        Ok(())
    }

    /// The expression computing an instruction's value; consumes the
    /// pending expressions of its operands.
    fn expression(&mut self, value: &InstructionValue) -> Result<Expr, CompilerError> {
        use InstructionValue as V;
        Ok(match value {
            V::Primitive(primitive) => primitive_expr(primitive),
            V::LoadLocal(place) => self.take(*place)?,
            V::LoadGlobal(name) => Expr::Ident(name.clone()),
            V::LoadThis => Expr::This,
            V::StoreLocal { target, value, .. } => {
                let value = self.take(*value)?;
                Expr::assign(Pattern::Ident(self.name(target.identifier)), sp(value))
            }
            V::StoreGlobal { name, value } => {
                let value = self.take(*value)?;
                Expr::assign(Pattern::Ident(name.clone()), sp(value))
            }
            V::DeclareLocal { target, .. } => Expr::Ident(self.name(target.identifier)),
            V::Destructure { pattern, value, .. } => {
                let value = self.take(*value)?;
                let target = self.pattern(pattern)?;
                Expr::assign(target, sp(value))
            }
            V::BinaryOp { op, left, right } => {
                let left = self.take(*left)?;
                let right = self.take(*right)?;
                Expr::binary(*op, sp(left), sp(right))
            }
            V::UnaryOp { op, operand } => Expr::Unary {
                op: *op,
                arg: Box::new(sp(self.take(*operand)?)),
            },
            V::Update { op, prefix, target } => Expr::Update {
                op: *op,
                prefix: *prefix,
                arg: Box::new(sp(Expr::Ident(self.name(target.identifier)))),
            },
            V::PropertyLoad { object, property } => {
                let optional = self.optional_link(*object);
                let object = self.take(*object)?;
                Expr::Member {
                    object: Box::new(sp(object)),
                    property: member_prop(property),
                    optional,
                }
            }
            V::ComputedLoad { object, property } => {
                let optional = self.optional_link(*object);
                self.computed_member(*object, *property, optional)?
            }
            V::PropertyStore {
                object,
                property,
                value,
            } => {
                let object = self.take(*object)?;
                let value = self.take(*value)?;
                let target = Expr::Member {
                    object: Box::new(sp(object)),
                    property: member_prop(property),
                    optional: false,
                };
                Expr::assign(Pattern::Member(Box::new(sp(target))), sp(value))
            }
            V::ComputedStore {
                object,
                property,
                value,
            } => {
                let target = self.computed_member(*object, *property, false)?;
                let value = self.take(*value)?;
                Expr::assign(Pattern::Member(Box::new(sp(target))), sp(value))
            }
            V::PropertyDelete { object, property } => {
                let object = self.take(*object)?;
                Expr::Unary {
                    op: UnaryOp::Delete,
                    arg: Box::new(sp(Expr::Member {
                        object: Box::new(sp(object)),
                        property: member_prop(property),
                        optional: false,
                    })),
                }
            }
            V::ComputedDelete { object, property } => Expr::Unary {
                op: UnaryOp::Delete,
                arg: Box::new(sp(self.computed_member(*object, *property, false)?)),
            },
            V::Call { callee, args } => {
                let optional = self.optional_link(*callee);
                let callee = match self.take(*callee)? {
                    // Calling a loaded member must not bind `this`.
                    member @ (Expr::Member { .. } | Expr::Chain(_)) => {
                        Expr::Sequence(vec![sp(Expr::Number(0.0)), sp(member)])
                    }
                    other => other,
                };
                Expr::Call {
                    callee: Box::new(sp(callee)),
                    args: self.args(args)?,
                    optional,
                }
            }
            V::MethodCall {
                receiver,
                property,
                args,
            } => {
                let optional = self.optional_link(*receiver);
                let object = self.take(*receiver)?;
                let property = match property {
                    PropertyKey::Named(name) => member_prop(name),
                    PropertyKey::Computed(place) => {
                        MemberProp::Computed(Box::new(sp(self.take(*place)?)))
                    }
                };
                Expr::Call {
                    callee: Box::new(sp(Expr::Member {
                        object: Box::new(sp(object)),
                        property,
                        optional,
                    })),
                    args: self.args(args)?,
                    optional: false,
                }
            }
            V::New { callee, args } => Expr::New {
                callee: Box::new(sp(self.take(*callee)?)),
                args: self.args(args)?,
            },
            V::ArrayExpression(items) => {
                let mut elements = Vec::new();
                for item in items {
                    elements.push(match item {
                        ArrayItem::Hole => ArrayElement::Hole,
                        ArrayItem::Place(p) => ArrayElement::Expr(sp(self.take(*p)?)),
                        ArrayItem::Spread(p) => ArrayElement::Spread(sp(self.take(*p)?)),
                    });
                }
                Expr::Array(elements)
            }
            V::ObjectExpression(props) => {
                let mut members = Vec::new();
                for prop in props {
                    members.push(match prop {
                        ObjectProperty::Property { key, value, method } => {
                            let key = self.prop_key(key)?;
                            let value = self.take(*value)?;
                            let shorthand = !*method
                                && matches!((&key, &value), (PropKey::Ident(k), Expr::Ident(v)) if k == v);
                            ObjectMember::Property {
                                key,
                                value: sp(value),
                                shorthand,
                                method: *method,
                            }
                        }
                        ObjectProperty::Spread(p) => ObjectMember::Spread(sp(self.take(*p)?)),
                    });
                }
                Expr::Object(members)
            }
            V::TemplateLiteral { quasis, exprs } => Expr::Template {
                quasis: quasis.clone(),
                exprs: self.takes(exprs)?,
            },
            V::TaggedTemplate { tag, quasis, exprs } => Expr::TaggedTemplate {
                tag: Box::new(sp(self.take(*tag)?)),
                quasis: quasis.clone(),
                exprs: self.takes(exprs)?,
            },
            V::FunctionExpression { lowered, .. } => Expr::Function(lowered.ast.clone()),
            V::Await(place) => Expr::Await(Box::new(sp(self.take(*place)?))),
            V::Logical { op, left, right } => {
                let left = self.take(*left)?;
                let right = self.sequence(&right.instructions, right.result)?;
                Expr::Logical {
                    op: *op,
                    left: Box::new(sp(left)),
                    right: Box::new(sp(right)),
                }
            }
            V::Ternary {
                test,
                consequent,
                alternate,
            } => {
                let test = self.take(*test)?;
                let consequent = self.sequence(&consequent.instructions, consequent.result)?;
                let alternate = self.sequence(&alternate.instructions, alternate.result)?;
                Expr::Conditional {
                    test: Box::new(sp(test)),
                    consequent: Box::new(sp(consequent)),
                    alternate: Box::new(sp(alternate)),
                }
            }
            V::Optional { object, chain } => {
                let saved = self.optional_object.replace(object.identifier);
                let inner = self.sequence(&chain.instructions, chain.result);
                self.optional_object = saved;
                Expr::Chain(Box::new(sp(inner?)))
            }
        })
    }

    /// A value block as one expression: its effects and its result joined
    /// by commas.
    pub(super) fn sequence(
        &mut self,
        instrs: &[Instruction],
        result: Place,
    ) -> Result<Expr, CompilerError> {
        let saved = std::mem::replace(&mut self.base, self.pending.len());
        let mut effects = Vec::new();
        for instr in instrs {
            self.instruction(instr, &mut Out::Sequence(&mut effects))?;
        }
        let value = self.take(result)?;
        // Nothing outside the block reads what is left.
        self.pending.truncate(self.base);
        self.base = saved;
        if effects.is_empty() {
            return Ok(value);
        }
        effects.push(sp(value));
        Ok(Expr::Sequence(effects))
    }

    /// The expression for a place: its variable, or its pending expression.
    pub(super) fn take(&mut self, place: Place) -> Result<Expr, CompilerError> {
        let id = place.identifier;
        if self.is_variable(id) {
            return Ok(Expr::Ident(self.name(id)));
        }
        let Some(index) = self.pending.iter().rposition(|p| p.id == id) else {
            return Err(CompilerError::invalid(
                "temporary read before it is computed",
                place.span,
            ));
        };
        let entry = &mut self.pending[index];
        entry.remaining = entry.remaining.saturating_sub(1);
        if entry.remaining == 0 {
            Ok(self.pending.remove(index).expr)
        } else {
            Ok(entry.expr.clone())
        }
    }

    fn takes(&mut self, places: &[Place]) -> Result<Vec<Spanned<Expr>>, CompilerError> {
        places.iter().map(|p| self.take(*p).map(sp)).collect()
    }

    fn args(&mut self, args: &[CallArg]) -> Result<Vec<Argument>, CompilerError> {
        args.iter()
            .map(|arg| match arg {
                CallArg::Place(p) => self.take(*p).map(|e| Argument::Expr(sp(e))),
                CallArg::Spread(p) => self.take(*p).map(|e| Argument::Spread(sp(e))),
            })
            .collect()
    }

    fn computed_member(
        &mut self,
        object: Place,
        property: Place,
        optional: bool,
    ) -> Result<Expr, CompilerError> {
        let object = self.take(object)?;
        let property = self.take(property)?;
        Ok(Expr::Member {
            object: Box::new(sp(object)),
            property: MemberProp::Computed(Box::new(sp(property))),
            optional,
        })
    }

    /// Whether `object` is the object of the optional chain being emitted;
    /// only its first link is written with `?.`.
    fn optional_link(&mut self, object: Place) -> bool {
        if self.optional_object == Some(object.identifier) {
            self.optional_object = None;
            true
        } else {
            false
        }
    }

    fn prop_key(&mut self, key: &PropertyKey) -> Result<PropKey, CompilerError> {
        Ok(match key {
            PropertyKey::Named(name) if names::is_identifier_name(name) => {
                PropKey::Ident(name.clone())
            }
            PropertyKey::Named(name) => PropKey::Str(name.clone()),
            PropertyKey::Computed(place) => PropKey::Computed(Box::new(sp(self.take(*place)?))),
        })
    }

    pub(super) fn pattern(&mut self, pattern: &HirPattern) -> Result<Pattern, CompilerError> {
        Ok(match pattern {
            HirPattern::Place(place) => Pattern::Ident(self.name(place.identifier)),
            HirPattern::Object { props, rest } => {
                let mut out = Vec::new();
                for (key, value) in props {
                    let key = self.prop_key(key)?;
                    let value = self.pattern(value)?;
                    let shorthand =
                        matches!((&key, &value), (PropKey::Ident(k), Pattern::Ident(v)) if k == v);
                    out.push(ObjectPatternProp {
                        key,
                        value: sp(value),
                        shorthand,
                    });
                }
                Pattern::Object {
                    props: out,
                    rest: self.rest(*rest),
                }
            }
            HirPattern::Array { items, rest } => {
                let mut elements = Vec::new();
                for item in items {
                    elements.push(match item {
                        Some(item) => Some(sp(self.pattern(item)?)),
                        None => None,
                    });
                }
                Pattern::Array {
                    elements,
                    rest: self.rest(*rest),
                }
            }
        })
    }

    fn rest(&mut self, rest: Option<Place>) -> Option<Box<Spanned<Pattern>>> {
        rest.map(|place| Box::new(sp(Pattern::Ident(self.name(place.identifier)))))
    }
}

fn primitive_expr(primitive: &Primitive) -> Expr {
    match primitive {
        Primitive::Undefined => Expr::ident("undefined"),
        Primitive::Null => Expr::Null,
        Primitive::Bool(b) => Expr::Bool(*b),
        Primitive::Number(n) if *n < 0.0 || (*n == 0.0 && n.is_sign_negative()) => Expr::Unary {
            op: UnaryOp::Neg,
            arg: Box::new(sp(Expr::Number(-n))),
        },
        Primitive::Number(n) => Expr::Number(*n),
        Primitive::String(s) => Expr::Str(s.clone()),
    }
}

/// Values that are as cheap to recompute as to read from a variable.
fn is_duplicable(value: &InstructionValue) -> bool {
    matches!(
        value,
        InstructionValue::Primitive(_)
            | InstructionValue::LoadLocal(_)
            | InstructionValue::LoadGlobal(_)
            | InstructionValue::LoadThis
    )
}

fn has_effects(value: &InstructionValue) -> bool {
    !matches!(
        value,
        InstructionValue::Primitive(_)
            | InstructionValue::LoadLocal(_)
            | InstructionValue::LoadThis
            | InstructionValue::FunctionExpression { .. }
    )
}
