//! Lowering from the AST to HIR.
//!
//! The builder walks statements in source order, appending instructions to
//! the current block and closing it with a terminal whenever control flow
//! splits. A terminal's id is allocated before the blocks it owns are
//! lowered, so a structured statement covers one contiguous id range,
//! recorded as a `ControlRegion`.

mod expr;
#[cfg(test)]
mod tests;

use std::collections::HashMap;

use super::*;
use crate::ast::{self, Expr, ForHead, ForInit, FunctionBody, Pattern, Stmt};
use crate::error::CompilerError;
use crate::span::{Span, Spanned};

type LowerResult<T> = Result<T, CompilerError>;

/// Lower a function selected for compilation.
pub fn lower_function(func: &ast::Function, env: &mut Environment) -> LowerResult<HirFunction> {
    if func.is_async {
        return Err(CompilerError::unsupported("async functions", func.span));
    }
    if func.is_generator {
        return Err(CompilerError::unsupported("generator functions", func.span));
    }
    let ctx = FunctionContext {
        this_allowed: false,
        await_allowed: false,
    };
    let (hir, _) = HirBuilder::new(env, Vec::new(), ctx).build(func)?;
    Ok(hir)
}

/// What the function being lowered may reference.
#[derive(Clone, Copy, Debug)]
struct FunctionContext {
    /// `this` and `arguments` belong to a function that is not compiled.
    this_allowed: bool,
    await_allowed: bool,
}

#[derive(Clone, Debug, Default)]
struct LexicalScope {
    bindings: HashMap<String, IdentifierId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TargetKind {
    Loop,
    Switch,
    Label,
}

#[derive(Clone, Debug)]
struct JumpTarget {
    label: Option<String>,
    kind: TargetKind,
    break_block: BlockId,
    continue_block: Option<BlockId>,
}

/// Redirects `return` inside an inlined `useMemo` callback.
#[derive(Clone, Debug)]
struct ReturnOverride {
    binding: Place,
    label: LabelName,
    exit: BlockId,
}

struct HirBuilder<'env> {
    env: &'env mut Environment,
    blocks: Vec<Option<BasicBlock>>,
    current: BlockId,
    instructions: Vec<Instruction>,
    statement_starts: Vec<usize>,
    /// Open value blocks; instructions go to the innermost one.
    value_blocks: Vec<Vec<Instruction>>,
    scopes: Vec<LexicalScope>,
    /// Scopes below this index belong to enclosing functions.
    outer_scopes: usize,
    /// Captured outer bindings with the index of their declaring scope.
    context: Vec<(Place, usize)>,
    targets: Vec<JumpTarget>,
    return_overrides: Vec<ReturnOverride>,
    regions: Vec<ControlRegion>,
    manual_memos: Vec<IdentifierId>,
    next_label: u32,
    ctx: FunctionContext,
}

impl<'env> HirBuilder<'env> {
    fn new(env: &'env mut Environment, scopes: Vec<LexicalScope>, ctx: FunctionContext) -> Self {
        let outer_scopes = scopes.len();
        Self {
            env,
            blocks: vec![None],
            current: BlockId(0),
            instructions: Vec::new(),
            statement_starts: Vec::new(),
            value_blocks: Vec::new(),
            scopes,
            outer_scopes,
            context: Vec::new(),
            targets: Vec::new(),
            return_overrides: Vec::new(),
            regions: Vec::new(),
            manual_memos: Vec::new(),
            next_label: 0,
            ctx,
        }
    }

    fn build(mut self, func: &ast::Function) -> LowerResult<(HirFunction, Vec<(Place, usize)>)> {
        self.push_scope();
        let mut params = Vec::new();
        let mut deferred = Vec::new();
        for param in &func.params {
            let (pattern, rest) = match &param.node {
                Pattern::Rest(inner) => (inner.as_ref(), true),
                _ => (param, false),
            };
            let place = match &pattern.node {
                Pattern::Ident(name) => self.declare(name, pattern.span),
                _ => {
                    self.predeclare_pattern(&pattern.node, pattern.span);
                    let temp = self.temporary(pattern.span);
                    deferred.push((pattern, temp));
                    temp
                }
            };
            params.push(Param { place, rest });
        }
        for (pattern, temp) in deferred {
            self.begin_statement();
            self.lower_binding_pattern(pattern, StoreKind::Let, temp)?;
        }

        let mut directives = Vec::new();
        match &func.body {
            FunctionBody::Block(stmts) => {
                let prologue = func.directives().len();
                directives = func.directives().iter().map(|d| d.to_string()).collect();
                self.lower_stmts(&stmts[prologue..], true)?;
            }
            FunctionBody::Expr(expr) => {
                self.begin_statement();
                let value = self.lower_expr(expr)?;
                self.terminate_dead(
                    TerminalKind::Return {
                        value,
                        kind: ReturnKind::Explicit,
                    },
                    expr.span,
                );
            }
        }
        let end = Span::new(func.span.file_id, func.span.end, func.span.end);
        self.begin_statement();
        let undefined = self.push(InstructionValue::Primitive(Primitive::Undefined), end);
        let id = self.env.next_instr_id();
        let next = self.reserve_block();
        self.terminate(
            id,
            TerminalKind::Return {
                value: undefined,
                kind: ReturnKind::Implicit,
            },
            end,
            next,
        );
        self.pop_scope();

        let blocks = self
            .blocks
            .into_iter()
            .enumerate()
            .map(|(i, block)| {
                block.unwrap_or_else(|| BasicBlock {
                    id: BlockId(i as u32),
                    instructions: Vec::new(),
                    statement_starts: Vec::new(),
                    terminal: Terminal {
                        id,
                        kind: TerminalKind::Unreachable,
                        span: end,
                    },
                })
            })
            .collect();
        let context = self.context.iter().map(|(place, _)| *place).collect();
        let hir = HirFunction {
            name: func.name_str().map(str::to_string),
            params,
            entry: BlockId(0),
            blocks,
            directives,
            regions: self.regions,
            manual_memos: self.manual_memos,
            context,
            is_arrow: func.is_arrow,
            is_async: func.is_async,
            span: func.span,
        };
        Ok((hir, self.context))
    }

    // ─── Blocks and instructions ───────────────────────────────────

    fn reserve_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(None);
        id
    }

    /// Close the current block and continue in `next`.
    fn terminate(&mut self, id: InstrId, kind: TerminalKind, span: Span, next: BlockId) {
        let block = BasicBlock {
            id: self.current,
            instructions: std::mem::take(&mut self.instructions),
            statement_starts: std::mem::take(&mut self.statement_starts),
            terminal: Terminal { id, kind, span },
        };
        self.blocks[self.current.0 as usize] = Some(block);
        self.current = next;
    }

    /// Close the current block with a terminal that does not fall through.
    /// Code that follows lands in an unreachable block.
    fn terminate_dead(&mut self, kind: TerminalKind, span: Span) {
        let id = self.env.next_instr_id();
        let next = self.reserve_block();
        self.terminate(id, kind, span, next);
    }

    fn goto(&mut self, block: BlockId, kind: GotoKind, span: Span, next: BlockId) {
        let id = self.env.next_instr_id();
        self.terminate(id, TerminalKind::Goto { block, kind }, span, next);
    }

    fn jump(&mut self, block: BlockId, kind: GotoKind, span: Span) {
        self.terminate_dead(TerminalKind::Goto { block, kind }, span);
    }

    fn push(&mut self, value: InstructionValue, span: Span) -> Place {
        let id = self.env.next_instr_id();
        let lvalue = self.temporary(span);
        let instr = Instruction {
            id,
            lvalue,
            value,
            span,
        };
        match self.value_blocks.last_mut() {
            Some(sink) => sink.push(instr),
            None => self.instructions.push(instr),
        }
        lvalue
    }

    fn temporary(&mut self, span: Span) -> Place {
        Place::new(self.env.new_temporary(span), span)
    }

    /// Lower instructions into a fresh value block.
    fn value_block(
        &mut self,
        lower: impl FnOnce(&mut Self) -> LowerResult<Place>,
    ) -> LowerResult<ValueBlock> {
        self.value_blocks.push(Vec::new());
        let result = lower(self);
        let instructions = self.value_blocks.pop().unwrap_or_default();
        Ok(ValueBlock {
            instructions,
            result: result?,
        })
    }

    /// Mark the start of a source statement in the current block.
    fn begin_statement(&mut self) {
        if !self.value_blocks.is_empty() {
            return;
        }
        let len = self.instructions.len();
        if self.statement_starts.last() != Some(&len) {
            self.statement_starts.push(len);
        }
    }

    fn push_region(&mut self, terminal: InstrId, kind: RegionKind, test: Option<Place>) {
        let end = InstrId(self.env.instr_count().saturating_sub(1));
        self.regions.push(ControlRegion {
            terminal,
            end,
            kind,
            test,
        });
    }

    // ─── Bindings ──────────────────────────────────────────────────

    fn push_scope(&mut self) {
        self.scopes.push(LexicalScope::default());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Declare `name` in the innermost scope, reusing a predeclared binding.
    fn declare(&mut self, name: &str, span: Span) -> Place {
        if let Some(scope) = self.scopes.last() {
            if let Some(&id) = scope.bindings.get(name) {
                return Place::new(id, span);
            }
        }
        let id = self.env.new_binding(Some(name.to_string()), span);
        if let Some(scope) = self.scopes.last_mut() {
            scope.bindings.insert(name.to_string(), id);
        }
        Place::new(id, span)
    }

    /// Resolve a name to a local or captured binding; `None` means global.
    fn lookup(&mut self, name: &str, span: Span) -> Option<Place> {
        let (index, id) = self
            .scopes
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, scope)| scope.bindings.get(name).map(|&id| (i, id)))?;
        let place = Place::new(id, span);
        if index < self.outer_scopes {
            self.capture(place, index);
        }
        Some(place)
    }

    fn capture(&mut self, place: Place, scope_index: usize) {
        if !self.context.iter().any(|(p, _)| p.identifier == place.identifier) {
            self.context.push((place, scope_index));
        }
    }

    /// Create bindings for every lexical declaration of a statement list,
    /// so that closures may reference names declared later.
    fn predeclare(&mut self, stmts: &[Spanned<Stmt>]) {
        for stmt in stmts {
            match &stmt.node {
                Stmt::VarDecl { kind, decls } if *kind != ast::DeclKind::Var => {
                    for decl in decls {
                        self.predeclare_pattern(&decl.target.node, decl.target.span);
                    }
                }
                Stmt::FunctionDecl(func) => {
                    if let Some(name) = &func.name {
                        self.declare(&name.node, name.span);
                    }
                }
                _ => {}
            }
        }
    }

    fn predeclare_pattern(&mut self, pattern: &Pattern, span: Span) {
        match pattern {
            Pattern::Ident(name) => {
                self.declare(name, span);
            }
            Pattern::Object { props, rest } => {
                for prop in props {
                    self.predeclare_pattern(&prop.value.node, prop.value.span);
                }
                if let Some(rest) = rest {
                    self.predeclare_pattern(&rest.node, rest.span);
                }
            }
            Pattern::Array { elements, rest } => {
                for element in elements.iter().flatten() {
                    self.predeclare_pattern(&element.node, element.span);
                }
                if let Some(rest) = rest {
                    self.predeclare_pattern(&rest.node, rest.span);
                }
            }
            Pattern::Default { target, .. } | Pattern::Rest(target) => {
                self.predeclare_pattern(&target.node, target.span);
            }
            Pattern::Member(_) => {}
        }
    }

    // ─── Statements ────────────────────────────────────────────────

    /// Lower a braced block in its own lexical scope.
    fn lower_block(&mut self, stmts: &[Spanned<Stmt>]) -> LowerResult<()> {
        self.push_scope();
        let result = self.lower_stmts(stmts, true);
        self.pop_scope();
        result
    }

    /// Lower statements of the innermost scope. Function declarations are
    /// hoisted to the start.
    fn lower_stmts(&mut self, stmts: &[Spanned<Stmt>], predeclare: bool) -> LowerResult<()> {
        if predeclare {
            self.predeclare(stmts);
        }
        for stmt in stmts {
            if let Stmt::FunctionDecl(func) = &stmt.node {
                self.begin_statement();
                self.lower_function_decl(func, stmt.span)?;
            }
        }
        for stmt in stmts {
            if !matches!(stmt.node, Stmt::FunctionDecl(_)) {
                self.lower_stmt(stmt)?;
            }
        }
        Ok(())
    }

    /// Lower the body of a control statement in a nested scope.
    fn lower_nested(&mut self, stmt: &Spanned<Stmt>) -> LowerResult<()> {
        match &stmt.node {
            Stmt::Block(stmts) => self.lower_block(stmts),
            _ => self.lower_block(std::slice::from_ref(stmt)),
        }
    }

    fn lower_function_decl(&mut self, func: &ast::Function, span: Span) -> LowerResult<()> {
        let Some(name) = &func.name else {
            return Err(CompilerError::unsupported("anonymous function declaration", span));
        };
        let target = self.declare(&name.node, name.span);
        let value = self.lower_function_expr(func, span)?;
        self.push(
            InstructionValue::StoreLocal {
                kind: StoreKind::Function,
                target,
                value,
            },
            span,
        );
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Spanned<Stmt>) -> LowerResult<()> {
        let span = stmt.span;
        match &stmt.node {
            Stmt::VarDecl { kind, decls } => {
                if *kind == ast::DeclKind::Var {
                    return Err(CompilerError::unsupported("`var` declarations", span));
                }
                self.lower_declarators(StoreKind::from_decl(*kind), decls)
            }
            Stmt::FunctionDecl(func) => {
                self.begin_statement();
                self.lower_function_decl(func, span)
            }
            Stmt::Expr(expr) => {
                self.begin_statement();
                self.lower_expr(expr)?;
                Ok(())
            }
            Stmt::Block(stmts) => self.lower_block(stmts),
            Stmt::If {
                test,
                consequent,
                alternate,
            } => self.lower_if(test, consequent, alternate.as_deref(), span),
            Stmt::While { test, body } => self.lower_while(test, body, None, span),
            Stmt::DoWhile { body, test } => self.lower_do_while(body, test, None, span),
            Stmt::For {
                init,
                test,
                update,
                body,
            } => self.lower_for(init.as_ref(), test.as_ref(), update.as_ref(), body, None, span),
            Stmt::ForOf { left, right, body } => {
                self.lower_for_each(left, right, body, None, true, span)
            }
            Stmt::ForIn { left, right, body } => {
                self.lower_for_each(left, right, body, None, false, span)
            }
            Stmt::Switch {
                discriminant,
                cases,
            } => self.lower_switch(discriminant, cases, span),
            Stmt::Labeled { label, body } => self.lower_labeled(label, body, span),
            Stmt::Break(label) => {
                let (block, label) = self.resolve_target(label.as_ref(), false, span)?;
                self.jump(block, GotoKind::Break { label }, span);
                Ok(())
            }
            Stmt::Continue(label) => {
                let (block, label) = self.resolve_target(label.as_ref(), true, span)?;
                self.jump(block, GotoKind::Continue { label }, span);
                Ok(())
            }
            Stmt::Return(value) => self.lower_return(value.as_ref(), span),
            Stmt::Throw(value) => {
                self.begin_statement();
                let value = self.lower_expr(value)?;
                self.terminate_dead(TerminalKind::Throw { value }, span);
                Ok(())
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => self.lower_try(block, handler.as_ref(), finalizer.as_deref(), span),
            Stmt::With { .. } => Err(CompilerError::unsupported("`with` statements", span)),
            Stmt::Debugger => Err(CompilerError::unsupported("`debugger` statements", span)),
            Stmt::Empty => Ok(()),
        }
    }

    fn lower_declarators(&mut self, kind: StoreKind, decls: &[ast::Declarator]) -> LowerResult<()> {
        for decl in decls {
            self.begin_statement();
            let span = decl.target.span;
            match (&decl.target.node, &decl.init) {
                (Pattern::Ident(name), None) => {
                    let target = self.declare(name, span);
                    self.push(InstructionValue::DeclareLocal { kind, target }, span);
                }
                (Pattern::Ident(name), Some(init)) => {
                    let target = self.declare(name, span);
                    let value = self.lower_expr(init)?;
                    self.push(InstructionValue::StoreLocal { kind, target, value }, span);
                }
                (_, Some(init)) => {
                    let value = self.lower_expr(init)?;
                    self.lower_binding_pattern(&decl.target, kind, value)?;
                }
                (_, None) => {
                    return Err(CompilerError::unsupported(
                        "destructuring declaration without initializer",
                        span,
                    ))
                }
            }
        }
        Ok(())
    }

    fn lower_return(&mut self, value: Option<&Spanned<Expr>>, span: Span) -> LowerResult<()> {
        self.begin_statement();
        let (place, kind) = match value {
            Some(expr) => (self.lower_expr(expr)?, ReturnKind::Explicit),
            None => (
                self.push(InstructionValue::Primitive(Primitive::Undefined), span),
                ReturnKind::Void,
            ),
        };
        if let Some(over) = self.return_overrides.last().cloned() {
            self.push(
                InstructionValue::StoreLocal {
                    kind: StoreKind::Reassign,
                    target: over.binding,
                    value: place,
                },
                span,
            );
            self.jump(
                over.exit,
                GotoKind::Break {
                    label: Some(over.label),
                },
                span,
            );
            return Ok(());
        }
        self.terminate_dead(TerminalKind::Return { value: place, kind }, span);
        Ok(())
    }

    fn lower_if(
        &mut self,
        test: &Spanned<Expr>,
        consequent: &Spanned<Stmt>,
        alternate: Option<&Spanned<Stmt>>,
        span: Span,
    ) -> LowerResult<()> {
        self.begin_statement();
        let test = self.lower_expr(test)?;
        let id = self.env.next_instr_id();
        let cons_block = self.reserve_block();
        let alt_block = alternate.map(|_| self.reserve_block());
        let fallthrough = self.reserve_block();
        self.terminate(
            id,
            TerminalKind::If {
                test,
                consequent: cons_block,
                alternate: alt_block,
                fallthrough,
            },
            span,
            cons_block,
        );
        self.lower_nested(consequent)?;
        self.goto(
            fallthrough,
            GotoKind::Fallthrough,
            span,
            alt_block.unwrap_or(fallthrough),
        );
        if let Some(alternate) = alternate {
            self.lower_nested(alternate)?;
            self.goto(fallthrough, GotoKind::Fallthrough, span, fallthrough);
        }
        self.push_region(id, RegionKind::If, Some(test));
        Ok(())
    }

    fn lower_while(
        &mut self,
        test: &Spanned<Expr>,
        body: &Spanned<Stmt>,
        label: Option<&str>,
        span: Span,
    ) -> LowerResult<()> {
        let id = self.env.next_instr_id();
        let test_block = self.reserve_block();
        let body_block = self.reserve_block();
        let fallthrough = self.reserve_block();
        self.terminate(
            id,
            TerminalKind::While {
                test: test_block,
                body: body_block,
                fallthrough,
            },
            span,
            test_block,
        );
        let test_place = self.lower_expr(test)?;
        let branch = self.env.next_instr_id();
        self.terminate(
            branch,
            TerminalKind::Branch {
                test: test_place,
                consequent: body_block,
                alternate: fallthrough,
            },
            test.span,
            body_block,
        );
        self.lower_loop_body(body, label, fallthrough, test_block)?;
        self.goto(test_block, GotoKind::Fallthrough, span, fallthrough);
        self.push_region(id, RegionKind::Loop, None);
        Ok(())
    }

    fn lower_do_while(
        &mut self,
        body: &Spanned<Stmt>,
        test: &Spanned<Expr>,
        label: Option<&str>,
        span: Span,
    ) -> LowerResult<()> {
        let id = self.env.next_instr_id();
        let body_block = self.reserve_block();
        let test_block = self.reserve_block();
        let fallthrough = self.reserve_block();
        self.terminate(
            id,
            TerminalKind::DoWhile {
                body: body_block,
                test: test_block,
                fallthrough,
            },
            span,
            body_block,
        );
        self.lower_loop_body(body, label, fallthrough, test_block)?;
        self.goto(test_block, GotoKind::Fallthrough, span, test_block);
        let test_place = self.lower_expr(test)?;
        let branch = self.env.next_instr_id();
        self.terminate(
            branch,
            TerminalKind::Branch {
                test: test_place,
                consequent: body_block,
                alternate: fallthrough,
            },
            test.span,
            fallthrough,
        );
        self.push_region(id, RegionKind::Loop, None);
        Ok(())
    }

    fn lower_for(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&Spanned<Expr>>,
        update: Option<&Spanned<Expr>>,
        body: &Spanned<Stmt>,
        label: Option<&str>,
        span: Span,
    ) -> LowerResult<()> {
        self.push_scope();
        let id = self.env.next_instr_id();
        let init_block = self.reserve_block();
        let test_block = test.map(|_| self.reserve_block());
        let update_block = update.map(|_| self.reserve_block());
        let body_block = self.reserve_block();
        let fallthrough = self.reserve_block();
        self.terminate(
            id,
            TerminalKind::For {
                init: init_block,
                test: test_block,
                update: update_block,
                body: body_block,
                fallthrough,
            },
            span,
            init_block,
        );

        match init {
            Some(ForInit::VarDecl { kind, decls }) => {
                if *kind == ast::DeclKind::Var {
                    return Err(CompilerError::unsupported("`var` declarations", span));
                }
                for decl in decls {
                    self.predeclare_pattern(&decl.target.node, decl.target.span);
                }
                self.lower_declarators(StoreKind::from_decl(*kind), decls)?;
            }
            Some(ForInit::Expr(expr)) => {
                self.begin_statement();
                self.lower_expr(expr)?;
            }
            None => {}
        }
        let head = test_block.unwrap_or(body_block);
        self.goto(head, GotoKind::Fallthrough, span, head);

        if let (Some(test), Some(_)) = (test, test_block) {
            let test_place = self.lower_expr(test)?;
            let branch = self.env.next_instr_id();
            self.terminate(
                branch,
                TerminalKind::Branch {
                    test: test_place,
                    consequent: body_block,
                    alternate: fallthrough,
                },
                test.span,
                body_block,
            );
        }

        let continue_block = update_block.unwrap_or(head);
        self.lower_loop_body(body, label, fallthrough, continue_block)?;
        match (update, update_block) {
            (Some(update), Some(block)) => {
                self.goto(block, GotoKind::Fallthrough, span, block);
                self.lower_expr(update)?;
                self.goto(head, GotoKind::Fallthrough, span, fallthrough);
            }
            _ => self.goto(head, GotoKind::Fallthrough, span, fallthrough),
        }
        self.pop_scope();
        self.push_region(id, RegionKind::Loop, None);
        Ok(())
    }

    fn lower_for_each(
        &mut self,
        left: &ForHead,
        right: &Spanned<Expr>,
        body: &Spanned<Stmt>,
        label: Option<&str>,
        is_of: bool,
        span: Span,
    ) -> LowerResult<()> {
        self.begin_statement();
        let collection = self.lower_expr(right)?;
        self.push_scope();
        let binding = match left {
            ForHead::Decl { kind, target } => {
                if *kind == ast::DeclKind::Var {
                    return Err(CompilerError::unsupported("`var` declarations", span));
                }
                self.predeclare_pattern(&target.node, target.span);
                LoopBinding {
                    kind: StoreKind::from_decl(*kind),
                    target: self.loop_pattern(target)?,
                }
            }
            ForHead::Target(target) => match &target.node {
                Pattern::Ident(name) => match self.lookup(name, target.span) {
                    Some(place) => LoopBinding {
                        kind: StoreKind::Reassign,
                        target: HirPattern::Place(place),
                    },
                    None => {
                        return Err(CompilerError::unsupported(
                            "loop assigning to a global",
                            target.span,
                        ))
                    }
                },
                _ => {
                    return Err(CompilerError::unsupported(
                        "loop head assigning to a pattern",
                        target.span,
                    ))
                }
            },
        };
        let id = self.env.next_instr_id();
        let body_block = self.reserve_block();
        let fallthrough = self.reserve_block();
        let kind = if is_of {
            TerminalKind::ForOf {
                collection,
                binding,
                body: body_block,
                fallthrough,
            }
        } else {
            TerminalKind::ForIn {
                collection,
                binding,
                body: body_block,
                fallthrough,
            }
        };
        self.terminate(id, kind, span, body_block);
        self.lower_loop_body(body, label, fallthrough, body_block)?;
        self.goto(body_block, GotoKind::Fallthrough, span, fallthrough);
        self.pop_scope();
        self.push_region(id, RegionKind::Loop, None);
        Ok(())
    }

    /// Declared loop bindings: plain names and default-free patterns.
    fn loop_pattern(&mut self, pattern: &Spanned<Pattern>) -> LowerResult<HirPattern> {
        match &pattern.node {
            Pattern::Ident(name) => Ok(HirPattern::Place(self.declare(name, pattern.span))),
            Pattern::Object { props, rest } => {
                let mut out = Vec::new();
                for prop in props {
                    let Some(key) = prop.key.static_name() else {
                        return Err(CompilerError::unsupported(
                            "computed key in a loop binding",
                            pattern.span,
                        ));
                    };
                    out.push((PropertyKey::Named(key), self.loop_pattern(&prop.value)?));
                }
                let rest = match rest {
                    Some(rest) => Some(self.loop_rest(rest)?),
                    None => None,
                };
                Ok(HirPattern::Object { props: out, rest })
            }
            Pattern::Array { elements, rest } => {
                let mut items = Vec::new();
                for element in elements {
                    items.push(match element {
                        Some(element) => Some(self.loop_pattern(element)?),
                        None => None,
                    });
                }
                let rest = match rest {
                    Some(rest) => Some(self.loop_rest(rest)?),
                    None => None,
                };
                Ok(HirPattern::Array { items, rest })
            }
            _ => Err(CompilerError::unsupported(
                "default values in a loop binding",
                pattern.span,
            )),
        }
    }

    fn loop_rest(&mut self, rest: &Spanned<Pattern>) -> LowerResult<Place> {
        match &rest.node {
            Pattern::Ident(name) => Ok(self.declare(name, rest.span)),
            _ => Err(CompilerError::unsupported("nested rest pattern", rest.span)),
        }
    }

    fn lower_loop_body(
        &mut self,
        body: &Spanned<Stmt>,
        label: Option<&str>,
        break_block: BlockId,
        continue_block: BlockId,
    ) -> LowerResult<()> {
        self.targets.push(JumpTarget {
            label: label.map(str::to_string),
            kind: TargetKind::Loop,
            break_block,
            continue_block: Some(continue_block),
        });
        let result = self.lower_nested(body);
        self.targets.pop();
        result
    }

    fn lower_switch(
        &mut self,
        discriminant: &Spanned<Expr>,
        cases: &[ast::SwitchCase],
        span: Span,
    ) -> LowerResult<()> {
        self.begin_statement();
        let discriminant = self.lower_expr(discriminant)?;
        let mut tests = Vec::new();
        for case in cases {
            tests.push(match &case.test {
                Some(test) => {
                    if !is_pure_case_test(&test.node) {
                        return Err(CompilerError::unsupported(
                            "`case` test with side effects",
                            test.span,
                        ));
                    }
                    Some(self.lower_expr(test)?)
                }
                None => None,
            });
        }
        let id = self.env.next_instr_id();
        let case_blocks: Vec<BlockId> = cases.iter().map(|_| self.reserve_block()).collect();
        let fallthrough = self.reserve_block();
        self.terminate(
            id,
            TerminalKind::Switch {
                discriminant,
                cases: tests
                    .into_iter()
                    .zip(&case_blocks)
                    .map(|(test, &block)| SwitchCaseBlock { test, block })
                    .collect(),
                fallthrough,
            },
            span,
            case_blocks.first().copied().unwrap_or(fallthrough),
        );

        self.push_scope();
        for case in cases {
            self.predeclare(&case.body);
        }
        self.targets.push(JumpTarget {
            label: None,
            kind: TargetKind::Switch,
            break_block: fallthrough,
            continue_block: None,
        });
        let mut result = Ok(());
        for (i, case) in cases.iter().enumerate() {
            if let Err(err) = self.lower_stmts(&case.body, false) {
                result = Err(err);
                break;
            }
            let next = case_blocks.get(i + 1).copied().unwrap_or(fallthrough);
            self.goto(next, GotoKind::Fallthrough, span, next);
        }
        self.targets.pop();
        self.pop_scope();
        result?;
        self.push_region(id, RegionKind::Switch, Some(discriminant));
        Ok(())
    }

    fn lower_labeled(
        &mut self,
        label: &Spanned<String>,
        body: &Spanned<Stmt>,
        span: Span,
    ) -> LowerResult<()> {
        let id = self.env.next_instr_id();
        let block = self.reserve_block();
        let fallthrough = self.reserve_block();
        self.terminate(
            id,
            TerminalKind::Label {
                label: LabelName::User(label.node.clone()),
                block,
                fallthrough,
            },
            span,
            block,
        );
        let name = Some(label.node.as_str());
        match &body.node {
            Stmt::While { test, body: inner } => self.lower_while(test, inner, name, body.span)?,
            Stmt::DoWhile { body: inner, test } => {
                self.lower_do_while(inner, test, name, body.span)?
            }
            Stmt::For {
                init,
                test,
                update,
                body: inner,
            } => self.lower_for(
                init.as_ref(),
                test.as_ref(),
                update.as_ref(),
                inner,
                name,
                body.span,
            )?,
            Stmt::ForOf { left, right, body: inner } => {
                self.lower_for_each(left, right, inner, name, true, body.span)?
            }
            Stmt::ForIn { left, right, body: inner } => {
                self.lower_for_each(left, right, inner, name, false, body.span)?
            }
            _ => {
                self.targets.push(JumpTarget {
                    label: Some(label.node.clone()),
                    kind: TargetKind::Label,
                    break_block: fallthrough,
                    continue_block: None,
                });
                let result = self.lower_nested(body);
                self.targets.pop();
                result?;
            }
        }
        self.goto(fallthrough, GotoKind::Fallthrough, span, fallthrough);
        self.push_region(id, RegionKind::Label, None);
        Ok(())
    }

    /// Find the block a `break`/`continue` jumps to.
    fn resolve_target(
        &self,
        label: Option<&Spanned<String>>,
        is_continue: bool,
        span: Span,
    ) -> LowerResult<(BlockId, Option<LabelName>)> {
        let target = match label {
            Some(label) => self
                .targets
                .iter()
                .rev()
                .find(|t| t.label.as_deref() == Some(label.node.as_str())),
            None => self.targets.iter().rev().find(|t| {
                t.kind == TargetKind::Loop || (!is_continue && t.kind == TargetKind::Switch)
            }),
        };
        let Some(target) = target else {
            return Err(CompilerError::unsupported("jump target not found", span));
        };
        let block = if is_continue {
            target.continue_block.ok_or_else(|| {
                CompilerError::unsupported("`continue` to a non-loop label", span)
            })?
        } else {
            target.break_block
        };
        Ok((block, label.map(|l| LabelName::User(l.node.clone()))))
    }

    fn lower_try(
        &mut self,
        block: &[Spanned<Stmt>],
        handler: Option<&ast::CatchClause>,
        finalizer: Option<&[Spanned<Stmt>]>,
        span: Span,
    ) -> LowerResult<()> {
        let id = self.env.next_instr_id();
        let try_block = self.reserve_block();
        let handler_block = handler.map(|_| self.reserve_block());
        let finalizer_block = finalizer.map(|_| self.reserve_block());
        let fallthrough = self.reserve_block();

        let param = match handler.and_then(|h| h.param.as_ref()) {
            Some(pattern) => match &pattern.node {
                Pattern::Ident(name) => Some(Place::new(
                    self.env.new_binding(Some(name.clone()), pattern.span),
                    pattern.span,
                )),
                _ => Some(self.temporary(pattern.span)),
            },
            None => None,
        };
        self.terminate(
            id,
            TerminalKind::Try {
                block: try_block,
                handler: handler_block.map(|block| CatchHandler { param, block }),
                finalizer: finalizer_block,
                fallthrough,
            },
            span,
            try_block,
        );

        let after = finalizer_block.unwrap_or(fallthrough);
        self.lower_block(block)?;
        self.goto(
            after,
            GotoKind::Fallthrough,
            span,
            handler_block.unwrap_or(after),
        );

        if let (Some(handler), Some(_)) = (handler, handler_block) {
            self.push_scope();
            if let (Some(pattern), Some(param)) = (&handler.param, param) {
                match &pattern.node {
                    Pattern::Ident(name) => {
                        if let Some(scope) = self.scopes.last_mut() {
                            scope.bindings.insert(name.clone(), param.identifier);
                        }
                    }
                    _ => {
                        self.predeclare_pattern(&pattern.node, pattern.span);
                        self.begin_statement();
                        self.lower_binding_pattern(pattern, StoreKind::Let, param)?;
                    }
                }
            }
            self.lower_stmts(&handler.body, true)?;
            self.pop_scope();
            self.goto(after, GotoKind::Fallthrough, span, after);
        }

        if let Some(finalizer) = finalizer {
            self.lower_block(finalizer)?;
            self.goto(fallthrough, GotoKind::Fallthrough, span, fallthrough);
        }
        self.push_region(id, RegionKind::Try, None);
        Ok(())
    }
}

/// `case` tests are evaluated ahead of the switch, so they must not have
/// effects: literals, names and static member paths.
fn is_pure_case_test(expr: &Expr) -> bool {
    match expr {
        Expr::Number(_) | Expr::Str(_) | Expr::Bool(_) | Expr::Null | Expr::Ident(_) => true,
        Expr::Template { exprs, .. } => exprs.is_empty(),
        Expr::Unary { op, arg } => {
            !matches!(op, ast::UnaryOp::Delete) && is_pure_case_test(&arg.node)
        }
        Expr::Member {
            object,
            property: ast::MemberProp::Ident(_),
            optional: false,
        } => is_pure_case_test(&object.node),
        _ => false,
    }
}
