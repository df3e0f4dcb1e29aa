//! Code generation: a reactive function back to an `ast::Function` whose
//! scopes read and write the memo cache.
//!
//! A scope with dependencies `a` and `b.c` and one declaration `x` becomes
//!
//! ```text
//! let x;
//! if ($[0] !== a || $[1] !== b.c) {
//!   ...body...
//!   $[0] = a;
//!   $[1] = b.c;
//!   $[2] = x;
//! } else {
//!   x = $[2];
//! }
//! ```
//!
//! A scope without dependencies tests its first slot against the runtime's
//! `EMPTY` marker instead. Temporaries read exactly once are folded back
//! into the expression that reads them; everything else lives in a named
//! variable.

mod expr;
pub mod names;
#[cfg(test)]
mod tests;

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::ast::{
    self, BinOp, CatchClause, DeclKind, Declarator, Expr, ForHead, ForInit, FunctionBody,
    ImportDecl, ImportSpecifier, LogicalOp, MemberProp, Pattern, Stmt, SwitchCase,
};
use crate::config::CompilerConfig;
use crate::error::CompilerError;
use crate::hir::{Environment, IdentifierId, Instruction, InstructionValue, LabelName, ReturnKind};
use crate::reactive::{
    Dependency, ExpressionBlock, ReactiveFunction, ReactiveStatement, ReactiveTerminal,
    ScopeBlock, TerminalStatement,
};
use crate::span::Spanned;

pub use names::NameGen;

// ─── Runtime names ─────────────────────────────────────────────────

/// Local names under which one program imports the runtime helpers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeNames {
    pub cache: String,
    pub empty: String,
    pub early_return: String,
    pub freeze: String,
}

impl RuntimeNames {
    /// Pick names that no identifier of the program already uses.
    pub fn choose(names: &mut NameGen) -> Self {
        Self {
            cache: names.prefer("_c"),
            empty: names.prefer("_empty"),
            early_return: names.prefer("_exit"),
            freeze: names.prefer("_freeze"),
        }
    }

    /// `import { c as _c, ... } from "<module>";` for the helpers in `used`.
    pub fn import(&self, used: RuntimeUses, module: &str) -> Option<ImportDecl> {
        let mut specifiers = Vec::new();
        let entries = [
            (used.cache, "c", &self.cache),
            (used.empty, "EMPTY", &self.empty),
            (used.early_return, "EARLY_RETURN", &self.early_return),
            (used.freeze, "freeze", &self.freeze),
        ];
        for (wanted, imported, local) in entries {
            if wanted {
                specifiers.push(ImportSpecifier {
                    imported: imported.to_string(),
                    local: sp(local.clone()),
                });
            }
        }
        if specifiers.is_empty() {
            return None;
        }
        Some(ImportDecl {
            default: None,
            specifiers,
            source: module.to_string(),
        })
    }
}

/// Runtime helpers referenced by generated code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RuntimeUses {
    pub cache: bool,
    pub empty: bool,
    pub early_return: bool,
    pub freeze: bool,
}

impl RuntimeUses {
    pub fn merge(&mut self, other: RuntimeUses) {
        self.cache |= other.cache;
        self.empty |= other.empty;
        self.early_return |= other.early_return;
        self.freeze |= other.freeze;
    }
}

pub struct GeneratedFunction {
    pub function: ast::Function,
    pub uses: RuntimeUses,
}

// ─── Entry point ───────────────────────────────────────────────────

/// Emit `func` with its scopes memoized. `names` must already hold every
/// name spelled in the program, including the runtime names; `original`
/// supplies the function's name and span.
pub fn generate_function(
    func: &ReactiveFunction,
    original: &ast::Function,
    env: &Environment,
    runtime: &RuntimeNames,
    names: NameGen,
    config: &CompilerConfig,
) -> Result<GeneratedFunction, CompilerError> {
    let mut cg = Codegen::new(env, runtime, names, config);
    cg.prepare(func);

    let params = func
        .params
        .iter()
        .map(|param| {
            let name = Pattern::Ident(cg.name(param.place.identifier));
            if param.rest {
                sp(Pattern::Rest(Box::new(sp(name))))
            } else {
                sp(name)
            }
        })
        .collect();
    let body = cg.block(&func.body)?;

    let mut stmts: Vec<Spanned<Stmt>> = func
        .directives
        .iter()
        .map(|d| sp(Stmt::Expr(sp(Expr::Str(d.clone())))))
        .collect();
    if func.cache_size > 0 {
        cg.used.cache = true;
        stmts.push(sp(Stmt::VarDecl {
            kind: DeclKind::Const,
            decls: vec![Declarator {
                target: sp(Pattern::Ident(cg.cache.clone())),
                init: Some(sp(Expr::call(
                    sp(Expr::Ident(runtime.cache.clone())),
                    vec![sp(Expr::Number(f64::from(func.cache_size)))],
                ))),
            }],
        }));
    }
    if !cg.function_lets.is_empty() {
        stmts.push(sp(Stmt::VarDecl {
            kind: DeclKind::Let,
            decls: cg
                .function_lets
                .iter()
                .map(|name| Declarator {
                    target: sp(Pattern::Ident(name.clone())),
                    init: None,
                })
                .collect(),
        }));
    }
    stmts.extend(body);
    trace!(
        function = func.name.as_deref().unwrap_or("<anonymous>"),
        temporaries = cg.generated.len(),
        "function generated"
    );

    Ok(GeneratedFunction {
        function: ast::Function {
            name: original.name.clone(),
            params,
            body: FunctionBody::Block(stmts),
            is_arrow: func.is_arrow,
            is_async: func.is_async,
            is_generator: false,
            span: original.span,
        },
        uses: cg.used,
    })
}

// ─── State ─────────────────────────────────────────────────────────

/// An expression waiting to be folded into the instruction that reads it.
struct Pending {
    id: IdentifierId,
    expr: Expr,
    /// Reads still expected; duplicable values may be read several times.
    remaining: usize,
}

/// Where the side effects of instructions go.
enum Out<'o> {
    Block(&'o mut Vec<Spanned<Stmt>>),
    /// Inside an expression: effects become comma-sequence elements.
    Sequence(&'o mut Vec<Spanned<Expr>>),
}

impl Out<'_> {
    fn push_expr(&mut self, expr: Expr) {
        match self {
            Out::Block(stmts) => stmts.push(sp(Stmt::Expr(sp(expr)))),
            Out::Sequence(exprs) => exprs.push(sp(expr)),
        }
    }
}

struct Codegen<'a> {
    env: &'a Environment,
    runtime: &'a RuntimeNames,
    config: &'a CompilerConfig,
    names: NameGen,
    /// Name of the cache array, `$` unless the program uses it.
    cache: String,
    /// Names chosen for identifiers without a source name.
    generated: HashMap<IdentifierId, String>,
    uses: HashMap<IdentifierId, usize>,
    /// Temporaries materialized in a named variable instead of being folded.
    variables: HashSet<IdentifierId>,
    /// Declared by `let` ahead of the scope that assigns them.
    hoisted: HashSet<IdentifierId>,
    pending: Vec<Pending>,
    /// Entries below this index belong to an enclosing expression.
    base: usize,
    /// Variables first assigned inside an expression, declared at the top.
    function_lets: Vec<String>,
    labels: HashMap<u32, String>,
    /// Innermost early-return target: result variable and label.
    exits: Vec<(String, String)>,
    /// Object of the optional chain being emitted, until its first link.
    optional_object: Option<IdentifierId>,
    used: RuntimeUses,
}

impl<'a> Codegen<'a> {
    fn new(
        env: &'a Environment,
        runtime: &'a RuntimeNames,
        mut names: NameGen,
        config: &'a CompilerConfig,
    ) -> Self {
        let cache = names.prefer("$");
        Self {
            env,
            runtime,
            config,
            names,
            cache,
            generated: HashMap::new(),
            uses: HashMap::new(),
            variables: HashSet::new(),
            hoisted: HashSet::new(),
            pending: Vec::new(),
            base: 0,
            function_lets: Vec::new(),
            labels: HashMap::new(),
            exits: Vec::new(),
            optional_object: None,
            used: RuntimeUses::default(),
        }
    }

    // ─── Preparation ───────────────────────────────────────────────

    /// Count reads of every temporary and find the temporaries that must
    /// live in a variable.
    fn prepare(&mut self, func: &ReactiveFunction) {
        for param in &func.params {
            self.variables.insert(param.place.identifier);
        }
        self.prepare_block(&func.body);
    }

    fn prepare_block(&mut self, block: &[ReactiveStatement]) {
        for stmt in block {
            match stmt {
                ReactiveStatement::Instructions(instrs) => self.prepare_instructions(instrs),
                ReactiveStatement::Terminal(term) => {
                    for place in term.terminal.operands() {
                        self.count(place.identifier);
                    }
                    for place in term.terminal.stored_places() {
                        self.variables.insert(place.identifier);
                    }
                    for expr in term.terminal.expression_blocks() {
                        self.prepare_instructions(&expr.instructions);
                        self.count(expr.value.identifier);
                    }
                    for inner in term.terminal.blocks() {
                        self.prepare_block(inner);
                    }
                }
                ReactiveStatement::Scope(scope) => {
                    let s = &scope.scope;
                    self.variables.extend(s.declarations.iter().copied());
                    self.variables.extend(s.reassignments.iter().copied());
                    self.variables.extend(s.dependencies.iter().map(|d| d.root));
                    self.prepare_block(&scope.body);
                }
            }
        }
    }

    fn prepare_instructions(&mut self, instrs: &[Instruction]) {
        for instr in instrs {
            instr.walk(&mut |i| {
                let skipped = match &i.value {
                    InstructionValue::Optional { object, .. } => Some(object.identifier),
                    _ => None,
                };
                for place in i.value.operands() {
                    if Some(place.identifier) != skipped {
                        *self.uses.entry(place.identifier).or_default() += 1;
                    }
                }
                for block in i.value.value_blocks() {
                    *self.uses.entry(block.result.identifier).or_default() += 1;
                }
                if let InstructionValue::Destructure { pattern, .. } = &i.value {
                    self.variables
                        .extend(pattern.places().iter().map(|p| p.identifier));
                }
            });
        }
    }

    fn count(&mut self, id: IdentifierId) {
        *self.uses.entry(id).or_default() += 1;
    }

    fn uses(&self, id: IdentifierId) -> usize {
        self.uses.get(&id).copied().unwrap_or(0)
    }

    // ─── Names ─────────────────────────────────────────────────────

    fn name(&mut self, id: IdentifierId) -> String {
        if let Some(name) = self.env.name_of(id) {
            return name.to_string();
        }
        if let Some(name) = self.generated.get(&id) {
            return name.clone();
        }
        let name = self.names.fresh("t");
        self.generated.insert(id, name.clone());
        name
    }

    fn is_variable(&self, id: IdentifierId) -> bool {
        self.env.identifier(id).is_binding() || self.variables.contains(&id)
    }

    fn label(&mut self, label: &LabelName) -> String {
        match label {
            LabelName::User(name) => name.clone(),
            LabelName::Generated(n) => {
                if let Some(name) = self.labels.get(n) {
                    return name.clone();
                }
                let name = self.names.fresh("bb");
                self.labels.insert(*n, name.clone());
                name
            }
        }
    }

    // ─── Pending expressions ───────────────────────────────────────

    /// Materialize every pending expression of the current frame, in order.
    fn flush(&mut self, out: &mut Out<'_>) {
        if self.pending.len() <= self.base {
            return;
        }
        let flushed: Vec<Pending> = self.pending.drain(self.base..).collect();
        for entry in flushed {
            self.variables.insert(entry.id);
            self.write_variable(entry.id, entry.expr, out);
        }
    }

    /// Assign `expr` to the variable for `id`, declaring it if needed.
    fn write_variable(&mut self, id: IdentifierId, expr: Expr, out: &mut Out<'_>) {
        let name = self.name(id);
        if self.hoisted.contains(&id) {
            out.push_expr(Expr::assign(Pattern::Ident(name), sp(expr)));
            return;
        }
        match out {
            Out::Block(stmts) => stmts.push(sp(Stmt::VarDecl {
                kind: DeclKind::Const,
                decls: vec![Declarator {
                    target: sp(Pattern::Ident(name)),
                    init: Some(sp(expr)),
                }],
            })),
            Out::Sequence(exprs) => {
                self.function_lets.push(name.clone());
                self.hoisted.insert(id);
                exprs.push(sp(Expr::assign(Pattern::Ident(name), sp(expr))));
            }
        }
    }

    /// Emit an expression evaluated for its effects, after everything
    /// computed before it.
    fn effect(&mut self, expr: Expr, out: &mut Out<'_>) {
        self.flush(out);
        out.push_expr(expr);
    }

    fn push_stmt(&mut self, stmt: Stmt, out: &mut Out<'_>) -> Result<(), CompilerError> {
        match out {
            Out::Block(stmts) => {
                stmts.push(sp(stmt));
                Ok(())
            }
            Out::Sequence(_) => Err(CompilerError::invalid(
                "statement inside an expression",
                crate::span::Span::dummy(),
            )),
        }
    }

    // ─── Blocks ────────────────────────────────────────────────────

    fn block(&mut self, block: &[ReactiveStatement]) -> Result<Vec<Spanned<Stmt>>, CompilerError> {
        let mut out = Vec::new();
        self.statements(block, &mut out)?;
        Ok(out)
    }

    fn statements(
        &mut self,
        block: &[ReactiveStatement],
        out: &mut Vec<Spanned<Stmt>>,
    ) -> Result<(), CompilerError> {
        for (index, stmt) in block.iter().enumerate() {
            match stmt {
                ReactiveStatement::Instructions(instrs) => {
                    for instr in instrs {
                        self.instruction(instr, &mut Out::Block(out))?;
                    }
                    // Operands of the next terminal stay folded into it.
                    if !matches!(block.get(index + 1), Some(ReactiveStatement::Terminal(_))) {
                        self.flush(&mut Out::Block(out));
                    }
                }
                ReactiveStatement::Terminal(term) => self.terminal(term, out)?,
                ReactiveStatement::Scope(scope) => {
                    self.flush(&mut Out::Block(out));
                    self.scope(scope, out)?;
                }
            }
        }
        self.flush(&mut Out::Block(out));
        Ok(())
    }

    /// An expression block in expression position.
    fn expression_block(&mut self, block: &ExpressionBlock) -> Result<Expr, CompilerError> {
        self.sequence(&block.instructions, block.value)
    }

    // ─── Terminals ─────────────────────────────────────────────────

    fn terminal(
        &mut self,
        term: &TerminalStatement,
        out: &mut Vec<Spanned<Stmt>>,
    ) -> Result<(), CompilerError> {
        use ReactiveTerminal as T;
        match &term.terminal {
            T::Break { label } => {
                self.flush(&mut Out::Block(out));
                let label = label.as_ref().map(|l| sp(self.label(l)));
                out.push(sp(Stmt::Break(label)));
            }
            T::Continue { label } => {
                self.flush(&mut Out::Block(out));
                let label = label.as_ref().map(|l| sp(self.label(l)));
                out.push(sp(Stmt::Continue(label)));
            }
            T::Return { value, kind } => {
                let value = self.take(*value)?;
                self.flush(&mut Out::Block(out));
                self.return_stmt(value, *kind, out);
            }
            T::Throw { value } => {
                let value = self.take(*value)?;
                self.flush(&mut Out::Block(out));
                out.push(sp(Stmt::Throw(sp(value))));
            }
            T::If {
                test,
                consequent,
                alternate,
            } => {
                let test = self.take(*test)?;
                self.flush(&mut Out::Block(out));
                let consequent = self.block(consequent)?;
                let alternate = match alternate {
                    Some(block) => Some(Box::new(sp(Stmt::Block(self.block(block)?)))),
                    None => None,
                };
                out.push(sp(Stmt::If {
                    test: sp(test),
                    consequent: Box::new(sp(Stmt::Block(consequent))),
                    alternate,
                }));
            }
            T::Switch {
                discriminant,
                cases,
            } => {
                let discriminant = self.take(*discriminant)?;
                let mut tests = Vec::new();
                for case in cases {
                    tests.push(match case.test {
                        Some(test) => Some(sp(self.take(test)?)),
                        None => None,
                    });
                }
                self.flush(&mut Out::Block(out));
                let mut emitted = Vec::new();
                for (case, test) in cases.iter().zip(tests) {
                    emitted.push(SwitchCase {
                        test,
                        body: self.block(&case.body)?,
                    });
                }
                out.push(sp(Stmt::Switch {
                    discriminant: sp(discriminant),
                    cases: emitted,
                }));
            }
            T::While { label, test, body } => {
                self.flush(&mut Out::Block(out));
                let test = self.expression_block(test)?;
                let body = self.block(body)?;
                let stmt = Stmt::While {
                    test: sp(test),
                    body: Box::new(sp(Stmt::Block(body))),
                };
                out.push(sp(self.labeled(label, stmt)));
            }
            T::DoWhile { label, body, test } => {
                self.flush(&mut Out::Block(out));
                let body = self.block(body)?;
                let test = self.expression_block(test)?;
                let stmt = Stmt::DoWhile {
                    body: Box::new(sp(Stmt::Block(body))),
                    test: sp(test),
                };
                out.push(sp(self.labeled(label, stmt)));
            }
            T::For {
                label,
                init,
                test,
                update,
                body,
            } => {
                self.flush(&mut Out::Block(out));
                let init = self.block(init)?;
                let test = match test {
                    Some(test) => Some(sp(self.expression_block(test)?)),
                    None => None,
                };
                let update = match update {
                    Some(update) => Some(sp(self.expression_block(update)?)),
                    None => None,
                };
                let body = Box::new(sp(Stmt::Block(self.block(body)?)));
                match for_init(init) {
                    Ok(init) => {
                        let stmt = Stmt::For {
                            init,
                            test,
                            update,
                            body,
                        };
                        out.push(sp(self.labeled(label, stmt)));
                    }
                    Err(mut prelude) => {
                        let stmt = Stmt::For {
                            init: None,
                            test,
                            update,
                            body,
                        };
                        prelude.push(sp(self.labeled(label, stmt)));
                        out.push(sp(Stmt::Block(prelude)));
                    }
                }
            }
            T::ForOf {
                label,
                collection,
                binding,
                body,
            }
            | T::ForIn {
                label,
                collection,
                binding,
                body,
            } => {
                let right = self.take(*collection)?;
                self.flush(&mut Out::Block(out));
                let target = sp(self.pattern(&binding.target)?);
                let left = if binding.kind.is_declaration() {
                    let kind = match binding.kind {
                        crate::hir::StoreKind::Const => DeclKind::Const,
                        _ => DeclKind::Let,
                    };
                    ForHead::Decl { kind, target }
                } else {
                    ForHead::Target(target)
                };
                let body = Box::new(sp(Stmt::Block(self.block(body)?)));
                let stmt = if matches!(term.terminal, T::ForOf { .. }) {
                    Stmt::ForOf {
                        left,
                        right: sp(right),
                        body,
                    }
                } else {
                    Stmt::ForIn {
                        left,
                        right: sp(right),
                        body,
                    }
                };
                out.push(sp(self.labeled(label, stmt)));
            }
            T::Label { label, block } => {
                self.flush(&mut Out::Block(out));
                let label = self.label(label);
                let body = self.block(block)?;
                out.push(sp(Stmt::Labeled {
                    label: sp(label),
                    body: Box::new(sp(Stmt::Block(body))),
                }));
            }
            T::Try {
                block,
                handler,
                finalizer,
            } => {
                self.flush(&mut Out::Block(out));
                let block = self.block(block)?;
                let handler = match handler {
                    Some(handler) => {
                        let param = handler
                            .param
                            .map(|p| sp(Pattern::Ident(self.name(p.identifier))));
                        Some(CatchClause {
                            param,
                            body: self.block(&handler.body)?,
                        })
                    }
                    None => None,
                };
                let finalizer = match finalizer {
                    Some(finalizer) => Some(self.block(finalizer)?),
                    None => None,
                };
                out.push(sp(Stmt::Try {
                    block,
                    handler,
                    finalizer,
                }));
            }
        }
        Ok(())
    }

    fn labeled(&mut self, label: &Option<LabelName>, stmt: Stmt) -> Stmt {
        match label {
            Some(label) => Stmt::Labeled {
                label: sp(self.label(label)),
                body: Box::new(sp(stmt)),
            },
            None => stmt,
        }
    }

    /// A `return`, or inside an early-return scope an assignment to the
    /// scope's result followed by a break out of its labeled block.
    fn return_stmt(&mut self, value: Expr, kind: ReturnKind, out: &mut Vec<Spanned<Stmt>>) {
        if let Some((result, label)) = self.exits.last() {
            out.push(assign_stmt(Pattern::Ident(result.clone()), value));
            out.push(sp(Stmt::Break(Some(sp(label.clone())))));
            return;
        }
        match kind {
            ReturnKind::Implicit => {}
            ReturnKind::Void => out.push(sp(Stmt::Return(None))),
            ReturnKind::Explicit => out.push(sp(Stmt::Return(Some(sp(value))))),
        }
    }

    // ─── Scopes ────────────────────────────────────────────────────

    fn scope(&mut self, block: &ScopeBlock, out: &mut Vec<Spanned<Stmt>>) -> Result<(), CompilerError> {
        let scope = &block.scope;
        for id in &scope.declarations {
            if self.hoisted.insert(*id) {
                let name = self.name(*id);
                out.push(let_decl(name));
            }
        }
        let deps: Vec<Expr> = scope
            .dependencies
            .iter()
            .map(|dep| self.dependency(dep))
            .collect();

        let test = if deps.is_empty() {
            self.used.empty = true;
            Expr::binary(
                BinOp::StrictEq,
                sp(self.slot(scope.first_slot)),
                sp(Expr::Ident(self.runtime.empty.clone())),
            )
        } else {
            let mut test: Option<Expr> = None;
            for (index, dep) in deps.iter().enumerate() {
                let changed = Expr::binary(
                    BinOp::StrictNotEq,
                    sp(self.slot(scope.first_slot + index as u32)),
                    sp(dep.clone()),
                );
                test = Some(match test {
                    Some(left) => Expr::Logical {
                        op: LogicalOp::Or,
                        left: Box::new(sp(left)),
                        right: Box::new(sp(changed)),
                    },
                    None => changed,
                });
            }
            test.unwrap_or(Expr::Bool(true))
        };

        let exit = if scope.early_return {
            self.used.early_return = true;
            let result = self.names.fresh("t");
            let label = self.names.fresh("bb");
            out.push(let_decl(result.clone()));
            Some((result, label))
        } else {
            None
        };
        if let Some(exit) = &exit {
            self.exits.push(exit.clone());
        }
        let body = self.block(&block.body)?;
        if exit.is_some() {
            self.exits.pop();
        }

        let mut miss = Vec::new();
        let mut hit = Vec::new();
        match &exit {
            Some((result, label)) => {
                miss.push(assign_stmt(
                    Pattern::Ident(result.clone()),
                    Expr::Ident(self.runtime.early_return.clone()),
                ));
                miss.push(sp(Stmt::Labeled {
                    label: sp(label.clone()),
                    body: Box::new(sp(Stmt::Block(body))),
                }));
            }
            None => miss.extend(body),
        }
        let mut slot = scope.first_slot;
        for dep in deps {
            miss.push(assign_stmt(self.slot_target(slot), dep));
            slot += 1;
        }
        let outputs = scope
            .declarations
            .iter()
            .map(|id| (*id, true))
            .chain(scope.reassignments.iter().map(|id| (*id, false)));
        for (id, declared) in outputs {
            let name = self.name(id);
            let stored = if declared && self.config.emit_freeze {
                self.used.freeze = true;
                Expr::call(
                    sp(Expr::Ident(self.runtime.freeze.clone())),
                    vec![sp(Expr::Ident(name.clone()))],
                )
            } else {
                Expr::Ident(name.clone())
            };
            miss.push(assign_stmt(self.slot_target(slot), stored));
            hit.push(assign_stmt(Pattern::Ident(name), self.slot(slot)));
            slot += 1;
        }
        if let Some((result, _)) = &exit {
            miss.push(assign_stmt(self.slot_target(slot), Expr::Ident(result.clone())));
            hit.push(assign_stmt(Pattern::Ident(result.clone()), self.slot(slot)));
        }
        out.push(sp(Stmt::If {
            test: sp(test),
            consequent: Box::new(sp(Stmt::Block(miss))),
            alternate: Some(Box::new(sp(Stmt::Block(hit)))),
        }));

        if let Some((result, _)) = exit {
            let mut replay = Vec::new();
            self.return_stmt(Expr::Ident(result.clone()), ReturnKind::Explicit, &mut replay);
            out.push(sp(Stmt::If {
                test: sp(Expr::binary(
                    BinOp::StrictNotEq,
                    sp(Expr::Ident(result)),
                    sp(Expr::Ident(self.runtime.early_return.clone())),
                )),
                consequent: Box::new(sp(Stmt::Block(replay))),
                alternate: None,
            }));
        }
        trace!(scope = scope.id, slots = scope.slot_count(), "scope emitted");
        Ok(())
    }

    /// `props.user?.name`, read the same way the scope body reads it.
    fn dependency(&mut self, dep: &Dependency) -> Expr {
        let mut expr = Expr::Ident(self.name(dep.root));
        let mut optional = false;
        for entry in &dep.path {
            optional |= entry.optional;
            expr = Expr::Member {
                object: Box::new(sp(expr)),
                property: member_prop(&entry.property),
                optional: entry.optional,
            };
        }
        if optional {
            Expr::Chain(Box::new(sp(expr)))
        } else {
            expr
        }
    }

    /// `$[index]`
    fn slot(&self, index: u32) -> Expr {
        Expr::Member {
            object: Box::new(sp(Expr::Ident(self.cache.clone()))),
            property: MemberProp::Computed(Box::new(sp(Expr::Number(f64::from(index))))),
            optional: false,
        }
    }

    fn slot_target(&self, index: u32) -> Pattern {
        Pattern::Member(Box::new(sp(self.slot(index))))
    }
}

// ─── Helpers ───────────────────────────────────────────────────────

fn sp<T>(node: T) -> Spanned<T> {
    Spanned::dummy(node)
}

fn assign_stmt(target: Pattern, value: Expr) -> Spanned<Stmt> {
    sp(Stmt::Expr(sp(Expr::assign(target, sp(value)))))
}

fn let_decl(name: String) -> Spanned<Stmt> {
    sp(Stmt::VarDecl {
        kind: DeclKind::Let,
        decls: vec![Declarator {
            target: sp(Pattern::Ident(name)),
            init: None,
        }],
    })
}

fn member_prop(name: &str) -> MemberProp {
    if names::is_identifier_name(name) {
        MemberProp::Ident(name.to_string())
    } else {
        MemberProp::Computed(Box::new(sp(Expr::Str(name.to_string()))))
    }
}

/// A loop's init statements as a `for` head, or the statements to run
/// before a head-less loop when they do not fit in one.
fn for_init(init: Vec<Spanned<Stmt>>) -> Result<Option<ForInit>, Vec<Spanned<Stmt>>> {
    match init.as_slice() {
        [] => return Ok(None),
        [only] => {
            if let Stmt::Expr(expr) = &only.node {
                return Ok(Some(ForInit::Expr(expr.clone())));
            }
        }
        _ => {}
    }
    let mut kind = None;
    let mut decls = Vec::new();
    for stmt in &init {
        match &stmt.node {
            Stmt::VarDecl { kind: k, decls: d } if kind.is_none() || kind == Some(*k) => {
                kind = Some(*k);
                decls.extend(d.iter().cloned());
            }
            _ => return Err(init),
        }
    }
    match kind {
        Some(kind) => Ok(Some(ForInit::VarDecl { kind, decls })),
        None => Err(init),
    }
}
