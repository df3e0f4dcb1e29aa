//! Reactive functions: the HIR control-flow graph rebuilt as a tree of
//! statements, with reactive scopes wrapped around runs of statements.
//!
//! A reactive scope is a run of whole statements whose results are cached.
//! On entry the scope compares its dependencies against the cache; when
//! they are unchanged it restores its outputs instead of running its body.
//!
//! Construction runs in order:
//!
//! 1. `build`: structured statements from the CFG,
//! 2. `scopes`: candidate ranges from the analysis, aligned to statements,
//!    merged and inserted,
//! 3. `deps`: dependencies, declarations and reassignments per scope,
//! 4. `prune`: scopes whose outputs never escape are dissolved,
//! 5. `slots`: cache slot layout.

mod build;
mod deps;
pub mod print;
mod prune;
mod scopes;
mod slots;
#[cfg(test)]
mod tests;

use tracing::debug;

use crate::analysis::Analysis;
use crate::config::CompilerConfig;
use crate::error::CompilerError;
use crate::hir::{
    Environment, HirFunction, IdentifierId, InstrId, Instruction, LabelName, LoopBinding, Param,
    Place, ReturnKind,
};
use crate::span::Span;

pub use print::print_reactive_function;

// ─── Tree ──────────────────────────────────────────────────────────

pub type ReactiveBlock = Vec<ReactiveStatement>;

#[derive(Clone, Debug)]
pub enum ReactiveStatement {
    /// The instructions of one source statement.
    Instructions(Vec<Instruction>),
    Terminal(TerminalStatement),
    Scope(ScopeBlock),
}

/// A terminal and the blocks it owns. The instructions computing its
/// operands (test, discriminant, collection or returned value) are the
/// `Instructions` statement right before it.
#[derive(Clone, Debug)]
pub struct TerminalStatement {
    pub id: InstrId,
    pub terminal: ReactiveTerminal,
    pub span: Span,
}

/// Instructions evaluated as one expression, yielding `value`.
#[derive(Clone, Debug)]
pub struct ExpressionBlock {
    pub instructions: Vec<Instruction>,
    pub value: Place,
}

#[derive(Clone, Debug)]
pub struct ReactiveCase {
    pub test: Option<Place>,
    pub body: ReactiveBlock,
}

#[derive(Clone, Debug)]
pub struct ReactiveHandler {
    pub param: Option<Place>,
    pub body: ReactiveBlock,
}

#[derive(Clone, Debug)]
pub enum ReactiveTerminal {
    Break {
        label: Option<LabelName>,
    },
    Continue {
        label: Option<LabelName>,
    },
    Return {
        value: Place,
        kind: ReturnKind,
    },
    Throw {
        value: Place,
    },
    If {
        test: Place,
        consequent: ReactiveBlock,
        alternate: Option<ReactiveBlock>,
    },
    Switch {
        discriminant: Place,
        cases: Vec<ReactiveCase>,
    },
    While {
        label: Option<LabelName>,
        test: ExpressionBlock,
        body: ReactiveBlock,
    },
    DoWhile {
        label: Option<LabelName>,
        body: ReactiveBlock,
        test: ExpressionBlock,
    },
    For {
        label: Option<LabelName>,
        init: ReactiveBlock,
        test: Option<ExpressionBlock>,
        update: Option<ExpressionBlock>,
        body: ReactiveBlock,
    },
    ForOf {
        label: Option<LabelName>,
        collection: Place,
        binding: LoopBinding,
        body: ReactiveBlock,
    },
    ForIn {
        label: Option<LabelName>,
        collection: Place,
        binding: LoopBinding,
        body: ReactiveBlock,
    },
    Label {
        label: LabelName,
        block: ReactiveBlock,
    },
    Try {
        block: ReactiveBlock,
        handler: Option<ReactiveHandler>,
        finalizer: Option<ReactiveBlock>,
    },
}

impl ReactiveTerminal {
    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            ReactiveTerminal::While { .. }
                | ReactiveTerminal::DoWhile { .. }
                | ReactiveTerminal::For { .. }
                | ReactiveTerminal::ForOf { .. }
                | ReactiveTerminal::ForIn { .. }
        )
    }

    /// Nested statement lists, in source order.
    pub fn blocks(&self) -> Vec<&ReactiveBlock> {
        use ReactiveTerminal as T;
        match self {
            T::Break { .. } | T::Continue { .. } | T::Return { .. } | T::Throw { .. } => Vec::new(),
            T::If {
                consequent,
                alternate,
                ..
            } => {
                let mut out = vec![consequent];
                out.extend(alternate.iter());
                out
            }
            T::Switch { cases, .. } => cases.iter().map(|c| &c.body).collect(),
            T::While { body, .. }
            | T::DoWhile { body, .. }
            | T::ForOf { body, .. }
            | T::ForIn { body, .. } => vec![body],
            T::For { init, body, .. } => vec![init, body],
            T::Label { block, .. } => vec![block],
            T::Try {
                block,
                handler,
                finalizer,
            } => {
                let mut out = vec![block];
                out.extend(handler.iter().map(|h| &h.body));
                out.extend(finalizer.iter());
                out
            }
        }
    }

    pub fn blocks_mut(&mut self) -> Vec<&mut ReactiveBlock> {
        use ReactiveTerminal as T;
        match self {
            T::Break { .. } | T::Continue { .. } | T::Return { .. } | T::Throw { .. } => Vec::new(),
            T::If {
                consequent,
                alternate,
                ..
            } => {
                let mut out = vec![consequent];
                out.extend(alternate.iter_mut());
                out
            }
            T::Switch { cases, .. } => cases.iter_mut().map(|c| &mut c.body).collect(),
            T::While { body, .. }
            | T::DoWhile { body, .. }
            | T::ForOf { body, .. }
            | T::ForIn { body, .. } => vec![body],
            T::For { init, body, .. } => vec![init, body],
            T::Label { block, .. } => vec![block],
            T::Try {
                block,
                handler,
                finalizer,
            } => {
                let mut out = vec![block];
                out.extend(handler.iter_mut().map(|h| &mut h.body));
                out.extend(finalizer.iter_mut());
                out
            }
        }
    }

    /// Expression blocks evaluated by loops.
    pub fn expression_blocks(&self) -> Vec<&ExpressionBlock> {
        match self {
            ReactiveTerminal::While { test, .. } | ReactiveTerminal::DoWhile { test, .. } => {
                vec![test]
            }
            ReactiveTerminal::For { test, update, .. } => {
                test.iter().chain(update.iter()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Places the terminal reads directly.
    pub fn operands(&self) -> Vec<Place> {
        use ReactiveTerminal as T;
        match self {
            T::Return { value, .. } | T::Throw { value } => vec![*value],
            T::If { test, .. } => vec![*test],
            T::Switch {
                discriminant,
                cases,
            } => {
                let mut out = vec![*discriminant];
                out.extend(cases.iter().filter_map(|c| c.test));
                out
            }
            T::ForOf { collection, .. } | T::ForIn { collection, .. } => vec![*collection],
            _ => Vec::new(),
        }
    }

    /// Bindings the terminal itself writes.
    pub fn stored_places(&self) -> Vec<Place> {
        match self {
            ReactiveTerminal::ForOf { binding, .. } | ReactiveTerminal::ForIn { binding, .. } => {
                binding.target.places()
            }
            ReactiveTerminal::Try {
                handler: Some(ReactiveHandler {
                    param: Some(param), ..
                }),
                ..
            } => vec![*param],
            _ => Vec::new(),
        }
    }
}

// ─── Scopes ────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathEntry {
    pub property: String,
    /// Read with `?.`.
    pub optional: bool,
}

/// A value a scope reads from outside: a root identifier and a static
/// property path, e.g. `props.user?.name`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dependency {
    pub root: IdentifierId,
    pub path: Vec<PathEntry>,
}

impl Dependency {
    pub fn is_prefix_of(&self, other: &Dependency) -> bool {
        self.root == other.root
            && self.path.len() <= other.path.len()
            && self
                .path
                .iter()
                .zip(&other.path)
                .all(|(a, b)| a.property == b.property)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ReactiveScope {
    pub id: u32,
    /// Instruction ids `[start, end)` covered by the scope's statements.
    pub start: InstrId,
    pub end: InstrId,
    pub dependencies: Vec<Dependency>,
    /// Values created inside the scope and read after it.
    pub declarations: Vec<IdentifierId>,
    /// Outer bindings written inside the scope and read after it.
    pub reassignments: Vec<IdentifierId>,
    /// The scope contains a `return`.
    pub early_return: bool,
    /// First cache slot; see `slots`.
    pub first_slot: u32,
}

impl ReactiveScope {
    pub fn contains(&self, id: InstrId) -> bool {
        self.start <= id && id < self.end
    }

    /// Number of cache slots: dependencies, outputs, then the early-return
    /// value.
    pub fn slot_count(&self) -> u32 {
        (self.dependencies.len() + self.declarations.len() + self.reassignments.len()) as u32
            + u32::from(self.early_return)
    }
}

#[derive(Clone, Debug)]
pub struct ScopeBlock {
    pub scope: ReactiveScope,
    pub body: ReactiveBlock,
}

#[derive(Clone, Debug)]
pub struct ReactiveFunction {
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub directives: Vec<String>,
    pub body: ReactiveBlock,
    pub is_arrow: bool,
    pub is_async: bool,
    pub span: Span,
    /// Total cache slots used by the function's scopes.
    pub cache_size: u32,
}

impl ReactiveFunction {
    /// Kept scopes, outermost first.
    pub fn scopes(&self) -> Vec<&ReactiveScope> {
        let mut out = Vec::new();
        visit_scopes(&self.body, &mut |scope| out.push(scope));
        out
    }
}

fn visit_scopes<'a>(block: &'a ReactiveBlock, f: &mut impl FnMut(&'a ReactiveScope)) {
    for stmt in block {
        match stmt {
            ReactiveStatement::Instructions(_) => {}
            ReactiveStatement::Terminal(term) => {
                for inner in term.terminal.blocks() {
                    visit_scopes(inner, f);
                }
            }
            ReactiveStatement::Scope(scope) => {
                f(&scope.scope);
                visit_scopes(&scope.body, f);
            }
        }
    }
}

// ─── Id ranges ─────────────────────────────────────────────────────

/// Smallest and largest instruction id in a statement, inclusive.
pub fn statement_range(stmt: &ReactiveStatement) -> Option<(InstrId, InstrId)> {
    let mut range: Option<(InstrId, InstrId)> = None;
    visit_ids(stmt, &mut |id| {
        range = Some(match range {
            Some((lo, hi)) => (lo.min(id), hi.max(id)),
            None => (id, id),
        });
    });
    range
}

/// Smallest and largest instruction id in a statement list, inclusive.
pub fn block_range(block: &[ReactiveStatement]) -> Option<(InstrId, InstrId)> {
    block
        .iter()
        .filter_map(statement_range)
        .reduce(|(lo, hi), (l, h)| (lo.min(l), hi.max(h)))
}

fn visit_ids(stmt: &ReactiveStatement, f: &mut impl FnMut(InstrId)) {
    let instructions = |instrs: &[Instruction], f: &mut dyn FnMut(InstrId)| {
        for instr in instrs {
            instr.walk(&mut |i| f(i.id));
        }
    };
    match stmt {
        ReactiveStatement::Instructions(instrs) => instructions(instrs, f),
        ReactiveStatement::Terminal(term) => {
            f(term.id);
            for block in term.terminal.expression_blocks() {
                instructions(&block.instructions, f);
            }
            for block in term.terminal.blocks() {
                for inner in block {
                    visit_ids(inner, f);
                }
            }
        }
        ReactiveStatement::Scope(scope) => {
            for inner in &scope.body {
                visit_ids(inner, f);
            }
        }
    }
}

// ─── Pipeline ──────────────────────────────────────────────────────

/// Build the reactive function for a lowered and analyzed function.
pub fn build_reactive_function(
    func: &HirFunction,
    env: &Environment,
    analysis: &Analysis,
    config: &CompilerConfig,
) -> Result<ReactiveFunction, CompilerError> {
    let mut body = build::build_tree(func)?;
    scopes::infer_scopes(&mut body, func, analysis);
    deps::annotate_scopes(&mut body, func, analysis);
    prune::prune_scopes(&mut body, func, analysis, config);
    let cache_size = slots::assign_slots(&mut body);
    let reactive = ReactiveFunction {
        name: func.name.clone(),
        params: func.params.clone(),
        directives: func.directives.clone(),
        body,
        is_arrow: func.is_arrow,
        is_async: func.is_async,
        span: func.span,
        cache_size,
    };
    debug!(
        function = func.name.as_deref().unwrap_or("<anonymous>"),
        scopes = reactive.scopes().len(),
        cache_size,
        identifiers = env.identifiers.len(),
        "reactive scopes built"
    );
    Ok(reactive)
}
