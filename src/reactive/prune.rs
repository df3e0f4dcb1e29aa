//! Dissolve scopes whose outputs never escape the function.
//!
//! A value escapes when it is returned or thrown, passed to a hook, written
//! to global state, or (with preserved manual memoization) produced by
//! `useMemo`/`useCallback`. Memoizing anything else cannot change what the
//! caller observes, so those scopes are spliced back into their parent.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use super::*;
use crate::hir::{InstructionValue, TerminalKind};

pub(super) fn prune_scopes(
    body: &mut ReactiveBlock,
    func: &HirFunction,
    analysis: &Analysis,
    config: &CompilerConfig,
) {
    let escaping = escaping_values(func, analysis, config);

    let manual: HashSet<IdentifierId> = if config.enable_preserve_existing_memoization_guarantees {
        func.manual_memos.iter().copied().collect()
    } else {
        HashSet::new()
    };

    let mut infos = Vec::new();
    scope_infos(body, analysis, &manual, &mut infos);
    let mut keep: HashSet<u32> = infos
        .iter()
        .filter(|info| {
            info.early_return
                || info.manual_memo
                || info.outputs.iter().any(|id| escaping.contains(id))
        })
        .map(|info| info.id)
        .collect();

    // A kept scope's inputs must come from kept scopes too, or a hit would
    // hand out a value computed from a stale input.
    let producers: HashMap<IdentifierId, u32> = infos
        .iter()
        .flat_map(|info| info.outputs.iter().map(move |id| (*id, info.id)))
        .collect();
    loop {
        let mut changed = false;
        for info in &infos {
            if !keep.contains(&info.id) {
                continue;
            }
            for input in &info.inputs {
                if let Some(producer) = producers.get(input) {
                    changed |= keep.insert(*producer);
                }
            }
        }
        if !changed {
            break;
        }
    }

    let before = infos.len();
    dissolve(body, &keep);
    trace!(kept = keep.len(), pruned = before - keep.len(), "scopes pruned");
}

// ─── Escape analysis ───────────────────────────────────────────────

fn escaping_values(
    func: &HirFunction,
    analysis: &Analysis,
    config: &CompilerConfig,
) -> HashSet<IdentifierId> {
    let instrs = func.reachable_instructions();
    let terminals = func.reachable_terminals();
    let mut escaping: HashSet<IdentifierId> = HashSet::new();
    for terminal in &terminals {
        if let TerminalKind::Return { .. } | TerminalKind::Throw { .. } = terminal.kind {
            escaping.extend(terminal.kind.operands().iter().map(|p| p.identifier));
        }
    }
    for instr in &instrs {
        if analysis.hooks.contains(&instr.id) {
            let args = match &instr.value {
                InstructionValue::Call { args, .. } | InstructionValue::MethodCall { args, .. } => {
                    args.iter().map(|a| a.place().identifier).collect()
                }
                _ => Vec::new(),
            };
            escaping.extend(args);
        }
        if analysis.global_writes.contains(&instr.id) {
            escaping.extend(instr.value.operands().iter().map(|p| p.identifier));
        }
    }
    if config.enable_preserve_existing_memoization_guarantees {
        escaping.extend(func.manual_memos.iter().copied());
    }

    let alias_sets = analysis.alias_sets();
    loop {
        let before = escaping.len();
        for instr in &instrs {
            let mut flows = escaping.contains(&instr.lvalue.identifier)
                || instr
                    .value
                    .stored_places()
                    .iter()
                    .any(|p| escaping.contains(&p.identifier));
            // Whatever is put into an escaping object escapes with it.
            flows |= analysis
                .effects_of(instr.id)
                .iter()
                .any(|(place, effect)| effect.is_mutation() && escaping.contains(&place.identifier));
            if flows {
                escaping.extend(instr.value.operands().iter().map(|p| p.identifier));
                if escaping.contains(&instr.lvalue.identifier) {
                    escaping.extend(instr.value.value_blocks().iter().map(|b| b.result.identifier));
                }
            }
        }
        for terminal in &terminals {
            if let TerminalKind::ForOf {
                collection,
                binding,
                ..
            }
            | TerminalKind::ForIn {
                collection,
                binding,
                ..
            } = &terminal.kind
            {
                if binding
                    .target
                    .places()
                    .iter()
                    .any(|p| escaping.contains(&p.identifier))
                {
                    escaping.insert(collection.identifier);
                }
            }
        }
        for members in alias_sets.values() {
            if members.iter().any(|id| escaping.contains(id)) {
                escaping.extend(members.iter().copied());
            }
        }
        if escaping.len() == before {
            return escaping;
        }
    }
}

// ─── Scopes ────────────────────────────────────────────────────────

struct ScopeInfo {
    id: u32,
    outputs: Vec<IdentifierId>,
    /// Bindings defined before the scope and read inside it.
    inputs: Vec<IdentifierId>,
    early_return: bool,
    /// Computes a preserved `useMemo`/`useCallback` result, even one that is
    /// only consumed inside the scope.
    manual_memo: bool,
}

fn scope_infos(
    block: &[ReactiveStatement],
    analysis: &Analysis,
    manual: &HashSet<IdentifierId>,
    out: &mut Vec<ScopeInfo>,
) {
    for stmt in block {
        match stmt {
            ReactiveStatement::Instructions(_) => {}
            ReactiveStatement::Terminal(term) => {
                for inner in term.terminal.blocks() {
                    scope_infos(inner, analysis, manual, out);
                }
            }
            ReactiveStatement::Scope(scope) => {
                let s = &scope.scope;
                let mut inputs = Vec::new();
                for place in read_places(&scope.body) {
                    let defined_before = analysis.def(place.identifier).is_some_and(|d| d < s.start);
                    if defined_before && !inputs.contains(&place.identifier) {
                        inputs.push(place.identifier);
                    }
                }
                let outputs: Vec<IdentifierId> = s
                    .declarations
                    .iter()
                    .chain(s.reassignments.iter())
                    .copied()
                    .collect();
                // A scope without slots has nothing to compare or restore.
                let has_slots = !outputs.is_empty() || !s.dependencies.is_empty();
                out.push(ScopeInfo {
                    id: s.id,
                    outputs,
                    inputs,
                    early_return: s.early_return,
                    manual_memo: has_slots && !manual.is_empty() && writes_any(&scope.body, manual),
                });
                scope_infos(&scope.body, analysis, manual, out);
            }
        }
    }
}

fn read_places(block: &[ReactiveStatement]) -> Vec<Place> {
    let mut out = Vec::new();
    let instructions = |instrs: &[Instruction], out: &mut Vec<Place>| {
        for instr in instrs {
            instr.walk(&mut |i| out.extend(i.value.operands()));
        }
    };
    for stmt in block {
        match stmt {
            ReactiveStatement::Instructions(instrs) => instructions(instrs, &mut out),
            ReactiveStatement::Terminal(term) => {
                out.extend(term.terminal.operands());
                for expr in term.terminal.expression_blocks() {
                    instructions(&expr.instructions, &mut out);
                }
                for inner in term.terminal.blocks() {
                    out.extend(read_places(inner));
                }
            }
            ReactiveStatement::Scope(scope) => out.extend(read_places(&scope.body)),
        }
    }
    out
}

/// Whether the block defines or assigns one of `ids`.
fn writes_any(block: &[ReactiveStatement], ids: &HashSet<IdentifierId>) -> bool {
    let instructions = |instrs: &[Instruction]| {
        let mut found = false;
        for instr in instrs {
            instr.walk(&mut |i| {
                found |= ids.contains(&i.lvalue.identifier)
                    || i.value.stored_places().iter().any(|p| ids.contains(&p.identifier));
            });
        }
        found
    };
    block.iter().any(|stmt| match stmt {
        ReactiveStatement::Instructions(instrs) => instructions(instrs),
        ReactiveStatement::Terminal(term) => {
            term.terminal
                .stored_places()
                .iter()
                .any(|p| ids.contains(&p.identifier))
                || term
                    .terminal
                    .expression_blocks()
                    .iter()
                    .any(|expr| instructions(&expr.instructions))
                || term.terminal.blocks().iter().any(|inner| writes_any(inner, ids))
        }
        ReactiveStatement::Scope(scope) => writes_any(&scope.body, ids),
    })
}

/// Replace every scope not in `keep` by its body.
fn dissolve(block: &mut ReactiveBlock, keep: &HashSet<u32>) {
    let statements = std::mem::take(block);
    for stmt in statements {
        match stmt {
            ReactiveStatement::Scope(mut scope) => {
                dissolve(&mut scope.body, keep);
                if keep.contains(&scope.scope.id) {
                    block.push(ReactiveStatement::Scope(scope));
                } else {
                    block.extend(scope.body);
                }
            }
            ReactiveStatement::Terminal(mut term) => {
                for inner in term.terminal.blocks_mut() {
                    dissolve(inner, keep);
                }
                block.push(ReactiveStatement::Terminal(term));
            }
            other => block.push(other),
        }
    }
}
