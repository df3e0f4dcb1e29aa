//! Scope inference.
//!
//! Values created together and mutated together form one group; the
//! group's instruction range is the union of its members' mutable ranges.
//! Each range is widened to whole statements of one block, overlapping
//! ranges are merged, and the survivors are wrapped around their
//! statements as `Scope` statements, outermost first.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use petgraph::unionfind::UnionFind;
use tracing::trace;

use super::*;
use crate::analysis::{MutableRange, ValueKind};

pub(super) fn infer_scopes(body: &mut ReactiveBlock, func: &HirFunction, analysis: &Analysis) {
    let candidates = candidate_ranges(func, analysis);
    let mut ranges: Vec<MutableRange> = candidates
        .iter()
        .filter_map(|range| aligned(body, *range))
        .collect();
    merge_overlapping(body, &mut ranges);

    // Hook calls and global writes must run on every call.
    ranges.retain(|range| {
        !analysis
            .hooks
            .iter()
            .chain(analysis.global_writes.iter())
            .any(|id| range.contains(*id))
    });

    for (index, range) in ranges.iter().enumerate() {
        let scope = ReactiveScope {
            id: index as u32,
            start: range.start,
            end: range.end,
            ..ReactiveScope::default()
        };
        if !insert_scope(body, scope) {
            trace!(start = %range.start, end = %range.end, "scope has no matching statements");
        }
    }
    trace!(
        candidates = candidates.len(),
        scopes = ranges.len(),
        "scopes inferred"
    );
}

// ─── Candidates ────────────────────────────────────────────────────

/// One range per group of values that are created or mutated together.
fn candidate_ranges(func: &HirFunction, analysis: &Analysis) -> Vec<MutableRange> {
    let mut groups = UnionFind::<usize>::new(analysis.kinds.len().max(1));
    for members in analysis.alias_sets().values() {
        for pair in members.windows(2) {
            groups.union(pair[0].index(), pair[1].index());
        }
    }
    let creators: Vec<&Instruction> = func
        .reachable_instructions()
        .into_iter()
        .filter(|instr| analysis.creates_value(instr))
        .collect();
    for instr in &creators {
        for operand in instr.value.operands() {
            if analysis.is_mutable_at(operand.identifier, instr.id) {
                groups.union(instr.lvalue.identifier.index(), operand.identifier.index());
            }
        }
    }

    let mut ranges: BTreeMap<usize, MutableRange> = BTreeMap::new();
    for instr in &creators {
        let id = instr.lvalue.identifier;
        if let Some(range) = analysis.range(id) {
            extend(&mut ranges, groups.find(id.index()), range);
        }
    }
    for (index, kind) in analysis.kinds.iter().enumerate() {
        let root = groups.find(index);
        if *kind != ValueKind::Mutable || !ranges.contains_key(&root) {
            continue;
        }
        if let Some(range) = analysis.range(IdentifierId(index as u32)) {
            extend(&mut ranges, root, range);
        }
    }
    ranges.into_values().filter(|r| !r.is_empty()).collect()
}

fn extend(ranges: &mut BTreeMap<usize, MutableRange>, root: usize, range: MutableRange) {
    let entry = ranges.entry(root).or_insert(range);
    entry.start = entry.start.min(range.start);
    entry.end = entry.end.max(range.end);
}

// ─── Alignment ─────────────────────────────────────────────────────

enum Aligned<'a> {
    Run(&'a [ReactiveStatement]),
    /// Entirely inside a loop body: never memoized.
    InLoop,
    Empty,
}

fn aligned(body: &ReactiveBlock, range: MutableRange) -> Option<MutableRange> {
    match align(body, range) {
        Aligned::Run(run) => block_range(run).map(|(lo, hi)| MutableRange {
            start: lo,
            end: InstrId(hi.0 + 1),
        }),
        Aligned::InLoop | Aligned::Empty => None,
    }
}

/// The smallest run of whole statements, all in one block, covering
/// `range`.
fn align<'a>(block: &'a [ReactiveStatement], range: MutableRange) -> Aligned<'a> {
    let overlapping: Vec<usize> = (0..block.len())
        .filter(|&i| overlaps(&block[i], range))
        .collect();
    let (Some(&first), Some(&last)) = (overlapping.first(), overlapping.last()) else {
        return Aligned::Empty;
    };
    if first == last {
        if let ReactiveStatement::Terminal(term) = &block[first] {
            if !range.contains(term.id) {
                if term.terminal.is_loop() {
                    return Aligned::InLoop;
                }
                let inner: Vec<&'a ReactiveBlock> = term
                    .terminal
                    .blocks()
                    .into_iter()
                    .filter(|b| b.iter().any(|s| overlaps(s, range)))
                    .collect();
                if inner.len() == 1 {
                    match align(inner[0], range) {
                        Aligned::Run(run) if !escapes(run) => return Aligned::Run(run),
                        Aligned::InLoop => return Aligned::InLoop,
                        _ => {}
                    }
                }
            }
        }
    }

    // A scope never starts between a terminal and the instructions computing
    // its operands. Ending there is fine: the operand becomes an output.
    let mut first = first;
    if first > 0 && feeds_terminal(&block[first - 1], &block[first]) {
        first -= 1;
    }
    Aligned::Run(&block[first..=last])
}

fn overlaps(stmt: &ReactiveStatement, range: MutableRange) -> bool {
    statement_range(stmt).is_some_and(|(lo, hi)| lo < range.end && hi >= range.start)
}

fn feeds_terminal(group: &ReactiveStatement, next: &ReactiveStatement) -> bool {
    let (ReactiveStatement::Instructions(instrs), ReactiveStatement::Terminal(term)) = (group, next)
    else {
        return false;
    };
    let operands = term.terminal.operands();
    instrs
        .iter()
        .any(|i| operands.iter().any(|p| p.identifier == i.lvalue.identifier))
}

/// Whether a run contains a `break` or `continue` that leaves it.
fn escapes(run: &[ReactiveStatement]) -> bool {
    let mut labels = Vec::new();
    run.iter().any(|stmt| jumps_out(stmt, 0, 0, &mut labels))
}

pub(super) fn jumps_out(
    stmt: &ReactiveStatement,
    loops: usize,
    breakables: usize,
    labels: &mut Vec<LabelName>,
) -> bool {
    let term = match stmt {
        ReactiveStatement::Instructions(_) => return false,
        ReactiveStatement::Scope(scope) => {
            return scope
                .body
                .iter()
                .any(|s| jumps_out(s, loops, breakables, labels))
        }
        ReactiveStatement::Terminal(term) => &term.terminal,
    };
    let own_label = match term {
        ReactiveTerminal::Break { label: None } => return breakables == 0,
        ReactiveTerminal::Continue { label: None } => return loops == 0,
        ReactiveTerminal::Break { label: Some(l) } | ReactiveTerminal::Continue { label: Some(l) } => {
            return !labels.contains(l)
        }
        ReactiveTerminal::While { label, .. }
        | ReactiveTerminal::DoWhile { label, .. }
        | ReactiveTerminal::For { label, .. }
        | ReactiveTerminal::ForOf { label, .. }
        | ReactiveTerminal::ForIn { label, .. } => label.clone(),
        ReactiveTerminal::Label { label, .. } => Some(label.clone()),
        _ => None,
    };
    let is_loop = term.is_loop();
    let breakable = is_loop || matches!(term, ReactiveTerminal::Switch { .. });
    let pushed = own_label.is_some();
    labels.extend(own_label);
    let inner_loops = loops + usize::from(is_loop);
    let inner_breakables = breakables + usize::from(breakable);
    let result = term.blocks().into_iter().any(|block| {
        block
            .iter()
            .any(|s| jumps_out(s, inner_loops, inner_breakables, labels))
    });
    if pushed {
        labels.pop();
    }
    result
}

// ─── Merging ───────────────────────────────────────────────────────

/// Merge ranges that partially overlap (or coincide) until every pair is
/// either disjoint or properly nested.
fn merge_overlapping(body: &ReactiveBlock, ranges: &mut Vec<MutableRange>) {
    loop {
        ranges.sort_by_key(|r| (r.start, Reverse(r.end)));
        ranges.dedup();
        let mut pair = None;
        'search: for i in 0..ranges.len() {
            for j in i + 1..ranges.len() {
                let (a, b) = (ranges[i], ranges[j]);
                if b.start >= a.end {
                    break;
                }
                if b.end > a.end {
                    pair = Some((i, j));
                    break 'search;
                }
            }
        }
        let Some((i, j)) = pair else { return };
        let union = MutableRange {
            start: ranges[i].start.min(ranges[j].start),
            end: ranges[i].end.max(ranges[j].end),
        };
        ranges.remove(j);
        ranges.remove(i);
        if let Some(range) = aligned(body, union) {
            ranges.push(range);
        }
    }
}

// ─── Insertion ─────────────────────────────────────────────────────

/// Wrap the statements covering exactly `scope`'s range. Returns false if
/// no run of statements matches.
fn insert_scope(block: &mut ReactiveBlock, scope: ReactiveScope) -> bool {
    let ranges: Vec<Option<(InstrId, InstrId)>> = block.iter().map(statement_range).collect();
    let inside: Vec<usize> = (0..block.len())
        .filter(|&i| ranges[i].is_some_and(|(lo, hi)| lo >= scope.start && hi < scope.end))
        .collect();
    if let (Some(&first), Some(&last)) = (inside.first(), inside.last()) {
        let starts = ranges[first].is_some_and(|(lo, _)| lo == scope.start);
        let ends = ranges[last].is_some_and(|(_, hi)| hi.0 + 1 == scope.end.0);
        if starts && ends {
            let body: ReactiveBlock = block.drain(first..=last).collect();
            block.insert(first, ReactiveStatement::Scope(ScopeBlock { scope, body }));
            return true;
        }
    }

    let Some(index) = (0..block.len()).find(|&i| {
        ranges[i].is_some_and(|(lo, hi)| lo <= scope.start && hi.0 + 1 >= scope.end.0)
    }) else {
        return false;
    };
    match &mut block[index] {
        ReactiveStatement::Instructions(_) => false,
        ReactiveStatement::Scope(outer) => insert_scope(&mut outer.body, scope),
        ReactiveStatement::Terminal(term) => {
            let target = term.terminal.blocks_mut().into_iter().find(|inner| {
                block_range(inner).is_some_and(|(lo, hi)| lo <= scope.start && hi.0 + 1 >= scope.end.0)
            });
            match target {
                Some(inner) => insert_scope(inner, scope),
                None => false,
            }
        }
    }
}
