//! Dependencies, declarations and reassignments of each scope.

use std::collections::{HashMap, HashSet};

use super::*;
use crate::analysis::ValueKind;
use crate::hir::InstructionValue;

/// Dereferenced paths, keyed by root and property names, with the first
/// instruction that dereferences them.
type Derefs = HashMap<(IdentifierId, Vec<String>), InstrId>;

pub(super) fn annotate_scopes(body: &mut ReactiveBlock, func: &HirFunction, analysis: &Analysis) {
    let refs = References::build(func);
    let mut leading = Derefs::new();
    unconditional_derefs(body, &refs, &mut leading);
    annotate_block(body, analysis, &refs, &leading);
}

fn annotate_block(
    block: &mut ReactiveBlock,
    analysis: &Analysis,
    refs: &References,
    leading: &Derefs,
) {
    for stmt in block.iter_mut() {
        match stmt {
            ReactiveStatement::Instructions(_) => {}
            ReactiveStatement::Terminal(term) => {
                for inner in term.terminal.blocks_mut() {
                    annotate_block(inner, analysis, refs, leading);
                }
            }
            ReactiveStatement::Scope(scope) => {
                annotate_scope(scope, analysis, refs, leading);
                annotate_block(&mut scope.body, analysis, refs, leading);
            }
        }
    }
}

// ─── References ────────────────────────────────────────────────────

/// Where every identifier is read or written, and which temporaries hold a
/// static property path.
pub(super) struct References {
    sites: HashMap<IdentifierId, Vec<InstrId>>,
    stores: HashMap<IdentifierId, Vec<InstrId>>,
    /// Bindings read by a nested function.
    captured: HashSet<IdentifierId>,
    paths: HashMap<IdentifierId, Dependency>,
    params: HashSet<IdentifierId>,
    /// Paths each function expression reads from the bindings it captures.
    closures: HashMap<IdentifierId, Vec<Dependency>>,
}

impl References {
    pub(super) fn build(func: &HirFunction) -> Self {
        let mut refs = References {
            sites: HashMap::new(),
            stores: HashMap::new(),
            captured: HashSet::new(),
            paths: HashMap::new(),
            params: func.params.iter().map(|p| p.place.identifier).collect(),
            closures: HashMap::new(),
        };
        for instr in func.reachable_instructions() {
            refs.site(instr.lvalue.identifier, instr.id);
            for place in instr.value.operands() {
                refs.site(place.identifier, instr.id);
            }
            for place in instr.value.stored_places() {
                refs.site(place.identifier, instr.id);
                refs.stores.entry(place.identifier).or_default().push(instr.id);
            }
            if let InstructionValue::FunctionExpression { lowered, context } = &instr.value {
                refs.captured.extend(context.iter().map(|p| p.identifier));
                refs.closures
                    .insert(instr.lvalue.identifier, captured_paths(&lowered.func, context));
            }
        }
        for terminal in func.reachable_terminals() {
            for place in terminal.kind.operands() {
                refs.site(place.identifier, terminal.id);
            }
            for place in terminal.kind.stored_places() {
                refs.site(place.identifier, terminal.id);
                refs.stores.entry(place.identifier).or_default().push(terminal.id);
            }
        }
        let live = func.live_blocks();
        for id in func.reverse_postorder() {
            if live[id.0 as usize] {
                record_paths(&func.block(id).instructions, &mut refs.paths, None);
            }
        }
        refs
    }

    fn site(&mut self, id: IdentifierId, at: InstrId) {
        self.sites.entry(id).or_default().push(at);
    }

    /// The path a place holds, or the place itself as a root.
    pub(super) fn path_of(&self, place: Place) -> Dependency {
        self.paths
            .get(&place.identifier)
            .cloned()
            .unwrap_or(Dependency {
                root: place.identifier,
                path: Vec::new(),
            })
    }

    pub(super) fn is_param(&self, id: IdentifierId) -> bool {
        self.params.contains(&id)
    }

    /// Values an instruction consumes. A function expression reads the
    /// paths its body reads from captured bindings.
    pub(super) fn reads(&self, instr: &Instruction) -> Vec<Dependency> {
        match self.closures.get(&instr.lvalue.identifier) {
            Some(paths) => paths.clone(),
            None => self
                .consumed(instr)
                .into_iter()
                .map(|place| self.path_of(place))
                .collect(),
        }
    }

    /// Operands that consume a value, as opposed to extending a path.
    pub(super) fn consumed(&self, instr: &Instruction) -> Vec<Place> {
        match &instr.value {
            InstructionValue::LoadLocal(_) | InstructionValue::Optional { .. } => Vec::new(),
            InstructionValue::PropertyLoad { .. }
                if self.paths.contains_key(&instr.lvalue.identifier) =>
            {
                Vec::new()
            }
            value => value.operands(),
        }
    }
}

/// Every path a nested function reads from its captured bindings. A
/// binding captured but never consumed contributes itself.
fn captured_paths(func: &HirFunction, context: &[Place]) -> Vec<Dependency> {
    let inner = References::build(func);
    let roots: HashSet<IdentifierId> = context.iter().map(|p| p.identifier).collect();
    let mut out: Vec<Dependency> = Vec::new();
    let mut keep = |dep: Dependency| {
        if roots.contains(&dep.root) && !out.contains(&dep) {
            out.push(dep);
        }
    };
    for instr in func.reachable_instructions() {
        for dep in inner.reads(instr) {
            keep(dep);
        }
    }
    for terminal in func.reachable_terminals() {
        for place in terminal.kind.operands() {
            keep(inner.path_of(place));
        }
    }
    for place in context {
        if !out.iter().any(|d| d.root == place.identifier) {
            out.push(Dependency {
                root: place.identifier,
                path: Vec::new(),
            });
        }
    }
    out
}

/// Map temporaries to the property paths they load. `optional_object` is
/// the object of an enclosing `?.`, whose first load is optional.
fn record_paths(
    instrs: &[Instruction],
    paths: &mut HashMap<IdentifierId, Dependency>,
    optional_object: Option<IdentifierId>,
) {
    for instr in instrs {
        match &instr.value {
            InstructionValue::LoadLocal(place) => {
                let dep = paths.get(&place.identifier).cloned().unwrap_or(Dependency {
                    root: place.identifier,
                    path: Vec::new(),
                });
                paths.insert(instr.lvalue.identifier, dep);
            }
            InstructionValue::PropertyLoad { object, property } => {
                if let Some(mut dep) = paths.get(&object.identifier).cloned() {
                    dep.path.push(PathEntry {
                        property: property.clone(),
                        optional: optional_object == Some(object.identifier),
                    });
                    paths.insert(instr.lvalue.identifier, dep);
                }
            }
            InstructionValue::Optional { object, chain } => {
                record_paths(&chain.instructions, paths, Some(object.identifier));
                if let Some(dep) = paths.get(&chain.result.identifier).cloned() {
                    paths.insert(instr.lvalue.identifier, dep);
                }
            }
            value => {
                for block in value.value_blocks() {
                    record_paths(&block.instructions, paths, None);
                }
            }
        }
    }
}

// ─── Per scope ─────────────────────────────────────────────────────

fn annotate_scope(scope: &mut ScopeBlock, analysis: &Analysis, refs: &References, leading: &Derefs) {
    let (start, end) = (scope.scope.start, scope.scope.end);
    let inside = |at: InstrId| start <= at && at < end;
    let outside_def = |id: IdentifierId| {
        refs.is_param(id) || analysis.def(id).is_some_and(|d| d < start)
    };

    // Dependencies.
    let mut candidates = Vec::new();
    let mut stored = HashSet::new();
    collect_reads(&scope.body, refs, &mut stored, &mut |dep, stored| {
        let root = dep.root;
        if outside_def(root) && analysis.is_reactive(root) && !stored.contains(&root) {
            candidates.push(dep);
        }
    });
    // Paths the function always dereferences before entering the scope
    // stay valid as long as nothing writes their root afterwards.
    let mut derefs: HashSet<(IdentifierId, Vec<String>)> = leading
        .iter()
        .filter(|((root, _), at)| {
            **at < start
                && refs
                    .stores
                    .get(root)
                    .map_or(true, |stores| stores.iter().all(|w| w <= *at))
        })
        .map(|(key, _)| key.clone())
        .collect();
    let mut inside_derefs = Derefs::new();
    unconditional_derefs(&scope.body, refs, &mut inside_derefs);
    derefs.extend(inside_derefs.into_keys());
    let mut dependencies: Vec<Dependency> = Vec::new();
    for mut dep in candidates {
        let keep = if analysis.kind(dep.root) == ValueKind::Mutable {
            0
        } else {
            hoistable_len(&dep, &derefs)
        };
        dep.path.truncate(keep);
        add_dependency(&mut dependencies, dep);
    }

    // Outputs.
    let mut declarations: Vec<(InstrId, IdentifierId)> = Vec::new();
    let mut reassignments: Vec<(InstrId, IdentifierId)> = Vec::new();
    for (id, sites) in &refs.sites {
        let used_outside = sites.iter().any(|at| !inside(*at));
        let used_after = sites.iter().any(|at| *at >= end) || refs.captured.contains(id);
        match analysis.def(*id) {
            Some(def) if inside(def) && !refs.is_param(*id) => {
                if used_outside {
                    declarations.push((def, *id));
                }
            }
            _ => {
                let first_store = refs
                    .stores
                    .get(id)
                    .and_then(|stores| stores.iter().copied().filter(|at| inside(*at)).min());
                if let Some(at) = first_store {
                    if used_after {
                        reassignments.push((at, *id));
                    }
                }
            }
        }
    }
    declarations.sort();
    reassignments.sort();

    let s = &mut scope.scope;
    s.dependencies = dependencies;
    s.declarations = declarations.into_iter().map(|(_, id)| id).collect();
    s.reassignments = reassignments.into_iter().map(|(_, id)| id).collect();
    s.early_return = contains_return(&scope.body);
}

/// Visit every consumed value in program order. `stored` holds the
/// bindings written so far inside the scope.
fn collect_reads(
    block: &[ReactiveStatement],
    refs: &References,
    stored: &mut HashSet<IdentifierId>,
    f: &mut impl FnMut(Dependency, &HashSet<IdentifierId>),
) {
    for stmt in block {
        match stmt {
            ReactiveStatement::Instructions(instrs) => {
                for instr in instrs {
                    read_instruction(instr, refs, stored, f);
                }
            }
            ReactiveStatement::Terminal(term) => {
                for place in term.terminal.operands() {
                    f(refs.path_of(place), stored);
                }
                stored.extend(term.terminal.stored_places().iter().map(|p| p.identifier));
                for expr in term.terminal.expression_blocks() {
                    for instr in &expr.instructions {
                        read_instruction(instr, refs, stored, f);
                    }
                }
                for inner in term.terminal.blocks() {
                    collect_reads(inner, refs, stored, f);
                }
            }
            ReactiveStatement::Scope(inner) => collect_reads(&inner.body, refs, stored, f),
        }
    }
}

fn read_instruction(
    instr: &Instruction,
    refs: &References,
    stored: &mut HashSet<IdentifierId>,
    f: &mut impl FnMut(Dependency, &HashSet<IdentifierId>),
) {
    instr.walk(&mut |i| {
        for dep in refs.reads(i) {
            f(dep, stored);
        }
        stored.extend(i.value.stored_places().iter().map(|p| p.identifier));
    });
}

/// Paths dereferenced on every execution of the block, before anything
/// can leave it early. Returns whether the walk reached the end.
fn unconditional_derefs(block: &[ReactiveStatement], refs: &References, out: &mut Derefs) -> bool {
    for stmt in block {
        match stmt {
            ReactiveStatement::Instructions(instrs) => {
                for instr in instrs {
                    if let Some(object) = dereferenced(&instr.value) {
                        if let Some(dep) = refs.paths.get(&object.identifier) {
                            out.entry((dep.root, property_names(dep))).or_insert(instr.id);
                        }
                    }
                }
            }
            ReactiveStatement::Scope(inner) => {
                if !unconditional_derefs(&inner.body, refs, out) {
                    return false;
                }
            }
            ReactiveStatement::Terminal(term) => {
                match &term.terminal {
                    // The block always runs from its first statement.
                    ReactiveTerminal::Label { block, .. } => {
                        unconditional_derefs(block, refs, out);
                    }
                    // Iterating throws on a nullish collection.
                    ReactiveTerminal::ForOf { collection, .. } => {
                        let dep = refs.path_of(*collection);
                        out.entry((dep.root, property_names(&dep))).or_insert(term.id);
                    }
                    _ => {}
                }
                if leaves(stmt) {
                    return false;
                }
            }
        }
    }
    true
}

fn dereferenced(value: &InstructionValue) -> Option<Place> {
    use InstructionValue as V;
    match value {
        V::PropertyLoad { object, .. }
        | V::ComputedLoad { object, .. }
        | V::PropertyStore { object, .. }
        | V::ComputedStore { object, .. }
        | V::PropertyDelete { object, .. }
        | V::ComputedDelete { object, .. } => Some(*object),
        V::MethodCall { receiver, .. } => Some(*receiver),
        V::Destructure { value, .. } => Some(*value),
        _ => None,
    }
}

fn property_names(dep: &Dependency) -> Vec<String> {
    dep.path.iter().map(|e| e.property.clone()).collect()
}

/// Longest prefix of the path that can be read without throwing.
fn hoistable_len(dep: &Dependency, derefs: &HashSet<(IdentifierId, Vec<String>)>) -> usize {
    let mut prefix = Vec::new();
    for (i, entry) in dep.path.iter().enumerate() {
        if !entry.optional && !derefs.contains(&(dep.root, prefix.clone())) {
            return i;
        }
        prefix.push(entry.property.clone());
    }
    dep.path.len()
}

/// Add in first-appearance order; a path and its prefix collapse to the
/// prefix.
fn add_dependency(deps: &mut Vec<Dependency>, dep: Dependency) {
    if deps.iter().any(|d| d.is_prefix_of(&dep)) {
        return;
    }
    match deps.iter().position(|d| dep.is_prefix_of(d)) {
        Some(first) => {
            deps[first] = dep.clone();
            let mut i = first + 1;
            while i < deps.len() {
                if dep.is_prefix_of(&deps[i]) {
                    deps.remove(i);
                } else {
                    i += 1;
                }
            }
        }
        None => deps.push(dep),
    }
}

fn contains_return(block: &[ReactiveStatement]) -> bool {
    block.iter().any(|stmt| match stmt {
        ReactiveStatement::Instructions(_) => false,
        ReactiveStatement::Terminal(term) => {
            matches!(term.terminal, ReactiveTerminal::Return { .. })
                || term.terminal.blocks().into_iter().any(|b| contains_return(b))
        }
        ReactiveStatement::Scope(scope) => contains_return(&scope.body),
    })
}

/// Whether control can leave the statement: a `return` or `throw`
/// anywhere, or a jump to a target outside it.
fn leaves(stmt: &ReactiveStatement) -> bool {
    returns_or_throws(std::slice::from_ref(stmt))
        || super::scopes::jumps_out(stmt, 0, 0, &mut Vec::new())
}

fn returns_or_throws(block: &[ReactiveStatement]) -> bool {
    block.iter().any(|stmt| match stmt {
        ReactiveStatement::Instructions(_) => false,
        ReactiveStatement::Terminal(term) => {
            matches!(
                term.terminal,
                ReactiveTerminal::Return { .. } | ReactiveTerminal::Throw { .. }
            ) || term.terminal.blocks().into_iter().any(|b| returns_or_throws(b))
        }
        ReactiveStatement::Scope(scope) => returns_or_throws(&scope.body),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(root: u32, path: &[(&str, bool)]) -> Dependency {
        Dependency {
            root: IdentifierId(root),
            path: path
                .iter()
                .map(|(p, optional)| PathEntry {
                    property: p.to_string(),
                    optional: *optional,
                })
                .collect(),
        }
    }

    #[test]
    fn test_prefix_replaces_longer_paths_in_place() {
        let mut deps = Vec::new();
        add_dependency(&mut deps, dep(1, &[("a", false), ("b", false)]));
        add_dependency(&mut deps, dep(2, &[]));
        add_dependency(&mut deps, dep(1, &[("a", false), ("c", false)]));
        add_dependency(&mut deps, dep(1, &[("a", false)]));
        add_dependency(&mut deps, dep(1, &[("a", false), ("b", false)]));
        assert_eq!(deps, vec![dep(1, &[("a", false)]), dep(2, &[])]);
    }

    #[test]
    fn test_hoisting_stops_at_first_unchecked_deref() {
        let mut derefs = HashSet::new();
        derefs.insert((IdentifierId(1), Vec::new()));
        let full = dep(1, &[("a", false), ("b", false)]);
        assert_eq!(hoistable_len(&full, &derefs), 1);
        let optional = dep(1, &[("a", false), ("b", true)]);
        assert_eq!(hoistable_len(&optional, &derefs), 2);
        assert_eq!(hoistable_len(&full, &HashSet::new()), 0);
    }
}
