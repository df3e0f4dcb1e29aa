//! Kind inference, instruction effects, alias sets and mutable ranges.

use std::collections::{BTreeSet, HashMap};

use petgraph::unionfind::UnionFind;

use super::{Analysis, Effect, MutableRange, ValueKind};
use crate::error::CompilerError;
use crate::hir::globals::{builtin_function, builtin_method, is_hook_name, BuiltinShape, ShapeResult};
use crate::hir::{
    CallArg, Environment, HirFunction, IdentifierId, InstrId, Instruction, InstructionValue, Place,
    PropertyKey, StoreKind, Terminal, TerminalKind,
};
use crate::span::Span;

/// What a call's callee resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CallKind {
    Hook,
    Builtin(BuiltinShape),
    Unknown,
}

/// Where a temporary's value was loaded from.
#[derive(Clone, Debug)]
enum Source {
    Global(String),
    Local(IdentifierId),
    Property(IdentifierId, String),
}

pub(super) fn infer_effects(func: &HirFunction, env: &Environment) -> Result<Analysis, CompilerError> {
    let count = env.identifiers.len();
    let instrs = func.reachable_instructions();
    let terminals = func.reachable_terminals();
    let sources = load_sources(&instrs);
    let calls = classify_calls(&instrs, &sources, env);
    let reassigned = reassigned_context(&instrs);
    let defs = definitions(func, &instrs, &terminals, count);
    let kinds = infer_kinds(func, &instrs, &terminals, &calls, &reassigned, count);

    let mut builder = EffectBuilder {
        env,
        kinds: &kinds,
        sources: &sources,
        alias: UnionFind::new(count.max(1)),
        sites: Vec::new(),
        mutations: Vec::new(),
        captures: Vec::new(),
        current: Vec::new(),
        global_writes: BTreeSet::new(),
    };
    let mut effects = HashMap::new();
    let mut hooks = BTreeSet::new();
    for instr in &instrs {
        let kind = calls.get(&instr.id).copied().unwrap_or(CallKind::Unknown);
        if kind == CallKind::Hook {
            hooks.insert(instr.id);
        }
        builder.instruction(instr, kind)?;
        effects.insert(instr.id, std::mem::take(&mut builder.current));
    }
    for terminal in &terminals {
        builder.terminal(terminal);
        effects.insert(terminal.id, std::mem::take(&mut builder.current));
    }

    let EffectBuilder {
        mut alias,
        mut sites,
        mutations,
        captures,
        global_writes,
        ..
    } = builder;
    resolve_captures(&mut alias, &kinds, &captures, &mutations, &mut sites);
    // A set's range opens at its earliest definition. Loads and other
    // aliasing definitions do not keep it open; only sites do.
    let mut ranges: HashMap<usize, MutableRange> = HashMap::new();
    for (index, kind) in kinds.iter().enumerate() {
        if *kind != ValueKind::Mutable {
            continue;
        }
        let Some(def) = defs[index] else { continue };
        let root = alias.find_mut(index);
        let start = ranges.get(&root).map_or(def, |range| range.start.min(def));
        ranges.insert(
            root,
            MutableRange {
                start,
                end: InstrId(start.0 + 1),
            },
        );
    }
    for (site, id) in sites {
        if kinds[id.index()] == ValueKind::Mutable {
            let root = alias.find_mut(id.index());
            extend(&mut ranges, root, site, InstrId(site.0 + 1));
        }
    }

    Ok(Analysis {
        reactive: vec![false; count],
        kinds,
        defs,
        effects,
        hooks,
        global_writes,
        alias,
        ranges,
    })
}

/// A value put into a container shares the container's fate only if the
/// container may be mutated after the value went in. Applying one capture
/// can make another container mutable later, hence the fixpoint.
fn resolve_captures(
    alias: &mut UnionFind<usize>,
    kinds: &[ValueKind],
    captures: &[(InstrId, IdentifierId, IdentifierId)],
    mutations: &[(InstrId, IdentifierId)],
    sites: &mut Vec<(InstrId, IdentifierId)>,
) {
    let mut applied = vec![false; captures.len()];
    loop {
        let mut changed = false;
        for (i, (at, container, value)) in captures.iter().enumerate() {
            if applied[i] || kinds[container.index()] != ValueKind::Mutable {
                continue;
            }
            let root = alias.find(container.index());
            let mutated_later = mutations
                .iter()
                .any(|(site, id)| site > at && alias.find(id.index()) == root);
            if mutated_later {
                alias.union(container.index(), value.index());
                sites.push((*at, *value));
                applied[i] = true;
                changed = true;
            }
        }
        if !changed {
            return;
        }
    }
}

fn extend(ranges: &mut HashMap<usize, MutableRange>, root: usize, start: InstrId, end: InstrId) {
    let range = ranges.entry(root).or_insert(MutableRange { start, end });
    range.start = range.start.min(start);
    range.end = range.end.max(end);
}

// ─── Pre-passes ────────────────────────────────────────────────────

fn load_sources(instrs: &[&Instruction]) -> HashMap<IdentifierId, Source> {
    let mut sources = HashMap::new();
    for instr in instrs {
        let source = match &instr.value {
            InstructionValue::LoadGlobal(name) => Source::Global(name.clone()),
            InstructionValue::LoadLocal(place) => Source::Local(place.identifier),
            InstructionValue::PropertyLoad { object, property } => {
                Source::Property(object.identifier, property.clone())
            }
            _ => continue,
        };
        sources.insert(instr.lvalue.identifier, source);
    }
    sources
}

fn classify_calls(
    instrs: &[&Instruction],
    sources: &HashMap<IdentifierId, Source>,
    env: &Environment,
) -> HashMap<InstrId, CallKind> {
    let mut calls = HashMap::new();
    for instr in instrs {
        let kind = match &instr.value {
            InstructionValue::Call { callee, .. } => match sources.get(&callee.identifier) {
                Some(Source::Global(name)) if is_hook_name(name) => CallKind::Hook,
                Some(Source::Global(name)) => builtin_function(name)
                    .map(CallKind::Builtin)
                    .unwrap_or(CallKind::Unknown),
                Some(Source::Local(binding)) if env.name_of(*binding).is_some_and(is_hook_name) => {
                    CallKind::Hook
                }
                _ => CallKind::Unknown,
            },
            InstructionValue::MethodCall {
                receiver,
                property: PropertyKey::Named(method),
                ..
            } => {
                if is_hook_name(method) {
                    CallKind::Hook
                } else if let Some(Source::Global(global)) = sources.get(&receiver.identifier) {
                    builtin_method(global, method)
                        .map(CallKind::Builtin)
                        .unwrap_or(CallKind::Unknown)
                } else {
                    CallKind::Unknown
                }
            }
            InstructionValue::MethodCall { .. } | InstructionValue::New { .. } => CallKind::Unknown,
            _ => continue,
        };
        calls.insert(instr.id, kind);
    }
    calls
}

/// Outer bindings reassigned inside closures, at any nesting depth.
fn reassigned_context(instrs: &[&Instruction]) -> BTreeSet<IdentifierId> {
    let mut out = BTreeSet::new();
    for instr in instrs {
        if let InstructionValue::FunctionExpression { lowered, context } = &instr.value {
            let mut written = BTreeSet::new();
            reassigned_in(&lowered.func, &mut written);
            out.extend(
                context
                    .iter()
                    .map(|p| p.identifier)
                    .filter(|id| written.contains(id)),
            );
        }
    }
    out
}

fn reassigned_in(func: &HirFunction, out: &mut BTreeSet<IdentifierId>) {
    for instr in func.instructions() {
        match &instr.value {
            InstructionValue::StoreLocal {
                kind: StoreKind::Reassign,
                target,
                ..
            }
            | InstructionValue::Update { target, .. } => {
                out.insert(target.identifier);
            }
            InstructionValue::Destructure {
                kind: StoreKind::Reassign,
                pattern,
                ..
            } => out.extend(pattern.places().iter().map(|p| p.identifier)),
            InstructionValue::FunctionExpression { lowered, .. } => reassigned_in(&lowered.func, out),
            _ => {}
        }
    }
    for terminal in func.terminals() {
        if let TerminalKind::ForOf { binding, .. } | TerminalKind::ForIn { binding, .. } = &terminal.kind {
            if binding.kind == StoreKind::Reassign {
                out.extend(binding.target.places().iter().map(|p| p.identifier));
            }
        }
    }
}

fn definitions(
    func: &HirFunction,
    instrs: &[&Instruction],
    terminals: &[&Terminal],
    count: usize,
) -> Vec<Option<InstrId>> {
    let mut defs: Vec<Option<InstrId>> = vec![None; count];
    let mut define = |id: IdentifierId, at: InstrId| {
        let slot = &mut defs[id.index()];
        *slot = Some(slot.map_or(at, |d| d.min(at)));
    };
    for param in &func.params {
        define(param.place.identifier, InstrId(0));
    }
    for instr in instrs {
        define(instr.lvalue.identifier, instr.id);
        for place in instr.value.stored_places() {
            define(place.identifier, instr.id);
        }
    }
    for terminal in terminals {
        for place in terminal.kind.stored_places() {
            define(place.identifier, terminal.id);
        }
    }
    defs
}

// ─── Kinds ─────────────────────────────────────────────────────────

/// Kind of a value read out of a container of kind `object`.
fn loaded_kind(object: ValueKind) -> ValueKind {
    object
}

fn infer_kinds(
    func: &HirFunction,
    instrs: &[&Instruction],
    terminals: &[&Terminal],
    calls: &HashMap<InstrId, CallKind>,
    reassigned: &BTreeSet<IdentifierId>,
    count: usize,
) -> Vec<ValueKind> {
    let mut kinds = vec![ValueKind::Primitive; count];
    for param in &func.params {
        kinds[param.place.identifier.index()] = ValueKind::Frozen;
    }
    for id in reassigned {
        kinds[id.index()] = ValueKind::Mutable;
    }

    fn raise(kinds: &mut [ValueKind], id: IdentifierId, kind: ValueKind) -> bool {
        let slot = &mut kinds[id.index()];
        let joined = slot.join(kind);
        let changed = joined != *slot;
        *slot = joined;
        changed
    }

    loop {
        let mut changed = false;
        for instr in instrs {
            let k = |p: &Place| kinds[p.identifier.index()];
            let call = calls.get(&instr.id).copied().unwrap_or(CallKind::Unknown);
            let lvalue = lvalue_kind(&instr.value, call, &k);
            let stores: Vec<(IdentifierId, ValueKind)> = match &instr.value {
                InstructionValue::StoreLocal { target, value, .. } => {
                    vec![(target.identifier, k(value))]
                }
                InstructionValue::Destructure { pattern, value, .. } => pattern
                    .places()
                    .iter()
                    .map(|p| (p.identifier, loaded_kind(k(value))))
                    .collect(),
                _ => Vec::new(),
            };
            changed |= raise(&mut kinds, instr.lvalue.identifier, lvalue);
            for (id, kind) in stores {
                changed |= raise(&mut kinds, id, kind);
            }
        }
        for terminal in terminals {
            match &terminal.kind {
                TerminalKind::ForOf {
                    collection,
                    binding,
                    ..
                } => {
                    let kind = loaded_kind(kinds[collection.identifier.index()]);
                    for place in binding.target.places() {
                        changed |= raise(&mut kinds, place.identifier, kind);
                    }
                }
                TerminalKind::Try { .. } => {
                    for place in terminal.kind.stored_places() {
                        changed |= raise(&mut kinds, place.identifier, ValueKind::Mutable);
                    }
                }
                _ => {}
            }
        }
        if !changed {
            return kinds;
        }
    }
}

fn lvalue_kind(value: &InstructionValue, call: CallKind, k: &impl Fn(&Place) -> ValueKind) -> ValueKind {
    use InstructionValue as V;
    match value {
        V::Primitive(_)
        | V::BinaryOp { .. }
        | V::UnaryOp { .. }
        | V::Update { .. }
        | V::TemplateLiteral { .. }
        | V::PropertyDelete { .. }
        | V::ComputedDelete { .. }
        | V::DeclareLocal { .. } => ValueKind::Primitive,
        V::LoadLocal(place) => k(place),
        V::LoadGlobal(_) => ValueKind::Global,
        V::StoreLocal { value, .. }
        | V::StoreGlobal { value, .. }
        | V::PropertyStore { value, .. }
        | V::ComputedStore { value, .. }
        | V::Destructure { value, .. } => k(value),
        V::PropertyLoad { object, .. } | V::ComputedLoad { object, .. } => loaded_kind(k(object)),
        V::Call { .. } | V::MethodCall { .. } => match call {
            CallKind::Hook => ValueKind::Frozen,
            CallKind::Builtin(shape) if shape.result == ShapeResult::Primitive => ValueKind::Primitive,
            CallKind::Builtin(_) | CallKind::Unknown => ValueKind::Mutable,
        },
        V::LoadThis
        | V::New { .. }
        | V::ArrayExpression(_)
        | V::ObjectExpression(_)
        | V::TaggedTemplate { .. }
        | V::FunctionExpression { .. }
        | V::Await(_) => ValueKind::Mutable,
        V::Logical { left, right, .. } => k(left).join(k(&right.result)),
        V::Ternary {
            consequent,
            alternate,
            ..
        } => k(&consequent.result).join(k(&alternate.result)),
        V::Optional { chain, .. } => k(&chain.result),
    }
}

// ─── Effects ───────────────────────────────────────────────────────

struct EffectBuilder<'a> {
    env: &'a Environment,
    kinds: &'a [ValueKind],
    sources: &'a HashMap<IdentifierId, Source>,
    alias: UnionFind<usize>,
    /// Instructions at which a mutable value is mutated, captured or stored.
    sites: Vec<(InstrId, IdentifierId)>,
    /// Definite or possible mutations of mutable values.
    mutations: Vec<(InstrId, IdentifierId)>,
    /// `(at, container, value)`: `value` was put into `container`.
    captures: Vec<(InstrId, IdentifierId, IdentifierId)>,
    current: Vec<(Place, Effect)>,
    global_writes: BTreeSet<InstrId>,
}

impl EffectBuilder<'_> {
    fn kind(&self, place: Place) -> ValueKind {
        self.kinds[place.identifier.index()]
    }

    fn is_mutable(&self, place: Place) -> bool {
        self.kind(place) == ValueKind::Mutable
    }

    fn union(&mut self, a: Place, b: Place) {
        if self.is_mutable(a) && self.is_mutable(b) {
            self.alias.union(a.identifier.index(), b.identifier.index());
        }
    }

    fn read(&mut self, place: Place) {
        self.current.push((place, Effect::Read));
    }

    /// `value` becomes reachable from `into`. The two alias only if `into`
    /// may be mutated later; see `resolve_captures`.
    fn capture(&mut self, at: InstrId, into: Place, value: Place) {
        if self.is_mutable(value) {
            self.current.push((value, Effect::Capture));
            self.captures.push((at, into.identifier, value.identifier));
        } else {
            self.read(value);
        }
    }

    /// A closure may mutate what it captures whenever it is called.
    fn capture_by_closure(&mut self, at: InstrId, closure: Place, value: Place) {
        if self.is_mutable(value) {
            self.current.push((value, Effect::Capture));
            self.sites.push((at, value.identifier));
            self.union(closure, value);
        } else {
            self.read(value);
        }
    }

    fn mutate(&mut self, at: InstrId, place: Place, span: Span) -> Result<(), CompilerError> {
        match self.kind(place) {
            ValueKind::Frozen => {
                return Err(CompilerError::invalid(
                    format!(
                        "cannot mutate `{}`: parameters, hook results and values read from them are read-only during render",
                        self.describe(place.identifier)
                    ),
                    span,
                ));
            }
            ValueKind::Global => {
                self.global_writes.insert(at);
            }
            ValueKind::Mutable => {
                self.sites.push((at, place.identifier));
                self.mutations.push((at, place.identifier));
            }
            ValueKind::Primitive => {}
        }
        self.current.push((place, Effect::Mutate));
        Ok(())
    }

    /// Unknown code may mutate `place`; its result may alias it.
    fn escape(&mut self, at: InstrId, result: Place, place: Place) {
        if self.is_mutable(place) {
            self.current.push((place, Effect::ConditionallyMutate));
            self.sites.push((at, place.identifier));
            self.mutations.push((at, place.identifier));
            self.union(result, place);
        } else {
            self.read(place);
        }
    }

    fn store(&mut self, at: InstrId, target: Place, value: Option<Place>) {
        self.current.push((target, Effect::Store));
        if self.is_mutable(target) {
            self.sites.push((at, target.identifier));
            if let Some(value) = value {
                self.union(target, value);
            }
        }
    }

    fn describe(&self, id: IdentifierId) -> String {
        match self.sources.get(&id) {
            Some(Source::Local(binding)) => self.describe(*binding),
            Some(Source::Property(object, property)) => {
                format!("{}.{}", self.describe(*object), property)
            }
            Some(Source::Global(name)) => name.clone(),
            None => self
                .env
                .name_of(id)
                .map(str::to_string)
                .unwrap_or_else(|| "value".to_string()),
        }
    }

    fn instruction(&mut self, instr: &Instruction, call: CallKind) -> Result<(), CompilerError> {
        use InstructionValue as V;
        let at = instr.id;
        let lvalue = instr.lvalue;
        match &instr.value {
            V::Primitive(_) | V::LoadGlobal(_) | V::LoadThis => {}
            V::LoadLocal(place) => {
                self.read(*place);
                self.union(lvalue, *place);
            }
            V::StoreLocal { target, value, .. } => {
                self.read(*value);
                self.store(at, *target, Some(*value));
                self.union(lvalue, *value);
            }
            V::StoreGlobal { value, .. } => {
                self.read(*value);
                self.global_writes.insert(at);
            }
            V::DeclareLocal { target, .. } | V::Update { target, .. } => self.store(at, *target, None),
            V::Destructure { pattern, value, .. } => {
                self.read(*value);
                for key in pattern.computed_keys() {
                    self.read(key);
                }
                for leaf in pattern.places() {
                    self.store(at, leaf, Some(*value));
                }
                self.union(lvalue, *value);
            }
            V::BinaryOp { .. } | V::UnaryOp { .. } | V::TemplateLiteral { .. } => {
                for place in instr.value.operands() {
                    self.read(place);
                }
            }
            V::PropertyLoad { object, .. } => {
                self.read(*object);
                self.union(lvalue, *object);
            }
            V::ComputedLoad { object, property } => {
                self.read(*object);
                self.read(*property);
                self.union(lvalue, *object);
            }
            V::PropertyStore { object, value, .. } => {
                self.mutate(at, *object, instr.span)?;
                self.capture(at, *object, *value);
                self.union(lvalue, *value);
            }
            V::ComputedStore {
                object,
                property,
                value,
            } => {
                self.mutate(at, *object, instr.span)?;
                self.read(*property);
                self.capture(at, *object, *value);
                self.union(lvalue, *value);
            }
            V::PropertyDelete { object, .. } => self.mutate(at, *object, instr.span)?,
            V::ComputedDelete { object, property } => {
                self.mutate(at, *object, instr.span)?;
                self.read(*property);
            }
            V::Call { callee, args } | V::New { callee, args } => {
                self.call(at, lvalue, *callee, args, call);
            }
            V::MethodCall {
                receiver,
                property,
                args,
            } => {
                if let PropertyKey::Computed(key) = property {
                    self.read(*key);
                }
                self.call(at, lvalue, *receiver, args, call);
            }
            V::ArrayExpression(_) | V::ObjectExpression(_) => {
                for place in instr.value.operands() {
                    self.capture(at, lvalue, place);
                }
            }
            V::FunctionExpression { context, .. } => {
                for place in context {
                    self.capture_by_closure(at, lvalue, *place);
                }
            }
            V::TaggedTemplate { tag, exprs, .. } => {
                self.escape(at, lvalue, *tag);
                for place in exprs {
                    self.capture(at, lvalue, *place);
                }
            }
            V::Await(place) => {
                self.read(*place);
                self.union(lvalue, *place);
            }
            V::Logical { left, right, .. } => {
                self.read(*left);
                self.union(lvalue, *left);
                self.union(lvalue, right.result);
            }
            V::Ternary {
                test,
                consequent,
                alternate,
            } => {
                self.read(*test);
                self.union(lvalue, consequent.result);
                self.union(lvalue, alternate.result);
            }
            V::Optional { object, chain } => {
                self.read(*object);
                self.union(lvalue, chain.result);
            }
        }
        Ok(())
    }

    /// `target` is the callee of a call or the receiver of a method call.
    fn call(&mut self, at: InstrId, lvalue: Place, target: Place, args: &[CallArg], call: CallKind) {
        match call {
            CallKind::Hook => {
                self.read(target);
                for arg in args {
                    self.current.push((arg.place(), Effect::Freeze));
                }
            }
            CallKind::Builtin(shape) => {
                self.read(target);
                for arg in args {
                    if shape.result == ShapeResult::FreshCapturing {
                        self.capture(at, lvalue, arg.place());
                    } else {
                        self.read(arg.place());
                    }
                }
            }
            CallKind::Unknown => {
                self.escape(at, lvalue, target);
                for arg in args {
                    self.escape(at, lvalue, arg.place());
                }
            }
        }
    }

    fn terminal(&mut self, terminal: &Terminal) {
        let at = terminal.id;
        match &terminal.kind {
            TerminalKind::ForOf {
                collection,
                binding,
                ..
            } => {
                self.read(*collection);
                for leaf in binding.target.places() {
                    self.store(at, leaf, Some(*collection));
                }
            }
            TerminalKind::ForIn {
                collection,
                binding,
                ..
            } => {
                self.read(*collection);
                for leaf in binding.target.places() {
                    self.store(at, leaf, None);
                }
            }
            kind => {
                for place in kind.operands() {
                    self.read(place);
                }
                for place in kind.stored_places() {
                    self.store(at, place, None);
                }
            }
        }
    }
}
