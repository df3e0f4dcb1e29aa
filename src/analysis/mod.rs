//! Alias, mutability and reactivity analysis.
//!
//! `analyze` annotates a lowered function with:
//!
//! - a kind per identifier (primitive, global, frozen or mutable),
//! - the effect each instruction has on each of its operands,
//! - alias sets of mutable values and the instruction range over which
//!   each set is still being mutated,
//! - the set of reactive identifiers: values that may differ between two
//!   calls with different inputs.
//!
//! Nested functions are not analyzed on their own: a closure is a mutable
//! value aliased with the mutable values it captures, and calling it (or
//! passing it to unknown code) counts as a possible mutation of all of them.

mod effects;
mod reactivity;
#[cfg(test)]
mod tests;

use std::collections::{BTreeSet, HashMap};

use petgraph::unionfind::UnionFind;
use tracing::debug;

use crate::error::CompilerError;
use crate::hir::{Environment, HirFunction, IdentifierId, InstrId, Instruction, InstructionValue, Place};

pub use reactivity::infer_reactivity;

// ─── Kinds and effects ─────────────────────────────────────────────

/// What kind of value an identifier may hold. Ordered by `join`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKind {
    Primitive,
    /// Loaded from a global or a module import.
    Global,
    /// Read-only: parameters, hook results and values loaded from them.
    Frozen,
    /// A locally created object that may still change.
    Mutable,
}

impl ValueKind {
    pub fn join(self, other: ValueKind) -> ValueKind {
        self.max(other)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Effect {
    Read,
    /// Definite mutation: property store or delete.
    Mutate,
    /// Possible mutation by unknown code.
    ConditionallyMutate,
    /// The operand becomes reachable from the instruction's result.
    Capture,
    /// A binding is written.
    Store,
    /// The operand escapes into a hook and must not change afterwards.
    Freeze,
}

impl Effect {
    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            Effect::Mutate | Effect::ConditionallyMutate | Effect::Capture
        )
    }
}

/// Instruction ids `[start, end)` over which an alias set is mutable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MutableRange {
    pub start: InstrId,
    pub end: InstrId,
}

impl MutableRange {
    pub fn len(&self) -> u32 {
        self.end.0.saturating_sub(self.start.0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: InstrId) -> bool {
        self.start <= id && id < self.end
    }
}

// ─── Analysis results ──────────────────────────────────────────────

pub struct Analysis {
    /// Indexed by identifier.
    pub kinds: Vec<ValueKind>,
    /// First instruction defining each identifier; parameters are
    /// defined at id 0.
    pub defs: Vec<Option<InstrId>>,
    /// Effects of each instruction and terminal on its operands.
    pub effects: HashMap<InstrId, Vec<(Place, Effect)>>,
    pub reactive: Vec<bool>,
    /// Hook calls.
    pub hooks: BTreeSet<InstrId>,
    /// Writes to globals and to objects loaded from globals.
    pub global_writes: BTreeSet<InstrId>,
    alias: UnionFind<usize>,
    ranges: HashMap<usize, MutableRange>,
}

impl Analysis {
    pub fn kind(&self, id: IdentifierId) -> ValueKind {
        self.kinds
            .get(id.index())
            .copied()
            .unwrap_or(ValueKind::Primitive)
    }

    pub fn is_reactive(&self, id: IdentifierId) -> bool {
        self.reactive.get(id.index()).copied().unwrap_or(false)
    }

    pub fn def(&self, id: IdentifierId) -> Option<InstrId> {
        self.defs.get(id.index()).copied().flatten()
    }

    pub fn effects_of(&self, id: InstrId) -> &[(Place, Effect)] {
        self.effects.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Representative of the identifier's alias set.
    pub fn alias_root(&self, id: IdentifierId) -> usize {
        self.alias.find(id.index())
    }

    pub fn same_alias_set(&self, a: IdentifierId, b: IdentifierId) -> bool {
        self.alias.equiv(a.index(), b.index())
    }

    /// Mutable range of the identifier's alias set. Values that are never
    /// mutated after creation get a one-instruction range at their
    /// definition.
    pub fn range(&self, id: IdentifierId) -> Option<MutableRange> {
        if self.kind(id) == ValueKind::Mutable {
            if let Some(range) = self.ranges.get(&self.alias_root(id)) {
                return Some(*range);
            }
        }
        let def = self.def(id)?;
        Some(MutableRange {
            start: def,
            end: InstrId(def.0 + 1),
        })
    }

    /// Whether the value may still change at `at`.
    pub fn is_mutable_at(&self, id: IdentifierId, at: InstrId) -> bool {
        if self.kind(id) != ValueKind::Mutable {
            return false;
        }
        match self.range(id) {
            Some(range) => range.len() > 1 && range.contains(at),
            None => false,
        }
    }

    /// Mutable identifiers grouped by alias set.
    pub fn alias_sets(&self) -> HashMap<usize, Vec<IdentifierId>> {
        let mut sets: HashMap<usize, Vec<IdentifierId>> = HashMap::new();
        for (index, kind) in self.kinds.iter().enumerate() {
            if *kind == ValueKind::Mutable {
                sets.entry(self.alias.find(index))
                    .or_default()
                    .push(IdentifierId(index as u32));
            }
        }
        sets
    }

    /// Whether the instruction produces a fresh mutable object: literals,
    /// closures, `new`, tagged templates and calls returning a mutable value.
    pub fn creates_value(&self, instr: &Instruction) -> bool {
        if self.kind(instr.lvalue.identifier) != ValueKind::Mutable {
            return false;
        }
        instr.value.allocates()
            || matches!(
                instr.value,
                InstructionValue::Call { .. } | InstructionValue::MethodCall { .. }
            )
    }

    /// Whether the instruction is a hook call or writes global state.
    pub fn is_non_cacheable(&self, id: InstrId) -> bool {
        self.hooks.contains(&id) || self.global_writes.contains(&id)
    }
}

/// Run every analysis over a lowered function.
pub fn analyze(func: &HirFunction, env: &Environment) -> Result<Analysis, CompilerError> {
    let mut analysis = effects::infer_effects(func, env)?;
    infer_reactivity(func, &mut analysis);
    debug!(
        function = func.name.as_deref().unwrap_or("<anonymous>"),
        alias_sets = analysis.alias_sets().len(),
        reactive = analysis.reactive.iter().filter(|r| **r).count(),
        hooks = analysis.hooks.len(),
        "analysis complete"
    );
    Ok(analysis)
}
