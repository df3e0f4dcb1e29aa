//! Reactivity: which values may change between calls.
//!
//! Parameters, hook results and catch parameters are reactive. Reactivity
//! flows from operands to results and stored bindings, into bindings
//! written under reactive control flow, and across alias sets when a
//! mutable value is mutated with a reactive operand.

use std::collections::HashMap;

use super::{Analysis, ValueKind};
use crate::hir::{
    ControlRegion, HirFunction, IdentifierId, InstrId, Instruction, InstructionValue, Place,
    RegionKind, TerminalKind,
};

pub fn infer_reactivity(func: &HirFunction, analysis: &mut Analysis) {
    let alias_sets = analysis.alias_sets();
    let mut reactive = std::mem::take(&mut analysis.reactive);
    for param in &func.params {
        reactive[param.place.identifier.index()] = true;
    }
    let instrs = func.reachable_instructions();
    for instr in &instrs {
        if analysis.hooks.contains(&instr.id) {
            reactive[instr.lvalue.identifier.index()] = true;
        }
    }
    let terminals = func.reachable_terminals();
    for terminal in &terminals {
        if let TerminalKind::Try { .. } = terminal.kind {
            for place in terminal.kind.stored_places() {
                reactive[place.identifier.index()] = true;
            }
        }
    }

    // Every read, for deciding which loop/label/try regions are reactive.
    let mut reads: Vec<(InstrId, Place)> = Vec::new();
    for instr in &instrs {
        for place in instr.value.operands() {
            reads.push((instr.id, place));
        }
    }
    for terminal in &terminals {
        for place in terminal.kind.operands() {
            reads.push((terminal.id, place));
        }
    }

    let live = func.live_blocks();
    let blocks: Vec<_> = func
        .reverse_postorder()
        .into_iter()
        .filter(|id| live[id.0 as usize])
        .collect();
    let mut pass = Pass {
        analysis: &*analysis,
        alias_sets: &alias_sets,
        reactive,
        changed: false,
    };
    loop {
        pass.changed = false;
        let control: Vec<ControlRegion> = func
            .regions
            .iter()
            .filter(|region| pass.region_is_reactive(region, &reads))
            .copied()
            .collect();
        for id in &blocks {
            for instr in &func.block(*id).instructions {
                pass.instruction(instr, &control, false);
            }
        }
        for terminal in &terminals {
            let in_control = control.iter().any(|r| r.contains(terminal.id));
            match &terminal.kind {
                TerminalKind::ForOf {
                    collection,
                    binding,
                    ..
                }
                | TerminalKind::ForIn {
                    collection,
                    binding,
                    ..
                } => {
                    let value = in_control || pass.is(*collection);
                    for place in binding.target.places() {
                        pass.mark_if(place.identifier, value);
                    }
                }
                _ => {}
            }
        }
        if !pass.changed {
            break;
        }
    }
    let reactive = pass.reactive;
    analysis.reactive = reactive;
}

struct Pass<'a> {
    analysis: &'a Analysis,
    alias_sets: &'a HashMap<usize, Vec<IdentifierId>>,
    reactive: Vec<bool>,
    changed: bool,
}

impl Pass<'_> {
    fn is(&self, place: Place) -> bool {
        self.reactive[place.identifier.index()]
    }

    fn mark_if(&mut self, id: IdentifierId, value: bool) {
        if value && !self.reactive[id.index()] {
            self.reactive[id.index()] = true;
            self.changed = true;
        }
    }

    fn region_is_reactive(&self, region: &ControlRegion, reads: &[(InstrId, Place)]) -> bool {
        match region.kind {
            RegionKind::If | RegionKind::Switch => region.test.is_some_and(|t| self.is(t)),
            RegionKind::Loop | RegionKind::Label | RegionKind::Try => reads
                .iter()
                .any(|(id, place)| {
                    (region.contains(*id) || *id == region.terminal) && self.is(*place)
                }),
        }
    }

    /// `guarded` is set inside value blocks whose condition is reactive.
    fn instruction(&mut self, instr: &Instruction, control: &[ControlRegion], guarded: bool) {
        let conditional = guarded || control.iter().any(|r| r.contains(instr.id));
        let operands = instr.value.operands();
        let mut value = operands.iter().any(|p| self.is(*p));
        for block in instr.value.value_blocks() {
            value |= self.is(block.result);
        }
        self.mark_if(instr.lvalue.identifier, value);

        match &instr.value {
            InstructionValue::StoreLocal { target, value, .. } => {
                let v = self.is(*value) || conditional;
                self.mark_if(target.identifier, v);
            }
            InstructionValue::Update { target, .. } => {
                let v = self.is(*target) || conditional;
                self.mark_if(target.identifier, v);
            }
            InstructionValue::Destructure { pattern, value, .. } => {
                let v = self.is(*value) || conditional;
                for leaf in pattern.places() {
                    self.mark_if(leaf.identifier, v);
                }
            }
            _ => {}
        }

        if value || conditional {
            let mutated: Vec<IdentifierId> = self
                .analysis
                .effects_of(instr.id)
                .iter()
                .filter(|(_, effect)| effect.is_mutation())
                .map(|(place, _)| place.identifier)
                .collect();
            for id in mutated {
                self.mark_alias_set(id);
            }
        }

        // Value blocks run conditionally on the instruction's test.
        let test = match &instr.value {
            InstructionValue::Logical { left, .. } => Some(*left),
            InstructionValue::Ternary { test, .. } => Some(*test),
            InstructionValue::Optional { object, .. } => Some(*object),
            _ => None,
        };
        let inner_guard = conditional || test.is_some_and(|t| self.is(t));
        for block in instr.value.value_blocks() {
            for inner in &block.instructions {
                self.instruction(inner, control, inner_guard);
            }
        }
    }

    fn mark_alias_set(&mut self, id: IdentifierId) {
        if self.analysis.kind(id) != ValueKind::Mutable {
            return;
        }
        let root = self.analysis.alias_root(id);
        let members = self.alias_sets.get(&root).cloned().unwrap_or_default();
        for member in members {
            self.mark_if(member, true);
        }
    }
}
