//! Cache slot layout.
//!
//! Scopes take consecutive slots in source pre-order: an outer scope's
//! slots come before those of the scopes nested in it. Within a scope the
//! order is dependencies, declarations, reassignments, then the
//! early-return value.

use super::*;

/// Assign `first_slot` to every scope and return the total slot count.
pub(super) fn assign_slots(body: &mut ReactiveBlock) -> u32 {
    let mut next = 0;
    assign_block(body, &mut next);
    next
}

fn assign_block(block: &mut ReactiveBlock, next: &mut u32) {
    for stmt in block.iter_mut() {
        match stmt {
            ReactiveStatement::Instructions(_) => {}
            ReactiveStatement::Terminal(term) => {
                for inner in term.terminal.blocks_mut() {
                    assign_block(inner, next);
                }
            }
            ReactiveStatement::Scope(scope) => {
                scope.scope.first_slot = *next;
                *next += scope.scope.slot_count();
                assign_block(&mut scope.body, next);
            }
        }
    }
}
