//! Rebuild structured statements from the control-flow graph.
//!
//! Every structured terminal owns its blocks and continues at its
//! fallthrough, so the tree is recovered by following fallthroughs. A
//! `goto` that merely falls through ends the current statement list.

use super::*;
use crate::hir::{BlockId, GotoKind, TerminalKind};

pub(super) fn build_tree(func: &HirFunction) -> Result<ReactiveBlock, CompilerError> {
    let builder = TreeBuilder {
        func,
        live: func.live_blocks(),
    };
    builder.block(func.entry)
}

struct TreeBuilder<'a> {
    func: &'a HirFunction,
    live: Vec<bool>,
}

impl TreeBuilder<'_> {
    fn is_live(&self, id: BlockId) -> bool {
        self.live.get(id.0 as usize).copied().unwrap_or(false)
    }

    /// Statements starting at `start` until control leaves the list.
    fn block(&self, start: BlockId) -> Result<ReactiveBlock, CompilerError> {
        let mut out = Vec::new();
        let mut current = Some(start);
        while let Some(id) = current {
            current = self.visit(id, &mut out)?;
        }
        Ok(out)
    }

    /// Append one block's statements and return the block that follows.
    fn visit(&self, id: BlockId, out: &mut ReactiveBlock) -> Result<Option<BlockId>, CompilerError> {
        let block = self.func.block(id);
        let terminal = &block.terminal;
        out.extend(
            block
                .statements()
                .into_iter()
                .map(|group| ReactiveStatement::Instructions(group.to_vec())),
        );

        let statement = |terminal_kind: ReactiveTerminal| {
            ReactiveStatement::Terminal(TerminalStatement {
                id: terminal.id,
                terminal: terminal_kind,
                span: terminal.span,
            })
        };

        let next = match &terminal.kind {
            TerminalKind::Goto { kind, .. } => {
                match kind {
                    GotoKind::Fallthrough => {}
                    GotoKind::Break { label } => out.push(statement(ReactiveTerminal::Break {
                        label: label.clone(),
                    })),
                    GotoKind::Continue { label } => {
                        out.push(statement(ReactiveTerminal::Continue {
                            label: label.clone(),
                        }))
                    }
                }
                None
            }
            TerminalKind::Return { value, kind } => {
                out.push(statement(ReactiveTerminal::Return {
                    value: *value,
                    kind: *kind,
                }));
                None
            }
            TerminalKind::Throw { value } => {
                out.push(statement(ReactiveTerminal::Throw { value: *value }));
                None
            }
            TerminalKind::Unreachable => None,
            TerminalKind::Branch { .. } => {
                return Err(CompilerError::unsupported(
                    "control flow in a loop condition",
                    terminal.span,
                ));
            }
            TerminalKind::If {
                test,
                consequent,
                alternate,
                fallthrough,
            } => {
                let consequent = self.block(*consequent)?;
                let alternate = match alternate {
                    Some(block) => Some(self.block(*block)?),
                    None => None,
                };
                out.push(statement(ReactiveTerminal::If {
                    test: *test,
                    consequent,
                    alternate,
                }));
                Some(*fallthrough)
            }
            TerminalKind::Switch {
                discriminant,
                cases,
                fallthrough,
            } => {
                let mut reactive_cases = Vec::new();
                for case in cases {
                    reactive_cases.push(ReactiveCase {
                        test: case.test,
                        body: self.block(case.block)?,
                    });
                }
                out.push(statement(ReactiveTerminal::Switch {
                    discriminant: *discriminant,
                    cases: reactive_cases,
                }));
                Some(*fallthrough)
            }
            TerminalKind::While {
                test,
                body,
                fallthrough,
            } => {
                let test = self.expression(*test, terminal.span)?;
                let body = self.block(*body)?;
                out.push(statement(ReactiveTerminal::While {
                    label: None,
                    test,
                    body,
                }));
                Some(*fallthrough)
            }
            TerminalKind::DoWhile {
                body,
                test,
                fallthrough,
            } => {
                let body = self.block(*body)?;
                let test = self.expression(*test, terminal.span)?;
                out.push(statement(ReactiveTerminal::DoWhile {
                    label: None,
                    body,
                    test,
                }));
                Some(*fallthrough)
            }
            TerminalKind::For {
                init,
                test,
                update,
                body,
                fallthrough,
            } => {
                let init = self.block(*init)?;
                if init
                    .iter()
                    .any(|stmt| !matches!(stmt, ReactiveStatement::Instructions(_)))
                {
                    return Err(CompilerError::unsupported(
                        "control flow in a loop initializer",
                        terminal.span,
                    ));
                }
                let test = match test {
                    Some(block) => Some(self.expression(*block, terminal.span)?),
                    None => None,
                };
                let update = match update {
                    Some(block) => Some(self.expression(*block, terminal.span)?),
                    None => None,
                };
                let body = self.block(*body)?;
                out.push(statement(ReactiveTerminal::For {
                    label: None,
                    init,
                    test,
                    update,
                    body,
                }));
                Some(*fallthrough)
            }
            TerminalKind::ForOf {
                collection,
                binding,
                body,
                fallthrough,
            } => {
                let body = self.block(*body)?;
                out.push(statement(ReactiveTerminal::ForOf {
                    label: None,
                    collection: *collection,
                    binding: binding.clone(),
                    body,
                }));
                Some(*fallthrough)
            }
            TerminalKind::ForIn {
                collection,
                binding,
                body,
                fallthrough,
            } => {
                let body = self.block(*body)?;
                out.push(statement(ReactiveTerminal::ForIn {
                    label: None,
                    collection: *collection,
                    binding: binding.clone(),
                    body,
                }));
                Some(*fallthrough)
            }
            TerminalKind::Label {
                label,
                block,
                fallthrough,
            } => {
                let mut inner = self.block(*block)?;
                match fold_label(&mut inner, label) {
                    true => out.append(&mut inner),
                    false => out.push(statement(ReactiveTerminal::Label {
                        label: label.clone(),
                        block: inner,
                    })),
                }
                Some(*fallthrough)
            }
            TerminalKind::Try {
                block,
                handler,
                finalizer,
                fallthrough,
            } => {
                let block = self.block(*block)?;
                let handler = match handler {
                    Some(h) => Some(ReactiveHandler {
                        param: h.param,
                        body: self.block(h.block)?,
                    }),
                    None => None,
                };
                let finalizer = match finalizer {
                    Some(f) => Some(self.block(*f)?),
                    None => None,
                };
                out.push(statement(ReactiveTerminal::Try {
                    block,
                    handler,
                    finalizer,
                }));
                Some(*fallthrough)
            }
        };
        Ok(next.filter(|b| self.is_live(*b)))
    }

    /// A loop test or update block: straight-line instructions ending in
    /// the loop's branch or a jump back to the loop head.
    fn expression(&self, id: BlockId, span: Span) -> Result<ExpressionBlock, CompilerError> {
        let block = self.func.block(id);
        let value = match &block.terminal.kind {
            TerminalKind::Branch { test, .. } => *test,
            TerminalKind::Goto {
                kind: GotoKind::Fallthrough,
                ..
            } => match block.instructions.last() {
                Some(instr) => instr.lvalue,
                None => {
                    return Err(CompilerError::unsupported("empty loop update", span));
                }
            },
            _ => {
                return Err(CompilerError::unsupported(
                    "control flow in a loop condition",
                    span,
                ))
            }
        };
        Ok(ExpressionBlock {
            instructions: block.instructions.clone(),
            value,
        })
    }
}

/// A user label around a single loop becomes the loop's own label.
fn fold_label(inner: &mut ReactiveBlock, label: &LabelName) -> bool {
    if !matches!(label, LabelName::User(_)) || inner.len() != 1 {
        return false;
    }
    let Some(ReactiveStatement::Terminal(term)) = inner.first_mut() else {
        return false;
    };
    let slot = match &mut term.terminal {
        ReactiveTerminal::While { label, .. }
        | ReactiveTerminal::DoWhile { label, .. }
        | ReactiveTerminal::For { label, .. }
        | ReactiveTerminal::ForOf { label, .. }
        | ReactiveTerminal::ForIn { label, .. } => label,
        _ => return false,
    };
    if slot.is_some() {
        return false;
    }
    *slot = Some(label.clone());
    true
}
