use super::*;
use crate::ast::navigate::find_function;
use crate::error::ErrorKind;
use crate::hir::print::print_function;

fn lower(source: &str) -> Result<(HirFunction, Environment), CompilerError> {
    let program = crate::parse_source_silent(source, "test.js").expect("source should parse");
    let func = find_function(&program, "f").expect("function f should exist");
    let mut env = Environment::new();
    let hir = lower_function(func, &mut env)?;
    Ok((hir, env))
}

fn lower_ok(source: &str) -> (HirFunction, Environment) {
    match lower(source) {
        Ok(result) => result,
        Err(err) => panic!("lowering failed: {}", err),
    }
}

fn unsupported(source: &str) -> String {
    let err = lower(source).expect_err("lowering should fail");
    assert_eq!(err.kind(), ErrorKind::UnsupportedSyntax);
    err.message().to_string()
}

fn terminal_kinds(hir: &HirFunction) -> Vec<&TerminalKind> {
    hir.reverse_postorder()
        .into_iter()
        .map(|id| &hir.block(id).terminal.kind)
        .collect()
}

fn count_values(hir: &HirFunction, pred: impl Fn(&InstructionValue) -> bool) -> usize {
    hir.instructions().iter().filter(|i| pred(&i.value)).count()
}

#[test]
fn test_straight_line_function() {
    let (hir, env) = lower_ok("function f(a) { const x = a + 1; return x; }");
    assert_eq!(hir.params.len(), 1);
    assert_eq!(env.name_of(hir.params[0].place.identifier), Some("a"));
    let entry = hir.block(hir.entry);
    assert_eq!(entry.instructions.len(), 5);
    let lens: Vec<usize> = entry.statements().iter().map(|s| s.len()).collect();
    assert_eq!(lens, vec![4, 1]);
    assert!(matches!(
        entry.terminal.kind,
        TerminalKind::Return {
            kind: ReturnKind::Explicit,
            ..
        }
    ));
}

#[test]
fn test_if_region_covers_both_branches() {
    let (hir, _) = lower_ok(
        "function f(a) { let x = 0; if (a) { x = 1; } else { x = 2; } return x; }",
    );
    assert_eq!(hir.regions.len(), 1);
    let region = hir.regions[0];
    assert_eq!(region.kind, RegionKind::If);
    assert!(region.test.is_some());
    let stores: Vec<InstrId> = hir
        .instructions()
        .iter()
        .filter(|i| {
            matches!(
                i.value,
                InstructionValue::StoreLocal {
                    kind: StoreKind::Reassign,
                    ..
                }
            )
        })
        .map(|i| i.id)
        .collect();
    assert_eq!(stores.len(), 2);
    assert!(stores.iter().all(|&id| region.contains(id)));
    assert!(matches!(
        hir.block(hir.entry).terminal.kind,
        TerminalKind::If {
            alternate: Some(_),
            ..
        }
    ));
}

#[test]
fn test_loops_and_continue() {
    let (hir, _) = lower_ok(
        "function f(items) {
            let n = 0;
            for (const item of items) { if (item) continue; n += 1; }
            while (n > 10) { n -= 1; }
            return n;
        }",
    );
    let kinds = terminal_kinds(&hir);
    assert!(kinds.iter().any(|k| matches!(k, TerminalKind::ForOf { .. })));
    assert!(kinds.iter().any(|k| matches!(k, TerminalKind::While { .. })));
    assert!(kinds.iter().any(|k| matches!(
        k,
        TerminalKind::Goto {
            kind: GotoKind::Continue { label: None },
            ..
        }
    )));
    let loops = hir
        .regions
        .iter()
        .filter(|r| r.kind == RegionKind::Loop)
        .count();
    assert_eq!(loops, 2);
}

#[test]
fn test_labeled_break_names_the_label() {
    let (hir, _) = lower_ok(
        "function f(rows) {
            outer: for (const r of rows) {
                for (const c of r) { if (c) break outer; }
            }
        }",
    );
    let kinds = terminal_kinds(&hir);
    assert!(kinds.iter().any(|k| matches!(
        k,
        TerminalKind::Label {
            label: LabelName::User(name),
            ..
        } if name == "outer"
    )));
    assert!(kinds.iter().any(|k| matches!(
        k,
        TerminalKind::Goto {
            kind: GotoKind::Break {
                label: Some(LabelName::User(name))
            },
            ..
        } if name == "outer"
    )));
}

#[test]
fn test_switch_cases() {
    let (hir, _) = lower_ok(
        "function f(x) {
            switch (x) { case 1: return \"a\"; case \"b\": break; default: return null; }
            return 0;
        }",
    );
    let TerminalKind::Switch { cases, .. } = &hir.block(hir.entry).terminal.kind else {
        panic!("entry should end in a switch");
    };
    assert_eq!(cases.len(), 3);
    assert!(cases[0].test.is_some());
    assert!(cases[2].test.is_none());
    assert_eq!(hir.regions[0].kind, RegionKind::Switch);
}

#[test]
fn test_unsupported_constructs() {
    assert!(unsupported("function f() { var x = 1; return x; }").contains("var"));
    assert!(unsupported("function f() { return this.x; }").contains("this"));
    assert!(unsupported("async function f() { await g(); }").contains("async"));
    assert!(unsupported("function f(s) { return eval(s); }").contains("eval"));
    assert!(unsupported("function f(o) { with (o) { g(); } }").contains("with"));
    assert!(unsupported("function f() { return arguments[0]; }").contains("arguments"));
    assert!(unsupported("function f(x) { switch (x) { case g(): return 1; } }").contains("case"));
}

#[test]
fn test_nested_this_and_await_are_allowed() {
    let (hir, _) = lower_ok(
        "function f(a) {
            const o = { m() { return this.v; } };
            const load = async () => { await a; };
            return [o, load];
        }",
    );
    assert_eq!(
        count_values(&hir, |v| matches!(v, InstructionValue::FunctionExpression { .. })),
        2
    );
}

#[test]
fn test_use_memo_is_inlined_through_a_label() {
    let (hir, _) = lower_ok(
        "function f(a) {
            const v = useMemo(() => { if (a) return [a]; return []; }, [a]);
            return v;
        }",
    );
    assert_eq!(hir.manual_memos.len(), 1);
    let kinds = terminal_kinds(&hir);
    assert!(kinds.iter().any(|k| matches!(
        k,
        TerminalKind::Label {
            label: LabelName::Generated(0),
            ..
        }
    )));
    let breaks = kinds
        .iter()
        .filter(|k| {
            matches!(
                k,
                TerminalKind::Goto {
                    kind: GotoKind::Break {
                        label: Some(LabelName::Generated(0))
                    },
                    ..
                }
            )
        })
        .count();
    assert_eq!(breaks, 2);
    assert_eq!(
        count_values(&hir, |v| matches!(v, InstructionValue::Call { .. })),
        0
    );
}

#[test]
fn test_use_callback_and_non_inline_memo() {
    let (hir, _) = lower_ok(
        "function f(a, compute) {
            const cb = useCallback(() => a, [a]);
            const v = useMemo(compute, [a]);
            return [cb, v];
        }",
    );
    assert_eq!(hir.manual_memos.len(), 1);
    let memo = hir.manual_memos[0];
    assert!(hir.instructions().iter().any(|i| {
        i.lvalue.identifier == memo
            && matches!(i.value, InstructionValue::FunctionExpression { .. })
    }));
    assert_eq!(
        count_values(&hir, |v| matches!(v, InstructionValue::Call { .. })),
        1
    );
}

#[test]
fn test_optional_chain_wraps_the_tail() {
    let (hir, _) = lower_ok("function f(a) { return a?.b.c; }");
    let optional = hir
        .instructions()
        .into_iter()
        .find_map(|i| match &i.value {
            InstructionValue::Optional { chain, .. } => Some(chain.instructions.len()),
            _ => None,
        })
        .expect("an optional instruction");
    assert_eq!(optional, 2);
}

#[test]
fn test_closure_context_lists_outer_bindings() {
    let (hir, env) = lower_ok(
        "function f(a) { let n = 0; const inc = () => { n += a; }; inc(); return n; }",
    );
    let context = hir
        .instructions()
        .into_iter()
        .find_map(|i| match &i.value {
            InstructionValue::FunctionExpression { context, .. } => Some(context.clone()),
            _ => None,
        })
        .expect("a function expression");
    let mut names: Vec<&str> = context
        .iter()
        .filter_map(|p| env.name_of(p.identifier))
        .collect();
    names.sort();
    assert_eq!(names, vec!["a", "n"]);
}

#[test]
fn test_destructured_param_with_default() {
    let (hir, env) = lower_ok("function f({ a = 1, b }) { return a + b; }");
    assert_eq!(env.name_of(hir.params[0].place.identifier), None);
    assert_eq!(
        count_values(&hir, |v| matches!(v, InstructionValue::Destructure { .. })),
        1
    );
    assert_eq!(
        count_values(&hir, |v| matches!(v, InstructionValue::Ternary { .. })),
        1
    );
}

#[test]
fn test_code_after_return_is_unreachable() {
    let (hir, _) = lower_ok("function f() { return 1; g(); }");
    let reachable = hir.reverse_postorder();
    assert_eq!(reachable, vec![hir.entry]);
}

#[test]
fn test_print_function_lists_blocks() {
    let (hir, env) = lower_ok("function f(a) { return a; }");
    let text = print_function(&hir, &env);
    assert!(text.starts_with("function f(a$0)\n"));
    assert!(text.contains("bb0:"));
    assert!(text.contains("LoadLocal a$0"));
    assert!(text.contains("Return Explicit"));
}
