use super::*;
use crate::ast::navigate::find_function;
use crate::error::ErrorKind;
use crate::hir::builder::lower_function;

fn analyze_source(source: &str) -> Result<(HirFunction, Environment, Analysis), CompilerError> {
    let program = crate::parse_source_silent(source, "test.js").expect("source should parse");
    let func = find_function(&program, "f").expect("function f should exist");
    let mut env = Environment::new();
    let hir = lower_function(func, &mut env)?;
    let analysis = analyze(&hir, &env)?;
    Ok((hir, env, analysis))
}

fn analyze_ok(source: &str) -> (HirFunction, Environment, Analysis) {
    match analyze_source(source) {
        Ok(result) => result,
        Err(err) => panic!("analysis failed: {}", err),
    }
}

fn binding(env: &Environment, name: &str) -> IdentifierId {
    env.identifiers
        .iter()
        .find(|i| i.name.as_deref() == Some(name))
        .map(|i| i.id)
        .unwrap_or_else(|| panic!("no binding named {}", name))
}

fn instr_where(hir: &HirFunction, pred: impl Fn(&InstructionValue) -> bool) -> InstrId {
    hir.instructions()
        .into_iter()
        .find(|i| pred(&i.value))
        .map(|i| i.id)
        .expect("matching instruction")
}

#[test]
fn test_params_are_frozen_and_reactive() {
    let (_, env, analysis) = analyze_ok("function f(a) { const k = 1; const b = a.x; return [k, b]; }");
    let a = binding(&env, "a");
    assert_eq!(analysis.kind(a), ValueKind::Frozen);
    assert!(analysis.is_reactive(a));
    assert!(analysis.is_reactive(binding(&env, "b")));
    assert!(!analysis.is_reactive(binding(&env, "k")));
    assert_eq!(analysis.kind(binding(&env, "k")), ValueKind::Primitive);
}

#[test]
fn test_aliased_mutation_extends_the_range() {
    let (hir, env, analysis) = analyze_ok(
        "function f(x) { const a = []; const b = a; b.push(x); return a; }",
    );
    let a = binding(&env, "a");
    let b = binding(&env, "b");
    assert_eq!(analysis.kind(a), ValueKind::Mutable);
    assert!(analysis.same_alias_set(a, b));
    let push = instr_where(&hir, |v| matches!(v, InstructionValue::MethodCall { .. }));
    assert!(analysis.is_mutable_at(a, push));
    assert!(analysis.range(a).is_some_and(|r| r.end > push));
    // Mutated with a reactive argument.
    assert!(analysis.is_reactive(a));
}

#[test]
fn test_unmutated_allocation_range_ends_at_its_store() {
    let (hir, env, analysis) = analyze_ok("function f() { const a = [1, 2]; return a; }");
    let a = binding(&env, "a");
    let range = analysis.range(a).expect("a range");
    let array = instr_where(&hir, |v| matches!(v, InstructionValue::ArrayExpression(_)));
    // From the literal to the store into `a`, nothing after.
    assert_eq!(range.start, array);
    assert_eq!(Some(range.end), analysis.def(a).map(|d| InstrId(d.0 + 1)));
    assert!(!analysis.is_reactive(a));
}

#[test]
fn test_mutating_a_parameter_is_rejected() {
    let err = match analyze_source("function f(props) { props.items.length = 0; return props; }") {
        Err(err) => err,
        Ok(_) => panic!("mutation of a parameter should fail"),
    };
    assert_eq!(err.kind(), ErrorKind::InvalidAssumption);
    assert!(err.message().contains("props.items"));
}

#[test]
fn test_unknown_call_on_frozen_value_is_a_read() {
    let (hir, _, analysis) = analyze_ok("function f(props) { const s = props.list.slice(); return s; }");
    let call = instr_where(&hir, |v| matches!(v, InstructionValue::MethodCall { .. }));
    assert!(analysis
        .effects_of(call)
        .iter()
        .all(|(_, effect)| *effect == Effect::Read));
}

#[test]
fn test_store_under_reactive_condition_is_reactive() {
    let (_, env, analysis) = analyze_ok(
        "function f(p) { let x = 0; if (p) { x = 1; } let y = 0; if (true) { y = 2; } return [x, y]; }",
    );
    assert!(analysis.is_reactive(binding(&env, "x")));
    assert!(!analysis.is_reactive(binding(&env, "y")));
}

#[test]
fn test_loop_over_reactive_collection() {
    let (_, env, analysis) = analyze_ok(
        "function f(items) { let total = 0; for (const item of items) { total += 1; } return total; }",
    );
    assert!(analysis.is_reactive(binding(&env, "item")));
    assert!(analysis.is_reactive(binding(&env, "total")));
}

#[test]
fn test_hooks_and_global_writes_are_recorded() {
    let (hir, env, analysis) = analyze_ok(
        "function f() { const [v, set] = useState(0); window.last = v; return v; }",
    );
    assert_eq!(analysis.hooks.len(), 1);
    assert_eq!(analysis.global_writes.len(), 1);
    let hook = instr_where(&hir, |v| matches!(v, InstructionValue::Call { .. }));
    assert!(analysis.is_non_cacheable(hook));
    assert!(analysis.is_reactive(binding(&env, "v")));
    assert_eq!(analysis.kind(binding(&env, "v")), ValueKind::Frozen);
}

#[test]
fn test_builtin_results() {
    let (_, env, analysis) = analyze_ok(
        "function f(a) { const o = { a }; const m = Math.max(1, 2); const k = Object.keys(o); return [m, k]; }",
    );
    assert_eq!(analysis.kind(binding(&env, "m")), ValueKind::Primitive);
    assert!(!analysis.is_reactive(binding(&env, "m")));
    let k = binding(&env, "k");
    let o = binding(&env, "o");
    assert_eq!(analysis.kind(k), ValueKind::Mutable);
    assert!(!analysis.same_alias_set(k, o));
}

#[test]
fn test_closure_aliases_captured_values() {
    let (_, env, analysis) = analyze_ok(
        "function f() { let count = 0; const items = []; const add = () => { count += 1; items.push(count); }; return add; }",
    );
    let count = binding(&env, "count");
    let items = binding(&env, "items");
    let add = binding(&env, "add");
    assert_eq!(analysis.kind(count), ValueKind::Mutable);
    assert!(analysis.same_alias_set(add, items));
    assert!(analysis.same_alias_set(add, count));
}

#[test]
fn test_value_kind_join_order() {
    assert_eq!(ValueKind::Primitive.join(ValueKind::Frozen), ValueKind::Frozen);
    assert_eq!(ValueKind::Global.join(ValueKind::Mutable), ValueKind::Mutable);
    assert_eq!(ValueKind::Frozen.join(ValueKind::Global), ValueKind::Frozen);
}

#[test]
fn test_capture_aliases_only_when_container_is_mutated_later() {
    let (_, env, analysis) = analyze_ok(
        "function f(x) { const a = []; a.push(x); const b = [a]; return b; }",
    );
    assert!(!analysis.same_alias_set(binding(&env, "a"), binding(&env, "b")));

    let (_, env, analysis) = analyze_ok(
        "function f(x) { const a = []; a.push(x); const b = [a]; b.push(1); return b; }",
    );
    assert!(analysis.same_alias_set(binding(&env, "a"), binding(&env, "b")));
}
