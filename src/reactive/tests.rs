use super::*;
use crate::analysis::analyze;
use crate::ast::navigate::find_function;
use crate::hir::builder::lower_function;

fn build_with(source: &str, config: &CompilerConfig) -> (ReactiveFunction, Environment) {
    let program = crate::parse_source_silent(source, "test.js").expect("source should parse");
    let func = find_function(&program, "f").expect("function f should exist");
    let mut env = Environment::new();
    let hir = lower_function(func, &mut env).expect("function should lower");
    let analysis = analyze(&hir, &env).expect("analysis should succeed");
    let reactive =
        build_reactive_function(&hir, &env, &analysis, config).expect("scopes should build");
    (reactive, env)
}

fn build(source: &str) -> (ReactiveFunction, Environment) {
    build_with(source, &CompilerConfig::default())
}

fn deps(scope: &ReactiveScope, env: &Environment) -> Vec<String> {
    scope
        .dependencies
        .iter()
        .map(|dep| {
            let mut out = env.name_of(dep.root).unwrap_or("<temp>").to_string();
            for entry in &dep.path {
                out.push_str(if entry.optional { "?." } else { "." });
                out.push_str(&entry.property);
            }
            out
        })
        .collect()
}

fn names(ids: &[IdentifierId], env: &Environment) -> Vec<String> {
    ids.iter()
        .map(|id| env.name_of(*id).unwrap_or("<temp>").to_string())
        .collect()
}

#[test]
fn test_mutated_literal_has_one_slot_and_no_dependencies() {
    let (func, env) = build("function f() { const a = []; a.push(1); return a; }");
    let scopes = func.scopes();
    assert_eq!(scopes.len(), 1);
    assert!(scopes[0].dependencies.is_empty());
    assert_eq!(names(&scopes[0].declarations, &env), ["a"]);
    assert_eq!(func.cache_size, 1);
}

#[test]
fn test_construction_over_a_prop_depends_on_the_path() {
    let (func, env) = build("function f(props) { const x = []; x.push(props.v); return x; }");
    let scopes = func.scopes();
    assert_eq!(scopes.len(), 1);
    assert_eq!(deps(scopes[0], &env), ["props.v"]);
    assert_eq!(names(&scopes[0].declarations, &env), ["x"]);
    assert_eq!(func.cache_size, 2);
    assert_eq!(scopes[0].first_slot, 0);
}

#[test]
fn test_values_that_never_escape_are_not_memoized() {
    let (func, _) = build("function f(props) { const o = {}; log(o, props.a); return 1; }");
    assert!(func.scopes().is_empty());
    assert_eq!(func.cache_size, 0);
}

#[test]
fn test_conditional_path_is_truncated_to_unconditional_prefix() {
    let (func, env) = build(
        "function f(props, c) {
           const x = [];
           x.push(props.a);
           if (c) {
             x.push(props.a.b);
           }
           return x;
         }",
    );
    let scopes = func.scopes();
    assert_eq!(scopes.len(), 1);
    assert_eq!(deps(scopes[0], &env), ["props.a", "c"]);
}

#[test]
fn test_optional_path_keeps_its_optional_links() {
    let (func, env) = build(
        "function f(props) { const x = []; x.push(props.user?.name); return x; }",
    );
    let scopes = func.scopes();
    assert_eq!(scopes.len(), 1);
    assert_eq!(deps(scopes[0], &env), ["props.user?.name"]);
}

#[test]
fn test_scope_containing_a_hook_is_flattened() {
    let (func, _) = build(
        "function f(props) { const x = []; x.push(useValue(props.a)); return x; }",
    );
    assert!(func.scopes().is_empty());
    assert_eq!(func.cache_size, 0);
}

#[test]
fn test_scope_inside_a_loop_body_is_dropped() {
    let (func, _) = build(
        "function f(props) {
           let n = 0;
           for (const item of props.items) {
             const y = [item];
             y.push(1);
             n += y.length;
           }
           return n;
         }",
    );
    assert!(func.scopes().is_empty());
}

#[test]
fn test_scope_spanning_a_whole_loop() {
    let (func, env) = build(
        "function f(items) {
           const out = [];
           for (const item of items) {
             out.push(item);
           }
           return out;
         }",
    );
    let scopes = func.scopes();
    assert_eq!(scopes.len(), 1);
    assert_eq!(deps(scopes[0], &env), ["items"]);
    assert_eq!(names(&scopes[0].declarations, &env), ["out"]);
    assert_eq!(func.cache_size, 2);
}

#[test]
fn test_early_return_takes_an_extra_slot() {
    let (func, env) = build(
        "function f(props) {
           const x = [];
           if (props.done) {
             return x;
           }
           x.push(1);
           return x;
         }",
    );
    let scopes = func.scopes();
    assert_eq!(scopes.len(), 1);
    assert!(scopes[0].early_return);
    assert_eq!(deps(scopes[0], &env), ["props.done"]);
    assert_eq!(scopes[0].slot_count(), 3);
    assert_eq!(func.cache_size, 3);
}

#[test]
fn test_outer_binding_written_inside_is_a_reassignment() {
    let (func, env) = build(
        "function f(props) {
           let n = 0;
           const items = [];
           n = props.count;
           items.push(props.a);
           return items.length + n;
         }",
    );
    let scopes = func.scopes();
    assert_eq!(scopes.len(), 1);
    assert_eq!(names(&scopes[0].declarations, &env), ["items"]);
    assert_eq!(names(&scopes[0].reassignments, &env), ["n"]);
}

#[test]
fn test_independent_allocations_get_their_own_scopes() {
    let (func, env) = build(
        "function f(props) {
           const a = [props.x];
           const b = [props.y];
           return [a, b];
         }",
    );
    let scopes = func.scopes();
    assert_eq!(scopes.len(), 3);
    assert_eq!(deps(scopes[0], &env), ["props.x"]);
    assert_eq!(deps(scopes[1], &env), ["props.y"]);
    assert_eq!(deps(scopes[2], &env), ["a", "b"]);
    // Slots are laid out scope after scope.
    assert_eq!(scopes[1].first_slot, scopes[0].slot_count());
    assert_eq!(
        func.cache_size,
        scopes.iter().map(|s| s.slot_count()).sum::<u32>()
    );
}

#[test]
fn test_preserved_manual_memoization_stays_memoized() {
    let source = "function f(props) {
                    const value = useMemo(() => [props.a], [props.a]);
                    log(value);
                    return 1;
                  }";
    let (plain, _) = build(source);
    assert!(plain.scopes().is_empty());

    let config = CompilerConfig {
        enable_preserve_existing_memoization_guarantees: true,
        ..CompilerConfig::default()
    };
    let (preserved, env) = build_with(source, &config);
    let scopes = preserved.scopes();
    assert_eq!(scopes.len(), 1);
    assert_eq!(deps(scopes[0], &env), ["props.a"]);
}

#[test]
fn test_preserved_callback_stays_memoized() {
    let source = "function f(props) {
                    const onClick = useCallback(() => props.onSelect(props.id), [props.id]);
                    register(onClick);
                    return 1;
                  }";
    let config = CompilerConfig {
        enable_preserve_existing_memoization_guarantees: true,
        ..CompilerConfig::default()
    };
    let (func, _) = build_with(source, &config);
    assert_eq!(func.scopes().len(), 1);
}

#[test]
fn test_labeled_break_out_of_nested_loop_keeps_collection_path() {
    let (func, env) = build(
        "function f(props) {
           const out = [];
           outer: for (const row of props.rows) {
             for (const cell of row) {
               if (cell === null) {
                 break outer;
               }
               out.push(cell);
             }
           }
           return out;
         }",
    );
    let scopes = func.scopes();
    assert_eq!(scopes.len(), 1);
    assert_eq!(deps(scopes[0], &env), ["props.rows"]);
}

#[test]
fn test_break_to_label_inside_scope_keeps_paths() {
    let (func, env) = build(
        "function f(props) {
           const out = [];
           b: {
             out.push(props.a);
             if (props.c) {
               break b;
             }
             out.push(1);
           }
           return out;
         }",
    );
    let scopes = func.scopes();
    assert_eq!(scopes.len(), 1);
    assert_eq!(deps(scopes[0], &env), ["props.a", "props.c"]);
}

#[test]
fn test_return_inside_branch_still_truncates_later_paths() {
    let (func, env) = build(
        "function f(props) {
           const out = [];
           if (props.skip) {
             return null;
           }
           out.push(props.item.id);
           return out;
         }",
    );
    let scopes = func.scopes();
    assert_eq!(scopes.len(), 1);
    assert_eq!(deps(scopes[0], &env), ["props.skip", "props.item"]);
}

#[test]
fn test_printed_scopes_name_dependencies() {
    let (func, env) = build("function f(props) { const x = []; x.push(props.v); return x; }");
    let printed = print_reactive_function(&func, &env);
    assert!(printed.contains("scope"), "{}", printed);
    assert!(printed.contains(".v"), "{}", printed);
}

#[test]
fn test_closure_depends_on_the_paths_it_reads() {
    let (func, env) = build(
        "function f(props) {
           const title = props.title;
           const format = (x) => props.prefix + x;
           return [format, title];
         }",
    );
    let scope = func
        .scopes()
        .into_iter()
        .find(|s| deps(s, &env).iter().any(|d| d.starts_with("props")))
        .expect("the closure should get its own scope");
    assert_eq!(deps(scope, &env), ["props.prefix"]);
}

#[test]
fn test_closure_passing_a_whole_capture_depends_on_it() {
    let (func, env) = build(
        "function f(props) {
           const title = props.title;
           const show = () => log(props, props.id);
           return [show, title];
         }",
    );
    let scope = func
        .scopes()
        .into_iter()
        .find(|s| deps(s, &env).iter().any(|d| d.starts_with("props")))
        .expect("the closure should get its own scope");
    assert_eq!(deps(scope, &env), ["props"]);
}

#[test]
fn test_closure_path_without_a_checked_object_is_truncated() {
    let (func, env) = build(
        "function f(props) {
           const read = () => props.a.b;
           return read;
         }",
    );
    let scopes = func.scopes();
    assert_eq!(scopes.len(), 1);
    assert_eq!(deps(scopes[0], &env), ["props"]);
}
