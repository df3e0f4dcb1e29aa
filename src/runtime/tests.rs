use std::cell::Cell;
use std::rc::Rc;

use super::*;
use crate::config::CompilerConfig;

fn load(source: &str) -> Interpreter {
    let mut interp = Interpreter::new();
    if let Err(err) = interp.run_source(source, "test.js") {
        panic!("program failed: {}", err);
    }
    interp
}

fn call(interp: &mut Interpreter, name: &str, args: Vec<Value>) -> Value {
    match interp.call(name, args) {
        Ok(value) => value,
        Err(err) => panic!("{}() failed: {}", name, err),
    }
}

fn eval(source: &str) -> Value {
    let mut interp = load(source);
    call(&mut interp, "f", vec![])
}

fn compiled(source: &str) -> Interpreter {
    let output = crate::compile_program(source, "test.js", &CompilerConfig::default())
        .expect("source should compile");
    load(&output.code)
}

fn props(entries: Vec<(&str, Value)>) -> Value {
    Value::object(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )
}

fn thrown_message(err: RuntimeError) -> String {
    match err {
        RuntimeError::Thrown(Value::Object(obj)) => obj
            .get("message")
            .map(|m| m.to_js_string())
            .unwrap_or_default(),
        other => panic!("expected a thrown error, got {}", other),
    }
}

// ─── Language ──────────────────────────────────────────────────────

#[test]
fn test_arithmetic_and_strings() {
    assert_eq!(eval("function f() { return 1 + 2 * 3 - 4 / 2; }"), Value::Number(5.0));
    assert_eq!(eval("function f() { return 'a' + 1 + 2; }"), Value::from("a12"));
    assert_eq!(eval("function f() { return 7 % 3 + 2 ** 3; }"), Value::Number(9.0));
    assert_eq!(eval("function f() { return [1, 2] + ''; }"), Value::from("1,2"));
    assert_eq!(eval("function f() { return -5 >>> 28; }"), Value::Number(15.0));
    assert_eq!(eval("function f() { return null ?? 'd'; }"), Value::from("d"));
    assert_eq!(eval("function f() { return typeof missing; }"), Value::from("undefined"));
}

#[test]
fn test_closures_capture_bindings() {
    let value = eval(
        "function f() {
           let n = 0;
           const inc = () => { n += 1; return n; };
           inc(); inc();
           return n;
         }",
    );
    assert_eq!(value, Value::Number(2.0));
}

#[test]
fn test_for_let_binds_per_iteration() {
    let value = eval(
        "function f() {
           const fns = [];
           for (let i = 0; i < 3; i++) { fns.push(() => i); }
           return fns.map(g => g()).join('-');
         }",
    );
    assert_eq!(value, Value::from("0-1-2"));
}

#[test]
fn test_labels_break_and_continue() {
    let value = eval(
        "function f() {
           const out = [];
           outer: for (const a of [1, 2, 3]) {
             for (const b of [1, 2, 3]) {
               if (b === 2) continue outer;
               if (a === 3) break outer;
               out.push(a * 10 + b);
             }
           }
           return out.join(',');
         }",
    );
    assert_eq!(value, Value::from("11,21"));
}

#[test]
fn test_switch_falls_through() {
    let value = eval(
        "function f() {
           let s = '';
           switch (2) { case 1: s += 'a'; case 2: s += 'b'; case 3: s += 'c'; break; default: s += 'd'; }
           return s;
         }",
    );
    assert_eq!(value, Value::from("bc"));
}

#[test]
fn test_exceptions_and_finally() {
    let value = eval(
        "function f() {
           const log = [];
           try {
             try { throw new Error('boom'); }
             finally { log.push('inner'); }
           } catch (e) {
             log.push(e.message);
           }
           return log.join(' ');
         }",
    );
    assert_eq!(value, Value::from("inner boom"));

    // A finally that returns overrides the try block's return.
    assert_eq!(
        eval("function f() { try { return 1; } finally { return 2; } }"),
        Value::Number(2.0)
    );
}

#[test]
fn test_uncaught_type_error() {
    let mut interp = load("function f(o) { return o.a.b; }");
    let err = interp
        .call("f", vec![props(vec![])])
        .expect_err("reading through undefined throws");
    assert_eq!(thrown_message(err), "Cannot read properties of undefined (reading 'b')");
}

#[test]
fn test_optional_chaining_short_circuits() {
    let mut interp = load(
        "function f(o) { return o?.user?.name ?? 'anon'; }
         function g(o) { return o.fn?.(1); }",
    );
    assert_eq!(call(&mut interp, "f", vec![Value::Null]), Value::from("anon"));
    let user = props(vec![("user", props(vec![("name", Value::from("ada"))]))]);
    assert_eq!(call(&mut interp, "f", vec![user]), Value::from("ada"));
    assert_eq!(call(&mut interp, "g", vec![props(vec![])]), Value::Undefined);
}

#[test]
fn test_tagged_template_receives_strings_and_values() {
    let value = eval(
        "function tag(strings, ...values) { return strings.join('|') + ':' + values.join(','); }
         function f() { const a = 1; return tag`x${a}y${a + 1}z`; }",
    );
    assert_eq!(value, Value::from("x|y|z:1,2"));
}

#[test]
fn test_destructuring_with_defaults_and_rest() {
    let value = eval(
        "function f() {
           const { a, b = 2, ...rest } = { a: 1, c: 3, d: 4 };
           const [x, , y = 9, ...tail] = [5, 6, undefined, 7, 8];
           return [a, b, Object.keys(rest).join(''), x, y, tail.length].join(',');
         }",
    );
    assert_eq!(value, Value::from("1,2,cd,5,9,2"));
}

#[test]
fn test_methods_receive_this() {
    let value = eval(
        "function f() {
           const counter = { n: 1, bump() { this.n += 1; return this.n; } };
           counter.bump();
           return counter.bump();
         }",
    );
    assert_eq!(value, Value::Number(3.0));
}

#[test]
fn test_const_reassignment_throws() {
    let mut interp = load("function f() { const a = 1; a = 2; }");
    let err = interp.call("f", vec![]).expect_err("const is read-only");
    assert_eq!(thrown_message(err), "Assignment to constant variable.");
}

#[test]
fn test_unbounded_recursion_is_stopped() {
    let overflowed = std::thread::Builder::new()
        .stack_size(32 * 1024 * 1024)
        .spawn(|| {
            let mut interp = load("function f() { return f(); }");
            matches!(interp.call("f", vec![]), Err(RuntimeError::StackOverflow))
        })
        .expect("thread spawns")
        .join()
        .expect("thread finishes");
    assert!(overflowed);
}

// ─── Standard library ──────────────────────────────────────────────

#[test]
fn test_array_methods() {
    let value = eval(
        "function f() {
           const xs = [3, 1, 2];
           const doubled = xs.map(x => x * 2).filter(x => x > 2);
           return [
             doubled.join('/'),
             xs.includes(2),
             xs.indexOf(9),
             xs.slice(-2).join(''),
             xs.concat([4], 5).length,
             xs.reduce((a, b) => a + b, 0),
             Array.isArray(xs),
             Math.max(...xs),
           ].join(' ');
         }",
    );
    assert_eq!(value, Value::from("6/4 true -1 12 5 6 true 3"));
}

#[test]
fn test_object_and_json_helpers() {
    let value = eval(
        "function f() {
           const o = { b: 1, a: [true, null, 'q'] };
           return JSON.stringify(o) + ' ' + Object.keys(o).join(',');
         }",
    );
    assert_eq!(value, Value::from(r#"{"b":1,"a":[true,null,"q"]} b,a"#));
}

#[test]
fn test_frozen_values_reject_writes() {
    let mut interp = load(
        "function f() { const o = Object.freeze({ a: 1 }); o.a = 2; }
         function g() { const xs = Object.freeze([]); xs.push(1); }",
    );
    assert!(interp.call("f", vec![]).is_err());
    assert!(interp.call("g", vec![]).is_err());
}

#[test]
fn test_host_functions_observe_calls() {
    let seen = Rc::new(Cell::new(0));
    let mut interp = Interpreter::new();
    let counter = seen.clone();
    interp.register_host("observe", move |args| {
        counter.set(counter.get() + 1);
        Ok(args.first().cloned().unwrap_or(Value::Undefined))
    });
    interp
        .run_source("function f(x) { return observe(x) + observe(1); }", "test.js")
        .expect("program loads");
    assert_eq!(call(&mut interp, "f", vec![Value::Number(2.0)]), Value::Number(3.0));
    assert_eq!(seen.get(), 2);
}

#[test]
fn test_console_log_is_captured() {
    let mut interp = load("function f() { console.log('n =', 1, [2]); }");
    call(&mut interp, "f", vec![]);
    assert_eq!(interp.console(), ["n = 1 [2]"]);
}

// ─── Memo runtime ──────────────────────────────────────────────────

#[test]
fn test_cache_is_persistent_per_function_object() {
    let mut interp = load(
        r#"import { c, EMPTY } from "memoc/runtime";
           function f() {
             const $ = c(2);
             const fresh = $[0] === EMPTY && $[1] === EMPTY;
             $[0] = 1;
             return fresh;
           }
           function g() { const $ = c(1); return $[0] === EMPTY; }"#,
    );
    assert_eq!(call(&mut interp, "f", vec![]), Value::Bool(true));
    assert_eq!(call(&mut interp, "f", vec![]), Value::Bool(false));
    // Another function has its own cache.
    assert_eq!(call(&mut interp, "g", vec![]), Value::Bool(true));
}

#[test]
fn test_markers_are_private_symbols() {
    let interp = Interpreter::new();
    let markers = interp.markers();
    assert!(markers.empty.strict_equals(&markers.empty));
    assert!(!markers.empty.strict_equals(&markers.early_return));
    assert!(!markers.empty.strict_equals(&Value::Undefined));
    assert_eq!(markers.empty.type_of(), "symbol");
}

#[test]
fn test_unknown_module_is_an_error() {
    let mut interp = Interpreter::new();
    let err = interp
        .run_source(r#"import { x } from "elsewhere";"#, "test.js")
        .expect_err("module is not registered");
    assert!(matches!(err, RuntimeError::UnknownModule(name) if name == "elsewhere"));
}

// ─── Compiled programs ─────────────────────────────────────────────

#[test]
fn test_cache_hit_returns_the_same_reference() {
    let source = "function Component(props) { const x = []; x.push(props.v); return x; }";
    let mut interp = compiled(source);
    let first = call(&mut interp, "Component", vec![props(vec![("v", Value::Number(1.0))])]);
    let second = call(&mut interp, "Component", vec![props(vec![("v", Value::Number(1.0))])]);
    assert!(first.strict_equals(&second));
    let third = call(&mut interp, "Component", vec![props(vec![("v", Value::Number(2.0))])]);
    assert!(!first.strict_equals(&third));
    assert_eq!(third, Value::array(vec![Value::Number(2.0)]));
}

#[test]
fn test_cache_hit_skips_recomputation() {
    let source = "function Component(props) {
                    const items = [];
                    items.push(expensive(props.a));
                    return items;
                  }";
    let calls = Rc::new(Cell::new(0));
    let mut interp = Interpreter::new();
    let counter = calls.clone();
    interp.register_host("expensive", move |args| {
        counter.set(counter.get() + 1);
        Ok(Value::Number(args.first().map_or(0.0, Value::to_number) * 10.0))
    });
    let output = crate::compile_program(source, "test.js", &CompilerConfig::default())
        .expect("source should compile");
    interp.run_source(&output.code, "test.js").expect("program loads");

    let a1 = props(vec![("a", Value::Number(1.0))]);
    call(&mut interp, "Component", vec![a1.clone()]);
    call(&mut interp, "Component", vec![a1]);
    assert_eq!(calls.get(), 1);
    call(&mut interp, "Component", vec![props(vec![("a", Value::Number(2.0))])]);
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_constant_scope_is_computed_once() {
    let source = "function Component() { const x = []; x.push(1); return x; }";
    let mut interp = compiled(source);
    let first = call(&mut interp, "Component", vec![]);
    let second = call(&mut interp, "Component", vec![]);
    assert!(first.strict_equals(&second));
}

#[test]
fn test_early_return_is_replayed_on_a_hit() {
    let source = "function Component(props) {
                    const bad = props.bad;
                    const out = [];
                    try {
                      if (bad) { throw new Error('bad'); }
                      out.push('ok');
                      return out;
                    } catch (e) {
                      out.push(e.message);
                    }
                    return out;
                  }";
    let mut original = load(source);
    let mut memoized = compiled(source);
    for bad in [true, true, false, false, true] {
        let args = vec![props(vec![("bad", Value::Bool(bad))])];
        let expected = call(&mut original, "Component", args.clone());
        let actual = call(&mut memoized, "Component", args);
        assert_eq!(expected, actual, "bad = {}", bad);
    }
    let bad = props(vec![("bad", Value::Bool(true))]);
    let first = call(&mut memoized, "Component", vec![bad.clone()]);
    let second = call(&mut memoized, "Component", vec![bad]);
    assert!(first.strict_equals(&second));
    assert_eq!(second, Value::array(vec![Value::from("bad")]));
}

#[test]
fn test_emit_freeze_freezes_cached_values() {
    let source = "function Component(props) { const x = [props.v]; x.push(1); return x; }";
    let config = CompilerConfig {
        emit_freeze: true,
        ..CompilerConfig::default()
    };
    let output = crate::compile_program(source, "test.js", &config).expect("source should compile");
    let mut interp = load(&output.code);
    let result = call(&mut interp, "Component", vec![props(vec![("v", Value::Number(1.0))])]);
    assert!(result.is_frozen());
}
