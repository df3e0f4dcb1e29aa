use crate::config::CompilerConfig;
use crate::CompiledProgram;

fn compile_with(source: &str, config: &CompilerConfig) -> CompiledProgram {
    match crate::compile_program(source, "test.js", config) {
        Ok(output) => output,
        Err(errors) => panic!("compilation failed: {:?}", errors),
    }
}

fn compile(source: &str) -> CompiledProgram {
    compile_with(source, &CompilerConfig::default())
}

fn assert_contains(code: &str, needle: &str) {
    assert!(code.contains(needle), "expected `{}` in:\n{}", needle, code);
}

#[test]
fn test_constant_scope_tests_the_empty_marker() {
    let output = compile("function f() { const x = []; x.push(1); return x; }");
    let code = &output.code;
    assert_contains(code, "import { c as _c, EMPTY as _empty } from \"memoc/runtime\";");
    assert_contains(code, "const $ = _c(1);");
    assert_contains(code, "let x;");
    assert_contains(code, "if ($[0] === _empty) {");
    assert_contains(code, "$[0] = x;");
    assert_contains(code, "x = $[0];");
    assert_contains(code, "return x;");
}

#[test]
fn test_dependencies_are_compared_and_stored() {
    let output = compile("function f(props) { const x = []; x.push(props.v); return x; }");
    let code = &output.code;
    assert_contains(code, "import { c as _c } from \"memoc/runtime\";");
    assert_contains(code, "const $ = _c(2);");
    assert_contains(code, "if ($[0] !== props.v) {");
    assert_contains(code, "$[0] = props.v;");
    assert_contains(code, "$[1] = x;");
    assert_contains(code, "x = $[1];");
    assert!(!code.contains("_empty"));
}

#[test]
fn test_generated_names_avoid_program_names() {
    let output = compile(
        "function f(props) {
           const $ = props.a;
           const _c = props.b;
           const x = [$, _c];
           x.push(props.v);
           return x;
         }",
    );
    let code = &output.code;
    assert_contains(code, "c as _c2");
    assert_contains(code, "const $2 = _c2(");
    assert_contains(code, "const $ = props.a;");
}

#[test]
fn test_emit_freeze_wraps_stored_declarations() {
    let config = CompilerConfig {
        emit_freeze: true,
        ..CompilerConfig::default()
    };
    let output = compile_with(
        "function f(props) { const x = []; x.push(props.v); return x; }",
        &config,
    );
    let code = &output.code;
    assert_contains(code, "freeze as _freeze");
    assert_contains(code, "$[1] = _freeze(x);");
    // Restored values are already frozen.
    assert_contains(code, "x = $[1];");
}

#[test]
fn test_early_return_uses_the_exit_marker() {
    let output = compile(
        "function f(props) {
           const x = [];
           if (props.done) {
             return x;
           }
           x.push(props.v);
           return x;
         }",
    );
    let code = &output.code;
    assert_contains(code, "EARLY_RETURN as _exit");
    assert_contains(code, "= _exit;");
    assert_contains(code, "!== _exit) {");
    assert_contains(code, "break bb");
}

#[test]
fn test_function_without_scopes_is_unchanged() {
    let source = "function f(a) {\n  return a + 1;\n}\n";
    let output = compile(source);
    assert_eq!(output.code, source);
    assert!(!output.code.contains("import"));
}

#[test]
fn test_compiled_code_parses_again() {
    let output = compile(
        "function f(props) {
           const items = [];
           for (const item of props.items) {
             if (item.visible) {
               items.push({ id: item.id, label: `#${item.id}` });
             }
           }
           const total = items.length > 0 ? items.length : null;
           return { items, total };
         }",
    );
    let reparsed = crate::parse_source_silent(&output.code, "out.js");
    assert!(reparsed.is_ok(), "output does not parse:\n{}", output.code);
}

#[test]
fn test_runtime_module_is_configurable() {
    let config = CompilerConfig {
        runtime_module: "react/compiler-runtime".to_string(),
        ..CompilerConfig::default()
    };
    let output = compile_with("function f() { const x = []; x.push(1); return x; }", &config);
    assert_contains(&output.code, "from \"react/compiler-runtime\";");
}
