use super::compile_ok;
use crate::config::{CompilationMode, CompilerConfig, Environment};
use crate::*;

const TWO_FUNCTIONS: &str = "function List(props) {
  const items = [];
  items.push(props.first);
  return items;
}

function plus(a) {
  return a + 1;
}
";

#[test]
fn test_compile_program_reports_each_candidate() {
    let output = compile_ok(TWO_FUNCTIONS, &CompilerConfig::default());
    assert_eq!(output.functions.len(), 2);

    let list = &output.functions[0];
    assert_eq!(list.name, "List");
    match list.outcome {
        FunctionOutcome::Compiled { cache_size, scopes } => {
            assert_eq!(cache_size, 2);
            assert_eq!(scopes, 1);
        }
        ref other => panic!("List should compile, got {:?}", other),
    }

    let plus = &output.functions[1];
    assert!(plus.is_compiled());
    assert!(matches!(
        plus.outcome,
        FunctionOutcome::Compiled { cache_size: 0, .. }
    ));
    assert!(output.diagnostics().is_empty());
}

#[test]
fn test_runtime_import_is_inserted_after_existing_imports() {
    let source = "import { helper } from \"./helper\";

function f(props) {
  const x = [];
  x.push(helper(props.v));
  return x;
}
";
    let output = compile_ok(source, &CompilerConfig::default());
    let first = output.code.find("from \"./helper\"").expect("original import kept");
    let runtime = output.code.find("from \"memoc/runtime\"").expect("runtime import");
    assert!(first < runtime, "{}", output.code);
    assert!(matches!(
        output.program.items[1].node,
        ast::Item::Import(_)
    ));
}

#[test]
fn test_unsupported_function_is_skipped_unchanged() {
    let source = "function broken(props) {
  debugger;
  const x = [];
  x.push(props.a);
  return x;
}

function fine(props) {
  const x = [];
  x.push(props.a);
  return x;
}
";
    let output = compile_ok(source, &CompilerConfig::default());
    assert!(!output.functions[0].is_compiled());
    assert!(output.functions[1].is_compiled());

    let diagnostics = output.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert!(
        diagnostics[0].message.contains("debugger"),
        "{}",
        diagnostics[0].message
    );
    // The skipped function keeps its original body.
    assert!(output.code.contains("debugger;"));
    assert!(output.code.contains("const $ = _c(2);"));
}

#[test]
fn test_use_no_memo_opts_out() {
    let source = "function f(props) {
  \"use no memo\";
  const x = [];
  x.push(props.a);
  return x;
}
";
    let output = compile_ok(source, &CompilerConfig::default());
    assert!(output.functions.is_empty());
    assert!(!output.code.contains("memoc/runtime"));
}

#[test]
fn test_annotation_mode_compiles_only_opted_in_functions() {
    let source = "function a(props) {
  \"use memo\";
  const x = [];
  x.push(props.a);
  return x;
}

function b(props) {
  const x = [];
  x.push(props.b);
  return x;
}
";
    let config = CompilerConfig {
        compilation_mode: CompilationMode::Annotation,
        ..CompilerConfig::default()
    };
    let output = compile_ok(source, &config);
    let names: Vec<&str> = output.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["a"]);
    assert!(output.code.contains("if ($[0] !== props.a) {"));
    assert!(output.code.contains("x.push(props.b);"));
}

#[test]
fn test_const_arrow_and_default_export_are_candidates() {
    let source = "export const g = (props) => {
  const x = [];
  x.push(props.a);
  return x;
};

export default function (props) {
  const y = {};
  y.value = props.b;
  return y;
}
";
    let output = compile_ok(source, &CompilerConfig::default());
    let names: Vec<&str> = output.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["g", "default"]);
    assert!(output.functions.iter().all(|f| f.is_compiled()));
}

#[test]
fn test_configuration_conflict_fails_the_program() {
    let config = CompilerConfig {
        emit_freeze: true,
        environment: Environment::Production,
        ..CompilerConfig::default()
    };
    let errors = compile_program("function f() {}", "test.js", &config)
        .expect_err("conflicting config should fail");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("emit_freeze"));
}

#[test]
fn test_parse_error_fails_the_program() {
    let result = compile_program("function f( {", "test.js", &CompilerConfig::default());
    assert!(result.is_err());
}

#[test]
fn test_compile_function_returns_its_import() {
    let program = parse_source_silent(
        "function f(props) { const x = []; x.push(props.v); return x; }",
        "test.js",
    )
    .expect("parses");
    let function = ast::navigate::find_function(&program, "f").expect("f exists");
    let compiled =
        compile_function(function, &CompilerConfig::default()).expect("f compiles");
    assert_eq!(compiled.cache_size, 2);
    assert_eq!(compiled.scopes, 1);
    assert!(compiled.import.is_some());
    assert!(compiled.code.starts_with("function f(props) {"));
}

#[test]
fn test_compile_batch_keeps_input_order() {
    let sources: Vec<(String, String)> = (0..8)
        .map(|i| {
            let source = if i == 3 {
                "function broken( {".to_string()
            } else {
                format!(
                    "function f{}(props) {{ const x = []; x.push(props.v); return x; }}",
                    i
                )
            };
            (format!("file{}.js", i), source)
        })
        .collect();
    let entries = compile_batch(&sources, &CompilerConfig::default());
    assert_eq!(entries.len(), 8);
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.name, format!("file{}.js", i));
        assert_eq!(entry.result.is_err(), i == 3);
    }
}

#[test]
fn test_fingerprints_are_stable_and_track_output() {
    let config = CompilerConfig::default();
    let first = compile_ok(TWO_FUNCTIONS, &config).fingerprints();
    let second = compile_ok(TWO_FUNCTIONS, &config).fingerprints();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].name, "List");
    assert_eq!(first[0].cache_size, 2);

    let changed = TWO_FUNCTIONS.replace("props.first", "props.second");
    let third = compile_ok(&changed, &config).fingerprints();
    assert_ne!(first[0].hash, third[0].hash);
    assert_eq!(first[1].hash, third[1].hash);
}
