//! Snapshot tests over small fixture programs.

use memoc::config::CompilerConfig;
use memoc::{CompiledProgram, FunctionOutcome};

const FIXTURE: &str = r#"import { format } from "./format";

export function List(props) {
  const items = [];
  items.push(format(props.first));
  return items;
}

function plus(a) {
  return a + 1;
}

function Broken(props) {
  debugger;
  return props.a;
}

function Mutates(props) {
  props.count = 1;
  return props;
}

const Arrow = (props) => {
  const box = {};
  box.value = props.v;
  return box;
};

function Opted(props) {
  "use no memo";
  return [props.a];
}
"#;

fn compile(source: &str) -> CompiledProgram {
    match memoc::compile_program(source, "fixture.js", &CompilerConfig::default()) {
        Ok(output) => output,
        Err(errors) => panic!("compilation failed: {:?}", errors),
    }
}

fn summary(output: &CompiledProgram) -> String {
    output
        .functions
        .iter()
        .map(|report| match &report.outcome {
            FunctionOutcome::Compiled { cache_size, scopes } => format!(
                "{}: compiled, {} slot(s), {} scope(s)",
                report.name, cache_size, scopes
            ),
            FunctionOutcome::Skipped { diagnostic } => format!(
                "{}: skipped ({})",
                report.name,
                diagnostic.notes.join(", ")
            ),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn test_fixture_function_reports() {
    let output = compile(FIXTURE);
    insta::assert_snapshot!(summary(&output), @r###"
    List: compiled, 2 slot(s), 1 scope(s)
    plus: compiled, 0 slot(s), 0 scope(s)
    Broken: skipped (category: unsupported-syntax)
    Mutates: skipped (category: invalid-assumption)
    Arrow: compiled, 2 slot(s), 1 scope(s)
    "###);
}

#[test]
fn test_fixture_keeps_untouched_functions_verbatim() {
    let output = compile(FIXTURE);
    assert!(output.code.contains("function plus(a) {\n  return a + 1;\n}\n"));
    assert!(output.code.contains("  debugger;\n"));
    assert!(output.code.contains("  \"use no memo\";\n"));
}

#[test]
fn test_format_is_canonical() {
    let source = "import { a as b, c } from \"m\";\nimport d from \"n\";\n\nexport function f(x) {\n  return b(x) + c * d;\n}\n";
    let program = memoc::parse_source_silent(source, "fixture.js").expect("fixture parses");
    let formatted = memoc::format::format_program(&program, &[]);
    insta::assert_snapshot!(formatted, @r###"
    import { a as b, c } from "m";
    import d from "n";

    export function f(x) {
      return b(x) + c * d;
    }
    "###);
}

#[test]
fn test_compiled_fixture_is_stable() {
    let first = compile(FIXTURE);
    let second = compile(FIXTURE);
    assert_eq!(first.code, second.code);
    assert_eq!(first.fingerprints(), second.fingerprints());
}
