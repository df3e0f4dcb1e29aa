use crate::config::CompilerConfig;
use crate::*;

const SOURCE: &str = "function f(props) {
  const x = [];
  x.push(props.v);
  return x;
}

function g(a) {
  return a * 2;
}
";

fn run(function: Option<&str>, stage: Stage) -> String {
    match inspect(SOURCE, "test.js", function, stage, &CompilerConfig::default()) {
        Ok(text) => text,
        Err(errors) => panic!("inspect failed: {:?}", errors),
    }
}

#[test]
fn test_inspect_hir_prints_blocks() {
    let text = run(Some("f"), Stage::Hir);
    assert!(text.starts_with("function f(props$"), "{}", text);
    assert!(text.contains("bb0:"), "{}", text);
    assert!(!text.contains("function g"));
}

#[test]
fn test_inspect_scopes_names_dependencies() {
    let text = run(Some("f"), Stage::Scopes);
    assert!(text.contains(".v"), "{}", text);
}

#[test]
fn test_inspect_code_includes_runtime_import() {
    let text = run(Some("f"), Stage::Code);
    assert!(text.contains("from \"memoc/runtime\";"), "{}", text);
    assert!(text.contains("const $ = _c(2);"), "{}", text);
}

#[test]
fn test_inspect_every_candidate() {
    let text = run(None, Stage::Code);
    assert!(text.contains("function f(props)"));
    assert!(text.contains("function g(a)"));
}

#[test]
fn test_inspect_unknown_function() {
    let errors = inspect(SOURCE, "test.js", Some("missing"), Stage::Hir, &CompilerConfig::default())
        .expect_err("unknown function");
    assert!(errors[0].message.contains("missing"));
}

#[test]
fn test_stage_display() {
    assert_eq!(Stage::Hir.to_string(), "hir");
    assert_eq!(Stage::Scopes.to_string(), "scopes");
    assert_eq!(Stage::Code.to_string(), "code");
}
