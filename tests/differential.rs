//! Differential tests: every program behaves the same before and after
//! compilation when both run on the reference evaluator.

use std::fs;

use memoc::config::CompilerConfig;
use memoc::project::{Project, PROJECT_FILE};
use memoc::runtime::value::Value;
use memoc::runtime::Interpreter;

fn props(entries: Vec<(&str, Value)>) -> Value {
    Value::object(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )
}

fn num(n: f64) -> Value {
    Value::Number(n)
}

fn load(source: &str) -> Interpreter {
    let mut interp = Interpreter::new();
    if let Err(err) = interp.run_source(source, "diff.js") {
        panic!("program failed to load: {}\n{}", err, source);
    }
    interp
}

/// Run `entry` on the original and the compiled program with each argument
/// list in turn, and compare results or thrown errors.
fn differential(source: &str, config: &CompilerConfig, entry: &str, calls: &[Vec<Value>]) {
    let output = memoc::compile_program(source, "diff.js", config).expect("source should compile");
    let report = output
        .functions
        .iter()
        .find(|f| f.name == entry)
        .expect("entry is a compilation candidate");
    assert!(report.is_compiled(), "{} was skipped: {:?}", entry, report.outcome);

    let mut original = load(source);
    let mut memoized = load(&output.code);
    for (i, args) in calls.iter().enumerate() {
        let expected = original.call(entry, args.clone());
        let actual = memoized.call(entry, args.clone());
        match (expected, actual) {
            (Ok(a), Ok(b)) => assert_eq!(a, b, "call {} differs\n{}", i, output.code),
            (Err(a), Err(b)) => assert_eq!(a.to_string(), b.to_string(), "call {}", i),
            (a, b) => panic!("call {}: {:?} vs {:?}\n{}", i, a, b, output.code),
        }
    }
}

#[test]
fn test_list_filtering() {
    let source = "function List(props) {
  const items = [];
  for (const item of props.items) {
    if (item.visible) {
      items.push({ id: item.id, label: `#${item.id}` });
    }
  }
  const total = items.length > 0 ? items.length : null;
  return { items, total };
}
";
    let item = |id: f64, visible: bool| {
        props(vec![("id", num(id)), ("visible", Value::Bool(visible))])
    };
    let first = Value::array(vec![item(1.0, true), item(2.0, false), item(3.0, true)]);
    let empty = Value::array(vec![]);
    let calls = vec![
        vec![props(vec![("items", first.clone())])],
        vec![props(vec![("items", first.clone())])],
        vec![props(vec![("items", empty)])],
        vec![props(vec![("items", first)])],
    ];
    differential(source, &CompilerConfig::default(), "List", &calls);
}

#[test]
fn test_switch_and_labels() {
    let source = "function Badge(props) {
  let tone;
  switch (props.kind) {
    case \"error\":
      tone = \"red\";
      break;
    case \"warn\":
      tone = \"amber\";
      break;
    default:
      tone = \"gray\";
  }
  const style = { color: tone, bold: props.kind === \"error\" };
  return [style, props.label];
}
";
    let calls: Vec<Vec<Value>> = ["error", "warn", "warn", "info", "error"]
        .iter()
        .map(|kind| {
            vec![props(vec![
                ("kind", Value::from(*kind)),
                ("label", Value::from("status")),
            ])]
        })
        .collect();
    differential(source, &CompilerConfig::default(), "Badge", &calls);
}

#[test]
fn test_catch_path_early_return() {
    let source = "function Parse(props) {
  const raw = props.raw;
  const out = [];
  try {
    out.push(JSON.parse(raw));
  } catch (e) {
    return { error: e.message };
  }
  return out;
}
";
    let calls: Vec<Vec<Value>> = ["[1, 2]", "{", "{", "3", "[1, 2]"]
        .iter()
        .map(|raw| vec![props(vec![("raw", Value::from(*raw))])])
        .collect();
    differential(source, &CompilerConfig::default(), "Parse", &calls);
}

#[test]
fn test_nested_loops() {
    let source = "function Grid(props) {
  const rows = [];
  for (let i = 0; i < props.n; i++) {
    const row = [];
    let j = 0;
    do {
      row.push(i * j);
      j++;
    } while (j <= i);
    rows.push(row);
  }
  return rows;
}
";
    let calls: Vec<Vec<Value>> = [3.0, 3.0, 0.0, 5.0, 3.0]
        .iter()
        .map(|n| vec![props(vec![("n", num(*n))])])
        .collect();
    differential(source, &CompilerConfig::default(), "Grid", &calls);
}

#[test]
fn test_labeled_break_out_of_nested_loop() {
    let source = "function Prefix(props) {
  const out = [];
  outer: for (const row of props.rows) {
    for (const cell of row) {
      if (cell === props.stop) {
        break outer;
      }
      out.push(cell);
    }
  }
  return out;
}
";
    let rows = Value::array(vec![
        Value::array(vec![num(1.0), num(2.0)]),
        Value::array(vec![num(3.0), num(4.0)]),
    ]);
    let other = Value::array(vec![Value::array(vec![num(3.0)]), Value::array(vec![num(5.0)])]);
    let call = |rows: &Value, stop: f64| vec![props(vec![("rows", rows.clone()), ("stop", num(stop))])];
    let calls = vec![
        call(&rows, 3.0),
        call(&rows, 3.0),
        call(&rows, 4.0),
        call(&other, 4.0),
        call(&other, 3.0),
    ];
    differential(source, &CompilerConfig::default(), "Prefix", &calls);

    // Fresh props around the same rows reuse the cached result.
    let output = memoc::compile_program(source, "diff.js", &CompilerConfig::default())
        .expect("source should compile");
    let mut memoized = load(&output.code);
    let first = memoized.call("Prefix", call(&rows, 3.0)).expect("first call");
    let second = memoized.call("Prefix", call(&rows, 3.0)).expect("second call");
    assert!(first.strict_equals(&second), "{}", output.code);
    assert_eq!(first, Value::array(vec![num(1.0), num(2.0)]));
}

#[test]
fn test_closures_and_callbacks() {
    let source = "function Labels(props) {
  const format = (name) => props.prefix + name.toUpperCase();
  const labels = props.names.map(format);
  return { labels, count: labels.length };
}
";
    let names = Value::array(vec![Value::from("ada"), Value::from("grace")]);
    let call = |prefix: &str, names: &Value| {
        vec![props(vec![
            ("prefix", Value::from(prefix)),
            ("names", names.clone()),
        ])]
    };
    let calls = vec![
        call("> ", &names),
        call("> ", &names),
        call("* ", &names),
        call("* ", &Value::array(vec![Value::from("linus")])),
    ];
    differential(source, &CompilerConfig::default(), "Labels", &calls);
}

#[test]
fn test_destructuring_and_optional_chains() {
    let source = "function Profile(props) {
  const { user, options = {} } = props;
  const name = user?.name ?? \"anonymous\";
  const info = { ...options, name, tags: [] };
  if (user?.admin) {
    info.tags.push(\"admin\");
  }
  return info;
}
";
    let admin = props(vec![("name", Value::from("root")), ("admin", Value::Bool(true))]);
    let options = props(vec![("theme", Value::from("dark"))]);
    let calls = vec![
        vec![props(vec![])],
        vec![props(vec![("user", admin.clone())])],
        vec![props(vec![("user", admin.clone()), ("options", options.clone())])],
        vec![props(vec![("user", admin), ("options", options)])],
        vec![props(vec![("user", Value::Null)])],
    ];
    differential(source, &CompilerConfig::default(), "Profile", &calls);
}

#[test]
fn test_hooks_and_manual_memoization() {
    let source = "function useDouble(x) {
  return x * 2;
}

function useMemo(compute, deps) {
  return compute();
}

function Sorted(props) {
  const doubled = useDouble(props.count);
  const sorted = useMemo(() => {
    const copy = props.values.slice();
    copy.sort((a, b) => a - b);
    return copy;
  }, [props.values]);
  return { sorted, doubled, label: props.label };
}
";
    let values = Value::array(vec![num(3.0), num(1.0), num(2.0)]);
    let call = |count: f64, values: &Value| {
        vec![props(vec![
            ("count", num(count)),
            ("values", values.clone()),
            ("label", Value::from("sorted")),
        ])]
    };
    let calls = vec![
        call(1.0, &values),
        call(1.0, &values),
        call(2.0, &values),
        call(2.0, &Value::array(vec![num(9.0), num(-1.0)])),
    ];
    differential(source, &CompilerConfig::default(), "Sorted", &calls);

    let preserving = CompilerConfig {
        enable_preserve_existing_memoization_guarantees: true,
        ..CompilerConfig::default()
    };
    differential(source, &preserving, "Sorted", &calls);
}

#[test]
fn test_thrown_errors_match() {
    let source = "function Total(props) {
  const parts = [];
  parts.push(props.a.value);
  parts.push(props.b);
  return parts;
}
";
    let a = props(vec![("value", num(1.0))]);
    let calls = vec![
        vec![props(vec![("a", a.clone()), ("b", num(2.0))])],
        vec![props(vec![("b", num(2.0))])],
        vec![props(vec![("a", a), ("b", num(2.0))])],
    ];
    differential(source, &CompilerConfig::default(), "Total", &calls);
}

#[test]
fn test_project_config_drives_compilation() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join(PROJECT_FILE),
        "[compiler]\nemit_freeze = true\nruntime_module = \"app/memo\"\n",
    )
    .expect("write project file");
    let nested = dir.path().join("src").join("components");
    fs::create_dir_all(&nested).expect("create source dir");

    let toml_path = Project::find(&nested).expect("project file is found from a subdirectory");
    let project = Project::load(&toml_path).expect("project loads");
    assert!(project.compiler.emit_freeze);

    let source = "function Box(props) {
  const box = {};
  box.value = props.v;
  return box;
}
";
    let output =
        memoc::compile_program(source, "box.js", &project.compiler).expect("source compiles");
    assert!(output.code.contains("from \"app/memo\";"), "{}", output.code);

    let mut interp = Interpreter::new();
    interp.alias_runtime_module("app/memo");
    if let Err(err) = interp.run_source(&output.code, "box.js") {
        panic!("compiled program failed: {}", err);
    }
    let arg = props(vec![("v", num(7.0))]);
    let first = interp.call("Box", vec![arg.clone()]).expect("first call");
    let second = interp.call("Box", vec![arg]).expect("second call");
    assert!(first.is_frozen());
    assert!(first.strict_equals(&second));
    assert_eq!(first, props(vec![("value", num(7.0))]));
}
