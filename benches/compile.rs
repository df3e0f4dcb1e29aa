//! Compilation throughput: one large file, a batch of files, and the
//! reference evaluator running compiled output.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use memoc::config::CompilerConfig;
use memoc::runtime::value::Value;
use memoc::runtime::Interpreter;

/// A program with `n` component-style functions of varying shape.
fn synthetic_program(n: usize) -> String {
    let mut source = String::new();
    for i in 0..n {
        let body = match i % 4 {
            0 => format!(
                "  const items = [];\n  for (const item of props.items) {{\n    if (item.visible) {{\n      items.push({{ id: item.id, n: {} }});\n    }}\n  }}\n  return items;\n",
                i
            ),
            1 => "  const style = { color: props.color, size: props.size * 2 };\n  const label = `${props.name}: ${style.size}`;\n  return [style, label];\n".to_string(),
            2 => "  let tone;\n  switch (props.kind) {\n    case \"a\":\n      tone = 1;\n      break;\n    default:\n      tone = 2;\n  }\n  const out = { tone };\n  out.extra = props.extra;\n  return out;\n".to_string(),
            _ => "  const x = [];\n  if (props.done) {\n    return x;\n  }\n  x.push(props.v);\n  return x;\n".to_string(),
        };
        source.push_str(&format!("function Component{}(props) {{\n{}}}\n\n", i, body));
    }
    source
}

fn bench_compile_program(c: &mut Criterion) {
    let config = CompilerConfig::default();
    let small = synthetic_program(8);
    let large = synthetic_program(128);

    let mut group = c.benchmark_group("compile_program");
    group.bench_function("8_functions", |b| {
        b.iter(|| memoc::compile_program(black_box(&small), "bench.js", &config))
    });
    group.bench_function("128_functions", |b| {
        b.iter(|| memoc::compile_program(black_box(&large), "bench.js", &config))
    });
    group.finish();
}

fn bench_compile_batch(c: &mut Criterion) {
    let config = CompilerConfig::default();
    let files: Vec<(String, String)> = (0..32)
        .map(|i| (format!("file{}.js", i), synthetic_program(16)))
        .collect();
    c.bench_function("compile_batch/32_files", |b| {
        b.iter(|| memoc::compile_batch(black_box(&files), &config))
    });
}

fn bench_cached_render(c: &mut Criterion) {
    let source = synthetic_program(4);
    let output = match memoc::compile_program(&source, "bench.js", &CompilerConfig::default()) {
        Ok(output) => output,
        Err(errors) => panic!("bench source failed to compile: {:?}", errors),
    };
    let props = Value::object(vec![
        ("color".to_string(), Value::from("red")),
        ("size".to_string(), Value::Number(3.0)),
        ("name".to_string(), Value::from("box")),
    ]);

    let mut group = c.benchmark_group("render");
    for (label, code) in [("original", source.as_str()), ("memoized", output.code.as_str())] {
        let mut interp = Interpreter::new();
        if let Err(err) = interp.run_source(code, "bench.js") {
            panic!("{} program failed: {}", label, err);
        }
        group.bench_function(label, |b| {
            b.iter(|| interp.call("Component1", vec![black_box(props.clone())]))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_compile_program,
    bench_compile_batch,
    bench_cached_render
);
criterion_main!(benches);
