use crate::syntax::lexer::Lexer;
use crate::syntax::parser::Parser;

use super::*;

/// Helper: parse source and format it back.
fn fmt(source: &str) -> String {
    let (tokens, comments, lex_errors) = Lexer::new(source, 0).tokenize();
    assert!(lex_errors.is_empty(), "lex errors: {:?}", lex_errors);
    let program = match Parser::new(tokens, source).parse_program() {
        Ok(program) => program,
        Err(errors) => panic!("parse errors: {:?}", errors),
    };
    format_program(&program, &comments)
}

/// Formatting is a fixpoint after the first pass.
fn assert_idempotent(source: &str) {
    let once = fmt(source);
    let twice = fmt(&once);
    assert_eq!(once, twice);
}

// --- Round trips ---

#[test]
fn test_function_declaration() {
    let src = "function Component(props) {\n  const a = props.a;\n  return a;\n}\n";
    assert_eq!(fmt(src), src);
}

#[test]
fn test_imports_grouped_and_items_separated() {
    let src = "import { useState } from \"react\";\nimport x, { y as z } from \"m\";\n\nexport function A() {}\n\nexport default function () {}\n";
    assert_eq!(fmt(src), src);
}

#[test]
fn test_const_arrow() {
    let src = "export const Button = ({ label, onClick }) => {\n  return html`<b>${label}</b>`;\n};\n";
    assert_eq!(fmt(src), src);
}

#[test]
fn test_control_flow() {
    let src = "function f(a) {\n  if (a) {\n    g();\n  } else if (b) {\n    h();\n  } else {\n    k();\n  }\n  for (let i = 0; i < 10; i++) {\n    continue;\n  }\n  for (const x of xs) {}\n  while (a) {\n    break;\n  }\n  do {\n    a--;\n  } while (a);\n}\n";
    assert_eq!(fmt(src), src);
}

#[test]
fn test_switch_and_try() {
    let src = "function f(x) {\n  switch (x) {\n    case 1:\n      g();\n      break;\n    default:\n      h();\n  }\n  try {\n    g();\n  } catch (e) {\n    h(e);\n  } finally {\n    k();\n  }\n}\n";
    assert_eq!(fmt(src), src);
}

#[test]
fn test_labeled_block() {
    let src = "function f() {\n  bb0: {\n    break bb0;\n  }\n}\n";
    assert_eq!(fmt(src), src);
}

#[test]
fn test_normalizes_whitespace() {
    let out = fmt("function   f( a,b ){return a+b}");
    assert_eq!(out, "function f(a, b) {\n  return a + b;\n}\n");
}

#[test]
fn test_top_level_comments_kept() {
    let out = fmt("// header\nfunction f() {}\n");
    assert!(out.starts_with("// header\nfunction f() {}\n"));
}

// --- Parentheses ---

#[test]
fn test_minimal_parens() {
    assert_eq!(fmt("(a + b) * c;"), "(a + b) * c;\n");
    assert_eq!(fmt("a + (b * c);"), "a + b * c;\n");
    assert_eq!(fmt("a - (b - c);"), "a - (b - c);\n");
    assert_eq!(fmt("(a - b) - c;"), "a - b - c;\n");
    assert_eq!(fmt("(a ** b) ** c;"), "(a ** b) ** c;\n");
    assert_eq!(fmt("(-a) ** b;"), "(-a) ** b;\n");
}

#[test]
fn test_nullish_mixing_keeps_parens() {
    assert_eq!(fmt("(a || b) ?? c;"), "(a || b) ?? c;\n");
    assert_eq!(fmt("a ?? (b && c);"), "a ?? (b && c);\n");
}

#[test]
fn test_chain_boundary_keeps_parens() {
    assert_eq!(fmt("(a?.b).c;"), "(a?.b).c;\n");
    assert_eq!(fmt("a?.b.c;"), "a?.b.c;\n");
    assert_eq!(fmt("(a?.b)();"), "(a?.b)();\n");
}

#[test]
fn test_statement_position_object_and_function() {
    assert_eq!(fmt("({ a } = b);"), "({ a } = b);\n");
    assert_eq!(fmt("(function () {})();"), "(function () {})();\n");
}

#[test]
fn test_arrow_object_body() {
    assert_eq!(fmt("f(() => ({ a: 1 }));"), "f(() => ({ a: 1 }));\n");
}

#[test]
fn test_new_with_call_in_callee() {
    assert_eq!(fmt("new (f())();"), "new (f())();\n");
    assert_eq!(fmt("new a.B;"), "new a.B();\n");
}

#[test]
fn test_unary_spacing() {
    assert_eq!(fmt("- -a;"), "- -a;\n");
    assert_eq!(fmt("typeof a;"), "typeof a;\n");
    assert_eq!(fmt("!(a && b);"), "!(a && b);\n");
}

#[test]
fn test_conditional_and_assignment_nesting() {
    assert_eq!(fmt("a = b ? c : d;"), "a = b ? c : d;\n");
    assert_eq!(fmt("(a ? b : c) ? d : e;"), "(a ? b : c) ? d : e;\n");
    assert_eq!(fmt("x = (a, b);"), "x = (a, b);\n");
}

#[test]
fn test_dangling_else_is_braced() {
    let out = fmt("if (a) if (b) x(); else y();");
    // The `else` belongs to the inner `if`: the printer must keep that binding.
    assert_idempotent(&out);
    assert!(out.contains("if (b)"));
}

#[test]
fn test_idempotent_on_larger_program() {
    assert_idempotent(
        "import { useState } from \"react\";\n\
         export default function App({ items, filter = \"\" }) {\n\
           const [count, setCount] = useState(0);\n\
           const visible = items.filter((item) => item.name.includes(filter));\n\
           const view = html`<ul>${visible.map((i) => html`<li>${i.name}</li>`)}</ul>`;\n\
           label: for (const v of visible) { if (!v) continue label; }\n\
           return { view, count, inc: () => setCount(count + 1), ...rest };\n\
         }\n",
    );
}

// --- Literals ---

#[test]
fn test_number_to_string() {
    assert_eq!(number_to_string(0.0), "0");
    assert_eq!(number_to_string(-0.0), "0");
    assert_eq!(number_to_string(42.0), "42");
    assert_eq!(number_to_string(3.5), "3.5");
    assert_eq!(number_to_string(0.1), "0.1");
    assert_eq!(number_to_string(-2.25), "-2.25");
    assert_eq!(number_to_string(1e21), "1e+21");
    assert_eq!(number_to_string(1e20), "100000000000000000000");
    assert_eq!(number_to_string(1.5e-7), "1.5e-7");
    assert_eq!(number_to_string(0.000001), "0.000001");
    assert_eq!(number_to_string(f64::NAN), "NaN");
    assert_eq!(number_to_string(f64::INFINITY), "Infinity");
}

#[test]
fn test_quote_string() {
    assert_eq!(quote_string("a\"b"), "\"a\\\"b\"");
    assert_eq!(quote_string("line\nnext"), "\"line\\nnext\"");
    assert_eq!(quote_string("tab\t\\"), "\"tab\\t\\\\\"");
}

#[test]
fn test_member_on_integer_literal() {
    assert_eq!(fmt("(1).toString();"), "(1).toString();\n");
    assert_eq!(fmt("1.5.toFixed();"), "1.5.toFixed();\n");
}

#[test]
fn test_array_holes() {
    assert_eq!(fmt("[, a, , ];"), "[, a, , ];\n");
}
