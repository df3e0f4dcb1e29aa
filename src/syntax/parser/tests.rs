use super::*;
use crate::syntax::lexer::Lexer;

fn parse(source: &str) -> Program {
    let (tokens, _comments, lex_errors) = Lexer::new(source, 0).tokenize();
    assert!(lex_errors.is_empty(), "lex errors: {:?}", lex_errors);
    match Parser::new(tokens, source).parse_program() {
        Ok(program) => program,
        Err(errors) => panic!("parse errors: {:?}", errors),
    }
}

fn parse_errors(source: &str) -> Vec<Diagnostic> {
    let (tokens, _comments, lex_errors) = Lexer::new(source, 0).tokenize();
    assert!(lex_errors.is_empty(), "lex errors: {:?}", lex_errors);
    match Parser::new(tokens, source).parse_program() {
        Ok(_) => Vec::new(),
        Err(errors) => errors,
    }
}

fn stmt(program: &Program, index: usize) -> &Stmt {
    match &program.items[index].node {
        Item::Stmt { stmt, .. } => &stmt.node,
        Item::Import(_) => panic!("expected statement at {}", index),
    }
}

/// Expression of the `index`-th top-level expression statement.
fn expr(source: &str) -> Expr {
    let program = parse(source);
    match stmt(&program, 0) {
        Stmt::Expr(e) => e.node.clone(),
        other => panic!("expected expression statement, got {:?}", other),
    }
}

// --- Items ---

#[test]
fn test_function_declaration() {
    let program = parse("function Component(props) { return props.a; }");
    let Stmt::FunctionDecl(f) = stmt(&program, 0) else {
        panic!("expected function");
    };
    assert_eq!(f.name_str(), Some("Component"));
    assert_eq!(f.params.len(), 1);
    assert!(!f.is_arrow);
    let FunctionBody::Block(body) = &f.body else {
        panic!("expected block body");
    };
    assert!(matches!(body[0].node, Stmt::Return(Some(_))));
}

#[test]
fn test_imports_and_exports() {
    let program = parse(
        "import React, { useState as useS, useMemo } from \"react\";\n\
         export function A() {}\n\
         export default function () {}\n\
         export const B = () => 1;",
    );
    let Item::Import(import) = &program.items[0].node else {
        panic!("expected import");
    };
    assert_eq!(import.default.as_ref().map(|d| d.node.as_str()), Some("React"));
    assert_eq!(import.specifiers[0].imported, "useState");
    assert_eq!(import.specifiers[0].local.node, "useS");
    assert_eq!(import.specifiers[1].local.node, "useMemo");
    assert_eq!(import.source, "react");

    assert!(matches!(
        program.items[1].node,
        Item::Stmt {
            export: Export::Named,
            ..
        }
    ));
    let Item::Stmt {
        export: Export::Default,
        stmt,
    } = &program.items[2].node
    else {
        panic!("expected default export");
    };
    assert!(matches!(&stmt.node, Stmt::FunctionDecl(f) if f.name.is_none()));
    assert!(matches!(
        program.items[3].node,
        Item::Stmt {
            export: Export::Named,
            ..
        }
    ));
}

#[test]
fn test_arrow_functions() {
    let program = parse("const f = (a, { b }, ...rest) => a + b;\nconst g = x => { return x; };");
    let Stmt::VarDecl { kind, decls } = stmt(&program, 0) else {
        panic!("expected declaration");
    };
    assert_eq!(*kind, DeclKind::Const);
    let Some(Spanned {
        node: Expr::Function(f),
        ..
    }) = &decls[0].init
    else {
        panic!("expected arrow");
    };
    assert!(f.is_arrow);
    assert_eq!(f.params.len(), 3);
    assert!(matches!(f.params[1].node, Pattern::Object { .. }));
    assert!(matches!(f.params[2].node, Pattern::Rest(_)));
    assert!(matches!(f.body, FunctionBody::Expr(_)));

    let Stmt::VarDecl { decls, .. } = stmt(&program, 1) else {
        panic!("expected declaration");
    };
    let Some(Spanned {
        node: Expr::Function(g),
        ..
    }) = &decls[0].init
    else {
        panic!("expected arrow");
    };
    assert!(matches!(g.body, FunctionBody::Block(_)));
}

#[test]
fn test_directives() {
    let program = parse("function A() { \"use memo\"; \"use strict\"; return 1; }");
    let Stmt::FunctionDecl(f) = stmt(&program, 0) else {
        panic!("expected function");
    };
    assert_eq!(f.directives(), vec!["use memo", "use strict"]);
    assert!(f.has_directive("use memo"));
    assert!(!f.has_directive("use no memo"));
}

// --- Expressions ---

#[test]
fn test_precedence() {
    let e = expr("a + b * c;");
    let Expr::Binary {
        op: BinOp::Add,
        right,
        ..
    } = e
    else {
        panic!("expected addition at the root");
    };
    assert!(matches!(right.node, Expr::Binary { op: BinOp::Mul, .. }));
}

#[test]
fn test_left_associative_subtraction() {
    let e = expr("a - b - c;");
    let Expr::Binary {
        op: BinOp::Sub,
        left,
        right,
    } = e
    else {
        panic!("expected subtraction");
    };
    assert!(matches!(left.node, Expr::Binary { op: BinOp::Sub, .. }));
    assert!(matches!(right.node, Expr::Ident(ref n) if n == "c"));
}

#[test]
fn test_exponent_is_right_associative() {
    let e = expr("a ** b ** c;");
    let Expr::Binary {
        op: BinOp::Exp,
        left,
        right,
    } = e
    else {
        panic!("expected exponent");
    };
    assert!(matches!(left.node, Expr::Ident(_)));
    assert!(matches!(right.node, Expr::Binary { op: BinOp::Exp, .. }));
}

#[test]
fn test_logical_and_conditional() {
    let e = expr("a ?? b ? c || d : e && f;");
    let Expr::Conditional {
        test,
        consequent,
        alternate,
    } = e
    else {
        panic!("expected conditional");
    };
    assert!(matches!(test.node, Expr::Logical { op: LogicalOp::Nullish, .. }));
    assert!(matches!(consequent.node, Expr::Logical { op: LogicalOp::Or, .. }));
    assert!(matches!(alternate.node, Expr::Logical { op: LogicalOp::And, .. }));
}

#[test]
fn test_optional_chain_is_wrapped() {
    let e = expr("a?.b.c;");
    let Expr::Chain(inner) = e else {
        panic!("expected chain");
    };
    let Expr::Member {
        object, optional, ..
    } = &inner.node
    else {
        panic!("expected member");
    };
    assert!(!optional);
    assert!(matches!(object.node, Expr::Member { optional: true, .. }));
}

#[test]
fn test_optional_call_and_index() {
    assert!(matches!(expr("f?.(x);"), Expr::Chain(_)));
    let Expr::Chain(inner) = expr("a?.[0];") else {
        panic!("expected chain");
    };
    assert!(matches!(
        inner.node,
        Expr::Member {
            property: MemberProp::Computed(_),
            optional: true,
            ..
        }
    ));
}

#[test]
fn test_conditional_with_number_is_not_optional_chain() {
    assert!(matches!(expr("a?.5:1;"), Expr::Conditional { .. }));
}

#[test]
fn test_compound_and_logical_assignment() {
    let Expr::Assign { op, target, .. } = expr("x.y += 1;") else {
        panic!("expected assignment");
    };
    assert_eq!(op, AssignOp::Compound(BinOp::Add));
    assert!(matches!(target.node, Pattern::Member(_)));

    let Expr::Assign { op, .. } = expr("x ??= 1;") else {
        panic!("expected assignment");
    };
    assert_eq!(op, AssignOp::Logical(LogicalOp::Nullish));
}

#[test]
fn test_destructuring_assignment() {
    let Expr::Assign { target, .. } = expr("[a, { b = 1 }, ...c] = value;") else {
        panic!("expected assignment");
    };
    let Pattern::Array { elements, rest } = &target.node else {
        panic!("expected array pattern");
    };
    assert_eq!(elements.len(), 2);
    assert!(rest.is_some());
    let Some(Spanned {
        node: Pattern::Object { props, .. },
        ..
    }) = &elements[1]
    else {
        panic!("expected object pattern");
    };
    assert!(props[0].shorthand);
    assert!(matches!(props[0].value.node, Pattern::Default { .. }));
}

#[test]
fn test_new_binds_member_then_call() {
    let Expr::Member { object, .. } = expr("new a.B(1).c;") else {
        panic!("expected member");
    };
    let Expr::New { callee, args } = &object.node else {
        panic!("expected new");
    };
    assert!(matches!(callee.node, Expr::Member { .. }));
    assert_eq!(args.len(), 1);
}

#[test]
fn test_object_literal_forms() {
    let Expr::Object(members) = expr("({ a, b: 1, [k]: 2, m() { return 1; }, ...rest, \"s\": 3 });")
    else {
        panic!("expected object");
    };
    assert_eq!(members.len(), 6);
    assert!(matches!(
        members[0],
        ObjectMember::Property {
            shorthand: true,
            ..
        }
    ));
    assert!(matches!(
        members[2],
        ObjectMember::Property {
            key: PropKey::Computed(_),
            ..
        }
    ));
    assert!(matches!(
        members[3],
        ObjectMember::Property { method: true, .. }
    ));
    assert!(matches!(members[4], ObjectMember::Spread(_)));
}

#[test]
fn test_tagged_template() {
    let Expr::TaggedTemplate { quasis, exprs, .. } = expr("html`<p>${a}</p>${b}`;") else {
        panic!("expected tagged template");
    };
    assert_eq!(quasis.len(), 3);
    assert_eq!(exprs.len(), 2);
    assert_eq!(quasis[0].cooked, "<p>");
}

#[test]
fn test_template_splices_end_at_identifiers_and_members() {
    let Expr::Template { quasis, exprs } = expr("`a${b}c${d.e}f${g(h)}`;") else {
        panic!("expected template literal");
    };
    assert_eq!(quasis.len(), 4);
    assert_eq!(exprs.len(), 3);
    assert_eq!(quasis[1].cooked, "c");
    assert_eq!(quasis[3].cooked, "");
    assert!(matches!(exprs[0].node, Expr::Ident(_)));
    assert!(matches!(exprs[1].node, Expr::Member { .. }));
}

#[test]
fn test_template_inside_call_arguments() {
    let program = parse("const label = format(`#${item.id}`, `${a}`);");
    assert!(matches!(stmt(&program, 0), Stmt::VarDecl { .. }));
}

#[test]
fn test_update_and_unary() {
    assert!(matches!(
        expr("i++;"),
        Expr::Update {
            prefix: false,
            op: UpdateOp::Increment,
            ..
        }
    ));
    assert!(matches!(
        expr("--i;"),
        Expr::Update {
            prefix: true,
            op: UpdateOp::Decrement,
            ..
        }
    ));
    assert!(matches!(
        expr("typeof x === \"string\";"),
        Expr::Binary {
            op: BinOp::StrictEq,
            ..
        }
    ));
}

#[test]
fn test_sequence_and_spread_arguments() {
    let Expr::Sequence(items) = expr("a, f(...b), c;") else {
        panic!("expected sequence");
    };
    assert_eq!(items.len(), 3);
    let Expr::Call { args, .. } = &items[1].node else {
        panic!("expected call");
    };
    assert!(matches!(args[0], Argument::Spread(_)));
}

// --- Statements ---

#[test]
fn test_for_loops() {
    let program = parse(
        "for (let i = 0; i < n; i++) {}\n\
         for (const x of xs) {}\n\
         for (k in obj) {}\n\
         for (;;) { break; }",
    );
    assert!(matches!(
        stmt(&program, 0),
        Stmt::For {
            init: Some(ForInit::VarDecl { .. }),
            test: Some(_),
            update: Some(_),
            ..
        }
    ));
    assert!(matches!(
        stmt(&program, 1),
        Stmt::ForOf {
            left: ForHead::Decl {
                kind: DeclKind::Const,
                ..
            },
            ..
        }
    ));
    assert!(matches!(
        stmt(&program, 2),
        Stmt::ForIn {
            left: ForHead::Target(_),
            ..
        }
    ));
    assert!(matches!(
        stmt(&program, 3),
        Stmt::For {
            init: None,
            test: None,
            update: None,
            ..
        }
    ));
}

#[test]
fn test_for_init_with_in_operator_in_parens() {
    let program = parse("for (let a = (\"x\" in o); a; ) {}");
    assert!(matches!(stmt(&program, 0), Stmt::For { .. }));
}

#[test]
fn test_for_init_with_in_operator_in_optional_index() {
    let program = parse("for (let a = o?.[\"x\" in p]; a; ) {}");
    assert!(matches!(
        stmt(&program, 0),
        Stmt::For {
            init: Some(ForInit::VarDecl { .. }),
            ..
        }
    ));
}

#[test]
fn test_labels_switch_try() {
    let program = parse(
        "outer: while (a) { continue outer; }\n\
         switch (x) { case 1: f(); break; default: g(); }\n\
         try { f(); } catch (e) { g(e); } finally { h(); }",
    );
    let Stmt::Labeled { label, body } = stmt(&program, 0) else {
        panic!("expected label");
    };
    assert_eq!(label.node, "outer");
    assert!(matches!(body.node, Stmt::While { .. }));

    let Stmt::Switch { cases, .. } = stmt(&program, 1) else {
        panic!("expected switch");
    };
    assert_eq!(cases.len(), 2);
    assert!(cases[1].test.is_none());
    assert_eq!(cases[0].body.len(), 2);

    let Stmt::Try {
        handler, finalizer, ..
    } = stmt(&program, 2)
    else {
        panic!("expected try");
    };
    assert!(handler.as_ref().is_some_and(|h| h.param.is_some()));
    assert!(finalizer.is_some());
}

#[test]
fn test_return_asi() {
    let program = parse("function f() {\n  return\n  1;\n}");
    let Stmt::FunctionDecl(f) = stmt(&program, 0) else {
        panic!("expected function");
    };
    let FunctionBody::Block(body) = &f.body else {
        panic!("expected block");
    };
    assert!(matches!(body[0].node, Stmt::Return(None)));
    assert_eq!(body.len(), 2);
}

#[test]
fn test_statements_without_semicolons() {
    let program = parse("let a = 1\nlet b = a\nf(b)\n");
    assert_eq!(program.items.len(), 3);
}

// --- Errors ---

#[test]
fn test_error_missing_semicolon() {
    let errors = parse_errors("let a = 1 let b = 2;");
    assert!(!errors.is_empty());
    assert!(errors[0].message.contains("expected ';'"));
}

#[test]
fn test_error_class_declaration() {
    let errors = parse_errors("class A {}");
    assert!(errors
        .iter()
        .any(|e| e.message.contains("class declarations are not supported")));
}

#[test]
fn test_error_invalid_assignment_target() {
    let errors = parse_errors("f() = 1;");
    assert!(errors
        .iter()
        .any(|e| e.message.contains("invalid assignment target")));
}

#[test]
fn test_error_nesting_depth() {
    let source = format!("x = {}1{};", "(".repeat(400), ")".repeat(400));
    let errors = parse_errors(&source);
    assert!(errors
        .iter()
        .any(|e| e.message.contains("nesting depth exceeded")));
}

#[test]
fn test_error_duplicate_default() {
    let errors = parse_errors("switch (x) { default: break; default: break; }");
    assert!(errors.iter().any(|e| e.message.contains("more than one")));
}
