use crate::ast::*;
use crate::syntax::span::Spanned;

use super::expr::{format_expr_at, format_function_decl, format_pattern};
use super::indent_str;

/// `{ … }` with statements one level deeper than `indent`.
pub(crate) fn format_block(stmts: &[Spanned<Stmt>], indent: usize) -> String {
    if stmts.is_empty() {
        return "{}".to_string();
    }
    let mut out = String::from("{\n");
    for stmt in stmts {
        emit_stmt(&mut out, &stmt.node, indent + 1);
    }
    out.push_str(&indent_str(indent));
    out.push('}');
    out
}

/// Format a statement at the given indentation, including the newline.
pub(crate) fn format_stmt(stmt: &Stmt, indent: usize) -> String {
    let mut out = String::new();
    emit_stmt(&mut out, stmt, indent);
    out
}

/// Expression in statement position: object literals and function
/// expressions would otherwise start a block or a declaration.
fn expr_stmt_text(expr: &Expr, indent: usize) -> String {
    let text = format_expr_at(expr, 0, indent);
    let ambiguous = text.starts_with('{')
        || text.starts_with("function ")
        || text.starts_with("function(")
        || text.starts_with("function*")
        || text.starts_with("async function")
        || text.starts_with("let [")
        || text.starts_with("class ");
    if ambiguous {
        format!("({})", text)
    } else {
        text
    }
}

pub(super) fn format_var_decl(kind: DeclKind, decls: &[Declarator], indent: usize, no_in: bool) -> String {
    let parts: Vec<String> = decls
        .iter()
        .map(|d| {
            let target = format_pattern(&d.target.node, indent);
            match &d.init {
                Some(init) => {
                    let mut value = format_expr_at(&init.node, 1, indent);
                    if no_in && value.contains(" in ") {
                        value = format!("({})", value);
                    }
                    format!("{} = {}", target, value)
                }
                None => target,
            }
        })
        .collect();
    format!("{} {}", kind.as_str(), parts.join(", "))
}

/// Body of `if`/loops: blocks stay on the header line, other statements
/// go on their own indented line.
fn emit_body(out: &mut String, body: &Stmt, indent: usize) {
    match body {
        Stmt::Block(stmts) => {
            out.push(' ');
            out.push_str(&format_block(stmts, indent));
        }
        other => {
            out.push('\n');
            let inner = format_stmt(other, indent + 1);
            out.push_str(inner.trim_end_matches('\n'));
        }
    }
}

fn for_head(head: &ForHead, indent: usize) -> String {
    match head {
        ForHead::Decl { kind, target } => {
            format!("{} {}", kind.as_str(), format_pattern(&target.node, indent))
        }
        ForHead::Target(target) => format_pattern(&target.node, indent),
    }
}

fn emit_stmt(out: &mut String, stmt: &Stmt, indent: usize) {
    let pad = indent_str(indent);
    out.push_str(&pad);
    match stmt {
        Stmt::VarDecl { kind, decls } => {
            out.push_str(&format_var_decl(*kind, decls, indent, false));
            out.push(';');
        }
        Stmt::FunctionDecl(f) => out.push_str(&format_function_decl(f, indent)),
        Stmt::Expr(e) => {
            out.push_str(&expr_stmt_text(&e.node, indent));
            out.push(';');
        }
        Stmt::Block(stmts) => out.push_str(&format_block(stmts, indent)),
        Stmt::If {
            test,
            consequent,
            alternate,
        } => {
            out.push_str("if (");
            out.push_str(&format_expr_at(&test.node, 0, indent));
            out.push(')');
            // `if (a) if (b) x; else y;` would rebind the else.
            let dangling = alternate.is_some() && matches!(consequent.node, Stmt::If { .. });
            if dangling {
                out.push(' ');
                out.push_str(&format_block(std::slice::from_ref(consequent.as_ref()), indent));
            } else {
                emit_body(out, &consequent.node, indent);
            }
            if let Some(alt) = alternate {
                if matches!(consequent.node, Stmt::Block(_)) || dangling {
                    out.push_str(" else");
                } else {
                    out.push('\n');
                    out.push_str(&pad);
                    out.push_str("else");
                }
                match &alt.node {
                    Stmt::If { .. } => {
                        out.push(' ');
                        let chained = format_stmt(&alt.node, indent);
                        out.push_str(chained.trim_start().trim_end_matches('\n'));
                    }
                    other => emit_body(out, other, indent),
                }
            }
        }
        Stmt::For {
            init,
            test,
            update,
            body,
        } => {
            out.push_str("for (");
            match init {
                Some(ForInit::VarDecl { kind, decls }) => {
                    out.push_str(&format_var_decl(*kind, decls, indent, true));
                }
                Some(ForInit::Expr(e)) => {
                    let text = format_expr_at(&e.node, 0, indent);
                    if text.contains(" in ") {
                        out.push_str(&format!("({})", text));
                    } else {
                        out.push_str(&text);
                    }
                }
                None => {}
            }
            out.push(';');
            if let Some(test) = test {
                out.push(' ');
                out.push_str(&format_expr_at(&test.node, 0, indent));
            }
            out.push(';');
            if let Some(update) = update {
                out.push(' ');
                out.push_str(&format_expr_at(&update.node, 0, indent));
            }
            out.push(')');
            emit_body(out, &body.node, indent);
        }
        Stmt::ForOf { left, right, body } => {
            out.push_str(&format!(
                "for ({} of {})",
                for_head(left, indent),
                format_expr_at(&right.node, 1, indent)
            ));
            emit_body(out, &body.node, indent);
        }
        Stmt::ForIn { left, right, body } => {
            out.push_str(&format!(
                "for ({} in {})",
                for_head(left, indent),
                format_expr_at(&right.node, 0, indent)
            ));
            emit_body(out, &body.node, indent);
        }
        Stmt::While { test, body } => {
            out.push_str("while (");
            out.push_str(&format_expr_at(&test.node, 0, indent));
            out.push(')');
            emit_body(out, &body.node, indent);
        }
        Stmt::DoWhile { body, test } => {
            out.push_str("do");
            emit_body(out, &body.node, indent);
            if matches!(body.node, Stmt::Block(_)) {
                out.push(' ');
            } else {
                out.push('\n');
                out.push_str(&pad);
            }
            out.push_str("while (");
            out.push_str(&format_expr_at(&test.node, 0, indent));
            out.push_str(");");
        }
        Stmt::Switch {
            discriminant,
            cases,
        } => {
            out.push_str("switch (");
            out.push_str(&format_expr_at(&discriminant.node, 0, indent));
            out.push_str(") {\n");
            let case_pad = indent_str(indent + 1);
            for case in cases {
                out.push_str(&case_pad);
                match &case.test {
                    Some(test) => {
                        out.push_str("case ");
                        out.push_str(&format_expr_at(&test.node, 0, indent + 1));
                        out.push_str(":\n");
                    }
                    None => out.push_str("default:\n"),
                }
                for stmt in &case.body {
                    emit_stmt(out, &stmt.node, indent + 2);
                }
            }
            out.push_str(&pad);
            out.push('}');
        }
        Stmt::Labeled { label, body } => {
            out.push_str(&label.node);
            out.push_str(": ");
            let inner = format_stmt(&body.node, indent);
            out.push_str(inner.trim_start().trim_end_matches('\n'));
        }
        Stmt::Break(label) => match label {
            Some(label) => out.push_str(&format!("break {};", label.node)),
            None => out.push_str("break;"),
        },
        Stmt::Continue(label) => match label {
            Some(label) => out.push_str(&format!("continue {};", label.node)),
            None => out.push_str("continue;"),
        },
        Stmt::Return(value) => match value {
            Some(value) => {
                out.push_str("return ");
                out.push_str(&format_expr_at(&value.node, 0, indent));
                out.push(';');
            }
            None => out.push_str("return;"),
        },
        Stmt::Throw(value) => {
            out.push_str("throw ");
            out.push_str(&format_expr_at(&value.node, 0, indent));
            out.push(';');
        }
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            out.push_str("try ");
            out.push_str(&format_block(block, indent));
            if let Some(handler) = handler {
                out.push_str(" catch ");
                if let Some(param) = &handler.param {
                    out.push('(');
                    out.push_str(&format_pattern(&param.node, indent));
                    out.push_str(") ");
                }
                out.push_str(&format_block(&handler.body, indent));
            }
            if let Some(finalizer) = finalizer {
                out.push_str(" finally ");
                out.push_str(&format_block(finalizer, indent));
            }
        }
        Stmt::With { object, body } => {
            out.push_str("with (");
            out.push_str(&format_expr_at(&object.node, 0, indent));
            out.push(')');
            emit_body(out, &body.node, indent);
        }
        Stmt::Debugger => out.push_str("debugger;"),
        Stmt::Empty => out.push(';'),
    }
    out.push('\n');
}
