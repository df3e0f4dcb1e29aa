use crate::ast::*;
use crate::syntax::span::Spanned;

use super::stmts::format_block;
use super::{number_to_string, quote_string};

// Printing precedence levels (higher binds tighter).
const PREC_SEQUENCE: u8 = 0;
const PREC_ASSIGN: u8 = 1;
const PREC_CONDITIONAL: u8 = 2;
const PREC_UNARY: u8 = 15;
const PREC_POSTFIX: u8 = 16;
const PREC_CALL: u8 = 17;
const PREC_PRIMARY: u8 = 18;

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Sequence(_) => PREC_SEQUENCE,
        Expr::Assign { .. } | Expr::Yield(_) => PREC_ASSIGN,
        Expr::Function(f) if f.is_arrow => PREC_ASSIGN,
        Expr::Conditional { .. } => PREC_CONDITIONAL,
        Expr::Logical { op, .. } => op.precedence(),
        Expr::Binary { op, .. } => op.precedence(),
        Expr::Unary { .. } | Expr::Await(_) => PREC_UNARY,
        Expr::Update { prefix: true, .. } => PREC_UNARY,
        Expr::Update { prefix: false, .. } => PREC_POSTFIX,
        Expr::Number(n) if *n < 0.0 || (*n == 0.0 && n.is_sign_negative()) => PREC_UNARY,
        Expr::Call { .. }
        | Expr::New { .. }
        | Expr::Member { .. }
        | Expr::Chain(_)
        | Expr::TaggedTemplate { .. } => PREC_CALL,
        _ => PREC_PRIMARY,
    }
}

/// Format an expression at the top level of a statement.
pub(crate) fn format_expr(expr: &Expr) -> String {
    format_expr_at(expr, PREC_SEQUENCE, 0)
}

/// Format an expression; nested function bodies are indented to `indent`.
pub(super) fn format_expr_at(expr: &Expr, min_prec: u8, indent: usize) -> String {
    let text = format_expr_inner(expr, indent);
    if precedence(expr) < min_prec {
        format!("({})", text)
    } else {
        text
    }
}

fn format_expr_inner(expr: &Expr, indent: usize) -> String {
    match expr {
        Expr::Number(n) => number_to_string(*n),
        Expr::Str(s) => quote_string(s),
        Expr::Bool(b) => b.to_string(),
        Expr::Null => "null".to_string(),
        Expr::Ident(name) => name.clone(),
        Expr::This => "this".to_string(),
        Expr::Template { quasis, exprs } => format_template(quasis, exprs, indent),
        Expr::TaggedTemplate { tag, quasis, exprs } => {
            format!(
                "{}{}",
                format_callee(&tag.node, indent),
                format_template(quasis, exprs, indent)
            )
        }
        Expr::Array(elements) => {
            let mut parts: Vec<String> = elements
                .iter()
                .map(|e| match e {
                    ArrayElement::Hole => String::new(),
                    ArrayElement::Expr(e) => format_expr_at(&e.node, PREC_ASSIGN, indent),
                    ArrayElement::Spread(e) => {
                        format!("...{}", format_expr_at(&e.node, PREC_ASSIGN, indent))
                    }
                })
                .collect();
            // A trailing hole needs its own comma.
            if matches!(elements.last(), Some(ArrayElement::Hole)) {
                parts.push(String::new());
            }
            format!("[{}]", parts.join(", "))
        }
        Expr::Object(members) => format_object(members, indent),
        Expr::Function(f) => format_function_expr(f, indent),
        Expr::Unary { op, arg } => {
            let arg_text = format_expr_at(&arg.node, PREC_UNARY, indent);
            match op {
                UnaryOp::Typeof | UnaryOp::Void | UnaryOp::Delete => {
                    format!("{} {}", op.as_str(), arg_text)
                }
                _ => {
                    let sym = op.as_str();
                    // `- -x` and `+ ++x` must not fuse into `--x` / `+++x`.
                    if (sym == "-" || sym == "+") && arg_text.starts_with(sym) {
                        format!("{} {}", sym, arg_text)
                    } else {
                        format!("{}{}", sym, arg_text)
                    }
                }
            }
        }
        Expr::Update { op, prefix, arg } => {
            let arg_text = format_expr_at(&arg.node, PREC_POSTFIX, indent);
            if *prefix {
                format!("{}{}", op.as_str(), arg_text)
            } else {
                format!("{}{}", arg_text, op.as_str())
            }
        }
        Expr::Binary { op, left, right } => {
            let prec = op.precedence();
            let (left_min, right_min) = if *op == BinOp::Exp {
                // Unary operands of `**` need parentheses.
                (PREC_POSTFIX, prec)
            } else {
                (prec, prec + 1)
            };
            format!(
                "{} {} {}",
                format_expr_at(&left.node, left_min, indent),
                op.as_str(),
                format_expr_at(&right.node, right_min, indent)
            )
        }
        Expr::Logical { op, left, right } => {
            let prec = op.precedence();
            format!(
                "{} {} {}",
                format_logical_operand(*op, &left.node, prec, indent),
                op.as_str(),
                format_logical_operand(*op, &right.node, prec + 1, indent)
            )
        }
        Expr::Assign { op, target, value } => format!(
            "{} {} {}",
            format_pattern(&target.node, indent),
            op.as_str(),
            format_expr_at(&value.node, PREC_ASSIGN, indent)
        ),
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => format!(
            "{} ? {} : {}",
            format_expr_at(&test.node, PREC_CONDITIONAL + 1, indent),
            format_expr_at(&consequent.node, PREC_ASSIGN, indent),
            format_expr_at(&alternate.node, PREC_ASSIGN, indent)
        ),
        Expr::Call {
            callee,
            args,
            optional,
        } => format!(
            "{}{}({})",
            format_callee(&callee.node, indent),
            if *optional { "?." } else { "" },
            format_arguments(args, indent)
        ),
        Expr::New { callee, args } => {
            let callee_text = if contains_call(&callee.node) {
                format!("({})", format_expr_inner(&callee.node, indent))
            } else {
                format_callee(&callee.node, indent)
            };
            format!("new {}({})", callee_text, format_arguments(args, indent))
        }
        Expr::Member {
            object,
            property,
            optional,
        } => {
            let object_text = match &object.node {
                // `1.toString()` would lex as a malformed number.
                Expr::Number(n) => {
                    let text = number_to_string(*n);
                    if text.bytes().all(|b| b.is_ascii_digit()) {
                        format!("({})", text)
                    } else {
                        format_expr_at(&object.node, PREC_CALL, indent)
                    }
                }
                other => format_callee(other, indent),
            };
            match property {
                MemberProp::Ident(name) => {
                    let dot = if *optional { "?." } else { "." };
                    format!("{}{}{}", object_text, dot, name)
                }
                MemberProp::Computed(prop) => {
                    let open = if *optional { "?.[" } else { "[" };
                    format!(
                        "{}{}{}]",
                        object_text,
                        open,
                        format_expr_at(&prop.node, PREC_SEQUENCE, indent)
                    )
                }
            }
        }
        Expr::Chain(inner) => format_expr_inner(&inner.node, indent),
        Expr::Sequence(items) => items
            .iter()
            .map(|e| format_expr_at(&e.node, PREC_ASSIGN, indent))
            .collect::<Vec<_>>()
            .join(", "),
        Expr::Await(arg) => format!("await {}", format_expr_at(&arg.node, PREC_UNARY, indent)),
        Expr::Yield(arg) => match arg {
            Some(arg) => format!("yield {}", format_expr_at(&arg.node, PREC_ASSIGN, indent)),
            None => "yield".to_string(),
        },
    }
}

/// Callee or member object. A completed optional chain keeps its
/// parentheses, and so does an immediately invoked function expression.
fn format_callee(expr: &Expr, indent: usize) -> String {
    let needs_parens = match expr {
        Expr::Chain(_) => true,
        Expr::Function(f) => !f.is_arrow,
        _ => false,
    };
    if needs_parens {
        return format!("({})", format_expr_inner(expr, indent));
    }
    format_expr_at(expr, PREC_CALL, indent)
}

/// `??` cannot be mixed with `&&`/`||` without parentheses.
fn format_logical_operand(parent: LogicalOp, operand: &Expr, min_prec: u8, indent: usize) -> String {
    if let Expr::Logical { op, .. } = operand {
        let mixed = (parent == LogicalOp::Nullish) != (*op == LogicalOp::Nullish);
        if mixed {
            return format!("({})", format_expr_inner(operand, indent));
        }
    }
    format_expr_at(operand, min_prec, indent)
}

/// Whether a `new` callee contains a call, which would otherwise bind to `new`.
fn contains_call(expr: &Expr) -> bool {
    match expr {
        Expr::Call { .. } => true,
        Expr::Member { object, .. } => contains_call(&object.node),
        Expr::TaggedTemplate { tag, .. } => contains_call(&tag.node),
        Expr::Chain(inner) => contains_call(&inner.node),
        _ => false,
    }
}

fn format_arguments(args: &[Argument], indent: usize) -> String {
    args.iter()
        .map(|a| match a {
            Argument::Expr(e) => format_expr_at(&e.node, PREC_ASSIGN, indent),
            Argument::Spread(e) => format!("...{}", format_expr_at(&e.node, PREC_ASSIGN, indent)),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_template(quasis: &[TemplateQuasi], exprs: &[Spanned<Expr>], indent: usize) -> String {
    let mut out = String::from("`");
    for (i, quasi) in quasis.iter().enumerate() {
        out.push_str(&quasi.raw);
        if let Some(e) = exprs.get(i) {
            out.push_str("${");
            out.push_str(&format_expr_at(&e.node, PREC_SEQUENCE, indent));
            out.push('}');
        }
    }
    out.push('`');
    out
}

fn format_prop_key(key: &PropKey, indent: usize) -> String {
    match key {
        PropKey::Ident(name) => name.clone(),
        PropKey::Str(s) => quote_string(s),
        PropKey::Number(n) => number_to_string(*n),
        PropKey::Computed(e) => format!("[{}]", format_expr_at(&e.node, PREC_ASSIGN, indent)),
    }
}

fn format_object(members: &[ObjectMember], indent: usize) -> String {
    if members.is_empty() {
        return "{}".to_string();
    }
    let parts: Vec<String> = members
        .iter()
        .map(|m| match m {
            ObjectMember::Spread(e) => {
                format!("...{}", format_expr_at(&e.node, PREC_ASSIGN, indent))
            }
            ObjectMember::Property {
                key,
                value,
                shorthand,
                method,
            } => {
                if *method {
                    if let Expr::Function(f) = &value.node {
                        return format!(
                            "{}({}) {}",
                            format_prop_key(key, indent),
                            format_params(&f.params, indent),
                            format_function_body(f, indent)
                        );
                    }
                }
                let is_plain_shorthand = *shorthand
                    && matches!((key, &value.node), (PropKey::Ident(k), Expr::Ident(v)) if k == v);
                if is_plain_shorthand {
                    format_prop_key(key, indent)
                } else {
                    format!(
                        "{}: {}",
                        format_prop_key(key, indent),
                        format_expr_at(&value.node, PREC_ASSIGN, indent)
                    )
                }
            }
        })
        .collect();
    format!("{{ {} }}", parts.join(", "))
}

// ─── Functions ─────────────────────────────────────────────────────

pub(super) fn format_params(params: &[Spanned<Pattern>], indent: usize) -> String {
    params
        .iter()
        .map(|p| format_pattern(&p.node, indent))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Block body (or concise body for arrows).
fn format_function_body(f: &Function, indent: usize) -> String {
    match &f.body {
        FunctionBody::Block(stmts) => format_block(stmts, indent),
        FunctionBody::Expr(e) => {
            let text = format_expr_at(&e.node, PREC_ASSIGN, indent);
            if text.starts_with('{') {
                format!("({})", text)
            } else {
                text
            }
        }
    }
}

/// `function name(a, b) { … }` without any leading `export`.
pub(super) fn format_function_decl(f: &Function, indent: usize) -> String {
    let mut out = String::new();
    if f.is_async {
        out.push_str("async ");
    }
    out.push_str("function");
    if f.is_generator {
        out.push('*');
    }
    match f.name_str() {
        Some(name) => {
            out.push(' ');
            out.push_str(name);
        }
        None => out.push(' '),
    }
    out.push('(');
    out.push_str(&format_params(&f.params, indent));
    out.push_str(") ");
    out.push_str(&format_function_body(f, indent));
    out
}

fn format_function_expr(f: &Function, indent: usize) -> String {
    if !f.is_arrow {
        return format_function_decl(f, indent);
    }
    format!(
        "{}({}) => {}",
        if f.is_async { "async " } else { "" },
        format_params(&f.params, indent),
        format_function_body(f, indent)
    )
}

// ─── Patterns ──────────────────────────────────────────────────────

pub(super) fn format_pattern(pattern: &Pattern, indent: usize) -> String {
    match pattern {
        Pattern::Ident(name) => name.clone(),
        Pattern::Object { props, rest } => {
            let mut parts: Vec<String> = props
                .iter()
                .map(|p| {
                    let is_plain_shorthand = p.shorthand
                        && match (&p.key, &p.value.node) {
                            (PropKey::Ident(k), Pattern::Ident(v)) => k == v,
                            (PropKey::Ident(k), Pattern::Default { target, .. }) => {
                                matches!(&target.node, Pattern::Ident(v) if v == k)
                            }
                            _ => false,
                        };
                    if is_plain_shorthand {
                        format_pattern(&p.value.node, indent)
                    } else {
                        format!(
                            "{}: {}",
                            format_prop_key(&p.key, indent),
                            format_pattern(&p.value.node, indent)
                        )
                    }
                })
                .collect();
            if let Some(rest) = rest {
                parts.push(format!("...{}", format_pattern(&rest.node, indent)));
            }
            if parts.is_empty() {
                "{}".to_string()
            } else {
                format!("{{ {} }}", parts.join(", "))
            }
        }
        Pattern::Array { elements, rest } => {
            let mut parts: Vec<String> = elements
                .iter()
                .map(|e| match e {
                    Some(p) => format_pattern(&p.node, indent),
                    None => String::new(),
                })
                .collect();
            if let Some(rest) = rest {
                parts.push(format!("...{}", format_pattern(&rest.node, indent)));
            } else if matches!(elements.last(), Some(None)) {
                parts.push(String::new());
            }
            format!("[{}]", parts.join(", "))
        }
        Pattern::Default { target, default } => format!(
            "{} = {}",
            format_pattern(&target.node, indent),
            format_expr_at(&default.node, PREC_ASSIGN, indent)
        ),
        Pattern::Rest(inner) => format!("...{}", format_pattern(&inner.node, indent)),
        Pattern::Member(expr) => format_expr_at(&expr.node, PREC_CALL, indent),
    }
}
