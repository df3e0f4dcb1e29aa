//! Textual dump of a reactive function for `memoc inspect --stage scopes`.

use std::fmt::Write;

use super::*;
use crate::hir::print::{identifier_name, place_name, print_instruction, print_label, print_pattern};

pub fn print_reactive_function(func: &ReactiveFunction, env: &Environment) -> String {
    let mut out = String::new();
    let params: Vec<String> = func
        .params
        .iter()
        .map(|p| {
            let name = place_name(env, &p.place);
            if p.rest {
                format!("...{}", name)
            } else {
                name
            }
        })
        .collect();
    let _ = writeln!(
        out,
        "function {}({}) cache {}",
        func.name.as_deref().unwrap_or("<anonymous>"),
        params.join(", "),
        func.cache_size
    );
    print_block(&mut out, &func.body, env, 1);
    out
}

/// `props$1.user?.name`
pub fn print_dependency(dep: &Dependency, env: &Environment) -> String {
    let mut out = identifier_name(env, dep.root);
    for entry in &dep.path {
        out.push_str(if entry.optional { "?." } else { "." });
        out.push_str(&entry.property);
    }
    out
}

fn print_block(out: &mut String, block: &[ReactiveStatement], env: &Environment, depth: usize) {
    for stmt in block {
        match stmt {
            ReactiveStatement::Instructions(instrs) => {
                for instr in instrs {
                    print_instruction(out, instr, env, depth);
                }
            }
            ReactiveStatement::Terminal(term) => print_terminal(out, term, env, depth),
            ReactiveStatement::Scope(scope) => print_scope(out, scope, env, depth),
        }
    }
}

fn print_scope(out: &mut String, block: &ScopeBlock, env: &Environment, depth: usize) {
    let pad = "  ".repeat(depth);
    let scope = &block.scope;
    let names = |ids: &[IdentifierId]| {
        ids.iter()
            .map(|id| identifier_name(env, *id))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let deps: Vec<String> = scope
        .dependencies
        .iter()
        .map(|d| print_dependency(d, env))
        .collect();
    let _ = write!(
        out,
        "{}scope @{} [{}, {}) slots {}..{} deps [{}] decls [{}]",
        pad,
        scope.id,
        scope.start.0,
        scope.end.0,
        scope.first_slot,
        scope.first_slot + scope.slot_count(),
        deps.join(", "),
        names(&scope.declarations)
    );
    if !scope.reassignments.is_empty() {
        let _ = write!(out, " reassigns [{}]", names(&scope.reassignments));
    }
    if scope.early_return {
        out.push_str(" early-return");
    }
    out.push_str(" {\n");
    print_block(out, &block.body, env, depth + 1);
    let _ = writeln!(out, "{}}}", pad);
}

fn print_terminal(out: &mut String, term: &TerminalStatement, env: &Environment, depth: usize) {
    let pad = "  ".repeat(depth);
    let p = |place: &Place| place_name(env, place);
    let label = |label: &Option<LabelName>| match label {
        Some(l) => format!("{}: ", print_label(l)),
        None => String::new(),
    };
    let head = |out: &mut String, text: String| {
        let _ = writeln!(out, "{}{} {}", pad, term.id, text);
    };
    let close = |out: &mut String| {
        let _ = writeln!(out, "{}}}", pad);
    };
    use ReactiveTerminal as T;
    match &term.terminal {
        T::Break { label } => match label {
            Some(l) => head(out, format!("break {}", print_label(l))),
            None => head(out, "break".to_string()),
        },
        T::Continue { label } => match label {
            Some(l) => head(out, format!("continue {}", print_label(l))),
            None => head(out, "continue".to_string()),
        },
        T::Return { value, kind } => head(out, format!("return {} ({:?})", p(value), kind)),
        T::Throw { value } => head(out, format!("throw {}", p(value))),
        T::If {
            test,
            consequent,
            alternate,
        } => {
            head(out, format!("if {} {{", p(test)));
            print_block(out, consequent, env, depth + 1);
            if let Some(alternate) = alternate {
                let _ = writeln!(out, "{}}} else {{", pad);
                print_block(out, alternate, env, depth + 1);
            }
            close(out);
        }
        T::Switch {
            discriminant,
            cases,
        } => {
            head(out, format!("switch {} {{", p(discriminant)));
            for case in cases {
                match &case.test {
                    Some(test) => {
                        let _ = writeln!(out, "{}  case {}:", pad, p(test));
                    }
                    None => {
                        let _ = writeln!(out, "{}  default:", pad);
                    }
                }
                print_block(out, &case.body, env, depth + 2);
            }
            close(out);
        }
        T::While { label: l, test, body } => {
            head(out, format!("{}while {{", label(l)));
            print_expression(out, "test", test, env, depth + 1);
            print_block(out, body, env, depth + 1);
            close(out);
        }
        T::DoWhile { label: l, body, test } => {
            head(out, format!("{}do {{", label(l)));
            print_block(out, body, env, depth + 1);
            print_expression(out, "test", test, env, depth + 1);
            close(out);
        }
        T::For {
            label: l,
            init,
            test,
            update,
            body,
        } => {
            head(out, format!("{}for {{", label(l)));
            let _ = writeln!(out, "{}  init {{", pad);
            print_block(out, init, env, depth + 2);
            let _ = writeln!(out, "{}  }}", pad);
            if let Some(test) = test {
                print_expression(out, "test", test, env, depth + 1);
            }
            if let Some(update) = update {
                print_expression(out, "update", update, env, depth + 1);
            }
            print_block(out, body, env, depth + 1);
            close(out);
        }
        T::ForOf {
            label: l,
            collection,
            binding,
            body,
        }
        | T::ForIn {
            label: l,
            collection,
            binding,
            body,
        } => {
            let keyword = if matches!(term.terminal, T::ForOf { .. }) {
                "of"
            } else {
                "in"
            };
            head(
                out,
                format!(
                    "{}for {:?} {} {} {} {{",
                    label(l),
                    binding.kind,
                    print_pattern(&binding.target, env),
                    keyword,
                    p(collection)
                ),
            );
            print_block(out, body, env, depth + 1);
            close(out);
        }
        T::Label { label: l, block } => {
            head(out, format!("{}: {{", print_label(l)));
            print_block(out, block, env, depth + 1);
            close(out);
        }
        T::Try {
            block,
            handler,
            finalizer,
        } => {
            head(out, "try {".to_string());
            print_block(out, block, env, depth + 1);
            if let Some(handler) = handler {
                match &handler.param {
                    Some(param) => {
                        let _ = writeln!(out, "{}}} catch {} {{", pad, p(param));
                    }
                    None => {
                        let _ = writeln!(out, "{}}} catch {{", pad);
                    }
                }
                print_block(out, &handler.body, env, depth + 1);
            }
            if let Some(finalizer) = finalizer {
                let _ = writeln!(out, "{}}} finally {{", pad);
                print_block(out, finalizer, env, depth + 1);
            }
            close(out);
        }
    }
}

fn print_expression(
    out: &mut String,
    name: &str,
    expr: &ExpressionBlock,
    env: &Environment,
    depth: usize,
) {
    let pad = "  ".repeat(depth);
    let _ = writeln!(out, "{}{} {{", pad, name);
    for instr in &expr.instructions {
        print_instruction(out, instr, env, depth + 1);
    }
    let _ = writeln!(out, "{}}} -> {}", pad, place_name(env, &expr.value));
}
