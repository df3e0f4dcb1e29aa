//! Textual HIR dump for `memoc inspect --stage hir` and tests.

use std::fmt::Write;

use super::*;
use crate::syntax::format::{number_to_string, quote_string};

/// `name$id` for bindings, `$id` for temporaries.
pub fn place_name(env: &Environment, place: &Place) -> String {
    identifier_name(env, place.identifier)
}

pub fn identifier_name(env: &Environment, id: IdentifierId) -> String {
    match env.name_of(id) {
        Some(name) => format!("{}${}", name, id.0),
        None => format!("${}", id.0),
    }
}

pub fn print_function(func: &HirFunction, env: &Environment) -> String {
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
        "function {}({})",
        func.name.as_deref().unwrap_or("<anonymous>"),
        params.join(", ")
    );
    for directive in &func.directives {
        let _ = writeln!(out, "  directive {}", quote_string(directive));
    }
    for id in func.reverse_postorder() {
        let block = func.block(id);
        let _ = writeln!(out, "{}:", block.id);
        for instr in &block.instructions {
            print_instruction(&mut out, instr, env, 1);
        }
        let _ = writeln!(
            out,
            "  {} {}",
            block.terminal.id,
            print_terminal(&block.terminal.kind, env)
        );
    }
    out
}

pub(crate) fn print_instruction(out: &mut String, instr: &Instruction, env: &Environment, depth: usize) {
    let pad = "  ".repeat(depth);
    let _ = writeln!(
        out,
        "{}{} {} = {}",
        pad,
        instr.id,
        place_name(env, &instr.lvalue),
        print_value(&instr.value, env)
    );
    for (i, block) in instr.value.value_blocks().into_iter().enumerate() {
        let _ = writeln!(out, "{}  block {} {{", pad, i);
        for inner in &block.instructions {
            print_instruction(out, inner, env, depth + 2);
        }
        let _ = writeln!(out, "{}  }} -> {}", pad, place_name(env, &block.result));
    }
}

fn print_value(value: &InstructionValue, env: &Environment) -> String {
    let p = |place: &Place| place_name(env, place);
    let args = |args: &[CallArg]| {
        args.iter()
            .map(|a| match a {
                CallArg::Place(x) => p(x),
                CallArg::Spread(x) => format!("...{}", p(x)),
            })
            .collect::<Vec<_>>()
            .join(", ")
    };
    let key = |key: &PropertyKey| match key {
        PropertyKey::Named(name) => name.clone(),
        PropertyKey::Computed(x) => format!("[{}]", p(x)),
    };
    use InstructionValue as V;
    match value {
        V::Primitive(prim) => format!("Primitive {}", print_primitive(prim)),
        V::LoadLocal(x) => format!("LoadLocal {}", p(x)),
        V::LoadGlobal(name) => format!("LoadGlobal {}", name),
        V::LoadThis => "LoadThis".to_string(),
        V::StoreLocal {
            kind,
            target,
            value,
        } => format!("StoreLocal {:?} {} = {}", kind, p(target), p(value)),
        V::StoreGlobal { name, value } => format!("StoreGlobal {} = {}", name, p(value)),
        V::DeclareLocal { kind, target } => format!("DeclareLocal {:?} {}", kind, p(target)),
        V::Destructure {
            kind,
            pattern,
            value,
        } => format!(
            "Destructure {:?} {} = {}",
            kind,
            print_pattern(pattern, env),
            p(value)
        ),
        V::BinaryOp { op, left, right } => {
            format!("BinaryOp {} {} {}", p(left), op.as_str(), p(right))
        }
        V::UnaryOp { op, operand } => format!("UnaryOp {} {}", op.as_str(), p(operand)),
        V::Update { op, prefix, target } => {
            if *prefix {
                format!("Update {}{}", op.as_str(), p(target))
            } else {
                format!("Update {}{}", p(target), op.as_str())
            }
        }
        V::PropertyLoad { object, property } => format!("PropertyLoad {}.{}", p(object), property),
        V::ComputedLoad { object, property } => {
            format!("ComputedLoad {}[{}]", p(object), p(property))
        }
        V::PropertyStore {
            object,
            property,
            value,
        } => format!("PropertyStore {}.{} = {}", p(object), property, p(value)),
        V::ComputedStore {
            object,
            property,
            value,
        } => format!("ComputedStore {}[{}] = {}", p(object), p(property), p(value)),
        V::PropertyDelete { object, property } => {
            format!("PropertyDelete {}.{}", p(object), property)
        }
        V::ComputedDelete { object, property } => {
            format!("ComputedDelete {}[{}]", p(object), p(property))
        }
        V::Call { callee, args: a } => format!("Call {}({})", p(callee), args(a)),
        V::MethodCall {
            receiver,
            property,
            args: a,
        } => format!("MethodCall {}.{}({})", p(receiver), key(property), args(a)),
        V::New { callee, args: a } => format!("New {}({})", p(callee), args(a)),
        V::ArrayExpression(items) => {
            let items: Vec<String> = items
                .iter()
                .map(|item| match item {
                    ArrayItem::Hole => String::new(),
                    ArrayItem::Place(x) => p(x),
                    ArrayItem::Spread(x) => format!("...{}", p(x)),
                })
                .collect();
            format!("Array [{}]", items.join(", "))
        }
        V::ObjectExpression(props) => {
            let props: Vec<String> = props
                .iter()
                .map(|prop| match prop {
                    ObjectProperty::Property {
                        key: k,
                        value,
                        method,
                    } => {
                        let marker = if *method { " (method)" } else { "" };
                        format!("{}: {}{}", key(k), p(value), marker)
                    }
                    ObjectProperty::Spread(x) => format!("...{}", p(x)),
                })
                .collect();
            format!("Object {{{}}}", props.join(", "))
        }
        V::TemplateLiteral { exprs, .. } => {
            let exprs: Vec<String> = exprs.iter().map(p).collect();
            format!("Template ({})", exprs.join(", "))
        }
        V::TaggedTemplate { tag, exprs, .. } => {
            let exprs: Vec<String> = exprs.iter().map(p).collect();
            format!("TaggedTemplate {} ({})", p(tag), exprs.join(", "))
        }
        V::FunctionExpression { lowered, context } => {
            let context: Vec<String> = context.iter().map(p).collect();
            format!(
                "Function {} context [{}]",
                lowered.func.name.as_deref().unwrap_or("<anonymous>"),
                context.join(", ")
            )
        }
        V::Await(x) => format!("Await {}", p(x)),
        V::Logical { op, left, .. } => format!("Logical {} {} block 0", p(left), op.as_str()),
        V::Ternary { test, .. } => format!("Ternary {} ? block 0 : block 1", p(test)),
        V::Optional { object, .. } => format!("Optional {}?. block 0", p(object)),
    }
}

pub fn print_primitive(prim: &Primitive) -> String {
    match prim {
        Primitive::Undefined => "undefined".to_string(),
        Primitive::Null => "null".to_string(),
        Primitive::Bool(b) => b.to_string(),
        Primitive::Number(n) => number_to_string(*n),
        Primitive::String(s) => quote_string(s),
    }
}

pub fn print_pattern(pattern: &HirPattern, env: &Environment) -> String {
    match pattern {
        HirPattern::Place(place) => place_name(env, place),
        HirPattern::Object { props, rest } => {
            let mut parts: Vec<String> = props
                .iter()
                .map(|(key, value)| {
                    let key = match key {
                        PropertyKey::Named(name) => name.clone(),
                        PropertyKey::Computed(x) => format!("[{}]", place_name(env, x)),
                    };
                    format!("{}: {}", key, print_pattern(value, env))
                })
                .collect();
            if let Some(rest) = rest {
                parts.push(format!("...{}", place_name(env, rest)));
            }
            format!("{{ {} }}", parts.join(", "))
        }
        HirPattern::Array { items, rest } => {
            let mut parts: Vec<String> = items
                .iter()
                .map(|item| match item {
                    Some(item) => print_pattern(item, env),
                    None => String::new(),
                })
                .collect();
            if let Some(rest) = rest {
                parts.push(format!("...{}", place_name(env, rest)));
            }
            format!("[{}]", parts.join(", "))
        }
    }
}

pub(crate) fn print_label(label: &LabelName) -> String {
    match label {
        LabelName::User(name) => name.clone(),
        LabelName::Generated(n) => format!("<generated {}>", n),
    }
}

pub fn print_terminal(kind: &TerminalKind, env: &Environment) -> String {
    let p = |place: &Place| place_name(env, place);
    let opt = |block: &Option<BlockId>| match block {
        Some(b) => b.to_string(),
        None => "-".to_string(),
    };
    use TerminalKind as T;
    match kind {
        T::Goto { block, kind } => match kind {
            GotoKind::Fallthrough => format!("Goto {}", block),
            GotoKind::Break { label } => match label {
                Some(l) => format!("Break {} ({})", block, print_label(l)),
                None => format!("Break {}", block),
            },
            GotoKind::Continue { label } => match label {
                Some(l) => format!("Continue {} ({})", block, print_label(l)),
                None => format!("Continue {}", block),
            },
        },
        T::If {
            test,
            consequent,
            alternate,
            fallthrough,
        } => format!(
            "If {} then {} else {} fallthrough {}",
            p(test),
            consequent,
            opt(alternate),
            fallthrough
        ),
        T::Branch {
            test,
            consequent,
            alternate,
        } => format!("Branch {} then {} else {}", p(test), consequent, alternate),
        T::Switch {
            discriminant,
            cases,
            fallthrough,
        } => {
            let cases: Vec<String> = cases
                .iter()
                .map(|c| match &c.test {
                    Some(t) => format!("{}: {}", p(t), c.block),
                    None => format!("default: {}", c.block),
                })
                .collect();
            format!(
                "Switch {} [{}] fallthrough {}",
                p(discriminant),
                cases.join(", "),
                fallthrough
            )
        }
        T::While {
            test,
            body,
            fallthrough,
        } => format!("While test {} body {} fallthrough {}", test, body, fallthrough),
        T::DoWhile {
            body,
            test,
            fallthrough,
        } => format!("DoWhile body {} test {} fallthrough {}", body, test, fallthrough),
        T::For {
            init,
            test,
            update,
            body,
            fallthrough,
        } => format!(
            "For init {} test {} update {} body {} fallthrough {}",
            init,
            opt(test),
            opt(update),
            body,
            fallthrough
        ),
        T::ForOf {
            collection,
            binding,
            body,
            fallthrough,
        } => format!(
            "ForOf {:?} {} of {} body {} fallthrough {}",
            binding.kind,
            print_pattern(&binding.target, env),
            p(collection),
            body,
            fallthrough
        ),
        T::ForIn {
            collection,
            binding,
            body,
            fallthrough,
        } => format!(
            "ForIn {:?} {} in {} body {} fallthrough {}",
            binding.kind,
            print_pattern(&binding.target, env),
            p(collection),
            body,
            fallthrough
        ),
        T::Label {
            label,
            block,
            fallthrough,
        } => format!(
            "Label {} {} fallthrough {}",
            print_label(label),
            block,
            fallthrough
        ),
        T::Try {
            block,
            handler,
            finalizer,
            fallthrough,
        } => {
            let handler = match handler {
                Some(h) => match &h.param {
                    Some(param) => format!("catch({}) {}", p(param), h.block),
                    None => format!("catch {}", h.block),
                },
                None => "-".to_string(),
            };
            format!(
                "Try {} {} finally {} fallthrough {}",
                block,
                handler,
                opt(finalizer),
                fallthrough
            )
        }
        T::Return { value, kind } => format!("Return {:?} {}", kind, p(value)),
        T::Throw { value } => format!("Throw {}", p(value)),
        T::Unreachable => "Unreachable".to_string(),
    }
}
