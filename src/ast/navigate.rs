//! AST navigation: find compilation candidates and collect names in use.

use std::collections::{BTreeMap, BTreeSet};

use super::*;
use crate::hash::ContentHash;

/// How a top-level function is introduced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionForm {
    /// `function Name() {}` (possibly exported).
    Declaration,
    /// `const Name = function () {}` or `const Name = () => …`.
    Binding,
}

/// A top-level function the compiler may transform.
#[derive(Clone, Debug)]
pub struct FunctionSite<'a> {
    pub name: String,
    pub function: &'a Function,
    pub form: FunctionForm,
    /// Index into `Program::items`.
    pub item_index: usize,
}

/// Top-level function declarations and `const` function bindings, in
/// source order.
pub fn top_level_functions(program: &Program) -> Vec<FunctionSite<'_>> {
    let mut sites = Vec::new();
    for (item_index, item) in program.items.iter().enumerate() {
        let Item::Stmt { export, stmt } = &item.node else {
            continue;
        };
        match &stmt.node {
            Stmt::FunctionDecl(function) => {
                let name = match (function.name_str(), export) {
                    (Some(name), _) => name.to_string(),
                    (None, Export::Default) => "default".to_string(),
                    (None, _) => continue,
                };
                sites.push(FunctionSite {
                    name,
                    function,
                    form: FunctionForm::Declaration,
                    item_index,
                });
            }
            Stmt::VarDecl {
                kind: DeclKind::Const,
                decls,
            } if decls.len() == 1 => {
                let decl = &decls[0];
                let (Pattern::Ident(name), Some(init)) = (&decl.target.node, &decl.init) else {
                    continue;
                };
                if let Expr::Function(function) = &init.node {
                    sites.push(FunctionSite {
                        name: name.clone(),
                        function,
                        form: FunctionForm::Binding,
                        item_index,
                    });
                }
            }
            _ => {}
        }
    }
    sites
}

/// Find a top-level function by name.
pub fn find_function<'a>(program: &'a Program, name: &str) -> Option<&'a Function> {
    top_level_functions(program)
        .into_iter()
        .find(|site| site.name == name)
        .map(|site| site.function)
}

/// Find a function by fingerprint prefix.
///
/// Returns `Some((name, func))` if exactly one function matches the
/// given hex prefix. Returns `None` if no match or ambiguous.
pub fn find_function_by_hash<'a>(
    program: &'a Program,
    fn_hashes: &BTreeMap<String, ContentHash>,
    prefix: &str,
) -> Option<(String, &'a Function)> {
    let prefix_lower = prefix.to_lowercase();
    let mut matches: Vec<(String, &Function)> = top_level_functions(program)
        .into_iter()
        .filter(|site| {
            fn_hashes.get(&site.name).is_some_and(|hash| {
                hash.to_hex().starts_with(&prefix_lower) || hash.to_short().starts_with(&prefix_lower)
            })
        })
        .map(|site| (site.name, site.function))
        .collect();

    if matches.len() == 1 {
        matches.pop()
    } else {
        None
    }
}

/// Check if a string looks like a hex hash prefix (all hex digits).
pub fn looks_like_hash(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

// ─── Name collection ───────────────────────────────────────────────

/// Every identifier, binding and label spelled anywhere in the program.
/// Generated names are chosen outside this set.
pub fn collect_names(program: &Program) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for item in &program.items {
        match &item.node {
            Item::Import(import) => {
                if let Some(default) = &import.default {
                    names.insert(default.node.clone());
                }
                for spec in &import.specifiers {
                    names.insert(spec.local.node.clone());
                }
            }
            Item::Stmt { stmt, .. } => stmt_names(&stmt.node, &mut names),
        }
    }
    names
}

/// Names spelled inside one function (parameters, body, nested functions).
pub fn function_names(function: &Function, names: &mut BTreeSet<String>) {
    if let Some(name) = &function.name {
        names.insert(name.node.clone());
    }
    for param in &function.params {
        pattern_names(&param.node, names);
    }
    match &function.body {
        FunctionBody::Block(stmts) => {
            for stmt in stmts {
                stmt_names(&stmt.node, names);
            }
        }
        FunctionBody::Expr(expr) => expr_names(&expr.node, names),
    }
}

fn stmt_names(stmt: &Stmt, names: &mut BTreeSet<String>) {
    match stmt {
        Stmt::VarDecl { decls, .. } => decls_names(decls, names),
        Stmt::FunctionDecl(f) => function_names(f, names),
        Stmt::Expr(e) | Stmt::Throw(e) => expr_names(&e.node, names),
        Stmt::Block(stmts) => stmts.iter().for_each(|s| stmt_names(&s.node, names)),
        Stmt::If {
            test,
            consequent,
            alternate,
        } => {
            expr_names(&test.node, names);
            stmt_names(&consequent.node, names);
            if let Some(alt) = alternate {
                stmt_names(&alt.node, names);
            }
        }
        Stmt::For {
            init,
            test,
            update,
            body,
        } => {
            match init {
                Some(ForInit::VarDecl { decls, .. }) => decls_names(decls, names),
                Some(ForInit::Expr(e)) => expr_names(&e.node, names),
                None => {}
            }
            for e in [test, update].into_iter().flatten() {
                expr_names(&e.node, names);
            }
            stmt_names(&body.node, names);
        }
        Stmt::ForOf { left, right, body } | Stmt::ForIn { left, right, body } => {
            match left {
                ForHead::Decl { target, .. } | ForHead::Target(target) => {
                    pattern_names(&target.node, names)
                }
            }
            expr_names(&right.node, names);
            stmt_names(&body.node, names);
        }
        Stmt::While { test, body } | Stmt::DoWhile { body, test } => {
            expr_names(&test.node, names);
            stmt_names(&body.node, names);
        }
        Stmt::Switch {
            discriminant,
            cases,
        } => {
            expr_names(&discriminant.node, names);
            for case in cases {
                if let Some(test) = &case.test {
                    expr_names(&test.node, names);
                }
                case.body.iter().for_each(|s| stmt_names(&s.node, names));
            }
        }
        Stmt::Labeled { label, body } => {
            names.insert(label.node.clone());
            stmt_names(&body.node, names);
        }
        Stmt::Break(label) | Stmt::Continue(label) => {
            if let Some(label) = label {
                names.insert(label.node.clone());
            }
        }
        Stmt::Return(value) => {
            if let Some(value) = value {
                expr_names(&value.node, names);
            }
        }
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            block.iter().for_each(|s| stmt_names(&s.node, names));
            if let Some(handler) = handler {
                if let Some(param) = &handler.param {
                    pattern_names(&param.node, names);
                }
                handler.body.iter().for_each(|s| stmt_names(&s.node, names));
            }
            if let Some(finalizer) = finalizer {
                finalizer.iter().for_each(|s| stmt_names(&s.node, names));
            }
        }
        Stmt::With { object, body } => {
            expr_names(&object.node, names);
            stmt_names(&body.node, names);
        }
        Stmt::Debugger | Stmt::Empty => {}
    }
}

fn decls_names(decls: &[Declarator], names: &mut BTreeSet<String>) {
    for decl in decls {
        pattern_names(&decl.target.node, names);
        if let Some(init) = &decl.init {
            expr_names(&init.node, names);
        }
    }
}

fn pattern_names(pattern: &Pattern, names: &mut BTreeSet<String>) {
    match pattern {
        Pattern::Ident(name) => {
            names.insert(name.clone());
        }
        Pattern::Object { props, rest } => {
            for prop in props {
                if let PropKey::Computed(key) = &prop.key {
                    expr_names(&key.node, names);
                }
                pattern_names(&prop.value.node, names);
            }
            if let Some(rest) = rest {
                pattern_names(&rest.node, names);
            }
        }
        Pattern::Array { elements, rest } => {
            for element in elements.iter().flatten() {
                pattern_names(&element.node, names);
            }
            if let Some(rest) = rest {
                pattern_names(&rest.node, names);
            }
        }
        Pattern::Default { target, default } => {
            pattern_names(&target.node, names);
            expr_names(&default.node, names);
        }
        Pattern::Rest(inner) => pattern_names(&inner.node, names),
        Pattern::Member(expr) => expr_names(&expr.node, names),
    }
}

fn expr_names(expr: &Expr, names: &mut BTreeSet<String>) {
    match expr {
        Expr::Number(_) | Expr::Str(_) | Expr::Bool(_) | Expr::Null | Expr::This => {}
        Expr::Ident(name) => {
            names.insert(name.clone());
        }
        Expr::Template { exprs, .. } => exprs.iter().for_each(|e| expr_names(&e.node, names)),
        Expr::TaggedTemplate { tag, exprs, .. } => {
            expr_names(&tag.node, names);
            exprs.iter().for_each(|e| expr_names(&e.node, names));
        }
        Expr::Array(elements) => {
            for element in elements {
                match element {
                    ArrayElement::Hole => {}
                    ArrayElement::Expr(e) | ArrayElement::Spread(e) => expr_names(&e.node, names),
                }
            }
        }
        Expr::Object(members) => {
            for member in members {
                match member {
                    ObjectMember::Property { key, value, .. } => {
                        if let PropKey::Computed(key) = key {
                            expr_names(&key.node, names);
                        }
                        expr_names(&value.node, names);
                    }
                    ObjectMember::Spread(e) => expr_names(&e.node, names),
                }
            }
        }
        Expr::Function(f) => function_names(f, names),
        Expr::Unary { arg, .. } | Expr::Update { arg, .. } | Expr::Await(arg) => {
            expr_names(&arg.node, names)
        }
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            expr_names(&left.node, names);
            expr_names(&right.node, names);
        }
        Expr::Assign { target, value, .. } => {
            pattern_names(&target.node, names);
            expr_names(&value.node, names);
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            expr_names(&test.node, names);
            expr_names(&consequent.node, names);
            expr_names(&alternate.node, names);
        }
        Expr::Call { callee, args, .. } | Expr::New { callee, args } => {
            expr_names(&callee.node, names);
            for arg in args {
                match arg {
                    Argument::Expr(e) | Argument::Spread(e) => expr_names(&e.node, names),
                }
            }
        }
        Expr::Member {
            object, property, ..
        } => {
            expr_names(&object.node, names);
            if let MemberProp::Computed(prop) = property {
                expr_names(&prop.node, names);
            }
        }
        Expr::Chain(inner) => expr_names(&inner.node, names),
        Expr::Sequence(items) => items.iter().for_each(|e| expr_names(&e.node, names)),
        Expr::Yield(arg) => {
            if let Some(arg) = arg {
                expr_names(&arg.node, names);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        crate::parse_source_silent(source, "test.js").unwrap()
    }

    #[test]
    fn test_top_level_functions() {
        let program = parse(
            "import { h } from \"m\";\n\
             function A() {}\n\
             export const B = () => 1;\n\
             export default function () {}\n\
             const notFn = 1;\n\
             let C = () => 2;",
        );
        let sites = top_level_functions(&program);
        let names: Vec<&str> = sites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "default"]);
        assert_eq!(sites[0].form, FunctionForm::Declaration);
        assert_eq!(sites[1].form, FunctionForm::Binding);
        assert_eq!(sites[1].item_index, 2);
    }

    #[test]
    fn test_find_function_by_name() {
        let program = parse("function main() {}\nconst helper = function (x) { return x; };");
        assert!(find_function(&program, "main").is_some());
        assert_eq!(
            find_function(&program, "helper").map(|f| f.params.len()),
            Some(1)
        );
        assert!(find_function(&program, "nonexistent").is_none());
    }

    #[test]
    fn test_find_function_by_hash_prefix() {
        let program = parse("function main() {}\nfunction helper() {}");
        let mut hashes = BTreeMap::new();
        hashes.insert("main".to_string(), ContentHash::of(b"main"));
        hashes.insert("helper".to_string(), ContentHash::of(b"helper"));
        let prefix = hashes["main"].to_hex()[..8].to_string();
        let (name, _) = find_function_by_hash(&program, &hashes, &prefix).unwrap();
        assert_eq!(name, "main");
    }

    #[test]
    fn test_collect_names_covers_all_positions() {
        let program = parse(
            "import D, { a as b } from \"m\";\n\
             function F({ p, q: [r = s] }, ...t) {\n\
               outer: for (const u of v) { break outer; }\n\
               const w = (x) => x.y[z];\n\
               try {} catch (e) {}\n\
             }",
        );
        let names = collect_names(&program);
        for expected in [
            "D", "b", "F", "p", "r", "s", "t", "outer", "u", "v", "w", "x", "z", "e",
        ] {
            assert!(names.contains(expected), "missing {}", expected);
        }
        // Static property names are not bindings.
        assert!(!names.contains("y"));
        assert!(!names.contains("q"));
    }

    #[test]
    fn test_looks_like_hash() {
        assert!(looks_like_hash("a1b2c3d4"));
        assert!(looks_like_hash("ABCDEF"));
        assert!(!looks_like_hash("main"));
        assert!(!looks_like_hash(""));
    }
}
