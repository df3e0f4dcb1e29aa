use crate::ast::*;

use super::stmts::format_stmt;
use super::{quote_string, FormatCtx};

impl FormatCtx {
    pub(super) fn emit_program(&mut self, program: &Program) {
        let mut prev_was_import = false;
        for (i, item) in program.items.iter().enumerate() {
            let is_import = matches!(item.node, Item::Import(_));
            // Imports stay grouped; everything else is separated by a blank line.
            if i > 0 && !(is_import && prev_was_import) {
                self.output.push('\n');
            }
            self.emit_leading_comments(item.span.start);
            match &item.node {
                Item::Import(import) => self.emit_import(import),
                Item::Stmt { export, stmt } => {
                    let prefix = match export {
                        Export::None => "",
                        Export::Named => "export ",
                        Export::Default => "export default ",
                    };
                    self.output.push_str(prefix);
                    let text = match (export, &stmt.node) {
                        // `export default <expr>;` must not be wrapped as a statement.
                        (Export::Default, Stmt::Expr(e)) => {
                            format!("{};\n", super::format_expr(&e.node))
                        }
                        _ => format_stmt(&stmt.node, 0),
                    };
                    self.output.push_str(&text);
                }
            }
            prev_was_import = is_import;
        }
    }

    fn emit_import(&mut self, import: &ImportDecl) {
        self.output.push_str("import ");
        let mut clauses = Vec::new();
        if let Some(default) = &import.default {
            clauses.push(default.node.clone());
        }
        if !import.specifiers.is_empty() {
            let specs: Vec<String> = import
                .specifiers
                .iter()
                .map(|s| {
                    if s.imported == s.local.node {
                        s.imported.clone()
                    } else {
                        format!("{} as {}", s.imported, s.local.node)
                    }
                })
                .collect();
            clauses.push(format!("{{ {} }}", specs.join(", ")));
        }
        if !clauses.is_empty() {
            self.output.push_str(&clauses.join(", "));
            self.output.push_str(" from ");
        }
        self.output.push_str(&quote_string(&import.source));
        self.output.push_str(";\n");
    }
}
