//! Statement and expression evaluation.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::ast::{
    self, Argument, ArrayElement, AssignOp, BinOp, DeclKind, Expr, ForHead, ForInit, LogicalOp,
    MemberProp, ObjectMember, Pattern, PropKey, Stmt, UnaryOp, UpdateOp,
};
use crate::span::Spanned;

use super::builtins;
use super::scope::{AssignError, Scope};
use super::value::{Callable, ObjectData, Value};
use super::{Interpreter, RuntimeError};

type Eval<T> = Result<T, RuntimeError>;

/// How a statement finished.
pub(super) enum Completion {
    Normal,
    Return(Value),
    Break(Option<String>),
    Continue(Option<String>),
}

/// What a loop does after one iteration of its body.
enum Flow {
    Next,
    Exit,
    Propagate(Completion),
}

fn flow(completion: Completion, labels: &[String]) -> Flow {
    match completion {
        Completion::Normal | Completion::Continue(None) => Flow::Next,
        Completion::Continue(Some(label)) if labels.contains(&label) => Flow::Next,
        Completion::Break(None) => Flow::Exit,
        Completion::Break(Some(label)) if labels.contains(&label) => Flow::Exit,
        other => Flow::Propagate(other),
    }
}

#[derive(Clone, Copy)]
enum BindMode {
    Declare(DeclKind),
    Assign,
}

/// A readable and writable location.
enum Place {
    Name(String),
    Property(Value, String),
}

impl Interpreter {
    /// Bind arguments and run a closure body in `scope`.
    pub(super) fn invoke(
        &mut self,
        func: &ast::Function,
        scope: &Scope,
        args: Vec<Value>,
    ) -> Eval<Value> {
        let mut args = args.into_iter();
        for param in &func.params {
            match &param.node {
                Pattern::Rest(inner) => {
                    let rest: Vec<Value> = args.by_ref().collect();
                    self.bind(&inner.node, Value::array(rest), scope, BindMode::Declare(DeclKind::Let))?;
                }
                pattern => {
                    let value = args.next().unwrap_or(Value::Undefined);
                    self.bind(pattern, value, scope, BindMode::Declare(DeclKind::Let))?;
                }
            }
        }
        match &func.body {
            ast::FunctionBody::Block(stmts) => match self.exec_stmts(stmts, scope)? {
                Completion::Return(value) => Ok(value),
                _ => Ok(Value::Undefined),
            },
            ast::FunctionBody::Expr(expr) => self.eval(expr, scope),
        }
    }

    // ─── Statements ────────────────────────────────────────────────

    /// Run a statement list. Function declarations are visible from the
    /// start of the list.
    pub(super) fn exec_stmts(&mut self, stmts: &[Spanned<Stmt>], scope: &Scope) -> Eval<Completion> {
        for stmt in stmts {
            if let Stmt::FunctionDecl(func) = &stmt.node {
                if let Some(name) = func.name_str() {
                    let value = Value::closure(Rc::new(func.clone()), scope.clone());
                    scope.define(name, value, true);
                }
            }
        }
        for stmt in stmts {
            let completion = self.exec(&stmt.node, scope, &[])?;
            if !matches!(completion, Completion::Normal) {
                return Ok(completion);
            }
        }
        Ok(Completion::Normal)
    }

    /// `labels` are the labels directly attached to `stmt`.
    fn exec(&mut self, stmt: &Stmt, scope: &Scope, labels: &[String]) -> Eval<Completion> {
        match stmt {
            Stmt::VarDecl { kind, decls } => {
                self.declare(*kind, decls, scope)?;
                Ok(Completion::Normal)
            }
            Stmt::FunctionDecl(_) | Stmt::Debugger | Stmt::Empty => Ok(Completion::Normal),
            Stmt::Expr(expr) => {
                self.eval(expr, scope)?;
                Ok(Completion::Normal)
            }
            Stmt::Block(stmts) => self.exec_stmts(stmts, &scope.child()),
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.is_truthy() {
                    self.exec(&consequent.node, scope, &[])
                } else if let Some(alternate) = alternate {
                    self.exec(&alternate.node, scope, &[])
                } else {
                    Ok(Completion::Normal)
                }
            }
            Stmt::While { test, body } => {
                while self.eval(test, scope)?.is_truthy() {
                    match flow(self.exec(&body.node, scope, &[])?, labels) {
                        Flow::Next => {}
                        Flow::Exit => break,
                        Flow::Propagate(completion) => return Ok(completion),
                    }
                }
                Ok(Completion::Normal)
            }
            Stmt::DoWhile { body, test } => {
                loop {
                    match flow(self.exec(&body.node, scope, &[])?, labels) {
                        Flow::Next => {}
                        Flow::Exit => break,
                        Flow::Propagate(completion) => return Ok(completion),
                    }
                    if !self.eval(test, scope)?.is_truthy() {
                        break;
                    }
                }
                Ok(Completion::Normal)
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => self.exec_for(init.as_ref(), test.as_ref(), update.as_ref(), body, scope, labels),
            Stmt::ForOf { left, right, body } => {
                let collection = self.eval(right, scope)?;
                // Arrays are read live so pushes during iteration are visited.
                let snapshot = match &collection {
                    Value::Array(_) => None,
                    other => Some(self.iterate(other)?),
                };
                let mut index = 0;
                loop {
                    let item = match (&collection, &snapshot) {
                        (_, Some(items)) => items.get(index).cloned(),
                        (Value::Array(array), None) => array.items.borrow().get(index).cloned(),
                        _ => None,
                    };
                    let Some(item) = item else { break };
                    index += 1;
                    let iteration = scope.child();
                    self.bind_head(left, item, &iteration)?;
                    match flow(self.exec(&body.node, &iteration, &[])?, labels) {
                        Flow::Next => {}
                        Flow::Exit => break,
                        Flow::Propagate(completion) => return Ok(completion),
                    }
                }
                Ok(Completion::Normal)
            }
            Stmt::ForIn { left, right, body } => {
                let object = self.eval(right, scope)?;
                for key in builtins::own_keys(&object) {
                    let iteration = scope.child();
                    self.bind_head(left, Value::string(key), &iteration)?;
                    match flow(self.exec(&body.node, &iteration, &[])?, labels) {
                        Flow::Next => {}
                        Flow::Exit => break,
                        Flow::Propagate(completion) => return Ok(completion),
                    }
                }
                Ok(Completion::Normal)
            }
            Stmt::Switch {
                discriminant,
                cases,
            } => {
                let value = self.eval(discriminant, scope)?;
                let inner = scope.child();
                let mut start = None;
                for (index, case) in cases.iter().enumerate() {
                    if let Some(test) = &case.test {
                        if self.eval(test, &inner)?.strict_equals(&value) {
                            start = Some(index);
                            break;
                        }
                    }
                }
                let start = start.or_else(|| cases.iter().position(|case| case.test.is_none()));
                if let Some(start) = start {
                    for case in &cases[start..] {
                        match self.exec_stmts(&case.body, &inner)? {
                            Completion::Normal => {}
                            Completion::Break(None) => break,
                            other => return Ok(other),
                        }
                    }
                }
                Ok(Completion::Normal)
            }
            Stmt::Labeled { label, body } => {
                let mut inner = labels.to_vec();
                inner.push(label.node.clone());
                match self.exec(&body.node, scope, &inner)? {
                    Completion::Break(Some(target)) if target == label.node => Ok(Completion::Normal),
                    other => Ok(other),
                }
            }
            Stmt::Break(label) => Ok(Completion::Break(label.as_ref().map(|l| l.node.clone()))),
            Stmt::Continue(label) => {
                Ok(Completion::Continue(label.as_ref().map(|l| l.node.clone())))
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, scope)?,
                    None => Value::Undefined,
                };
                Ok(Completion::Return(value))
            }
            Stmt::Throw(expr) => Err(RuntimeError::Thrown(self.eval(expr, scope)?)),
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                let result = self.exec_stmts(block, &scope.child());
                let result = match (result, handler) {
                    (Err(RuntimeError::Thrown(error)), Some(handler)) => {
                        let catch_scope = scope.child();
                        match &handler.param {
                            Some(param) => self
                                .bind(&param.node, error, &catch_scope, BindMode::Declare(DeclKind::Let))
                                .and_then(|()| self.exec_stmts(&handler.body, &catch_scope)),
                            None => self.exec_stmts(&handler.body, &catch_scope),
                        }
                    }
                    (result, _) => result,
                };
                if let Some(finalizer) = finalizer {
                    let completion = self.exec_stmts(finalizer, &scope.child())?;
                    if !matches!(completion, Completion::Normal) {
                        return Ok(completion);
                    }
                }
                result
            }
            Stmt::With { .. } => Err(RuntimeError::Unsupported("with statement".to_string())),
        }
    }

    fn exec_for(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&Spanned<Expr>>,
        update: Option<&Spanned<Expr>>,
        body: &Spanned<Stmt>,
        scope: &Scope,
        labels: &[String],
    ) -> Eval<Completion> {
        let loop_scope = scope.child();
        let per_iteration = match init {
            Some(ForInit::VarDecl { kind, decls }) => {
                self.declare(*kind, decls, &loop_scope)?;
                *kind != DeclKind::Var
            }
            Some(ForInit::Expr(expr)) => {
                self.eval(expr, &loop_scope)?;
                false
            }
            None => false,
        };
        // Closures created in the body capture the bindings of their own
        // iteration.
        let mut iteration = if per_iteration {
            loop_scope.copy_frame()
        } else {
            loop_scope
        };
        loop {
            if let Some(test) = test {
                if !self.eval(test, &iteration)?.is_truthy() {
                    break;
                }
            }
            match flow(self.exec(&body.node, &iteration, &[])?, labels) {
                Flow::Next => {}
                Flow::Exit => break,
                Flow::Propagate(completion) => return Ok(completion),
            }
            if per_iteration {
                iteration = iteration.copy_frame();
            }
            if let Some(update) = update {
                self.eval(update, &iteration)?;
            }
        }
        Ok(Completion::Normal)
    }

    fn bind_head(&mut self, head: &ForHead, value: Value, scope: &Scope) -> Eval<()> {
        match head {
            ForHead::Decl { kind, target } => {
                self.bind(&target.node, value, scope, BindMode::Declare(*kind))
            }
            ForHead::Target(target) => self.bind(&target.node, value, scope, BindMode::Assign),
        }
    }

    fn declare(&mut self, kind: DeclKind, decls: &[ast::Declarator], scope: &Scope) -> Eval<()> {
        for decl in decls {
            let value = match &decl.init {
                Some(init) => self.eval(init, scope)?,
                // `var x;` keeps an earlier value.
                None if kind == DeclKind::Var => match &decl.target.node {
                    Pattern::Ident(name) if scope.lookup(name).is_some() => continue,
                    _ => Value::Undefined,
                },
                None => Value::Undefined,
            };
            self.bind(&decl.target.node, value, scope, BindMode::Declare(kind))?;
        }
        Ok(())
    }

    fn bind(&mut self, pattern: &Pattern, value: Value, scope: &Scope, mode: BindMode) -> Eval<()> {
        match pattern {
            Pattern::Ident(name) => match mode {
                BindMode::Declare(DeclKind::Var) => {
                    scope.define_var(name, value);
                    Ok(())
                }
                BindMode::Declare(kind) => {
                    scope.define(name, value, kind != DeclKind::Const);
                    Ok(())
                }
                BindMode::Assign => self.assign_name(name, value, scope),
            },
            Pattern::Default { target, default } => {
                let value = match value {
                    Value::Undefined => self.eval(default, scope)?,
                    value => value,
                };
                self.bind(&target.node, value, scope, mode)
            }
            Pattern::Rest(inner) => self.bind(&inner.node, value, scope, mode),
            Pattern::Member(expr) => {
                let place = self.place(&expr.node, scope)?;
                self.write_place(&place, value, scope)
            }
            Pattern::Object { props, rest } => {
                if value.is_nullish() {
                    return Err(self.type_error(format!(
                        "Cannot destructure '{}' as it is {}.",
                        value.to_js_string(),
                        value.to_js_string()
                    )));
                }
                let mut used = Vec::new();
                for prop in props {
                    let key = self.prop_key(&prop.key, scope)?;
                    let item = self.get_property(&value, &key)?;
                    used.push(key);
                    self.bind(&prop.value.node, item, scope, mode)?;
                }
                if let Some(rest) = rest {
                    let remaining = builtins::own_entries(&value)
                        .into_iter()
                        .filter(|(key, _)| !used.contains(key))
                        .collect();
                    self.bind(&rest.node, Value::object(remaining), scope, mode)?;
                }
                Ok(())
            }
            Pattern::Array { elements, rest } => {
                let mut items = self.iterate(&value)?.into_iter();
                for element in elements {
                    let item = items.next().unwrap_or(Value::Undefined);
                    if let Some(element) = element {
                        self.bind(&element.node, item, scope, mode)?;
                    }
                }
                if let Some(rest) = rest {
                    self.bind(&rest.node, Value::array(items.collect()), scope, mode)?;
                }
                Ok(())
            }
        }
    }

    fn assign_name(&mut self, name: &str, value: Value, scope: &Scope) -> Eval<()> {
        match scope.assign(name, value.clone()) {
            Ok(()) => Ok(()),
            Err(AssignError::Constant) => Err(self.type_error("Assignment to constant variable.")),
            Err(AssignError::Undeclared) => {
                self.globals.define(name, value, true);
                Ok(())
            }
        }
    }

    // ─── Expressions ───────────────────────────────────────────────

    pub(super) fn eval(&mut self, expr: &Spanned<Expr>, scope: &Scope) -> Eval<Value> {
        self.eval_expr(&expr.node, scope)
    }

    fn eval_expr(&mut self, expr: &Expr, scope: &Scope) -> Eval<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(text) => Ok(Value::string(text.as_str())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Ident(name) => self.lookup(name, scope),
            Expr::This => Ok(scope.lookup("this").unwrap_or(Value::Undefined)),
            Expr::Template { quasis, exprs } => {
                let mut out = String::new();
                for (index, quasi) in quasis.iter().enumerate() {
                    out.push_str(&quasi.cooked);
                    if let Some(expr) = exprs.get(index) {
                        out.push_str(&self.eval(expr, scope)?.to_js_string());
                    }
                }
                Ok(Value::string(out))
            }
            Expr::TaggedTemplate { tag, quasis, exprs } => {
                let (function, this) = self
                    .chain_callee(&tag.node, scope)?
                    .unwrap_or((Value::Undefined, Value::Undefined));
                let strings = quasis
                    .iter()
                    .map(|quasi| Value::string(quasi.cooked.as_str()))
                    .collect();
                let mut args = vec![Value::array(strings)];
                for expr in exprs {
                    args.push(self.eval(expr, scope)?);
                }
                self.call_function(&function, this, args)
            }
            Expr::Array(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    match element {
                        ArrayElement::Hole => items.push(Value::Undefined),
                        ArrayElement::Expr(expr) => items.push(self.eval(expr, scope)?),
                        ArrayElement::Spread(expr) => {
                            let value = self.eval(expr, scope)?;
                            items.extend(self.iterate(&value)?);
                        }
                    }
                }
                Ok(Value::array(items))
            }
            Expr::Object(members) => {
                let object = Rc::new(ObjectData::default());
                for member in members {
                    match member {
                        ObjectMember::Property { key, value, .. } => {
                            let key = self.prop_key(key, scope)?;
                            let value = self.eval(value, scope)?;
                            object.set(&key, value);
                        }
                        ObjectMember::Spread(expr) => {
                            let value = self.eval(expr, scope)?;
                            for (key, item) in builtins::own_entries(&value) {
                                object.set(&key, item);
                            }
                        }
                    }
                }
                Ok(Value::Object(object))
            }
            Expr::Function(func) => Ok(self.function_value(func, scope)),
            Expr::Unary { op, arg } => self.unary(*op, arg, scope),
            Expr::Update { op, prefix, arg } => {
                let place = self.place(&arg.node, scope)?;
                let old = self.read_place(&place, scope)?.to_number();
                let new = match op {
                    UpdateOp::Increment => old + 1.0,
                    UpdateOp::Decrement => old - 1.0,
                };
                self.write_place(&place, Value::Number(new), scope)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                self.binary(*op, &left, &right)
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left, scope)?;
                let short = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if short {
                    Ok(left)
                } else {
                    self.eval(right, scope)
                }
            }
            Expr::Assign { op, target, value } => self.assign(*op, &target.node, value, scope),
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.is_truthy() {
                    self.eval(consequent, scope)
                } else {
                    self.eval(alternate, scope)
                }
            }
            Expr::Call { .. } | Expr::Member { .. } => {
                Ok(self.chain_value(expr, scope)?.unwrap_or(Value::Undefined))
            }
            Expr::Chain(inner) => Ok(self.chain_value(&inner.node, scope)?.unwrap_or(Value::Undefined)),
            Expr::New { callee, args } => {
                let constructor = self.eval(callee, scope)?;
                let args = self.arguments(args, scope)?;
                self.construct(&constructor, args)
            }
            Expr::Sequence(exprs) => {
                let mut last = Value::Undefined;
                for expr in exprs {
                    last = self.eval(expr, scope)?;
                }
                Ok(last)
            }
            // Calls complete synchronously, so awaiting yields the value.
            Expr::Await(arg) => self.eval(arg, scope),
            Expr::Yield(_) => Err(RuntimeError::Unsupported("yield".to_string())),
        }
    }

    fn lookup(&self, name: &str, scope: &Scope) -> Eval<Value> {
        match scope.lookup(name) {
            Some(value) => Ok(value),
            None if name == "undefined" => Ok(Value::Undefined),
            None => Err(self.reference_error(format!("{} is not defined", name))),
        }
    }

    fn function_value(&mut self, func: &ast::Function, scope: &Scope) -> Value {
        match (func.is_arrow, func.name_str()) {
            // A named function expression sees its own name.
            (false, Some(name)) => {
                let inner = scope.child();
                let value = Value::closure(Rc::new(func.clone()), inner.clone());
                inner.define(name, value.clone(), false);
                value
            }
            _ => Value::closure(Rc::new(func.clone()), scope.clone()),
        }
    }

    /// Evaluate a member or call link of an optional chain. `None` means
    /// the chain short-circuited.
    fn chain_value(&mut self, expr: &Expr, scope: &Scope) -> Eval<Option<Value>> {
        match expr {
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let Some(target) = self.chain_value(&object.node, scope)? else {
                    return Ok(None);
                };
                if *optional && target.is_nullish() {
                    return Ok(None);
                }
                let key = self.member_key(property, scope)?;
                self.get_property(&target, &key).map(Some)
            }
            Expr::Call {
                callee,
                args,
                optional,
            } => {
                let Some((function, this)) = self.chain_callee(&callee.node, scope)? else {
                    return Ok(None);
                };
                if *optional && function.is_nullish() {
                    return Ok(None);
                }
                let args = self.arguments(args, scope)?;
                self.call_function(&function, this, args).map(Some)
            }
            other => self.eval_expr(other, scope).map(Some),
        }
    }

    /// A callee with the receiver it is called on.
    fn chain_callee(&mut self, expr: &Expr, scope: &Scope) -> Eval<Option<(Value, Value)>> {
        match expr {
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let Some(target) = self.chain_value(&object.node, scope)? else {
                    return Ok(None);
                };
                if *optional && target.is_nullish() {
                    return Ok(None);
                }
                let key = self.member_key(property, scope)?;
                let function = self.get_property(&target, &key)?;
                Ok(Some((function, target)))
            }
            other => Ok(self
                .chain_value(other, scope)?
                .map(|function| (function, Value::Undefined))),
        }
    }

    fn arguments(&mut self, args: &[Argument], scope: &Scope) -> Eval<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Argument::Expr(expr) => values.push(self.eval(expr, scope)?),
                Argument::Spread(expr) => {
                    let value = self.eval(expr, scope)?;
                    values.extend(self.iterate(&value)?);
                }
            }
        }
        Ok(values)
    }

    fn construct(&mut self, constructor: &Value, args: Vec<Value>) -> Eval<Value> {
        match constructor {
            Value::Function(data) => match &data.callable {
                Callable::Closure { func, .. } if func.is_arrow => Err(self.type_error(format!(
                    "{} is not a constructor",
                    data.name()
                ))),
                Callable::Closure { .. } => {
                    let instance = Value::object(Vec::new());
                    let result = self.call_function(constructor, instance.clone(), args)?;
                    Ok(match result {
                        Value::Object(_) | Value::Array(_) | Value::Function(_) => result,
                        _ => instance,
                    })
                }
                Callable::Native { .. } => self.call_function(constructor, Value::Undefined, args),
            },
            other => Err(self.type_error(format!("{} is not a constructor", other.to_js_string()))),
        }
    }

    fn member_key(&mut self, property: &MemberProp, scope: &Scope) -> Eval<String> {
        match property {
            MemberProp::Ident(name) => Ok(name.clone()),
            MemberProp::Computed(expr) => Ok(self.eval(expr, scope)?.to_key()),
        }
    }

    fn prop_key(&mut self, key: &PropKey, scope: &Scope) -> Eval<String> {
        match key {
            PropKey::Computed(expr) => Ok(self.eval(expr, scope)?.to_key()),
            key => Ok(key.static_name().unwrap_or_default()),
        }
    }

    fn unary(&mut self, op: UnaryOp, arg: &Spanned<Expr>, scope: &Scope) -> Eval<Value> {
        match op {
            UnaryOp::Typeof => {
                if let Expr::Ident(name) = &arg.node {
                    if scope.lookup(name).is_none() {
                        return Ok(Value::from("undefined"));
                    }
                }
                Ok(Value::from(self.eval(arg, scope)?.type_of()))
            }
            UnaryOp::Delete => {
                let Expr::Member {
                    object, property, ..
                } = &arg.node
                else {
                    return Ok(Value::Bool(true));
                };
                let target = self.eval(object, scope)?;
                let key = self.member_key(property, scope)?;
                self.delete_property(&target, &key).map(Value::Bool)
            }
            UnaryOp::Neg => Ok(Value::Number(-self.eval(arg, scope)?.to_number())),
            UnaryOp::Plus => Ok(Value::Number(self.eval(arg, scope)?.to_number())),
            UnaryOp::Not => Ok(Value::Bool(!self.eval(arg, scope)?.is_truthy())),
            UnaryOp::BitNot => Ok(Value::Number(f64::from(!to_int32(
                self.eval(arg, scope)?.to_number(),
            )))),
            UnaryOp::Void => {
                self.eval(arg, scope)?;
                Ok(Value::Undefined)
            }
        }
    }

    fn assign(
        &mut self,
        op: AssignOp,
        target: &Pattern,
        value: &Spanned<Expr>,
        scope: &Scope,
    ) -> Eval<Value> {
        match op {
            AssignOp::Assign => match target {
                Pattern::Ident(name) => {
                    let value = self.eval(value, scope)?;
                    self.assign_name(name, value.clone(), scope)?;
                    Ok(value)
                }
                Pattern::Member(expr) => {
                    let place = self.place(&expr.node, scope)?;
                    let value = self.eval(value, scope)?;
                    self.write_place(&place, value.clone(), scope)?;
                    Ok(value)
                }
                pattern => {
                    let value = self.eval(value, scope)?;
                    self.bind(pattern, value.clone(), scope, BindMode::Assign)?;
                    Ok(value)
                }
            },
            AssignOp::Compound(bin) => {
                let place = self.pattern_place(target, scope)?;
                let current = self.read_place(&place, scope)?;
                let right = self.eval(value, scope)?;
                let result = self.binary(bin, &current, &right)?;
                self.write_place(&place, result.clone(), scope)?;
                Ok(result)
            }
            AssignOp::Logical(logical) => {
                let place = self.pattern_place(target, scope)?;
                let current = self.read_place(&place, scope)?;
                let write = match logical {
                    LogicalOp::And => current.is_truthy(),
                    LogicalOp::Or => !current.is_truthy(),
                    LogicalOp::Nullish => current.is_nullish(),
                };
                if !write {
                    return Ok(current);
                }
                let value = self.eval(value, scope)?;
                self.write_place(&place, value.clone(), scope)?;
                Ok(value)
            }
        }
    }

    fn place(&mut self, expr: &Expr, scope: &Scope) -> Eval<Place> {
        match expr {
            Expr::Ident(name) => Ok(Place::Name(name.clone())),
            Expr::Member {
                object, property, ..
            } => {
                let target = self.eval(object, scope)?;
                let key = self.member_key(property, scope)?;
                Ok(Place::Property(target, key))
            }
            _ => Err(RuntimeError::Unsupported("invalid assignment target".to_string())),
        }
    }

    fn pattern_place(&mut self, pattern: &Pattern, scope: &Scope) -> Eval<Place> {
        match pattern {
            Pattern::Ident(name) => Ok(Place::Name(name.clone())),
            Pattern::Member(expr) => self.place(&expr.node, scope),
            _ => Err(RuntimeError::Unsupported("invalid assignment target".to_string())),
        }
    }

    fn read_place(&mut self, place: &Place, scope: &Scope) -> Eval<Value> {
        match place {
            Place::Name(name) => self.lookup(name, scope),
            Place::Property(target, key) => self.get_property(target, key),
        }
    }

    fn write_place(&mut self, place: &Place, value: Value, scope: &Scope) -> Eval<()> {
        match place {
            Place::Name(name) => self.assign_name(name, value, scope),
            Place::Property(target, key) => self.set_property(target, key, value),
        }
    }

    // ─── Operators ─────────────────────────────────────────────────

    pub(super) fn binary(&mut self, op: BinOp, left: &Value, right: &Value) -> Eval<Value> {
        let number = |f: fn(f64, f64) -> f64| Value::Number(f(left.to_number(), right.to_number()));
        let int = |f: fn(i32, i32) -> i32| {
            Value::Number(f64::from(f(
                to_int32(left.to_number()),
                to_int32(right.to_number()),
            )))
        };
        let shift = (to_int32(right.to_number()) as u32) & 31;
        Ok(match op {
            BinOp::Add => add(left, right),
            BinOp::Sub => number(|a, b| a - b),
            BinOp::Mul => number(|a, b| a * b),
            BinOp::Div => number(|a, b| a / b),
            BinOp::Rem => number(|a, b| a % b),
            BinOp::Exp => number(f64::powf),
            BinOp::Eq => Value::Bool(left.loose_equals(right)),
            BinOp::NotEq => Value::Bool(!left.loose_equals(right)),
            BinOp::StrictEq => Value::Bool(left.strict_equals(right)),
            BinOp::StrictNotEq => Value::Bool(!left.strict_equals(right)),
            BinOp::Lt => Value::Bool(compare(left, right) == Some(Ordering::Less)),
            BinOp::LtEq => Value::Bool(matches!(
                compare(left, right),
                Some(Ordering::Less | Ordering::Equal)
            )),
            BinOp::Gt => Value::Bool(compare(left, right) == Some(Ordering::Greater)),
            BinOp::GtEq => Value::Bool(matches!(
                compare(left, right),
                Some(Ordering::Greater | Ordering::Equal)
            )),
            BinOp::Shl => Value::Number(f64::from(to_int32(left.to_number()).wrapping_shl(shift))),
            BinOp::Shr => Value::Number(f64::from(to_int32(left.to_number()) >> shift)),
            BinOp::UShr => Value::Number(f64::from((to_int32(left.to_number()) as u32) >> shift)),
            BinOp::BitAnd => int(|a, b| a & b),
            BinOp::BitOr => int(|a, b| a | b),
            BinOp::BitXor => int(|a, b| a ^ b),
            BinOp::In => match right {
                Value::Object(_) | Value::Array(_) | Value::Function(_) => {
                    Value::Bool(builtins::has_property(right, &left.to_key()))
                }
                other => {
                    return Err(self.type_error(format!(
                        "Cannot use 'in' operator to search for '{}' in {}",
                        left.to_key(),
                        other.to_js_string()
                    )))
                }
            },
            BinOp::Instanceof => {
                return Err(RuntimeError::Unsupported("instanceof".to_string()));
            }
        })
    }

    // ─── Properties ────────────────────────────────────────────────

    pub(super) fn get_property(&mut self, target: &Value, key: &str) -> Eval<Value> {
        match target {
            Value::Undefined | Value::Null => Err(self.type_error(format!(
                "Cannot read properties of {} (reading '{}')",
                target.to_js_string(),
                key
            ))),
            Value::Array(array) => {
                if key == "length" {
                    return Ok(Value::Number(array.items.borrow().len() as f64));
                }
                if let Some(index) = array_index(key) {
                    return Ok(array
                        .items
                        .borrow()
                        .get(index)
                        .cloned()
                        .unwrap_or(Value::Undefined));
                }
                Ok(builtins::array_method(key).unwrap_or(Value::Undefined))
            }
            Value::String(text) => {
                if key == "length" {
                    return Ok(Value::Number(text.chars().count() as f64));
                }
                if let Some(index) = array_index(key) {
                    return Ok(text
                        .chars()
                        .nth(index)
                        .map_or(Value::Undefined, |c| Value::string(c.to_string())));
                }
                Ok(builtins::string_method(key).unwrap_or(Value::Undefined))
            }
            Value::Object(object) => Ok(object
                .get(key)
                .or_else(|| builtins::object_method(key))
                .unwrap_or(Value::Undefined)),
            Value::Function(function) => Ok(function
                .props
                .get(key)
                .or_else(|| (key == "name").then(|| Value::string(function.name())))
                .or_else(|| builtins::function_method(key))
                .unwrap_or(Value::Undefined)),
            Value::Number(_) => Ok(builtins::number_method(key).unwrap_or(Value::Undefined)),
            Value::Bool(_) | Value::Symbol(_) => Ok(Value::Undefined),
        }
    }

    pub(super) fn set_property(&mut self, target: &Value, key: &str, value: Value) -> Eval<()> {
        match target {
            Value::Undefined | Value::Null => Err(self.type_error(format!(
                "Cannot set properties of {} (setting '{}')",
                target.to_js_string(),
                key
            ))),
            Value::Array(array) => {
                if array.frozen.get() {
                    return Err(self.type_error(format!(
                        "Cannot assign to read only property '{}' of object",
                        key
                    )));
                }
                if key == "length" {
                    let length = value.to_number();
                    if !(length >= 0.0 && length.fract() == 0.0) {
                        return Err(RuntimeError::Thrown(super::error_object(
                            "RangeError",
                            "Invalid array length".to_string(),
                        )));
                    }
                    array.items.borrow_mut().resize(length as usize, Value::Undefined);
                } else if let Some(index) = array_index(key) {
                    let mut items = array.items.borrow_mut();
                    if index >= items.len() {
                        items.resize(index + 1, Value::Undefined);
                    }
                    items[index] = value;
                }
                Ok(())
            }
            Value::Object(object) => {
                if object.frozen.get() {
                    return Err(self.type_error(format!(
                        "Cannot assign to read only property '{}' of object",
                        key
                    )));
                }
                object.set(key, value);
                Ok(())
            }
            Value::Function(function) => {
                function.props.set(key, value);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn delete_property(&mut self, target: &Value, key: &str) -> Eval<bool> {
        if target.is_nullish() {
            return Err(self.type_error(format!(
                "Cannot convert {} to object",
                target.to_js_string()
            )));
        }
        if !target.is_frozen() {
            match target {
                Value::Object(object) => {
                    object.remove(key);
                }
                Value::Array(array) => {
                    if let Some(index) = array_index(key) {
                        if let Some(slot) = array.items.borrow_mut().get_mut(index) {
                            *slot = Value::Undefined;
                        }
                    }
                }
                _ => {}
            }
            return Ok(true);
        }
        match target {
            Value::Object(_) | Value::Array(_) => Err(self.type_error(format!(
                "Cannot delete property '{}' of frozen object",
                key
            ))),
            _ => Ok(true),
        }
    }

    /// Items of an iterable, for spreads and array patterns.
    pub(super) fn iterate(&self, value: &Value) -> Eval<Vec<Value>> {
        match value {
            Value::Array(array) => Ok(array.items.borrow().clone()),
            Value::String(text) => Ok(text
                .chars()
                .map(|c| Value::string(c.to_string()))
                .collect()),
            other => Err(self.type_error(format!("{} is not iterable", other.to_js_string()))),
        }
    }
}

/// Canonical array index: digits with no leading zero.
fn array_index(key: &str) -> Option<usize> {
    let index: usize = key.parse().ok()?;
    (index.to_string() == key).then_some(index)
}

pub(super) fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    (n.trunc() % 4_294_967_296.0) as i64 as u32 as i32
}

/// Objects, arrays and functions convert to strings before `+` and
/// comparisons.
fn to_primitive(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) | Value::Function(_) => {
            Value::string(value.to_js_string())
        }
        other => other.clone(),
    }
}

fn add(left: &Value, right: &Value) -> Value {
    let (left, right) = (to_primitive(left), to_primitive(right));
    match (&left, &right) {
        (Value::String(_), _) | (_, Value::String(_)) => {
            Value::string(format!("{}{}", left.to_js_string(), right.to_js_string()))
        }
        _ => Value::Number(left.to_number() + right.to_number()),
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (to_primitive(left), to_primitive(right)) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(&b)),
        (a, b) => a.to_number().partial_cmp(&b.to_number()),
    }
}
