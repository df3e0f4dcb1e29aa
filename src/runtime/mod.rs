//! Reference evaluator for the JavaScript subset the compiler accepts.
//!
//! Runs original and compiled programs side by side so tests can check
//! that memoization preserves behavior: same results, same observable side
//! effects, and identical references on cache hits. The memo runtime module
//! (`c`, `EMPTY`, `EARLY_RETURN`, `freeze`) is installed under the default
//! runtime module name; host functions registered from Rust observe calls.
//!
//! Evaluation is a direct walk over the AST. Exceptions thrown by the
//! program travel as `RuntimeError::Thrown` and can be caught by `try`;
//! the other variants abort the run.

mod builtins;
mod eval;
mod scope;
pub mod value;
#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;
use tracing::trace;

use crate::ast;
use crate::config::DEFAULT_RUNTIME_MODULE;

use scope::Scope;
pub use value::Value;
use value::FunctionData;

/// Nested calls deeper than this abort the run.
const MAX_CALL_DEPTH: usize = 64;

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// An exception the program did not catch.
    #[error("uncaught exception: {}", describe(.0))]
    Thrown(Value),
    #[error("unsupported at runtime: {0}")]
    Unsupported(String),
    #[error("maximum call depth exceeded")]
    StackOverflow,
    #[error("unknown module '{0}'")]
    UnknownModule(String),
    #[error("no global function '{0}'")]
    UnknownFunction(String),
    #[error("source does not parse: {0}")]
    Parse(String),
}

fn describe(value: &Value) -> String {
    match value {
        Value::Object(obj) => match (obj.get("name"), obj.get("message")) {
            (Some(name), Some(message)) => {
                format!("{}: {}", name.to_js_string(), message.to_js_string())
            }
            _ => format!("{:?}", value),
        },
        other => format!("{:?}", other),
    }
}

/// The private markers of the memo runtime.
#[derive(Clone)]
pub struct Markers {
    pub empty: Value,
    pub early_return: Value,
}

pub struct Interpreter {
    globals: Scope,
    modules: HashMap<String, Vec<(String, Value)>>,
    /// Closures being called, innermost last.
    frames: Vec<Rc<FunctionData>>,
    markers: Markers,
    /// Lines written by `console.log`.
    console: Vec<String>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let markers = Markers {
            empty: Value::Symbol(Rc::from("memoc.empty")),
            early_return: Value::Symbol(Rc::from("memoc.early_return")),
        };
        let mut interp = Self {
            globals: Scope::global(),
            modules: HashMap::new(),
            frames: Vec::new(),
            markers,
            console: Vec::new(),
        };
        builtins::install_globals(&mut interp);
        let runtime = builtins::memo_runtime(&interp.markers);
        interp.register_module(DEFAULT_RUNTIME_MODULE, runtime);
        interp
    }

    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    /// Make `exports` importable from `name`.
    pub fn register_module(&mut self, name: &str, exports: Vec<(String, Value)>) {
        self.modules.insert(name.to_string(), exports);
    }

    /// Expose the memo runtime under another module name as well.
    pub fn alias_runtime_module(&mut self, name: &str) {
        if let Some(exports) = self.modules.get(DEFAULT_RUNTIME_MODULE).cloned() {
            self.modules.insert(name.to_string(), exports);
        }
    }

    /// Define a global function implemented in Rust.
    pub fn register_host(
        &mut self,
        name: &str,
        call: impl Fn(&[Value]) -> Result<Value, RuntimeError> + 'static,
    ) {
        let function = Value::native(name, move |_, _, args| call(&args));
        self.globals.define(name, function, true);
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        self.globals.define(name, value, true);
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.lookup(name)
    }

    pub fn console(&self) -> &[String] {
        &self.console
    }

    /// Parse and run a source file's top level.
    pub fn run_source(&mut self, source: &str, filename: &str) -> Result<(), RuntimeError> {
        let program = crate::parse_source_silent(source, filename).map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|d| d.message.clone()).collect();
            RuntimeError::Parse(messages.join("; "))
        })?;
        self.run_program(&program)
    }

    /// Run a program's top level: imports, then statements in order.
    pub fn run_program(&mut self, program: &ast::Program) -> Result<(), RuntimeError> {
        let scope = self.globals.clone();
        let mut stmts = Vec::new();
        for item in &program.items {
            match &item.node {
                ast::Item::Import(import) => self.import(import)?,
                ast::Item::Stmt { export, stmt } => {
                    if let (ast::Export::Default, ast::Stmt::FunctionDecl(f)) = (export, &stmt.node) {
                        if f.name.is_none() {
                            let value = Value::closure(Rc::new(f.clone()), scope.clone());
                            scope.define("default", value, true);
                            continue;
                        }
                    }
                    stmts.push(stmt.clone());
                }
            }
        }
        self.exec_stmts(&stmts, &scope)?;
        trace!(items = program.items.len(), "program evaluated");
        Ok(())
    }

    fn import(&mut self, import: &ast::ImportDecl) -> Result<(), RuntimeError> {
        let exports = self
            .modules
            .get(&import.source)
            .ok_or_else(|| RuntimeError::UnknownModule(import.source.clone()))?;
        let find = |name: &str| {
            exports
                .iter()
                .find(|(export, _)| export == name)
                .map(|(_, value)| value.clone())
                .unwrap_or(Value::Undefined)
        };
        let mut bindings = Vec::new();
        if let Some(default) = &import.default {
            bindings.push((default.node.clone(), find("default")));
        }
        for spec in &import.specifiers {
            bindings.push((spec.local.node.clone(), find(&spec.imported)));
        }
        for (name, value) in bindings {
            self.globals.define(&name, value, false);
        }
        Ok(())
    }

    /// Call a global function by name.
    pub fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let function = self
            .globals
            .lookup(name)
            .ok_or_else(|| RuntimeError::UnknownFunction(name.to_string()))?;
        self.call_function(&function, Value::Undefined, args)
    }

    pub fn call_function(
        &mut self,
        function: &Value,
        this: Value,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let Value::Function(data) = function else {
            return Err(self.type_error(format!("{} is not a function", function.to_js_string())));
        };
        if self.frames.len() >= MAX_CALL_DEPTH {
            return Err(RuntimeError::StackOverflow);
        }
        match &data.callable {
            value::Callable::Native { call, .. } => {
                let call = call.clone();
                call(self, this, args)
            }
            value::Callable::Closure { func, scope } => {
                let func = func.clone();
                let scope = scope.function_child();
                if !func.is_arrow {
                    scope.define("this", this, false);
                }
                self.frames.push(data.clone());
                let result = self.invoke(&func, &scope, args);
                self.frames.pop();
                result
            }
        }
    }

    /// The closure currently executing, whose memo cache `c(n)` returns.
    fn current_function(&self) -> Option<Rc<FunctionData>> {
        self.frames.last().cloned()
    }

    /// A thrown `TypeError`.
    fn type_error(&self, message: impl Into<String>) -> RuntimeError {
        RuntimeError::Thrown(error_object("TypeError", message.into()))
    }

    fn reference_error(&self, message: impl Into<String>) -> RuntimeError {
        RuntimeError::Thrown(error_object("ReferenceError", message.into()))
    }
}

fn error_object(name: &str, message: String) -> Value {
    Value::object(vec![
        ("name".to_string(), Value::from(name)),
        ("message".to_string(), Value::string(message)),
    ])
}
