//! Lexical environments: a chain of frames shared by closures.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::value::Value;

struct Binding {
    value: Value,
    mutable: bool,
}

struct Frame {
    vars: RefCell<HashMap<String, Binding>>,
    parent: Option<Scope>,
    /// `var` declarations land in the nearest function frame.
    function: bool,
}

#[derive(Clone)]
pub struct Scope(Rc<Frame>);

/// Why a write to a binding failed.
pub enum AssignError {
    Constant,
    Undeclared,
}

impl Scope {
    pub fn global() -> Self {
        Scope(Rc::new(Frame {
            vars: RefCell::new(HashMap::new()),
            parent: None,
            function: true,
        }))
    }

    pub fn child(&self) -> Self {
        Scope(Rc::new(Frame {
            vars: RefCell::new(HashMap::new()),
            parent: Some(self.clone()),
            function: false,
        }))
    }

    pub fn function_child(&self) -> Self {
        Scope(Rc::new(Frame {
            vars: RefCell::new(HashMap::new()),
            parent: Some(self.clone()),
            function: true,
        }))
    }

    pub fn define(&self, name: &str, value: Value, mutable: bool) {
        self.0
            .vars
            .borrow_mut()
            .insert(name.to_string(), Binding { value, mutable });
    }

    pub fn define_var(&self, name: &str, value: Value) {
        let mut scope = self.clone();
        while !scope.0.function {
            match scope.0.parent.clone() {
                Some(parent) => scope = parent,
                None => break,
            }
        }
        scope.define(name, value, true);
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(binding) = current.0.vars.borrow().get(name) {
                return Some(binding.value.clone());
            }
            scope = current.0.parent.as_ref();
        }
        None
    }

    pub fn assign(&self, name: &str, value: Value) -> Result<(), AssignError> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(binding) = current.0.vars.borrow_mut().get_mut(name) {
                if !binding.mutable {
                    return Err(AssignError::Constant);
                }
                binding.value = value;
                return Ok(());
            }
            scope = current.0.parent.as_ref();
        }
        Err(AssignError::Undeclared)
    }

    /// Copy of this frame's bindings into a fresh sibling frame, for
    /// per-iteration `let` bindings of `for` loops.
    pub fn copy_frame(&self) -> Scope {
        let vars = self
            .0
            .vars
            .borrow()
            .iter()
            .map(|(name, binding)| {
                (
                    name.clone(),
                    Binding {
                        value: binding.value.clone(),
                        mutable: binding.mutable,
                    },
                )
            })
            .collect();
        Scope(Rc::new(Frame {
            vars: RefCell::new(vars),
            parent: self.0.parent.clone(),
            function: self.0.function,
        }))
    }
}
