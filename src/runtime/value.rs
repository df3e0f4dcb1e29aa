//! Runtime values.
//!
//! Arrays, objects and functions are shared by reference: cloning a
//! `Value` clones the handle, and `===` compares handles. Objects keep
//! their properties in insertion order.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::ast;
use crate::syntax::format::number_to_string;

use super::scope::Scope;
use super::{Interpreter, RuntimeError};

#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Array(Rc<ArrayData>),
    Object(Rc<ObjectData>),
    Function(Rc<FunctionData>),
    /// A private marker, equal only to itself.
    Symbol(Rc<str>),
}

#[derive(Default)]
pub struct ArrayData {
    pub items: RefCell<Vec<Value>>,
    pub frozen: Cell<bool>,
}

#[derive(Default)]
pub struct ObjectData {
    pub props: RefCell<Vec<(String, Value)>>,
    pub frozen: Cell<bool>,
}

impl ObjectData {
    pub fn get(&self, key: &str) -> Option<Value> {
        self.props
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    pub fn set(&self, key: &str, value: Value) {
        let mut props = self.props.borrow_mut();
        match props.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = value,
            None => props.push((key.to_string(), value)),
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        let mut props = self.props.borrow_mut();
        let before = props.len();
        props.retain(|(k, _)| k != key);
        props.len() != before
    }

    pub fn keys(&self) -> Vec<String> {
        self.props.borrow().iter().map(|(k, _)| k.clone()).collect()
    }
}

pub type NativeFn = dyn Fn(&mut Interpreter, Value, Vec<Value>) -> Result<Value, RuntimeError>;

pub enum Callable {
    Closure {
        func: Rc<ast::Function>,
        scope: Scope,
    },
    Native {
        name: String,
        call: Rc<NativeFn>,
    },
}

pub struct FunctionData {
    pub callable: Callable,
    /// Static properties, e.g. `Object.keys` hangs off `Object`.
    pub props: ObjectData,
    /// Memo cache handed out by the runtime's `c(n)` to calls of this
    /// function object.
    pub cache: RefCell<Option<Rc<ArrayData>>>,
}

impl FunctionData {
    pub fn name(&self) -> String {
        match &self.callable {
            Callable::Closure { func, .. } => func.name_str().unwrap_or("").to_string(),
            Callable::Native { name, .. } => name.clone(),
        }
    }
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Value {
        Value::String(s.into())
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(ArrayData {
            items: RefCell::new(items),
            frozen: Cell::new(false),
        }))
    }

    pub fn object(props: Vec<(String, Value)>) -> Value {
        Value::Object(Rc::new(ObjectData {
            props: RefCell::new(props),
            frozen: Cell::new(false),
        }))
    }

    pub fn native(
        name: &str,
        call: impl Fn(&mut Interpreter, Value, Vec<Value>) -> Result<Value, RuntimeError> + 'static,
    ) -> Value {
        Value::Function(Rc::new(FunctionData {
            callable: Callable::Native {
                name: name.to_string(),
                call: Rc::new(call),
            },
            props: ObjectData::default(),
            cache: RefCell::new(None),
        }))
    }

    pub fn closure(func: Rc<ast::Function>, scope: Scope) -> Value {
        Value::Function(Rc::new(FunctionData {
            callable: Callable::Closure { func, scope },
            props: ObjectData::default(),
            cache: RefCell::new(None),
        }))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            Value::Symbol(_) => "symbol",
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Array(_) => string_to_number(&self.to_js_string()),
            _ => f64::NAN,
        }
    }

    /// `String(value)`.
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.to_string(),
            Value::Array(items) => items
                .items
                .borrow()
                .iter()
                .map(|v| if v.is_nullish() { String::new() } else { v.to_js_string() })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(f) => format!("function {}() {{ [code] }}", f.name()),
            Value::Symbol(desc) => format!("Symbol({})", desc),
        }
    }

    /// Property key for computed access.
    pub fn to_key(&self) -> String {
        self.to_js_string()
    }

    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Symbol(a), Value::Symbol(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Number(_), Value::String(_))
            | (Value::String(_), Value::Number(_))
            | (Value::Bool(_), _)
            | (_, Value::Bool(_)) => {
                if matches!(self, Value::Bool(_) | Value::Number(_) | Value::String(_))
                    && matches!(other, Value::Bool(_) | Value::Number(_) | Value::String(_))
                {
                    self.to_number() == other.to_number()
                } else {
                    self.strict_equals(other)
                }
            }
            _ => self.strict_equals(other),
        }
    }

    pub fn is_frozen(&self) -> bool {
        match self {
            Value::Array(a) => a.frozen.get(),
            Value::Object(o) => o.frozen.get(),
            _ => true,
        }
    }
}

/// `Number(text)` for strings.
pub fn string_to_number(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |n| n as f64);
    }
    match text {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if text.chars().all(|c| c.is_ascii_digit() || "+-.eE".contains(c)) => {
            text.parse().unwrap_or(f64::NAN)
        }
        _ => f64::NAN,
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(items) => f.debug_list().entries(items.items.borrow().iter()).finish(),
            Value::Object(obj) => {
                let mut map = f.debug_map();
                for (k, v) in obj.props.borrow().iter() {
                    map.entry(k, v);
                }
                map.finish()
            }
            other => f.write_str(&other.to_js_string()),
        }
    }
}

impl PartialEq for Value {
    /// Structural equality, for assertions in tests.
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Array(a), Value::Array(b)) => {
                Rc::ptr_eq(a, b) || *a.items.borrow() == *b.items.borrow()
            }
            (Value::Object(a), Value::Object(b)) => {
                Rc::ptr_eq(a, b) || *a.props.borrow() == *b.props.borrow()
            }
            _ => self.strict_equals(other),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Value {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::string(s)
    }
}
