//! Global objects, prototype methods and the memo runtime module.
//!
//! Methods are resolved by name on property reads, so `items.map` yields a
//! fresh native function bound to nothing; the receiver arrives as `this`.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::rc::Rc;

use crate::syntax::format::number_to_string;

use super::value::{ArrayData, Value};
use super::{Interpreter, Markers, RuntimeError};

type Eval<T> = Result<T, RuntimeError>;

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

/// Attach static members to a function value.
fn with_props(function: Value, props: Vec<(&str, Value)>) -> Value {
    if let Value::Function(data) = &function {
        for (key, value) in props {
            data.props.set(key, value);
        }
    }
    function
}

fn object(props: Vec<(&str, Value)>) -> Value {
    Value::object(
        props
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect(),
    )
}

// ─── Globals ───────────────────────────────────────────────────────

pub(super) fn install_globals(interp: &mut Interpreter) {
    for (name, value) in [
        ("undefined", Value::Undefined),
        ("NaN", Value::Number(f64::NAN)),
        ("Infinity", Value::Number(f64::INFINITY)),
    ] {
        interp.globals.define(name, value, false);
    }

    let globals = vec![
        ("Math", math()),
        ("Object", object_constructor()),
        ("Array", array_constructor()),
        ("JSON", json()),
        ("console", console()),
        (
            "Number",
            with_props(
                Value::native("Number", |_, _, args| {
                    Ok(Value::Number(args.first().map_or(0.0, Value::to_number)))
                }),
                vec![
                    (
                        "isInteger",
                        Value::native("isInteger", |_, _, args| {
                            Ok(Value::Bool(matches!(arg(&args, 0), Value::Number(n) if n.is_finite() && n.fract() == 0.0)))
                        }),
                    ),
                    (
                        "isFinite",
                        Value::native("isFinite", |_, _, args| {
                            Ok(Value::Bool(matches!(arg(&args, 0), Value::Number(n) if n.is_finite())))
                        }),
                    ),
                ],
            ),
        ),
        (
            "String",
            Value::native("String", |_, _, args| {
                Ok(Value::string(args.first().map_or(String::new(), Value::to_js_string)))
            }),
        ),
        (
            "Boolean",
            Value::native("Boolean", |_, _, args| Ok(Value::Bool(arg(&args, 0).is_truthy()))),
        ),
        (
            "isNaN",
            Value::native("isNaN", |_, _, args| Ok(Value::Bool(arg(&args, 0).to_number().is_nan()))),
        ),
        (
            "parseInt",
            Value::native("parseInt", |_, _, args| {
                let radix = match arg(&args, 1) {
                    Value::Undefined => 0,
                    radix => radix.to_number() as u32,
                };
                Ok(Value::Number(parse_int(&arg(&args, 0).to_js_string(), radix)))
            }),
        ),
        (
            "parseFloat",
            Value::native("parseFloat", |_, _, args| {
                Ok(Value::Number(parse_float(&arg(&args, 0).to_js_string())))
            }),
        ),
        ("Error", error_constructor("Error")),
        ("TypeError", error_constructor("TypeError")),
        ("RangeError", error_constructor("RangeError")),
    ];
    for (name, value) in globals {
        interp.globals.define(name, value, true);
    }
}

fn error_constructor(name: &'static str) -> Value {
    Value::native(name, move |_, _, args| {
        let message = match arg(&args, 0) {
            Value::Undefined => String::new(),
            message => message.to_js_string(),
        };
        Ok(super::error_object(name, message))
    })
}

fn math() -> Value {
    fn unary(name: &'static str, f: fn(f64) -> f64) -> (&'static str, Value) {
        (
            name,
            Value::native(name, move |_, _, args| Ok(Value::Number(f(arg(&args, 0).to_number())))),
        )
    }
    fn fold(name: &'static str, init: f64, pick: fn(f64, f64) -> f64) -> (&'static str, Value) {
        (
            name,
            Value::native(name, move |_, _, args| {
                let mut result = init;
                for value in &args {
                    let n = value.to_number();
                    if n.is_nan() {
                        return Ok(Value::Number(f64::NAN));
                    }
                    result = pick(result, n);
                }
                Ok(Value::Number(result))
            }),
        )
    }
    object(vec![
        ("PI", Value::Number(std::f64::consts::PI)),
        ("E", Value::Number(std::f64::consts::E)),
        unary("abs", f64::abs),
        unary("floor", f64::floor),
        unary("ceil", f64::ceil),
        unary("round", |n| (n + 0.5).floor()),
        unary("trunc", f64::trunc),
        unary("sign", |n| if n == 0.0 || n.is_nan() { n } else { n.signum() }),
        unary("sqrt", f64::sqrt),
        unary("cbrt", f64::cbrt),
        unary("log", f64::ln),
        unary("exp", f64::exp),
        unary("sin", f64::sin),
        unary("cos", f64::cos),
        fold("min", f64::INFINITY, f64::min),
        fold("max", f64::NEG_INFINITY, f64::max),
        (
            "pow",
            Value::native("pow", |_, _, args| {
                Ok(Value::Number(arg(&args, 0).to_number().powf(arg(&args, 1).to_number())))
            }),
        ),
    ])
}

fn console() -> Value {
    object(vec![(
        "log",
        Value::native("log", |interp, _, args| {
            let line: Vec<String> = args.iter().map(display).collect();
            interp.console.push(line.join(" "));
            Ok(Value::Undefined)
        }),
    )])
}

/// `console.log` rendering: strings bare, everything else as JSON where
/// possible.
fn display(value: &Value) -> String {
    match value {
        Value::String(text) => text.to_string(),
        Value::Array(_) | Value::Object(_) => {
            stringify(value, 0).unwrap_or_else(|| value.to_js_string())
        }
        other => other.to_js_string(),
    }
}

fn object_constructor() -> Value {
    with_props(
        Value::native("Object", |_, _, args| match arg(&args, 0) {
            value @ (Value::Object(_) | Value::Array(_) | Value::Function(_)) => Ok(value),
            _ => Ok(Value::object(Vec::new())),
        }),
        vec![
            (
                "keys",
                Value::native("keys", |_, _, args| {
                    Ok(Value::array(
                        own_keys(&arg(&args, 0)).into_iter().map(Value::string).collect(),
                    ))
                }),
            ),
            (
                "values",
                Value::native("values", |_, _, args| {
                    Ok(Value::array(
                        own_entries(&arg(&args, 0)).into_iter().map(|(_, v)| v).collect(),
                    ))
                }),
            ),
            (
                "entries",
                Value::native("entries", |_, _, args| {
                    Ok(Value::array(
                        own_entries(&arg(&args, 0))
                            .into_iter()
                            .map(|(k, v)| Value::array(vec![Value::string(k), v]))
                            .collect(),
                    ))
                }),
            ),
            (
                "assign",
                Value::native("assign", |interp, _, args| {
                    let target = arg(&args, 0);
                    for source in args.iter().skip(1) {
                        for (key, value) in own_entries(source) {
                            interp.set_property(&target, &key, value)?;
                        }
                    }
                    Ok(target)
                }),
            ),
            (
                "fromEntries",
                Value::native("fromEntries", |interp, _, args| {
                    let result = Value::object(Vec::new());
                    for entry in interp.iterate(&arg(&args, 0))? {
                        let key = interp.get_property(&entry, "0")?.to_key();
                        let value = interp.get_property(&entry, "1")?;
                        interp.set_property(&result, &key, value)?;
                    }
                    Ok(result)
                }),
            ),
            ("freeze", Value::native("freeze", |_, _, args| Ok(freeze(arg(&args, 0))))),
            (
                "isFrozen",
                Value::native("isFrozen", |_, _, args| Ok(Value::Bool(arg(&args, 0).is_frozen()))),
            ),
        ],
    )
}

fn array_constructor() -> Value {
    with_props(
        Value::native("Array", |_, _, args| match args.as_slice() {
            [Value::Number(n)] => Ok(Value::array(vec![Value::Undefined; *n as usize])),
            _ => Ok(Value::array(args)),
        }),
        vec![
            (
                "isArray",
                Value::native("isArray", |_, _, args| {
                    Ok(Value::Bool(matches!(arg(&args, 0), Value::Array(_))))
                }),
            ),
            (
                "from",
                Value::native("from", |interp, _, args| {
                    let source = arg(&args, 0);
                    let items = match &source {
                        Value::Object(_) => {
                            let length = interp.get_property(&source, "length")?.to_number();
                            let mut items = Vec::new();
                            for index in 0..(length.max(0.0) as usize) {
                                items.push(interp.get_property(&source, &index.to_string())?);
                            }
                            items
                        }
                        other => interp.iterate(other)?,
                    };
                    let items = match arg(&args, 1) {
                        Value::Undefined => items,
                        map => {
                            let mut mapped = Vec::with_capacity(items.len());
                            for (index, item) in items.into_iter().enumerate() {
                                mapped.push(interp.call_function(
                                    &map,
                                    Value::Undefined,
                                    vec![item, Value::Number(index as f64)],
                                )?);
                            }
                            mapped
                        }
                    };
                    Ok(Value::array(items))
                }),
            ),
            ("of", Value::native("of", |_, _, args| Ok(Value::array(args)))),
        ],
    )
}

// ─── JSON ──────────────────────────────────────────────────────────

fn json() -> Value {
    object(vec![
        (
            "stringify",
            Value::native("stringify", |interp, _, args| {
                let value = arg(&args, 0);
                match stringify(&value, 0) {
                    Some(text) => Ok(Value::string(text)),
                    None if matches!(value, Value::Array(_) | Value::Object(_)) => {
                        Err(interp.type_error("Converting circular structure to JSON"))
                    }
                    None => Ok(Value::Undefined),
                }
            }),
        ),
        (
            "parse",
            Value::native("parse", |_, _, args| {
                let text = arg(&args, 0).to_js_string();
                serde_json::from_str::<serde_json::Value>(&text)
                    .map(from_json)
                    .map_err(|err| {
                        RuntimeError::Thrown(super::error_object("SyntaxError", err.to_string()))
                    })
            }),
        ),
    ])
}

/// Nesting deeper than this is treated as a cycle.
const MAX_JSON_DEPTH: usize = 64;

/// `JSON.stringify`, or `None` for values it skips.
fn stringify(value: &Value, depth: usize) -> Option<String> {
    if depth > MAX_JSON_DEPTH {
        return None;
    }
    match value {
        Value::Undefined | Value::Function(_) | Value::Symbol(_) => None,
        Value::Null => Some("null".to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) if n.is_finite() => Some(number_to_string(*n)),
        Value::Number(_) => Some("null".to_string()),
        Value::String(text) => serde_json::to_string(text.as_ref()).ok(),
        Value::Array(array) => {
            let mut parts = Vec::new();
            for item in array.items.borrow().iter() {
                match item {
                    Value::Undefined | Value::Function(_) | Value::Symbol(_) => {
                        parts.push("null".to_string())
                    }
                    item => parts.push(stringify(item, depth + 1)?),
                }
            }
            Some(format!("[{}]", parts.join(",")))
        }
        Value::Object(object) => {
            let mut parts = Vec::new();
            for (key, item) in object.props.borrow().iter() {
                if matches!(item, Value::Undefined | Value::Function(_) | Value::Symbol(_)) {
                    continue;
                }
                let key = serde_json::to_string(key).ok()?;
                parts.push(format!("{}:{}", key, stringify(item, depth + 1)?));
            }
            Some(format!("{{{}}}", parts.join(",")))
        }
    }
}

fn from_json(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::string(s),
        serde_json::Value::Array(items) => Value::array(items.into_iter().map(from_json).collect()),
        serde_json::Value::Object(map) => {
            Value::object(map.into_iter().map(|(k, v)| (k, from_json(v))).collect())
        }
    }
}

// ─── Own properties ────────────────────────────────────────────────

pub(super) fn own_keys(value: &Value) -> Vec<String> {
    own_entries(value).into_iter().map(|(key, _)| key).collect()
}

pub(super) fn own_entries(value: &Value) -> Vec<(String, Value)> {
    match value {
        Value::Object(object) => object.props.borrow().clone(),
        Value::Array(array) => array
            .items
            .borrow()
            .iter()
            .enumerate()
            .map(|(index, item)| (index.to_string(), item.clone()))
            .collect(),
        Value::String(text) => text
            .chars()
            .enumerate()
            .map(|(index, c)| (index.to_string(), Value::string(c.to_string())))
            .collect(),
        Value::Function(function) => function.props.props.borrow().clone(),
        _ => Vec::new(),
    }
}

pub(super) fn has_property(value: &Value, key: &str) -> bool {
    match value {
        Value::Object(object) => object.get(key).is_some(),
        Value::Array(array) => {
            key == "length"
                || key
                    .parse::<usize>()
                    .is_ok_and(|index| index < array.items.borrow().len())
                || array_method(key).is_some()
        }
        Value::Function(function) => function.props.get(key).is_some(),
        _ => false,
    }
}

fn freeze(value: Value) -> Value {
    match &value {
        Value::Array(array) => array.frozen.set(true),
        Value::Object(object) => object.frozen.set(true),
        _ => {}
    }
    value
}

// ─── Prototype methods ─────────────────────────────────────────────

fn this_array(interp: &Interpreter, this: &Value) -> Eval<Rc<ArrayData>> {
    match this {
        Value::Array(array) => Ok(array.clone()),
        other => Err(interp.type_error(format!("{} is not an array", other.to_js_string()))),
    }
}

fn mutable_array(interp: &Interpreter, this: &Value) -> Eval<Rc<ArrayData>> {
    let array = this_array(interp, this)?;
    if array.frozen.get() {
        return Err(interp.type_error("Cannot add property, object is not extensible"));
    }
    Ok(array)
}

/// Call `callback(item, index, array)` for each item present when the
/// iteration started; `visit` decides whether to keep going.
fn each(
    interp: &mut Interpreter,
    this: &Value,
    callback: &Value,
    mut visit: impl FnMut(Value, Value) -> bool,
) -> Eval<()> {
    let array = this_array(interp, this)?;
    let length = array.items.borrow().len();
    for index in 0..length {
        let Some(item) = array.items.borrow().get(index).cloned() else {
            break;
        };
        let result = interp.call_function(
            callback,
            Value::Undefined,
            vec![item.clone(), Value::Number(index as f64), this.clone()],
        )?;
        if !visit(item, result) {
            break;
        }
    }
    Ok(())
}

/// Relative index as used by `slice`: negative counts from the end.
fn relative(value: &Value, length: usize, default: usize) -> usize {
    match value {
        Value::Undefined => default,
        value => {
            let n = value.to_number();
            let n = if n.is_nan() { 0.0 } else { n.trunc() };
            if n < 0.0 {
                (length as f64 + n).max(0.0) as usize
            } else {
                (n as usize).min(length)
            }
        }
    }
}

fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => a.strict_equals(b),
    }
}

pub(super) fn array_method(name: &str) -> Option<Value> {
    let method = match name {
        "push" => Value::native("push", |interp, this, args| {
            let array = mutable_array(interp, &this)?;
            let mut items = array.items.borrow_mut();
            items.extend(args);
            Ok(Value::Number(items.len() as f64))
        }),
        "pop" => Value::native("pop", |interp, this, _| {
            let array = mutable_array(interp, &this)?;
            let popped = array.items.borrow_mut().pop();
            Ok(popped.unwrap_or(Value::Undefined))
        }),
        "shift" => Value::native("shift", |interp, this, _| {
            let array = mutable_array(interp, &this)?;
            let mut items = array.items.borrow_mut();
            Ok(if items.is_empty() {
                Value::Undefined
            } else {
                items.remove(0)
            })
        }),
        "unshift" => Value::native("unshift", |interp, this, args| {
            let array = mutable_array(interp, &this)?;
            let mut items = array.items.borrow_mut();
            items.splice(0..0, args);
            Ok(Value::Number(items.len() as f64))
        }),
        "reverse" => Value::native("reverse", |interp, this, _| {
            mutable_array(interp, &this)?.items.borrow_mut().reverse();
            Ok(this)
        }),
        "sort" => Value::native("sort", |interp, this, args| {
            let array = mutable_array(interp, &this)?;
            let comparator = arg(&args, 0);
            let mut items = array.items.borrow().clone();
            // Insertion sort: the comparator may call back into the program.
            for i in 1..items.len() {
                let mut j = i;
                while j > 0 {
                    let order = match &comparator {
                        Value::Undefined => items[j - 1].to_js_string().cmp(&items[j].to_js_string()),
                        f => {
                            let result = interp.call_function(
                                f,
                                Value::Undefined,
                                vec![items[j - 1].clone(), items[j].clone()],
                            )?;
                            result.to_number().partial_cmp(&0.0).unwrap_or(Ordering::Equal)
                        }
                    };
                    if order != Ordering::Greater {
                        break;
                    }
                    items.swap(j - 1, j);
                    j -= 1;
                }
            }
            *array.items.borrow_mut() = items;
            Ok(this)
        }),
        "map" => Value::native("map", |interp, this, args| {
            let mut mapped = Vec::new();
            each(interp, &this, &arg(&args, 0), |_, result| {
                mapped.push(result);
                true
            })?;
            Ok(Value::array(mapped))
        }),
        "filter" => Value::native("filter", |interp, this, args| {
            let mut kept = Vec::new();
            each(interp, &this, &arg(&args, 0), |item, result| {
                if result.is_truthy() {
                    kept.push(item);
                }
                true
            })?;
            Ok(Value::array(kept))
        }),
        "forEach" => Value::native("forEach", |interp, this, args| {
            each(interp, &this, &arg(&args, 0), |_, _| true)?;
            Ok(Value::Undefined)
        }),
        "some" => Value::native("some", |interp, this, args| {
            let mut found = false;
            each(interp, &this, &arg(&args, 0), |_, result| {
                found = result.is_truthy();
                !found
            })?;
            Ok(Value::Bool(found))
        }),
        "every" => Value::native("every", |interp, this, args| {
            let mut all = true;
            each(interp, &this, &arg(&args, 0), |_, result| {
                all = result.is_truthy();
                all
            })?;
            Ok(Value::Bool(all))
        }),
        "find" => Value::native("find", |interp, this, args| {
            let mut found = Value::Undefined;
            each(interp, &this, &arg(&args, 0), |item, result| {
                if result.is_truthy() {
                    found = item;
                    return false;
                }
                true
            })?;
            Ok(found)
        }),
        "findIndex" => Value::native("findIndex", |interp, this, args| {
            let mut index = -1.0;
            let mut position = 0.0;
            each(interp, &this, &arg(&args, 0), |_, result| {
                if result.is_truthy() {
                    index = position;
                    return false;
                }
                position += 1.0;
                true
            })?;
            Ok(Value::Number(index))
        }),
        "reduce" => Value::native("reduce", |interp, this, args| {
            let array = this_array(interp, &this)?;
            let items = array.items.borrow().clone();
            let callback = arg(&args, 0);
            let mut rest = items.into_iter().enumerate();
            let mut accumulator = match args.get(1) {
                Some(initial) => initial.clone(),
                None => match rest.next() {
                    Some((_, first)) => first,
                    None => {
                        return Err(interp.type_error("Reduce of empty array with no initial value"))
                    }
                },
            };
            for (index, item) in rest {
                accumulator = interp.call_function(
                    &callback,
                    Value::Undefined,
                    vec![accumulator, item, Value::Number(index as f64), this.clone()],
                )?;
            }
            Ok(accumulator)
        }),
        "join" => Value::native("join", |interp, this, args| {
            let array = this_array(interp, &this)?;
            let separator = match arg(&args, 0) {
                Value::Undefined => ",".to_string(),
                separator => separator.to_js_string(),
            };
            let parts: Vec<String> = array
                .items
                .borrow()
                .iter()
                .map(|item| if item.is_nullish() { String::new() } else { item.to_js_string() })
                .collect();
            Ok(Value::string(parts.join(&separator)))
        }),
        "includes" => Value::native("includes", |interp, this, args| {
            let array = this_array(interp, &this)?;
            let needle = arg(&args, 0);
            let found = array.items.borrow().iter().any(|item| same_value_zero(item, &needle));
            Ok(Value::Bool(found))
        }),
        "indexOf" => Value::native("indexOf", |interp, this, args| {
            let array = this_array(interp, &this)?;
            let needle = arg(&args, 0);
            let index = array.items.borrow().iter().position(|item| item.strict_equals(&needle));
            Ok(Value::Number(index.map_or(-1.0, |i| i as f64)))
        }),
        "slice" => Value::native("slice", |interp, this, args| {
            let array = this_array(interp, &this)?;
            let items = array.items.borrow().clone();
            let start = relative(&arg(&args, 0), items.len(), 0);
            let end = relative(&arg(&args, 1), items.len(), items.len());
            let slice = items.get(start..end.max(start)).unwrap_or_default().to_vec();
            Ok(Value::array(slice))
        }),
        "concat" => Value::native("concat", |interp, this, args| {
            let array = this_array(interp, &this)?;
            let mut items = array.items.borrow().clone();
            for value in args {
                match value {
                    Value::Array(other) => items.extend(other.items.borrow().iter().cloned()),
                    other => items.push(other),
                }
            }
            Ok(Value::array(items))
        }),
        _ => return None,
    };
    Some(method)
}

fn this_string(interp: &Interpreter, this: &Value) -> Eval<Rc<str>> {
    match this {
        Value::String(text) => Ok(text.clone()),
        other => Err(interp.type_error(format!("{} is not a string", other.to_js_string()))),
    }
}

fn char_slice(text: &str, start: usize, end: usize) -> String {
    text.chars().skip(start).take(end.saturating_sub(start)).collect()
}

pub(super) fn string_method(name: &str) -> Option<Value> {
    fn transform(name: &'static str, f: fn(&str) -> String) -> Value {
        Value::native(name, move |interp, this, _| {
            Ok(Value::string(f(&this_string(interp, &this)?)))
        })
    }
    fn test(name: &'static str, f: fn(&str, &str) -> bool) -> Value {
        Value::native(name, move |interp, this, args| {
            let text = this_string(interp, &this)?;
            Ok(Value::Bool(f(&text, &arg(&args, 0).to_js_string())))
        })
    }
    let method = match name {
        "toUpperCase" => transform("toUpperCase", str::to_uppercase),
        "toLowerCase" => transform("toLowerCase", str::to_lowercase),
        "trim" => transform("trim", |s| s.trim().to_string()),
        "toString" => transform("toString", str::to_string),
        "includes" => test("includes", |s, needle| s.contains(needle)),
        "startsWith" => test("startsWith", |s, needle| s.starts_with(needle)),
        "endsWith" => test("endsWith", |s, needle| s.ends_with(needle)),
        "indexOf" => Value::native("indexOf", |interp, this, args| {
            let text = this_string(interp, &this)?;
            let needle = arg(&args, 0).to_js_string();
            let index = text
                .find(&needle)
                .map_or(-1.0, |byte| text[..byte].chars().count() as f64);
            Ok(Value::Number(index))
        }),
        "slice" | "substring" => Value::native("slice", |interp, this, args| {
            let text = this_string(interp, &this)?;
            let length = text.chars().count();
            let start = relative(&arg(&args, 0), length, 0);
            let end = relative(&arg(&args, 1), length, length);
            Ok(Value::string(char_slice(&text, start, end)))
        }),
        "charAt" => Value::native("charAt", |interp, this, args| {
            let text = this_string(interp, &this)?;
            let index = arg(&args, 0).to_number();
            let index = if index.is_nan() { 0 } else { index as usize };
            Ok(Value::string(char_slice(&text, index, index + 1)))
        }),
        "split" => Value::native("split", |interp, this, args| {
            let text = this_string(interp, &this)?;
            let parts: Vec<Value> = match arg(&args, 0) {
                Value::Undefined => vec![Value::String(text.clone())],
                separator => {
                    let separator = separator.to_js_string();
                    if separator.is_empty() {
                        text.chars().map(|c| Value::string(c.to_string())).collect()
                    } else {
                        text.split(separator.as_str()).map(Value::from).collect()
                    }
                }
            };
            Ok(Value::array(parts))
        }),
        "repeat" => Value::native("repeat", |interp, this, args| {
            let text = this_string(interp, &this)?;
            let count = arg(&args, 0).to_number();
            if !(count >= 0.0 && count.is_finite()) {
                return Err(RuntimeError::Thrown(super::error_object(
                    "RangeError",
                    format!("Invalid count value: {}", number_to_string(count)),
                )));
            }
            Ok(Value::string(text.repeat(count as usize)))
        }),
        "padStart" | "padEnd" => {
            let at_start = name == "padStart";
            Value::native(name, move |interp, this, args| {
                let text = this_string(interp, &this)?;
                let width = arg(&args, 0).to_number().max(0.0) as usize;
                let fill = match arg(&args, 1) {
                    Value::Undefined => " ".to_string(),
                    fill => fill.to_js_string(),
                };
                let length = text.chars().count();
                if width <= length || fill.is_empty() {
                    return Ok(Value::String(text));
                }
                let padding: String = fill.chars().cycle().take(width - length).collect();
                Ok(Value::string(if at_start {
                    format!("{}{}", padding, text)
                } else {
                    format!("{}{}", text, padding)
                }))
            })
        }
        "replace" => Value::native("replace", |interp, this, args| {
            let text = this_string(interp, &this)?;
            let pattern = arg(&args, 0).to_js_string();
            let replacement = arg(&args, 1).to_js_string();
            Ok(Value::string(text.replacen(&pattern, &replacement, 1)))
        }),
        "concat" => Value::native("concat", |interp, this, args| {
            let mut text = this_string(interp, &this)?.to_string();
            for value in &args {
                text.push_str(&value.to_js_string());
            }
            Ok(Value::string(text))
        }),
        _ => return None,
    };
    Some(method)
}

pub(super) fn number_method(name: &str) -> Option<Value> {
    let method = match name {
        "toFixed" => Value::native("toFixed", |_, this, args| {
            let digits = arg(&args, 0).to_number();
            let digits = if digits.is_nan() { 0 } else { digits as usize };
            Ok(Value::string(format!("{:.*}", digits, this.to_number())))
        }),
        "toString" => Value::native("toString", |_, this, _| Ok(Value::string(this.to_js_string()))),
        _ => return None,
    };
    Some(method)
}

pub(super) fn object_method(name: &str) -> Option<Value> {
    match name {
        "hasOwnProperty" => Some(Value::native("hasOwnProperty", |_, this, args| {
            let key = arg(&args, 0).to_key();
            Ok(Value::Bool(own_keys(&this).contains(&key)))
        })),
        _ => None,
    }
}

pub(super) fn function_method(name: &str) -> Option<Value> {
    match name {
        "call" => Some(Value::native("call", |interp, this, args| {
            let mut args = args.into_iter();
            let receiver = args.next().unwrap_or(Value::Undefined);
            interp.call_function(&this, receiver, args.collect())
        })),
        "apply" => Some(Value::native("apply", |interp, this, args| {
            let receiver = arg(&args, 0);
            let list = match arg(&args, 1) {
                Value::Undefined | Value::Null => Vec::new(),
                list => interp.iterate(&list)?,
            };
            interp.call_function(&this, receiver, list)
        })),
        _ => None,
    }
}

// ─── Number parsing ────────────────────────────────────────────────

fn parse_int(text: &str, radix: u32) -> f64 {
    let text = text.trim_start();
    let (negative, text) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    // Radix 0 means "detect": a hex prefix selects 16, anything else 10.
    let (radix, text) = match (radix, text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))) {
        (0 | 16, Some(rest)) => (16, rest),
        (0, None) => (10, text),
        (radix, _) => (radix, text),
    };
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    let digits: Vec<u32> = text.chars().map_while(|c| c.to_digit(radix)).collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    let value = digits
        .iter()
        .fold(0.0, |acc, digit| acc * f64::from(radix) + f64::from(*digit));
    if negative {
        -value
    } else {
        value
    }
}

fn parse_float(text: &str) -> f64 {
    let text = text.trim_start();
    for special in ["Infinity", "+Infinity"] {
        if text.starts_with(special) {
            return f64::INFINITY;
        }
    }
    if text.starts_with("-Infinity") {
        return f64::NEG_INFINITY;
    }
    // Longest prefix that parses as a number.
    let mut end = text
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit() || "+-.eE".contains(*c))
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
    while end > 0 {
        if let Ok(value) = text[..end].parse::<f64>() {
            return value;
        }
        end -= 1;
    }
    f64::NAN
}

// ─── Memo runtime ──────────────────────────────────────────────────

/// Exports of the memo runtime module: `c(n)` hands each function object
/// one persistent cache of `n` slots filled with `EMPTY`.
pub(super) fn memo_runtime(markers: &Markers) -> Vec<(String, Value)> {
    let empty = markers.empty.clone();
    let cache = Value::native("c", move |interp, _, args| {
        let Some(function) = interp.current_function() else {
            return Err(interp.type_error("c() called outside of a function"));
        };
        if let Some(existing) = function.cache.borrow().as_ref() {
            return Ok(Value::Array(existing.clone()));
        }
        let size = arg(&args, 0).to_number();
        let size = if size.is_finite() && size > 0.0 { size as usize } else { 0 };
        let slots = Rc::new(ArrayData {
            items: RefCell::new(vec![empty.clone(); size]),
            frozen: Cell::new(false),
        });
        *function.cache.borrow_mut() = Some(slots.clone());
        Ok(Value::Array(slots))
    });
    vec![
        ("c".to_string(), cache),
        ("EMPTY".to_string(), markers.empty.clone()),
        ("EARLY_RETURN".to_string(), markers.early_return.clone()),
        (
            "freeze".to_string(),
            Value::native("freeze", |_, _, args| Ok(freeze(arg(&args, 0)))),
        ),
    ]
}
