//! Known globals: hook naming and the builtin shape table.

/// What a known builtin returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeResult {
    Primitive,
    /// A fresh object that does not alias the arguments.
    Fresh,
    /// A fresh object that may hold references to the arguments' contents.
    FreshCapturing,
}

/// Builtins never mutate their arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuiltinShape {
    pub result: ShapeResult,
}

const PRIMITIVE: BuiltinShape = BuiltinShape {
    result: ShapeResult::Primitive,
};
const FRESH: BuiltinShape = BuiltinShape {
    result: ShapeResult::Fresh,
};
const FRESH_CAPTURING: BuiltinShape = BuiltinShape {
    result: ShapeResult::FreshCapturing,
};

/// `use` or `use` followed by an uppercase letter.
pub fn is_hook_name(name: &str) -> bool {
    match name.strip_prefix("use") {
        Some("") => true,
        Some(rest) => rest.starts_with(|c: char| c.is_ascii_uppercase()),
        None => false,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManualMemo {
    UseMemo,
    UseCallback,
}

pub fn manual_memo_kind(name: &str) -> Option<ManualMemo> {
    match name {
        "useMemo" => Some(ManualMemo::UseMemo),
        "useCallback" => Some(ManualMemo::UseCallback),
        _ => None,
    }
}

/// Shape of a global called directly, e.g. `parseInt(x)`.
pub fn builtin_function(name: &str) -> Option<BuiltinShape> {
    match name {
        "parseInt" | "parseFloat" | "isNaN" | "isFinite" | "Number" | "String" | "Boolean" => {
            Some(PRIMITIVE)
        }
        _ => None,
    }
}

/// Shape of a method on a global namespace, e.g. `Math.max(a, b)`.
pub fn builtin_method(global: &str, method: &str) -> Option<BuiltinShape> {
    match (global, method) {
        ("Math", _) => Some(PRIMITIVE),
        ("JSON", "stringify") => Some(PRIMITIVE),
        ("JSON", "parse") => Some(FRESH),
        ("Number", "isInteger" | "isFinite" | "isNaN" | "parseFloat" | "parseInt") => {
            Some(PRIMITIVE)
        }
        ("Object", "keys") => Some(FRESH),
        ("Object", "values" | "entries") => Some(FRESH_CAPTURING),
        ("Array", "isArray") => Some(PRIMITIVE),
        ("Array", "from" | "of") => Some(FRESH_CAPTURING),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_names() {
        assert!(is_hook_name("use"));
        assert!(is_hook_name("useState"));
        assert!(is_hook_name("useMyThing"));
        assert!(!is_hook_name("user"));
        assert!(!is_hook_name("usefulThing"));
        assert!(!is_hook_name("fetchUser"));
    }

    #[test]
    fn test_builtin_shapes() {
        assert_eq!(builtin_method("Math", "max"), Some(PRIMITIVE));
        assert_eq!(builtin_method("Object", "keys").map(|s| s.result), Some(ShapeResult::Fresh));
        assert_eq!(builtin_method("Object", "assign"), None);
        assert_eq!(builtin_function("parseInt"), Some(PRIMITIVE));
        assert_eq!(builtin_function("fetch"), None);
        assert_eq!(manual_memo_kind("useMemo"), Some(ManualMemo::UseMemo));
    }
}
