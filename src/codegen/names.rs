//! Fresh names for generated identifiers and labels.

use std::collections::BTreeSet;

/// Hands out names that collide neither with each other nor with any name
/// spelled in the program.
#[derive(Clone, Debug, Default)]
pub struct NameGen {
    taken: BTreeSet<String>,
}

impl NameGen {
    pub fn new(reserved: BTreeSet<String>) -> Self {
        Self { taken: reserved }
    }

    /// `base` itself if free, else `base2`, `base3`, ...
    pub fn prefer(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}{}", base, n);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    /// `prefix0`, `prefix1`, ... skipping taken names.
    pub fn fresh(&mut self, prefix: &str) -> String {
        let mut n = 0;
        loop {
            let candidate = format!("{}{}", prefix, n);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(name)
    }
}

/// Whether `name` can be written as a bare identifier or property key.
pub fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_skips_reserved_names() {
        let reserved: BTreeSet<String> = ["t0", "t2"].iter().map(|s| s.to_string()).collect();
        let mut names = NameGen::new(reserved);
        assert_eq!(names.fresh("t"), "t1");
        assert_eq!(names.fresh("t"), "t3");
        assert!(names.is_taken("t3"));
    }

    #[test]
    fn test_prefer_falls_back_to_numbered() {
        let mut names = NameGen::default();
        assert_eq!(names.prefer("_c"), "_c");
        assert_eq!(names.prefer("_c"), "_c2");
    }

    #[test]
    fn test_identifier_names() {
        assert!(is_identifier_name("value"));
        assert!(is_identifier_name("$el"));
        assert!(!is_identifier_name("data-id"));
        assert!(!is_identifier_name("1st"));
        assert!(!is_identifier_name(""));
    }
}
