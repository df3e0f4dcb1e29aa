pub mod project;

use serde::{Deserialize, Serialize};

use crate::error::CompilerError;

/// Which functions are compiled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilationMode {
    /// Every top-level function that is not opted out.
    #[default]
    Infer,
    /// Only functions carrying a `"use memo"` directive.
    Annotation,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Options for one compilation. Deserialized from the `[compiler]` table of
/// `memoc.toml`; every field has a default.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    pub compilation_mode: CompilationMode,
    /// Treat `useMemo`/`useCallback` results as escaping so they stay memoized.
    pub enable_preserve_existing_memoization_guarantees: bool,
    /// Pass each computed output through the runtime's `freeze` before caching it.
    pub emit_freeze: bool,
    pub environment: Environment,
    /// Module the cache helpers are imported from.
    pub runtime_module: String,
}

pub const DEFAULT_RUNTIME_MODULE: &str = "memoc/runtime";

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            compilation_mode: CompilationMode::Infer,
            enable_preserve_existing_memoization_guarantees: false,
            emit_freeze: false,
            environment: Environment::Development,
            runtime_module: DEFAULT_RUNTIME_MODULE.to_string(),
        }
    }
}

impl CompilerConfig {
    /// Reject mutually exclusive options.
    pub fn validate(&self) -> Result<(), CompilerError> {
        if self.emit_freeze && self.environment == Environment::Production {
            return Err(CompilerError::conflict(
                "`emit_freeze` is a development aid and cannot be enabled in production",
            ));
        }
        if self.runtime_module.trim().is_empty() {
            return Err(CompilerError::conflict("`runtime_module` must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = CompilerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.compilation_mode, CompilationMode::Infer);
        assert_eq!(config.runtime_module, DEFAULT_RUNTIME_MODULE);
    }

    #[test]
    fn test_freeze_in_production_conflicts() {
        let config = CompilerConfig {
            emit_freeze: true,
            environment: Environment::Production,
            ..CompilerConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ConfigurationConflict);
    }

    #[test]
    fn test_deserialize_partial_table() {
        let config: CompilerConfig =
            toml::from_str("compilation_mode = \"annotation\"\nemit_freeze = true\n").unwrap();
        assert_eq!(config.compilation_mode, CompilationMode::Annotation);
        assert!(config.emit_freeze);
        assert!(!config.enable_preserve_existing_memoization_guarantees);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<CompilerConfig, _> = toml::from_str("emit_frieze = true\n");
        assert!(result.is_err());
    }
}
