//! The per-function pipeline shared by compilation and inspection.
//!
//! Lowering, analysis and scope construction run in a fresh `Environment`
//! per function, so functions never share state and can be compiled in any
//! order or in parallel.

use tracing::debug;

use crate::analysis::{analyze, Analysis};
use crate::ast;
use crate::codegen::{generate_function, GeneratedFunction, NameGen, RuntimeNames};
use crate::config::CompilerConfig;
use crate::error::CompilerError;
use crate::hir::builder::lower_function;
use crate::hir::{Environment, HirFunction};
use crate::reactive::{build_reactive_function, ReactiveFunction};

/// A function lowered, analyzed and split into reactive scopes.
pub struct PreparedFunction {
    pub env: Environment,
    pub hir: HirFunction,
    pub analysis: Analysis,
    pub reactive: ReactiveFunction,
}

impl PreparedFunction {
    pub fn build(func: &ast::Function, config: &CompilerConfig) -> Result<Self, CompilerError> {
        let (env, hir) = lower(func)?;
        let analysis = analyze(&hir, &env)?;
        let reactive = build_reactive_function(&hir, &env, &analysis, config)?;
        debug!(
            function = func.name_str().unwrap_or("<anonymous>"),
            blocks = hir.blocks.len(),
            cache_size = reactive.cache_size,
            "function prepared"
        );
        Ok(Self {
            env,
            hir,
            analysis,
            reactive,
        })
    }

    /// Emit the memoized form of `original`.
    pub fn generate(
        &self,
        original: &ast::Function,
        runtime: &RuntimeNames,
        names: NameGen,
        config: &CompilerConfig,
    ) -> Result<GeneratedFunction, CompilerError> {
        generate_function(&self.reactive, original, &self.env, runtime, names, config)
    }
}

/// Lower only, for inspecting the HIR of functions the analysis rejects.
pub fn lower(func: &ast::Function) -> Result<(Environment, HirFunction), CompilerError> {
    let mut env = Environment::new();
    let hir = lower_function(func, &mut env)?;
    Ok((env, hir))
}
