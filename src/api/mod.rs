//! Public entry points: compile a program, a single function or a batch of
//! files, and inspect intermediate stages.
//!
//! Failures are scoped to one function. A function the compiler cannot
//! handle is kept unchanged and reported as skipped with a diagnostic; only
//! parse errors and configuration conflicts fail a whole program.

mod pipeline;
#[cfg(test)]
mod tests;

use std::collections::BTreeSet;
use std::fmt;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::ast::navigate::{collect_names, function_names, top_level_functions};
use crate::ast::{self, Expr, Item, Stmt};
use crate::codegen::{NameGen, RuntimeNames, RuntimeUses};
use crate::config::{CompilationMode, CompilerConfig};
use crate::diagnostic::Diagnostic;
use crate::error::CompilerError;
use crate::format::{format_function, format_program};
use crate::hash::{fingerprint, ContentHash};
use crate::span::{Span, Spanned};

pub use pipeline::{lower, PreparedFunction};

// ─── Results ───────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub enum FunctionOutcome {
    Compiled { cache_size: u32, scopes: usize },
    /// Emitted unchanged.
    Skipped { diagnostic: Diagnostic },
}

/// What happened to one compilation candidate.
#[derive(Clone, Debug)]
pub struct FunctionReport {
    pub name: String,
    pub outcome: FunctionOutcome,
}

impl FunctionReport {
    pub fn is_compiled(&self) -> bool {
        matches!(self.outcome, FunctionOutcome::Compiled { .. })
    }
}

#[derive(Clone, Debug)]
pub struct CompiledProgram {
    pub program: ast::Program,
    /// `program` formatted as source.
    pub code: String,
    pub functions: Vec<FunctionReport>,
}

impl CompiledProgram {
    /// Diagnostics of skipped functions, in source order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.functions
            .iter()
            .filter_map(|report| match &report.outcome {
                FunctionOutcome::Skipped { diagnostic } => Some(diagnostic.clone()),
                FunctionOutcome::Compiled { .. } => None,
            })
            .collect()
    }

    /// Fingerprint of every compiled function: its emitted code and slot
    /// count.
    pub fn fingerprints(&self) -> Vec<FunctionFingerprint> {
        let sites = top_level_functions(&self.program);
        self.functions
            .iter()
            .filter_map(|report| {
                let FunctionOutcome::Compiled { cache_size, .. } = report.outcome else {
                    return None;
                };
                let site = sites.iter().find(|site| site.name == report.name)?;
                Some(FunctionFingerprint {
                    name: report.name.clone(),
                    cache_size,
                    hash: fingerprint(&format_function(site.function), cache_size),
                })
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionFingerprint {
    pub name: String,
    pub cache_size: u32,
    pub hash: ContentHash,
}

#[derive(Clone, Debug)]
pub struct CompiledFunction {
    pub function: ast::Function,
    /// Import of the runtime helpers the function uses, if any.
    pub import: Option<ast::ImportDecl>,
    /// The function formatted as a declaration.
    pub code: String,
    pub cache_size: u32,
    pub scopes: usize,
}

/// One file of a batch.
#[derive(Debug)]
pub struct BatchEntry {
    pub name: String,
    pub result: Result<CompiledProgram, Vec<Diagnostic>>,
}

// ─── Compilation ───────────────────────────────────────────────────

/// Compile every candidate function of a source file.
pub fn compile_program(
    source: &str,
    filename: &str,
    config: &CompilerConfig,
) -> Result<CompiledProgram, Vec<Diagnostic>> {
    config.validate().map_err(|err| vec![err.to_diagnostic()])?;
    let (program, comments) = crate::parse_source_with_comments(source, filename)?;
    let (program, functions) = transform_program(&program, config);
    let code = format_program(&program, &comments);
    let compiled = functions.iter().filter(|f| f.is_compiled()).count();
    debug!(
        file = filename,
        candidates = functions.len(),
        compiled,
        "program compiled"
    );
    Ok(CompiledProgram {
        program,
        code,
        functions,
    })
}

/// Compile one function on its own. Generated names avoid every name the
/// function spells.
pub fn compile_function(
    function: &ast::Function,
    config: &CompilerConfig,
) -> Result<CompiledFunction, CompilerError> {
    config.validate()?;
    let mut reserved = BTreeSet::new();
    function_names(function, &mut reserved);
    let mut names = NameGen::new(reserved);
    let runtime = RuntimeNames::choose(&mut names);
    let transformed = transform_function(function, &runtime, names, config)?;
    Ok(CompiledFunction {
        code: format_function(&transformed.function),
        import: runtime.import(transformed.uses, &config.runtime_module),
        function: transformed.function,
        cache_size: transformed.cache_size,
        scopes: transformed.scopes,
    })
}

/// Compile independent files in parallel. Results keep the input order.
pub fn compile_batch(sources: &[(String, String)], config: &CompilerConfig) -> Vec<BatchEntry> {
    sources
        .par_iter()
        .map(|(name, source)| BatchEntry {
            name: name.clone(),
            result: compile_program(source, name, config),
        })
        .collect()
}

/// Whether a candidate is compiled under `config`.
pub fn is_selected(function: &ast::Function, config: &CompilerConfig) -> bool {
    if function.has_directive("use no memo") {
        return false;
    }
    match config.compilation_mode {
        CompilationMode::Infer => true,
        CompilationMode::Annotation => function.has_directive("use memo"),
    }
}

struct Transformed {
    function: ast::Function,
    uses: RuntimeUses,
    cache_size: u32,
    scopes: usize,
}

fn transform_function(
    function: &ast::Function,
    runtime: &RuntimeNames,
    names: NameGen,
    config: &CompilerConfig,
) -> Result<Transformed, CompilerError> {
    let prepared = PreparedFunction::build(function, config)?;
    let cache_size = prepared.reactive.cache_size;
    let scopes = prepared.reactive.scopes().len();
    if cache_size == 0 {
        return Ok(Transformed {
            function: function.clone(),
            uses: RuntimeUses::default(),
            cache_size,
            scopes,
        });
    }
    let generated = prepared.generate(function, runtime, names, config)?;
    Ok(Transformed {
        function: generated.function,
        uses: generated.uses,
        cache_size,
        scopes,
    })
}

fn transform_program(
    program: &ast::Program,
    config: &CompilerConfig,
) -> (ast::Program, Vec<FunctionReport>) {
    let mut names = NameGen::new(collect_names(program));
    let runtime = RuntimeNames::choose(&mut names);
    let mut uses = RuntimeUses::default();
    let mut output = program.clone();
    let mut reports = Vec::new();

    for site in top_level_functions(program) {
        if !is_selected(site.function, config) {
            debug!(function = %site.name, "function not selected");
            continue;
        }
        let outcome = match transform_function(site.function, &runtime, names.clone(), config) {
            Ok(transformed) => {
                uses.merge(transformed.uses);
                if let Some(slot) = output
                    .items
                    .get_mut(site.item_index)
                    .and_then(|item| function_slot(&mut item.node))
                {
                    *slot = transformed.function;
                }
                FunctionOutcome::Compiled {
                    cache_size: transformed.cache_size,
                    scopes: transformed.scopes,
                }
            }
            Err(err) => {
                warn!(function = %site.name, error = %err, "function skipped");
                FunctionOutcome::Skipped {
                    diagnostic: err.to_diagnostic(),
                }
            }
        };
        reports.push(FunctionReport {
            name: site.name,
            outcome,
        });
    }

    if let Some(import) = runtime.import(uses, &config.runtime_module) {
        let position = output
            .items
            .iter()
            .take_while(|item| matches!(item.node, Item::Import(_)))
            .count();
        output
            .items
            .insert(position, Spanned::dummy(Item::Import(import)));
    }
    (output, reports)
}

/// The function a candidate item introduces.
fn function_slot(item: &mut Item) -> Option<&mut ast::Function> {
    let Item::Stmt { stmt, .. } = item else {
        return None;
    };
    match &mut stmt.node {
        Stmt::FunctionDecl(function) => Some(function),
        Stmt::VarDecl { decls, .. } => match decls.first_mut()?.init.as_mut()?.node {
            Expr::Function(ref mut function) => Some(function),
            _ => None,
        },
        _ => None,
    }
}

// ─── Inspection ────────────────────────────────────────────────────

/// Intermediate forms printed by `memoc inspect`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Hir,
    Scopes,
    Code,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Hir => "hir",
            Stage::Scopes => "scopes",
            Stage::Code => "code",
        })
    }
}

/// Print one stage for the named function, or for every candidate.
pub fn inspect(
    source: &str,
    filename: &str,
    function: Option<&str>,
    stage: Stage,
    config: &CompilerConfig,
) -> Result<String, Vec<Diagnostic>> {
    config.validate().map_err(|err| vec![err.to_diagnostic()])?;
    let program = crate::parse_source_silent(source, filename)?;
    let sites: Vec<_> = top_level_functions(&program)
        .into_iter()
        .filter(|site| function.map_or(true, |name| site.name == name))
        .collect();
    if let (Some(name), true) = (function, sites.is_empty()) {
        return Err(vec![Diagnostic::error(
            format!("no top-level function named '{}'", name),
            Span::dummy(),
        )]);
    }

    let mut sections = Vec::new();
    for site in sites {
        let text = match stage {
            Stage::Hir => lower(site.function)
                .map(|(env, hir)| crate::hir::print::print_function(&hir, &env)),
            Stage::Scopes => PreparedFunction::build(site.function, config)
                .map(|p| crate::reactive::print_reactive_function(&p.reactive, &p.env)),
            Stage::Code => compile_function(site.function, config).map(|compiled| {
                match &compiled.import {
                    Some(import) => {
                        let program = ast::Program {
                            items: vec![Spanned::dummy(Item::Import(import.clone()))],
                        };
                        format!("{}{}", format_program(&program, &[]), compiled.code)
                    }
                    None => compiled.code,
                }
            }),
        };
        sections.push(match text {
            Ok(text) => text,
            Err(err) => format!("// {}: skipped: {}\n", site.name, err),
        });
    }
    Ok(sections.join("\n"))
}
