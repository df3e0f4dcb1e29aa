pub mod check;
pub mod compile;
pub mod hash;
pub mod inspect;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, ValueEnum};
use tracing::debug;

use memoc::config::{CompilationMode, CompilerConfig};
use memoc::diagnostic::render_diagnostics;
use memoc::project::Project;

/// File extensions treated as sources when walking a directory.
const SOURCE_EXTENSIONS: &[&str] = &["js", "jsx", "mjs"];

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModeArg {
    /// Compile every candidate function
    Infer,
    /// Compile only functions with a "use memo" directive
    Annotation,
}

impl From<ModeArg> for CompilationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Infer => CompilationMode::Infer,
            ModeArg::Annotation => CompilationMode::Annotation,
        }
    }
}

/// Compiler options shared by every subcommand.
#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    /// Project file to read options from (default: nearest memoc.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Which functions to compile
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,
    /// Freeze cached values at runtime (development only)
    #[arg(long)]
    pub emit_freeze: bool,
}

/// Options resolved from the project file and command-line overrides.
pub struct Resolved {
    pub project: Option<Project>,
    pub config: CompilerConfig,
}

fn load_project(toml_path: &Path) -> Project {
    match Project::load(toml_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {}", e.message);
            for note in &e.notes {
                eprintln!("  note: {}", note);
            }
            process::exit(1);
        }
    }
}

/// Load the project for `input` (or `--config`) and apply overrides.
pub fn resolve_config(input: &Path, args: &ConfigArgs) -> Resolved {
    let toml_path = match &args.config {
        Some(path) => Some(path.clone()),
        None => {
            let start = if input.is_dir() {
                input
            } else {
                input.parent().unwrap_or(Path::new("."))
            };
            Project::find(start)
        }
    };
    let project = toml_path.as_deref().map(load_project);
    let mut config = project
        .as_ref()
        .map(|p| p.compiler.clone())
        .unwrap_or_default();
    if let Some(mode) = args.mode {
        config.compilation_mode = mode.into();
    }
    if args.emit_freeze {
        config.emit_freeze = true;
    }
    if let Err(err) = config.validate() {
        eprintln!("error: {}", err);
        process::exit(1);
    }
    debug!(project = ?toml_path, mode = ?config.compilation_mode, "configuration resolved");
    Resolved { project, config }
}

/// Source files for an input: the file itself, or every source file under a
/// directory in sorted order.
pub fn resolve_sources(input: &Path) -> Vec<PathBuf> {
    if input.is_dir() {
        let mut result = Vec::new();
        collect_sources(input, &mut result);
        result.sort();
        result
    } else if is_source(input) {
        vec![input.to_path_buf()]
    } else {
        eprintln!("error: input must be a .js/.jsx/.mjs file or a directory");
        process::exit(1);
    }
}

fn is_source(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e))
}

fn collect_sources(dir: &Path, result: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        let name_str = name.to_string_lossy();

        // Skip hidden directories and installed packages
        if name_str.starts_with('.') || name_str == "node_modules" {
            continue;
        }

        if path.is_dir() {
            collect_sources(&path, result);
        } else if is_source(&path) {
            result.push(path);
        }
    }
}

/// Read a source file, exiting on error.
pub fn read_source(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", path.display(), e);
            process::exit(1);
        }
    }
}

/// Read every file up front; batches compile from memory.
pub fn read_sources(paths: &[PathBuf]) -> Vec<(String, String)> {
    paths
        .iter()
        .map(|path| (path.display().to_string(), read_source(path)))
        .collect()
}

/// Print the diagnostics of skipped functions; they do not fail a run.
pub fn report_skipped(program: &memoc::CompiledProgram, filename: &str, source: &str) {
    let diagnostics = program.diagnostics();
    if !diagnostics.is_empty() {
        render_diagnostics(&diagnostics, filename, source);
    }
}
