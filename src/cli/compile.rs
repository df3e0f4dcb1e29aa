use std::path::{Path, PathBuf};
use std::process;

use clap::Args;
use tracing::{debug, info};

use memoc::diagnostic::render_diagnostics;

use super::{read_source, read_sources, report_skipped, resolve_config, resolve_sources, ConfigArgs};

#[derive(Args)]
pub struct CompileArgs {
    /// Input source file or directory
    pub input: PathBuf,
    /// Output file (file input) or directory (directory input); default:
    /// stdout, or the project's out_dir
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[command(flatten)]
    pub config: ConfigArgs,
}

pub fn cmd_compile(args: CompileArgs) {
    let CompileArgs {
        input,
        output,
        config,
    } = args;
    let resolved = resolve_config(&input, &config);

    if !input.is_dir() {
        let files = resolve_sources(&input);
        let path = &files[0];
        let source = read_source(path);
        let filename = path.display().to_string();
        let program = match memoc::compile_program(&source, &filename, &resolved.config) {
            Ok(p) => p,
            Err(diagnostics) => {
                render_diagnostics(&diagnostics, &filename, &source);
                process::exit(1);
            }
        };
        report_skipped(&program, &filename, &source);
        match output {
            Some(out) => write_output(&out, &program.code),
            None => print!("{}", program.code),
        }
        return;
    }

    let out_dir = match output.or_else(|| {
        resolved
            .project
            .as_ref()
            .and_then(|p| p.out_dir.as_ref().map(|dir| p.root_dir.join(dir)))
    }) {
        Some(dir) => dir,
        None => {
            eprintln!("error: compiling a directory needs -o <dir> or out_dir in memoc.toml");
            process::exit(1);
        }
    };

    let files = resolve_sources(&input);
    let sources = read_sources(&files);
    debug!(files = sources.len(), "compiling directory");
    let entries = memoc::compile_batch(&sources, &resolved.config);

    let mut failed = 0;
    let mut compiled = 0;
    let mut skipped = 0;
    for ((path, (filename, source)), entry) in files.iter().zip(&sources).zip(&entries) {
        match &entry.result {
            Ok(program) => {
                report_skipped(program, filename, source);
                compiled += program.functions.iter().filter(|f| f.is_compiled()).count();
                skipped += program.functions.iter().filter(|f| !f.is_compiled()).count();
                let relative = path.strip_prefix(&input).unwrap_or(path);
                write_output(&out_dir.join(relative), &program.code);
            }
            Err(diagnostics) => {
                render_diagnostics(diagnostics, filename, source);
                failed += 1;
            }
        }
    }

    info!(files = files.len(), compiled, skipped, failed, "directory compiled");
    eprintln!(
        "Compiled {} file(s) into {}: {} function(s) compiled, {} skipped",
        files.len() - failed,
        out_dir.display(),
        compiled,
        skipped
    );
    if failed > 0 {
        eprintln!("error: {} file(s) failed to parse", failed);
        process::exit(1);
    }
}

fn write_output(path: &Path, code: &str) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("error: cannot create '{}': {}", parent.display(), e);
            process::exit(1);
        }
    }
    if let Err(e) = std::fs::write(path, code) {
        eprintln!("error: cannot write '{}': {}", path.display(), e);
        process::exit(1);
    }
}
