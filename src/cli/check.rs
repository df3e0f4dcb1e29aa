use std::path::PathBuf;
use std::process;

use clap::Args;

use memoc::diagnostic::render_diagnostics;
use memoc::FunctionOutcome;

use super::{read_sources, report_skipped, resolve_config, resolve_sources, ConfigArgs};

#[derive(Args)]
pub struct CheckArgs {
    /// Input source file or directory
    pub input: PathBuf,
    /// List each function with its slot count
    #[arg(long)]
    pub functions: bool,
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Compile without writing output and summarize what would change.
pub fn cmd_check(args: CheckArgs) {
    let CheckArgs {
        input,
        functions,
        config,
    } = args;
    let resolved = resolve_config(&input, &config);
    let files = resolve_sources(&input);
    let sources = read_sources(&files);
    let entries = memoc::compile_batch(&sources, &resolved.config);

    let mut failed = false;
    for ((filename, source), entry) in sources.iter().zip(&entries) {
        let program = match &entry.result {
            Ok(p) => p,
            Err(diagnostics) => {
                render_diagnostics(diagnostics, filename, source);
                failed = true;
                continue;
            }
        };
        report_skipped(program, filename, source);
        let compiled = program.functions.iter().filter(|f| f.is_compiled()).count();
        eprintln!(
            "OK: {} ({} compiled, {} skipped)",
            filename,
            compiled,
            program.functions.len() - compiled
        );
        if functions {
            for report in &program.functions {
                match &report.outcome {
                    FunctionOutcome::Compiled { cache_size, scopes } => println!(
                        "  {} {} slot(s) in {} scope(s)",
                        report.name, cache_size, scopes
                    ),
                    FunctionOutcome::Skipped { diagnostic } => {
                        println!("  {} skipped: {}", report.name, diagnostic.message)
                    }
                }
            }
        }
    }
    if failed {
        process::exit(1);
    }
}
