use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::check::CheckArgs;
use cli::compile::CompileArgs;
use cli::hash::HashArgs;
use cli::inspect::InspectArgs;

/// Environment variable holding a log filter, e.g. `MEMOC_LOG=memoc=trace`.
const LOG_ENV: &str = "MEMOC_LOG";

#[derive(Parser)]
#[command(
    name = "memoc",
    version,
    about = "Auto-memoizing compiler for component-style JavaScript functions"
)]
struct Cli {
    /// Log more (-v: debug, -vv: trace); MEMOC_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a source file or a directory of source files
    Compile(CompileArgs),
    /// Compile without writing output and report per-file results
    Check(CheckArgs),
    /// Print an intermediate stage for one or all functions
    Inspect(InspectArgs),
    /// Show fingerprints of compiled functions (BLAKE3)
    Hash(HashArgs),
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Compile(args) => cli::compile::cmd_compile(args),
        Command::Check(args) => cli::check::cmd_check(args),
        Command::Inspect(args) => cli::inspect::cmd_inspect(args),
        Command::Hash(args) => cli::hash::cmd_hash(args),
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "memoc=debug",
        _ => "memoc=trace",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
