use std::path::PathBuf;
use std::process;

use clap::Args;

use memoc::diagnostic::render_diagnostics;

use super::{read_sources, resolve_config, resolve_sources, ConfigArgs};

#[derive(Args)]
pub struct HashArgs {
    /// Input source file or directory
    pub input: PathBuf,
    /// Show full 256-bit hashes instead of short form
    #[arg(long)]
    pub full: bool,
    #[command(flatten)]
    pub config: ConfigArgs,
}

pub fn cmd_hash(args: HashArgs) {
    let resolved = resolve_config(&args.input, &args.config);
    let files = resolve_sources(&args.input);
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
        println!("{}", filename);
        for fp in program.fingerprints() {
            if args.full {
                println!("  {} {:>3} {}", fp.hash.to_hex(), fp.cache_size, fp.name);
            } else {
                println!("  {} {:>3} {}", fp.hash, fp.cache_size, fp.name);
            }
        }
    }
    if failed {
        process::exit(1);
    }
}
