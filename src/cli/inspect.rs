use std::path::PathBuf;
use std::process;

use clap::{Args, ValueEnum};

use memoc::diagnostic::render_diagnostics;
use memoc::Stage;

use super::{read_source, resolve_config, ConfigArgs};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StageArg {
    /// Control-flow graph after lowering
    Hir,
    /// Reactive scopes with dependencies and outputs
    Scopes,
    /// Generated code
    Code,
}

impl From<StageArg> for Stage {
    fn from(stage: StageArg) -> Self {
        match stage {
            StageArg::Hir => Stage::Hir,
            StageArg::Scopes => Stage::Scopes,
            StageArg::Code => Stage::Code,
        }
    }
}

#[derive(Args)]
pub struct InspectArgs {
    /// Input source file
    pub input: PathBuf,
    /// Stage to print
    #[arg(long, value_enum, default_value = "code")]
    pub stage: StageArg,
    /// Only this top-level function (default: every candidate)
    #[arg(short, long)]
    pub function: Option<String>,
    #[command(flatten)]
    pub config: ConfigArgs,
}

pub fn cmd_inspect(args: InspectArgs) {
    let resolved = resolve_config(&args.input, &args.config);
    let source = read_source(&args.input);
    let filename = args.input.display().to_string();
    match memoc::inspect(
        &source,
        &filename,
        args.function.as_deref(),
        args.stage.into(),
        &resolved.config,
    ) {
        Ok(text) => print!("{}", text),
        Err(diagnostics) => {
            render_diagnostics(&diagnostics, &filename, &source);
            process::exit(1);
        }
    }
}
