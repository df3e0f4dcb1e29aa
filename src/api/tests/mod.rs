mod compile;
mod inspect;

use crate::config::CompilerConfig;
use crate::*;

pub(super) fn compile_ok(source: &str, config: &CompilerConfig) -> CompiledProgram {
    match compile_program(source, "test.js", config) {
        Ok(output) => output,
        Err(errors) => panic!("compilation failed: {:?}", errors),
    }
}
