//! Resolved CLI state, threaded from `main.rs` into the library entry
//! point. No external configuration file or pluggable-builtins surface
//! is needed here — the language and the two lowering targets are fixed
//! by the assignment this compiler implements, unlike the teacher's
//! `CompilerConfig`/`ExternalBuiltin` extensibility layer.

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileMode {
    EmitKoopa,
    EmitRiscv,
    DumpAst,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: CompileMode,
    pub input: PathBuf,
    pub output: PathBuf,
}
