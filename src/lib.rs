//! Library entry point: wires the parser (external, generated by
//! `lalrpop`), the Koopa emitter, and the RISC-V backend together behind
//! one `compile`/`compile_file` call, mirroring the shape of the
//! teacher's `compile_file`/`compile_file_with_config` orchestration.

pub mod ast;
mod backend;
pub mod config;
mod const_eval;
mod init;
mod koopa_gen;
pub mod scope;

use std::fmt;
use std::fs;
use std::path::Path;

use lalrpop_util::lalrpop_mod;

lalrpop_mod!(pub sysy);

pub use config::{CompileMode, Config};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Scope,
    Codegen,
    Backend,
    Io,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Parse => "Parse",
            Stage::Scope => "Scope",
            Stage::Codegen => "Codegen",
            Stage::Backend => "Backend",
            Stage::Io => "Io",
        };
        write!(f, "{s}")
    }
}

/// The one shape every stage's richer internal error converges to at
/// the CLI boundary (§3.1). Each stage keeps its own typed enum
/// internally (see `koopa_gen::CodegenError`, `backend::BackendError`)
/// and converts to this only when handing control back to `main`.
#[derive(Debug)]
pub struct Diagnostic {
    pub stage: Stage,
    pub message: String,
    pub line: Option<usize>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} (line {line}): {}", self.stage, self.message),
            None => write!(f, "{}: {}", self.stage, self.message),
        }
    }
}

impl std::error::Error for Diagnostic {}

impl Diagnostic {
    fn new(stage: Stage, message: impl Into<String>) -> Self {
        Diagnostic { stage, message: message.into(), line: None }
    }
}

/// Parse `source`, then lower it as far as `mode` requires, returning
/// the resulting text (Koopa IR, RISC-V assembly, or an AST debug dump).
pub fn compile(source: &str, mode: CompileMode) -> Result<String, Diagnostic> {
    let parser = sysy::CompUnitParser::new();
    let ast = parser
        .parse(source)
        .map_err(|e| Diagnostic::new(Stage::Parse, e.to_string()))?;

    if mode == CompileMode::DumpAst {
        return Ok(format!("{ast:#?}"));
    }

    let ir = koopa_gen::emit(&ast).map_err(|e| Diagnostic::new(Stage::Scope, e.to_string()))?;

    match mode {
        CompileMode::EmitKoopa => Ok(ir),
        CompileMode::EmitRiscv => {
            backend::emit(ir).map_err(|e| Diagnostic::new(Stage::Backend, e.to_string()))
        }
        CompileMode::DumpAst => unreachable!("handled above"),
    }
}

/// Read `config.input`, compile it per `config.mode`, and write the
/// result to `config.output`. I/O failures at either end are reported
/// as `Io`-stage diagnostics with the OS error message attached, never
/// silently swallowed.
pub fn compile_file(config: &Config) -> Result<(), Diagnostic> {
    let source = fs::read_to_string(&config.input).map_err(|e| {
        Diagnostic::new(Stage::Io, format!("reading {}: {e}", config.input.display()))
    })?;
    let output = compile(&source, config.mode)?;
    write_output(&config.output, &output)
}

fn write_output(path: &Path, text: &str) -> Result<(), Diagnostic> {
    fs::write(path, text)
        .map_err(|e| Diagnostic::new(Stage::Io, format!("writing {}: {e}", path.display())))
}
