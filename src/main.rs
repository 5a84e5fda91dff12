//! `sysyc` — compiles one SysY source file to Koopa IR, RISC-V assembly,
//! or an AST dump, depending on which mode flag is set.

use std::path::PathBuf;
use std::process;

use clap::{ArgGroup, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

use sysy_compiler::{compile_file, CompileMode, Config};

#[derive(Parser)]
#[command(name = "sysyc", about = "Compiler for the SysY language")]
#[command(group(ArgGroup::new("mode").args(["koopa", "riscv", "ast"]).multiple(false)))]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Emit Koopa IR.
    #[arg(long = "koopa")]
    koopa: bool,

    /// Emit RISC-V assembly.
    #[arg(long = "riscv")]
    riscv: bool,

    /// Dump the parsed AST instead of compiling.
    #[arg(long = "ast")]
    ast: bool,

    /// Input SysY source file.
    input: Option<PathBuf>,

    /// Output path.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a shell completion script for `sysyc` itself.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(shell, &mut cmd, name, &mut std::io::stdout());
        return;
    }

    let mode = if cli.riscv {
        CompileMode::EmitRiscv
    } else if cli.ast {
        CompileMode::DumpAst
    } else {
        CompileMode::EmitKoopa
    };

    let Some(input) = cli.input else {
        eprintln!("Error: no input file given");
        process::exit(1);
    };
    let Some(output) = cli.output else {
        eprintln!("Error: -o/--output is required");
        process::exit(1);
    };

    let config = Config { mode, input, output };
    if let Err(e) = compile_file(&config) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
