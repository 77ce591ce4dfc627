use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use ts2bril::ir::verify::verify_program;
use ts2bril::ir::{to_json, Program};
use ts2bril::{compile_unit, LowerOptions, SourceSet};

#[derive(Parser)]
#[command(name = "ts2bril")]
#[command(about = "Lower a typed TypeScript subset to Bril JSON")]
struct Args {
    /// Path to the source file to lower
    file: Option<PathBuf>,

    /// Print bril-txt instead of JSON
    #[arg(long)]
    text: bool,

    /// Callee text that lowers to a print effect
    #[arg(long, default_value = "console.log")]
    print_builtin: String,

    /// Dump instruction to source mappings on stderr
    #[arg(long)]
    source_map: bool,

    /// Check the lowered program's structure before printing it
    #[arg(long)]
    verify: bool,

    /// Log lowering progress (repeat for more detail). RUST_LOG overrides this.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let Some(file) = args.file.as_deref() else {
        eprintln!("{}", Args::command().render_usage());
        return ExitCode::from(2);
    };

    match run(&args, file) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "ts2bril=debug",
        _ => "ts2bril=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args, file: &Path) -> Result<()> {
    let mut sources = SourceSet::new();
    let name = sources
        .load(file)
        .with_context(|| format!("reading '{}'", file.display()))?;
    debug!(unit = %name, "source loaded");

    let options = LowerOptions {
        print_builtin: args.print_builtin.clone(),
    };
    let program = compile_unit(&sources, &name, &options)?;

    if args.verify {
        verify_program(&program).context("lowered program failed verification")?;
    }

    if args.source_map {
        dump_source_map(&program);
    }

    if args.text {
        print!("{program}");
    } else {
        println!("{}", to_json(&program)?);
    }
    Ok(())
}

fn dump_source_map(program: &Program) {
    let map = &program.source_map;
    for (f, func) in program.functions.iter().enumerate() {
        eprintln!("@{}", func.name);
        for (i, instr) in func.instrs.iter().enumerate() {
            for m in map.get_mappings_for_instr((f, i)) {
                let pos = map
                    .position_of(m.ast_node_id)
                    .map(|(l, c)| format!("{l}:{c}"))
                    .unwrap_or_else(|| "?".to_string());
                let component = m
                    .component
                    .map(|c| format!(" [{c:?}]"))
                    .unwrap_or_default();
                eprintln!(
                    "  [{i:>3}] {instr}  <- node {} at {pos}{component}: {}",
                    m.ast_node_id.0, m.description
                );
            }
        }
    }
}
