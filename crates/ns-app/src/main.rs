use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use ns_lang::{compile_with, Error, Options, Redeclaration};
use tracing_subscriber::EnvFilter;

/// Run or check an NS program.
#[derive(Parser, Debug)]
#[command(name = "ns", version, about, long_about = None)]
struct Cli {
    /// Source file to run
    file: PathBuf,

    /// Arguments passed to the program as `args`
    args: Vec<String>,

    /// Only analyze the program; do not run it
    #[arg(long)]
    check: bool,

    /// Print the program's final value after it finishes
    #[arg(long)]
    print_result: bool,

    /// A `def` may replace an earlier function of the same name
    #[arg(long)]
    shadow_functions: bool,

    /// Nested function calls allowed before the run is aborted
    #[arg(long, default_value_t = Options::default().max_call_depth)]
    max_call_depth: usize,

    /// More log output (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

const EXIT_DIAGNOSTICS: u8 = 1;
const EXIT_RUNTIME: u8 = 2;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let source = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("failed to read {}", cli.file.display()))?;

    let policy = if cli.shadow_functions { Redeclaration::Shadow } else { Redeclaration::Error };
    let options = Options::default()
        .with_redeclaration(policy)
        .with_max_call_depth(cli.max_call_depth);

    let program = match compile_with(&source, &options) {
        Ok(p) => p,
        Err(errors) => {
            report(&cli.file, &errors);
            return Ok(ExitCode::from(EXIT_DIAGNOSTICS));
        }
    };
    for w in &program.analysis().warnings {
        eprintln!("{}: [warn] {w}", cli.file.display());
    }

    if cli.check {
        tracing::info!(file = %cli.file.display(), "no diagnostics");
        return Ok(ExitCode::SUCCESS);
    }

    match program.run(cli.args) {
        Ok(value) => {
            if cli.print_result {
                println!("{value}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}: {e}", cli.file.display());
            Ok(ExitCode::from(EXIT_RUNTIME))
        }
    }
}

fn report(file: &std::path::Path, errors: &[Error]) {
    for e in errors {
        eprintln!("{}: {e}", file.display());
    }
    eprintln!("{} error(s)", errors.len());
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "ns_lang=debug",
        _ => "ns_lang=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
