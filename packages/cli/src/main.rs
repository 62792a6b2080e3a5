mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{compile, init, inspect, CompileArgs, InitArgs, InspectArgs};
use tracing_subscriber::EnvFilter;

/// busgen - typed Rust client stubs from D-Bus introspection XML
#[derive(Parser, Debug)]
#[command(name = "busgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log compiler progress (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create busgen.config.json and an example interface
    Init(InitArgs),

    /// Compile introspection documents to Rust stubs
    Compile(CompileArgs),

    /// Print the parsed introspection AST as JSON, or a typed summary
    Inspect(InspectArgs),
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?.display().to_string();

    match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Compile(args) => compile(args, &cwd),
        Command::Inspect(args) => inspect(args, &cwd),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
