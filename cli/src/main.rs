mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{branch, compare, import, validate};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(env_filter).with_writer(std::io::stderr).init();
}

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose);
    match &cli.command {
        Commands::Compare(args) => compare::run(&cli, args),
        Commands::Branch(args) => branch::run(&cli, args),
        Commands::Import(args) => import::run(&cli, args),
        Commands::Validate(args) => validate::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
