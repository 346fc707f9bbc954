//! # dede CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use clap::Parser;

/// DEDE licensing workflow CLI.
///
/// Walks a seeded request through the approval process and runs
/// one-shot overdue sweep passes against it.
#[derive(Parser, Debug)]
#[command(name = "dede", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Walk a seeded request through the full approval path.
    Demo(dede_cli::demo::DemoArgs),
    /// Seed an overdue scenario and run one sweep pass.
    Sweep(dede_cli::sweep::SweepArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Demo(args) => dede_cli::demo::run(&args),
        Commands::Sweep(args) => dede_cli::sweep::run(&args),
    }
}
