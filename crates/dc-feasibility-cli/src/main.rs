mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::feasibility::{BreakEvenArgs, ModelArgs, ProjectArgs};
use commands::monte_carlo::MonteCarloArgs;
use commands::scenarios::ScenarioArgs;
use commands::sensitivity::{GridArgs, TornadoArgs};

/// Data-center financial feasibility modelling
#[derive(Parser)]
#[command(
    name = "dcfeas",
    version,
    about = "Data-center financial feasibility modelling",
    long_about = "Projects a data-center build's pro forma with decimal precision and \
                  reports NPV, IRR, payback, break-even occupancy, tornado and grid \
                  sensitivity, probability-weighted scenarios and Monte Carlo NPV."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log solver progress to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Full feasibility model: NPV, IRR, payback, ROI, break-even
    Model(ModelArgs),
    /// Year-by-year cash flow projection only
    Project(ProjectArgs),
    /// Flat occupancy at which NPV is zero
    BreakEven(BreakEvenArgs),
    /// One-at-a-time NPV sensitivity (tornado)
    Tornado(TornadoArgs),
    /// Two-way NPV sensitivity grid
    Grid(GridArgs),
    /// Probability-weighted scenario analysis
    Scenarios(ScenarioArgs),
    /// Monte Carlo NPV distribution
    MonteCarlo(MonteCarloArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
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

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Model(args) => commands::feasibility::run_model(args),
        Commands::Project(args) => commands::feasibility::run_project(args),
        Commands::BreakEven(args) => commands::feasibility::run_break_even(args),
        Commands::Tornado(args) => commands::sensitivity::run_tornado(args),
        Commands::Grid(args) => commands::sensitivity::run_grid(args),
        Commands::Scenarios(args) => commands::scenarios::run_scenarios(args),
        Commands::MonteCarlo(args) => commands::monte_carlo::run_monte_carlo(args),
        Commands::Version => {
            println!("dcfeas {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
