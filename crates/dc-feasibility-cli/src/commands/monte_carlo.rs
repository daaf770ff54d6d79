use clap::Args;
use serde_json::Value;

use dc_feasibility_core::monte_carlo::simulation::{self, McFeasibilityInput};

use crate::input;

/// Arguments for Monte Carlo NPV simulation
#[derive(Args)]
pub struct MonteCarloArgs {
    /// Path to JSON or YAML input (base assumptions + driver distributions)
    #[arg(long)]
    pub input: Option<String>,

    /// Override the number of simulation paths
    #[arg(long)]
    pub simulations: Option<u32>,

    /// Override the RNG seed
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run_monte_carlo(args: MonteCarloArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut mc_input: McFeasibilityInput = input::load(args.input.as_deref())?
        .ok_or("--input <file> or stdin required for Monte Carlo simulation")?;
    if let Some(n) = args.simulations {
        mc_input.num_simulations = n;
    }
    if args.seed.is_some() {
        mc_input.seed = args.seed;
    }
    let result = simulation::simulate_npv(&mc_input)?;
    Ok(serde_json::to_value(result)?)
}
