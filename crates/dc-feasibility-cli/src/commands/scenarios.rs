use clap::Args;
use serde_json::Value;

use dc_feasibility_core::scenarios::scenario::{self, ScenarioInput};

use crate::input;

/// Arguments for scenario analysis
#[derive(Args)]
pub struct ScenarioArgs {
    /// Path to JSON or YAML input (base assumptions + weighted scenarios)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_scenarios(args: ScenarioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let scenario_input: ScenarioInput = input::load(args.input.as_deref())?
        .ok_or("--input <file> or stdin required for scenario analysis")?;
    let result = scenario::analyze_scenarios(&scenario_input)?;
    Ok(serde_json::to_value(result)?)
}
