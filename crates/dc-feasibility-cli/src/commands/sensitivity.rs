use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use dc_feasibility_core::feasibility::assumptions::Driver;
use dc_feasibility_core::scenarios::sensitivity::{
    self, GridAxis, NpvGridInput, TornadoInput, TornadoVariable,
};

use crate::input;

/// Arguments for tornado sensitivity
#[derive(Args)]
pub struct TornadoArgs {
    /// Path to a full tornado input (base + variables) as JSON or YAML
    #[arg(long)]
    pub input: Option<String>,

    /// Path to the base assumptions, used with --vars
    #[arg(long)]
    pub base: Option<String>,

    /// Drivers to perturb, comma separated (e.g. total_capex,revenue_per_kw_month
    /// or opex:power=900000 for an OpEx component)
    #[arg(long, value_delimiter = ',')]
    pub vars: Vec<String>,

    /// Relative perturbation (default 0.20)
    #[arg(long)]
    pub perturbation: Option<Decimal>,
}

/// Arguments for the two-way NPV grid
#[derive(Args)]
pub struct GridArgs {
    /// Path to a full grid input (base + axes) as JSON or YAML
    #[arg(long)]
    pub input: Option<String>,

    /// Path to the base assumptions, used with --var1/--var2
    #[arg(long)]
    pub base: Option<String>,

    /// First axis in format driver:min:max:step
    /// (e.g. "discount_rate:0.08:0.12:0.01")
    #[arg(long)]
    pub var1: Option<String>,

    /// Second axis in format driver:min:max:step
    #[arg(long)]
    pub var2: Option<String>,
}

/// Parse a driver name. OpEx components are written `opex:<name>=<amount>`.
fn parse_driver(spec: &str) -> Result<Driver, Box<dyn std::error::Error>> {
    if let Some(component) = spec.strip_prefix("opex:") {
        let (name, amount) = component
            .split_once('=')
            .ok_or_else(|| format!("OpEx component must be opex:<name>=<amount>, got '{spec}'"))?;
        return Ok(Driver::OpexComponent {
            name: name.to_string(),
            annual_amount: amount.parse()?,
        });
    }
    serde_json::from_value(Value::String(spec.to_string()))
        .map_err(|_| format!("Unknown driver '{spec}'").into())
}

/// Parse `driver:min:max:step`. The driver part may itself contain a colon
/// for OpEx components.
fn parse_axis(spec: &str) -> Result<GridAxis, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = spec.rsplitn(4, ':').collect();
    if parts.len() != 4 {
        return Err(format!("Grid axis must be driver:min:max:step, got '{spec}'").into());
    }
    // rsplitn yields from the right: step, max, min, driver
    Ok(GridAxis {
        driver: parse_driver(parts[3])?,
        min: parts[2].parse()?,
        max: parts[1].parse()?,
        step: parts[0].parse()?,
    })
}

pub fn run_tornado(args: TornadoArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut tornado_input: TornadoInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(ref base_path) = args.base {
        if args.vars.is_empty() {
            return Err("--vars is required with --base".into());
        }
        let variables = args
            .vars
            .iter()
            .map(|v| parse_driver(v).map(TornadoVariable::from))
            .collect::<Result<Vec<_>, _>>()?;
        TornadoInput {
            base: input::file::read_input(base_path)?,
            variables,
            perturbation: dec!(0.20),
        }
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file>, --base <file> --vars ..., or stdin required for tornado".into());
    };

    if let Some(p) = args.perturbation {
        tornado_input.perturbation = p;
    }

    let result = sensitivity::tornado_analysis(&tornado_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_grid(args: GridArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let grid_input: NpvGridInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(ref base_path) = args.base {
        NpvGridInput {
            base: input::file::read_input(base_path)?,
            axis_1: parse_axis(args.var1.as_deref().ok_or("--var1 is required with --base")?)?,
            axis_2: parse_axis(args.var2.as_deref().ok_or("--var2 is required with --base")?)?,
        }
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file>, --base <file> --var1 --var2, or stdin required for grid".into());
    };

    let result = sensitivity::npv_grid(&grid_input)?;
    Ok(serde_json::to_value(result)?)
}
