use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use dc_feasibility_core::feasibility::assumptions::FinancialAssumptions;
use dc_feasibility_core::feasibility::break_even;
use dc_feasibility_core::feasibility::model;
use dc_feasibility_core::feasibility::projection;
use dc_feasibility_core::Currency;

use crate::input;

/// Assumption flags, used when neither --input nor stdin is given
#[derive(Args, Debug, Clone)]
pub struct AssumptionArgs {
    /// Path to JSON or YAML assumptions file
    #[arg(long)]
    pub input: Option<String>,

    /// Upfront capital expenditure
    #[arg(long)]
    pub capex: Option<Decimal>,

    /// Year-1 operating expenditure
    #[arg(long)]
    pub opex: Option<Decimal>,

    /// Revenue per kW of IT load per month
    #[arg(long)]
    pub rate_kw: Option<Decimal>,

    /// Contracted IT load in kW
    #[arg(long)]
    pub load_kw: Option<Decimal>,

    /// Discount rate as a decimal (e.g. 0.10 for 10%)
    #[arg(long)]
    pub discount_rate: Option<Decimal>,

    /// Project life in years
    #[arg(long)]
    pub life: Option<u32>,

    /// Annual revenue escalation (default 0)
    #[arg(long)]
    pub escalation: Option<Decimal>,

    /// Annual OpEx escalation (default 0)
    #[arg(long)]
    pub opex_escalation: Option<Decimal>,

    /// Corporate tax rate (default 0)
    #[arg(long)]
    pub tax_rate: Option<Decimal>,

    /// Straight-line depreciation period in years (default 15)
    #[arg(long)]
    pub depreciation_years: Option<u32>,

    /// Occupancy per year, comma separated (e.g. 0.3,0.5,0.7,1.0)
    #[arg(long, value_delimiter = ',')]
    pub ramp: Option<Vec<Decimal>>,

    /// Reporting currency code (default USD)
    #[arg(long, value_parser = parse_currency)]
    pub currency: Option<Currency>,
}

/// ISO code for the listed currencies, anything else kept verbatim.
fn parse_currency(code: &str) -> Result<Currency, String> {
    let code = code.trim();
    if code.is_empty() {
        return Err("Currency code must not be empty".into());
    }
    Ok(serde_json::from_value(Value::String(code.to_uppercase()))
        .unwrap_or_else(|_| Currency::Other(code.to_string())))
}

impl AssumptionArgs {
    /// Resolve the assumptions from file, stdin, or flags, in that order.
    pub fn resolve(&self) -> Result<FinancialAssumptions, Box<dyn std::error::Error>> {
        if let Some(assumptions) = input::load(self.input.as_deref())? {
            return Ok(assumptions);
        }
        Ok(FinancialAssumptions {
            total_capex: self.capex.ok_or("--capex is required (or provide --input)")?,
            annual_opex_base: self.opex.ok_or("--opex is required (or provide --input)")?,
            revenue_per_kw_month: self
                .rate_kw
                .ok_or("--rate-kw is required (or provide --input)")?,
            it_load_kw: self
                .load_kw
                .ok_or("--load-kw is required (or provide --input)")?,
            discount_rate: self
                .discount_rate
                .ok_or("--discount-rate is required (or provide --input)")?,
            project_life_years: self.life.ok_or("--life is required (or provide --input)")?,
            escalation_rate: self.escalation.unwrap_or_default(),
            opex_escalation: self.opex_escalation.unwrap_or_default(),
            occupancy_ramp: self.ramp.clone(),
            tax_rate: self.tax_rate.unwrap_or_default(),
            depreciation_years: self.depreciation_years.unwrap_or(15),
            currency: self.currency.clone().unwrap_or_default(),
        })
    }
}

/// Arguments for the full feasibility model
#[derive(Args)]
pub struct ModelArgs {
    #[command(flatten)]
    pub assumptions: AssumptionArgs,
}

/// Arguments for the cash flow projection
#[derive(Args)]
pub struct ProjectArgs {
    #[command(flatten)]
    pub assumptions: AssumptionArgs,
}

/// Arguments for break-even occupancy
#[derive(Args)]
pub struct BreakEvenArgs {
    #[command(flatten)]
    pub assumptions: AssumptionArgs,
}

pub fn run_model(args: ModelArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let assumptions = args.assumptions.resolve()?;
    let result = model::model_feasibility(&assumptions)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let assumptions = args.assumptions.resolve()?;
    let rows = projection::project(&assumptions)?;
    Ok(serde_json::to_value(rows)?)
}

pub fn run_break_even(args: BreakEvenArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let assumptions = args.assumptions.resolve()?;
    let result = break_even::break_even_occupancy(&assumptions)?;
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_currency() {
        assert_eq!(parse_currency("eur").unwrap(), Currency::EUR);
        assert_eq!(parse_currency("SGD").unwrap(), Currency::SGD);
        assert_eq!(parse_currency("NOK").unwrap(), Currency::Other("NOK".into()));
        assert!(parse_currency(" ").is_err());
    }
}
