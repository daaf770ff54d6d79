use napi::Result as NapiResult;
use napi_derive::napi;
use serde::de::DeserializeOwned;
use serde::Serialize;

use dc_feasibility_core::feasibility::assumptions::FinancialAssumptions;
use dc_feasibility_core::feasibility::{break_even, model, projection};
use dc_feasibility_core::monte_carlo::simulation::{self, McFeasibilityInput};
use dc_feasibility_core::scenarios::scenario::{self, ScenarioInput};
use dc_feasibility_core::scenarios::sensitivity::{self, NpvGridInput, TornadoInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse<T: DeserializeOwned>(input_json: &str) -> NapiResult<T> {
    serde_json::from_str(input_json).map_err(to_napi_error)
}

fn render<T: Serialize>(output: &T) -> NapiResult<String> {
    serde_json::to_string(output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Feasibility
// ---------------------------------------------------------------------------

#[napi]
pub fn model_feasibility(input_json: String) -> NapiResult<String> {
    let input: FinancialAssumptions = parse(&input_json)?;
    let output = model::model_feasibility(&input).map_err(to_napi_error)?;
    render(&output)
}

#[napi]
pub fn project_cashflows(input_json: String) -> NapiResult<String> {
    let input: FinancialAssumptions = parse(&input_json)?;
    let output = projection::project(&input).map_err(to_napi_error)?;
    render(&output)
}

#[napi]
pub fn break_even_occupancy(input_json: String) -> NapiResult<String> {
    let input: FinancialAssumptions = parse(&input_json)?;
    let output = break_even::break_even_occupancy(&input).map_err(to_napi_error)?;
    render(&output)
}

// ---------------------------------------------------------------------------
// Sensitivity
// ---------------------------------------------------------------------------

#[napi]
pub fn tornado_analysis(input_json: String) -> NapiResult<String> {
    let input: TornadoInput = parse(&input_json)?;
    let output = sensitivity::tornado_analysis(&input).map_err(to_napi_error)?;
    render(&output)
}

#[napi]
pub fn npv_grid(input_json: String) -> NapiResult<String> {
    let input: NpvGridInput = parse(&input_json)?;
    let output = sensitivity::npv_grid(&input).map_err(to_napi_error)?;
    render(&output)
}

// ---------------------------------------------------------------------------
// Scenarios & simulation
// ---------------------------------------------------------------------------

#[napi]
pub fn scenario_analysis(input_json: String) -> NapiResult<String> {
    let input: ScenarioInput = parse(&input_json)?;
    let output = scenario::analyze_scenarios(&input).map_err(to_napi_error)?;
    render(&output)
}

#[napi]
pub fn monte_carlo_npv(input_json: String) -> NapiResult<String> {
    let input: McFeasibilityInput = parse(&input_json)?;
    let output = simulation::simulate_npv(&input).map_err(to_napi_error)?;
    render(&output)
}
