use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, trace};

use crate::error::FeasibilityError;
use crate::types::{IrrOutcome, IrrUndefinedReason, Money, Rate};
use crate::FeasibilityResult;

/// IRR search bracket: -99% to +1000%.
pub const IRR_LOWER_BOUND: f64 = -0.99;
pub const IRR_UPPER_BOUND: f64 = 10.0;

const MAX_IRR_ITERATIONS: u32 = 100;
const IRR_RATE_TOLERANCE: f64 = 1e-12;
const IRR_INITIAL_GUESS: f64 = 0.10;

/// Compounding factor `(1 + rate)^periods` with overflow checking.
pub fn growth_factor(rate: Rate, periods: u32) -> FeasibilityResult<Decimal> {
    let base = Decimal::ONE + rate;
    let mut factor = Decimal::ONE;
    for _ in 0..periods {
        factor = factor
            .checked_mul(base)
            .ok_or_else(|| FeasibilityError::overflow(format!("growth factor at {rate} over {periods} periods")))?;
    }
    Ok(factor)
}

/// Discount factor `1 / (1 + rate)^year`.
pub fn discount_factor(rate: Rate, year: u32) -> FeasibilityResult<Decimal> {
    if rate <= dec!(-1) {
        return Err(FeasibilityError::InvalidInput {
            field: "discount_rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    let compounded = growth_factor(rate, year)?;
    Decimal::ONE
        .checked_div(compounded)
        .ok_or_else(|| FeasibilityError::overflow(format!("discount factor at year {year}")))
}

/// Net Present Value of a series of cash flows, the first at t = 0.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> FeasibilityResult<Money> {
    let mut result = Decimal::ZERO;
    for (t, cf) in cash_flows.iter().enumerate() {
        let df = discount_factor(rate, t as u32)?;
        let pv = cf
            .checked_mul(df)
            .ok_or_else(|| FeasibilityError::overflow(format!("NPV term at period {t}")))?;
        result = result
            .checked_add(pv)
            .ok_or_else(|| FeasibilityError::overflow("NPV sum"))?;
    }
    Ok(result)
}

fn npv_f64(rate: f64, flows: &[f64]) -> f64 {
    let one_plus_r = 1.0 + rate;
    flows
        .iter()
        .enumerate()
        .map(|(t, cf)| cf / one_plus_r.powi(t as i32))
        .sum()
}

fn npv_derivative_f64(rate: f64, flows: &[f64]) -> f64 {
    let one_plus_r = 1.0 + rate;
    flows
        .iter()
        .enumerate()
        .skip(1)
        .map(|(t, cf)| -(t as f64) * cf / one_plus_r.powi(t as i32 + 1))
        .sum()
}

/// Internal Rate of Return of a series of cash flows, the first at t = 0.
///
/// Safeguarded Newton-Raphson: the bracket [-99%, +1000%] must show a sign
/// change in NPV, otherwise the IRR is reported as undefined. Newton steps
/// that leave the bracket, or fail to halve the previous step, are replaced
/// by bisection, and the loop is capped at a fixed iteration count.
///
/// NPV is evaluated in f64 here: discount factors such as `0.01^-30` at
/// the lower bound fall outside the 28-digit decimal range.
pub fn irr(cash_flows: &[Money]) -> IrrOutcome {
    if cash_flows.len() < 2 {
        return IrrOutcome::Undefined {
            reason: IrrUndefinedReason::NoCashflows,
        };
    }

    // Decimal always fits in f64 (with rounding).
    let flows: Vec<f64> = cash_flows
        .iter()
        .map(|cf| cf.to_f64().unwrap_or(0.0))
        .collect();

    let mut lo = IRR_LOWER_BOUND;
    let mut hi = IRR_UPPER_BOUND;
    let f_lo = npv_f64(lo, &flows);
    let f_hi = npv_f64(hi, &flows);

    if f_lo == 0.0 {
        return defined(lo);
    }
    if f_hi == 0.0 {
        return defined(hi);
    }
    if !f_lo.is_finite() || !f_hi.is_finite() || f_lo.signum() == f_hi.signum() {
        debug!(f_lo, f_hi, "irr: no sign change across bracket");
        return IrrOutcome::Undefined {
            reason: IrrUndefinedReason::NoSignChange,
        };
    }
    let lo_negative = f_lo < 0.0;

    let mut rate = IRR_INITIAL_GUESS.clamp(lo, hi);
    let mut prev_step = hi - lo;

    for i in 0..MAX_IRR_ITERATIONS {
        let f = npv_f64(rate, &flows);
        if f == 0.0 {
            trace!(iterations = i, rate, "irr: exact root");
            return defined(rate);
        }
        if (f < 0.0) == lo_negative {
            lo = rate;
        } else {
            hi = rate;
        }
        if hi - lo < IRR_RATE_TOLERANCE {
            trace!(iterations = i, "irr: bracket collapsed");
            return defined((lo + hi) / 2.0);
        }

        let df = npv_derivative_f64(rate, &flows);
        let newton = if df != 0.0 { rate - f / df } else { f64::NAN };
        let step = newton - rate;

        let next = if newton.is_finite() && newton > lo && newton < hi && step.abs() * 2.0 <= prev_step.abs() {
            newton
        } else {
            trace!(iteration = i, rate, "irr: bisection fallback");
            (lo + hi) / 2.0
        };

        prev_step = next - rate;
        rate = next;
        if prev_step.abs() < IRR_RATE_TOLERANCE {
            trace!(iterations = i, rate, "irr: converged");
            return defined(rate);
        }
    }

    debug!(lo, hi, "irr: iteration cap reached, returning bracket midpoint");
    defined((lo + hi) / 2.0)
}

fn defined(rate: f64) -> IrrOutcome {
    match Decimal::from_f64(rate) {
        Some(r) => IrrOutcome::Defined {
            rate: r.round_dp(10),
        },
        None => IrrOutcome::Undefined {
            reason: IrrUndefinedReason::NoSignChange,
        },
    }
}
