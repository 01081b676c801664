//! EMI amortization engine
//!
//! - Implied monthly rate from principal, payment and tenure (Newton-Raphson
//!   with a multiplicative fallback when a step leaves the valid domain)
//! - Months elapsed and outstanding principal at an evaluation date
//! - Engine configuration shared by per-loan and portfolio views

mod balance;
mod config;
mod engine;
mod rate;

pub use balance::{compute_outstanding, months_elapsed, outstanding_principal, AmortizationResult};
pub use config::{
    ElapsedConvention, EngineConfig, SolverConfig, DEFAULT_INITIAL_GUESS, DEFAULT_MAX_ITERATIONS,
    DEFAULT_RATE_DECIMALS, DEFAULT_TOLERANCE, MAX_RATE_DECIMALS,
};
pub use engine::{AmortizationEngine, LoanEvaluation, RatePair};
pub use rate::{
    annual_percent, emi_payment, infer_monthly_rate, infer_monthly_rate_with,
    monthly_from_annual_percent, quantize_percent, solve_monthly_rate, RateSolution,
};
