//! Solver and engine configuration

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Default starting guess for the monthly rate (1% per month)
pub const DEFAULT_INITIAL_GUESS: f64 = 0.01;

/// Payment tolerance for convergence
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Iteration budget for the rate solver
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Decimals kept on a persisted annual rate percentage
pub const DEFAULT_RATE_DECIMALS: u32 = 2;

/// Most decimals rounding can keep; an f64 percentage carries no more
pub const MAX_RATE_DECIMALS: u32 = 15;

/// Tuning for the Newton-Raphson rate solver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Monthly rate the iteration starts from
    pub initial_guess: f64,

    /// Absolute payment difference accepted as converged
    pub tolerance: f64,

    /// Maximum number of iterations before returning a best effort
    pub max_iterations: u32,

    /// Derivatives smaller than this switch to the multiplicative nudge
    pub derivative_floor: f64,

    /// Upper bound on an accepted Newton step (1.0 = 100% per month)
    pub max_monthly_rate: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            initial_guess: DEFAULT_INITIAL_GUESS,
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            derivative_floor: 1e-6,
            max_monthly_rate: 1.0,
        }
    }
}

/// How the month of the first installment is counted when measuring elapsed time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElapsedConvention {
    /// Whole calendar months between start and evaluation date
    #[default]
    CalendarMonths,
    /// Calendar months minus one: the first installment month is not yet paid
    FirstInstallmentPending,
}

impl ElapsedConvention {
    /// Months subtracted from the raw calendar difference
    pub fn adjustment(&self) -> i64 {
        match self {
            ElapsedConvention::CalendarMonths => 0,
            ElapsedConvention::FirstInstallmentPending => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ElapsedConvention::CalendarMonths => "calendar",
            ElapsedConvention::FirstInstallmentPending => "first-installment-pending",
        }
    }
}

impl FromStr for ElapsedConvention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "calendar" | "calendar-months" => Ok(ElapsedConvention::CalendarMonths),
            "first-installment-pending" | "pending" => {
                Ok(ElapsedConvention::FirstInstallmentPending)
            }
            other => Err(format!("Unknown elapsed convention: {}", other)),
        }
    }
}

/// Configuration for an [`AmortizationEngine`](super::AmortizationEngine)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub solver: SolverConfig,

    /// Applied to every per-loan and portfolio evaluation
    pub elapsed_convention: ElapsedConvention,

    /// Inferred annual percentages are rounded to this many decimals before
    /// being used for balances. `None` keeps the raw solver output.
    pub rate_decimals: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            solver: SolverConfig::default(),
            elapsed_convention: ElapsedConvention::default(),
            rate_decimals: Some(DEFAULT_RATE_DECIMALS),
        }
    }
}

impl EngineConfig {
    /// Build a config from `EMI_*` environment variables, falling back to defaults
    ///
    /// - `EMI_ELAPSED_CONVENTION`: `calendar` | `first-installment-pending`
    /// - `EMI_MAX_ITERATIONS`: solver iteration budget
    /// - `EMI_TOLERANCE`: payment tolerance, ignored unless positive
    /// - `EMI_RATE_DECIMALS`: decimals kept on inferred rates (at most
    ///   [`MAX_RATE_DECIMALS`]), or `none`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading values through `lookup`
    ///
    /// Unparseable values are logged and leave the default in place.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let parse = |key: &str| lookup(key).map(|raw| raw.trim().to_string());

        if let Some(raw) = parse("EMI_ELAPSED_CONVENTION") {
            match raw.parse::<ElapsedConvention>() {
                Ok(convention) => config.elapsed_convention = convention,
                Err(e) => warn!("ignoring EMI_ELAPSED_CONVENTION: {}", e),
            }
        }
        if let Some(raw) = parse("EMI_MAX_ITERATIONS") {
            match raw.parse::<u32>() {
                Ok(max_iterations) => config.solver.max_iterations = max_iterations,
                Err(_) => warn!("ignoring EMI_MAX_ITERATIONS={}", raw),
            }
        }
        if let Some(raw) = parse("EMI_TOLERANCE") {
            match raw.parse::<f64>() {
                Ok(tolerance) if tolerance > 0.0 && tolerance.is_finite() => {
                    config.solver.tolerance = tolerance
                }
                _ => warn!("ignoring EMI_TOLERANCE={}", raw),
            }
        }
        if let Some(raw) = parse("EMI_RATE_DECIMALS") {
            if raw.eq_ignore_ascii_case("none") {
                config.rate_decimals = None;
            } else {
                match raw.parse::<u32>() {
                    Ok(decimals) => config.rate_decimals = Some(decimals.min(MAX_RATE_DECIMALS)),
                    Err(_) => warn!("ignoring EMI_RATE_DECIMALS={}", raw),
                }
            }
        }

        debug!("engine config: {:?}", config);
        config
    }

    pub fn with_elapsed_convention(mut self, convention: ElapsedConvention) -> Self {
        self.elapsed_convention = convention;
        self
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_rate_decimals(mut self, decimals: Option<u32>) -> Self {
        self.rate_decimals = decimals;
        self
    }
}
