//! Implied interest rate of a fixed-payment loan
//!
//! Solves `payment = P * r * (1+r)^n / ((1+r)^n - 1)` for the monthly rate `r`

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::config::{SolverConfig, MAX_RATE_DECIMALS};
use crate::error::RateInferenceError;

/// Outcome of a rate solve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateSolution {
    /// Fractional monthly rate, never negative
    pub monthly_rate: f64,

    /// Iterations spent (0 for closed-form answers)
    pub iterations: u32,

    /// `emi_payment(monthly_rate) - payment` at the returned rate
    pub residual: f64,

    /// Whether the residual met the tolerance
    pub converged: bool,
}

impl RateSolution {
    fn zero_interest() -> Self {
        Self {
            monthly_rate: 0.0,
            iterations: 0,
            residual: 0.0,
            converged: true,
        }
    }

    /// Annualized rate as a percentage (`monthly * 12 * 100`)
    pub fn annual_rate_percent(&self) -> f64 {
        annual_percent(self.monthly_rate)
    }
}

/// Solve for the monthly rate implied by a principal, a fixed payment and a tenure
///
/// Newton-Raphson starting from `config.initial_guess`. A step that would leave
/// `(0, config.max_monthly_rate]`, or a derivative below `config.derivative_floor`,
/// is replaced by a multiplicative nudge (`r * 0.9` when the computed payment is
/// too high, `r * 1.1` when too low) and iteration resumes.
///
/// # Arguments
/// * `principal` - Amount the rate is measured against
/// * `payment` - Fixed monthly installment
/// * `tenure_months` - Number of installments
///
/// # Returns
/// * `Ok(RateSolution)` - Converged rate, or the best estimate after the
///   iteration budget with `converged == false`
/// * `Err(RateInferenceError)` - Degenerate terms, payments that cannot cover
///   the principal, or a non-finite intermediate
pub fn solve_monthly_rate(
    principal: f64,
    payment: f64,
    tenure_months: u32,
    config: &SolverConfig,
) -> Result<RateSolution, RateInferenceError> {
    if !principal.is_finite() || !payment.is_finite() {
        return Err(RateInferenceError::NonFinite { iteration: 0 });
    }
    if principal <= 0.0 || payment <= 0.0 || tenure_months == 0 {
        return Err(RateInferenceError::DegenerateInput {
            principal,
            payment,
            tenure_months,
        });
    }

    let n = tenure_months as f64;
    let straight_line = principal / n;

    // Payment equal to principal/n is an interest-free loan
    if (payment - straight_line).abs() < config.tolerance {
        return Ok(RateSolution::zero_interest());
    }
    if payment < straight_line {
        return Err(RateInferenceError::NoPositiveRate {
            principal,
            total_payments: payment * n,
        });
    }

    let mut rate = config.initial_guess;

    for iteration in 0..config.max_iterations {
        let (calculated, derivative) = payment_and_derivative(principal, rate, tenure_months);
        if !calculated.is_finite() || !derivative.is_finite() {
            return Err(RateInferenceError::NonFinite { iteration });
        }

        let residual = calculated - payment;
        if residual.abs() < config.tolerance {
            debug!(
                "rate converged: monthly={:.10} after {} iterations",
                rate,
                iteration + 1
            );
            return Ok(RateSolution {
                monthly_rate: rate,
                iterations: iteration + 1,
                residual,
                converged: true,
            });
        }

        let nudged = if calculated > payment { rate * 0.9 } else { rate * 1.1 };

        rate = if derivative.abs() < config.derivative_floor {
            nudged
        } else {
            let newton = rate - residual / derivative;
            if newton <= 0.0 || newton > config.max_monthly_rate {
                nudged
            } else {
                newton
            }
        };
    }

    let rate = rate.max(0.0);
    let residual = emi_payment(principal, rate, tenure_months) - payment;
    if !residual.is_finite() {
        return Err(RateInferenceError::NonFinite {
            iteration: config.max_iterations,
        });
    }

    warn!(
        "rate solve did not converge in {} iterations (principal={}, payment={}, n={}, residual={:.6e}); returning best estimate",
        config.max_iterations, principal, payment, tenure_months, residual
    );

    Ok(RateSolution {
        monthly_rate: rate,
        iterations: config.max_iterations,
        residual,
        converged: false,
    })
}

/// Lenient rate inference: any [`RateInferenceError`] yields a zero rate
///
/// Returns the fractional monthly rate.
pub fn infer_monthly_rate(principal: f64, payment: f64, tenure_months: u32) -> f64 {
    infer_monthly_rate_with(principal, payment, tenure_months, &SolverConfig::default())
}

/// [`infer_monthly_rate`] with an explicit solver configuration
pub fn infer_monthly_rate_with(
    principal: f64,
    payment: f64,
    tenure_months: u32,
    config: &SolverConfig,
) -> f64 {
    match solve_monthly_rate(principal, payment, tenure_months, config) {
        Ok(solution) => solution.monthly_rate,
        Err(e) => {
            warn!("rate inference fell back to zero: {}", e);
            0.0
        }
    }
}

/// Fixed monthly installment for a principal at a monthly rate over `tenure_months`
///
/// A zero rate degenerates to straight-line repayment.
pub fn emi_payment(principal: f64, monthly_rate: f64, tenure_months: u32) -> f64 {
    if tenure_months == 0 {
        return 0.0;
    }
    payment_and_derivative(principal, monthly_rate, tenure_months).0
}

/// Payment at `rate` and its derivative with respect to `rate`
///
/// With `p = (1+r)^n` the derivative is `P * p * ((p - 1) - n*r/(1+r)) / (p - 1)^2`.
/// `p - 1` is taken through `exp_m1` so small rates keep their precision.
fn payment_and_derivative(principal: f64, rate: f64, tenure_months: u32) -> (f64, f64) {
    let n = tenure_months as f64;
    let growth = growth_minus_one(rate, tenure_months);

    if growth == 0.0 {
        // r -> 0 limits
        return (principal / n, principal * (n + 1.0) / (2.0 * n));
    }
    if !growth.is_finite() {
        // r * p / (p - 1) -> r as p -> inf
        return (principal * rate, principal);
    }

    let power = growth + 1.0;
    let payment = principal * rate * power / growth;
    let derivative = principal * power * (growth - n * rate / (1.0 + rate)) / (growth * growth);

    (payment, derivative)
}

/// `(1 + rate)^n - 1`
pub(crate) fn growth_minus_one(rate: f64, periods: u32) -> f64 {
    (periods as f64 * rate.ln_1p()).exp_m1()
}

/// Monthly fractional rate to annual percentage
pub fn annual_percent(monthly_rate: f64) -> f64 {
    monthly_rate * 12.0 * 100.0
}

/// Annual percentage to monthly fractional rate
pub fn monthly_from_annual_percent(annual_percent: f64) -> f64 {
    annual_percent / (12.0 * 100.0)
}

/// Round an annual percentage to `decimals` places
pub fn quantize_percent(annual_percent: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals.min(MAX_RATE_DECIMALS) as i32);
    let scaled = annual_percent * scale;
    if !scaled.is_finite() {
        return annual_percent;
    }
    scaled.round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn config() -> SolverConfig {
        SolverConfig::default()
    }

    #[test]
    fn test_home_loan_rate_converges() {
        let solution = solve_monthly_rate(900_000.0, 15_000.0, 120, &config()).unwrap();

        assert!(solution.converged);
        assert!(solution.iterations < 10);
        assert_abs_diff_eq!(
            emi_payment(900_000.0, solution.monthly_rate, 120),
            15_000.0,
            epsilon = 1e-4
        );
        // ~15.86% p.a.
        assert!((solution.annual_rate_percent() - 15.86).abs() < 0.01);
    }

    #[test]
    fn test_known_rate_recovered() {
        // 12% p.a. on 100,000 over 12 months
        let payment = emi_payment(100_000.0, 0.01, 12);
        assert_abs_diff_eq!(payment, 8884.88, epsilon = 0.01);

        let rate = infer_monthly_rate(100_000.0, payment, 12);
        assert_abs_diff_eq!(rate, 0.01, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_interest_loan() {
        let solution = solve_monthly_rate(120_000.0, 10_000.0, 12, &config()).unwrap();
        assert_eq!(solution.monthly_rate, 0.0);
        assert!(solution.converged);
        assert_eq!(solution.iterations, 0);
    }

    #[test]
    fn test_degenerate_inputs_rejected() {
        assert!(matches!(
            solve_monthly_rate(100_000.0, 5_000.0, 0, &config()),
            Err(RateInferenceError::DegenerateInput { .. })
        ));
        assert!(matches!(
            solve_monthly_rate(100_000.0, 0.0, 12, &config()),
            Err(RateInferenceError::DegenerateInput { .. })
        ));
        assert!(matches!(
            solve_monthly_rate(-1.0, 5_000.0, 12, &config()),
            Err(RateInferenceError::DegenerateInput { .. })
        ));
        assert!(matches!(
            solve_monthly_rate(f64::NAN, 5_000.0, 12, &config()),
            Err(RateInferenceError::NonFinite { iteration: 0 })
        ));
    }

    #[test]
    fn test_underpaying_loan_has_no_positive_rate() {
        let result = solve_monthly_rate(100_000.0, 5_000.0, 12, &config());
        assert!(matches!(result, Err(RateInferenceError::NoPositiveRate { .. })));
        assert_eq!(infer_monthly_rate(100_000.0, 5_000.0, 12), 0.0);
    }

    #[test]
    fn test_lenient_inference_is_zero_on_bad_terms() {
        assert_eq!(infer_monthly_rate(100_000.0, -10.0, 12), 0.0);
        assert_eq!(infer_monthly_rate(100_000.0, 10_000.0, 0), 0.0);
    }

    #[test]
    fn test_unconverged_solve_reports_best_estimate() {
        let tight = SolverConfig {
            max_iterations: 1,
            ..SolverConfig::default()
        };
        let solution = solve_monthly_rate(900_000.0, 15_000.0, 120, &tight).unwrap();

        assert!(!solution.converged);
        assert_eq!(solution.iterations, 1);
        assert!(solution.monthly_rate > 0.0);
        assert!(solution.residual.abs() >= tight.tolerance);
    }

    #[test]
    fn test_long_tenure_stays_finite() {
        // (1+r)^n overflows for very long tenures at high rates
        let payment = emi_payment(1_000.0, 0.9, 5_000);
        assert!(payment.is_finite());
        assert_abs_diff_eq!(payment, 900.0, epsilon = 1e-6);
    }

    #[test]
    fn test_solver_is_deterministic() {
        let a = solve_monthly_rate(450_000.0, 9_800.0, 60, &config()).unwrap();
        let b = solve_monthly_rate(450_000.0, 9_800.0, 60, &config()).unwrap();
        assert_eq!(a.monthly_rate.to_bits(), b.monthly_rate.to_bits());
    }

    #[test]
    fn test_quantize_percent() {
        assert_eq!(quantize_percent(15.8640158, 2), 15.86);
        assert_eq!(quantize_percent(0.0003, 2), 0.0);
        assert_abs_diff_eq!(monthly_from_annual_percent(12.0), 0.01, epsilon = 1e-15);
        assert_abs_diff_eq!(annual_percent(0.01), 12.0, epsilon = 1e-12);
    }

    #[test]
    fn test_quantize_percent_with_excess_decimals() {
        // Beyond f64 precision the value passes through unchanged
        assert_eq!(quantize_percent(1.0, 400), 1.0);
        assert!(quantize_percent(15.86, u32::MAX).is_finite());

        let raw = 15.864_015_8;
        let kept = quantize_percent(raw, 1_000);
        assert!(kept.is_finite());
        assert_abs_diff_eq!(kept, raw, epsilon = 1e-12);
        assert_eq!(quantize_percent(raw, 1_000), quantize_percent(raw, MAX_RATE_DECIMALS));
    }
}
