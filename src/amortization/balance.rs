//! Elapsed months and outstanding balance at a point in time

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::config::ElapsedConvention;
use super::rate::{annual_percent, growth_minus_one};
use crate::loan::LoanSnapshot;

/// Point-in-time view of a loan. Always recomputed, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationResult {
    /// Fractional monthly rate used for the balance
    pub monthly_rate: f64,

    /// `monthly_rate * 12 * 100`
    pub annual_rate_percent: f64,

    pub months_elapsed: u32,
    pub months_remaining: u32,

    /// Remaining balance at the evaluation date, never negative
    pub outstanding_principal: f64,

    /// `months_elapsed * monthly_payment`
    pub amount_paid_to_date: f64,

    /// Share of the tenure already elapsed, 0-100
    pub progress_percent: f64,

    /// Total payments minus financed principal, never negative
    pub total_interest: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,

    /// Due date of the next unpaid installment; none once the tenure is over
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_due_date: Option<NaiveDate>,

    /// False when the rate is a best-effort solver estimate
    pub converged: bool,
}

impl AmortizationResult {
    pub fn is_paid_off(&self) -> bool {
        self.months_remaining == 0
    }
}

/// Whole months between `start` and `as_of` under `convention`, clamped to `[0, tenure_months]`
pub fn months_elapsed(
    start: NaiveDate,
    as_of: NaiveDate,
    tenure_months: u32,
    convention: ElapsedConvention,
) -> u32 {
    let raw = (as_of.year() as i64 - start.year() as i64) * 12
        + (as_of.month() as i64 - start.month() as i64)
        - convention.adjustment();

    raw.clamp(0, tenure_months as i64) as u32
}

/// Outstanding principal after `months_elapsed` installments
///
/// Exactly zero once no months remain, whatever the rate.
/// Zero rate: straight-line `principal - elapsed * payment`.
/// Otherwise the present value of the remaining installments,
/// `payment * ((1+r)^m - 1) / (r * (1+r)^m)` with `m` months left.
pub fn outstanding_principal(
    principal: f64,
    monthly_payment: f64,
    monthly_rate: f64,
    tenure_months: u32,
    months_elapsed: u32,
) -> f64 {
    let elapsed = months_elapsed.min(tenure_months);
    let remaining = tenure_months - elapsed;
    if remaining == 0 {
        return 0.0;
    }

    if monthly_rate == 0.0 {
        return (principal - elapsed as f64 * monthly_payment).max(0.0);
    }

    let growth = growth_minus_one(monthly_rate, remaining);
    let balance = if growth.is_finite() {
        monthly_payment * growth / (monthly_rate * (growth + 1.0))
    } else {
        monthly_payment / monthly_rate
    };

    if balance.is_finite() {
        balance.max(0.0)
    } else {
        0.0
    }
}

/// Evaluate a snapshot at its `as_of_date` using `monthly_rate`
///
/// Negative or non-finite rates are treated as zero.
pub fn compute_outstanding(
    snapshot: &LoanSnapshot,
    monthly_rate: f64,
    convention: ElapsedConvention,
) -> AmortizationResult {
    let monthly_rate = if monthly_rate.is_finite() {
        monthly_rate.max(0.0)
    } else {
        0.0
    };
    let tenure = snapshot.total_tenure_months;

    let elapsed = months_elapsed(snapshot.start_date, snapshot.as_of_date, tenure, convention);
    let remaining = tenure - elapsed;

    let outstanding = outstanding_principal(
        snapshot.total_amount_financed,
        snapshot.monthly_payment,
        monthly_rate,
        tenure,
        elapsed,
    );

    let progress_percent = if tenure > 0 {
        elapsed as f64 / tenure as f64 * 100.0
    } else {
        0.0
    };

    let next_due_date = if remaining > 0 {
        snapshot.start_date.checked_add_months(Months::new(elapsed))
    } else {
        None
    };

    AmortizationResult {
        monthly_rate,
        annual_rate_percent: annual_percent(monthly_rate),
        months_elapsed: elapsed,
        months_remaining: remaining,
        outstanding_principal: outstanding,
        amount_paid_to_date: elapsed as f64 * snapshot.monthly_payment,
        progress_percent,
        total_interest: snapshot.total_interest(),
        end_date: snapshot.end_date(),
        next_due_date,
        converged: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn snapshot(as_of: NaiveDate) -> LoanSnapshot {
        LoanSnapshot {
            principal_disbursed: 118_000.0,
            total_amount_financed: 120_000.0,
            monthly_payment: 10_000.0,
            total_tenure_months: 12,
            start_date: date(2024, 1, 15),
            as_of_date: as_of,
            stated_annual_rate_percent: None,
        }
    }

    #[test]
    fn test_months_elapsed_conventions() {
        let start = date(2024, 1, 15);
        let as_of = date(2024, 7, 1);

        assert_eq!(months_elapsed(start, as_of, 12, ElapsedConvention::CalendarMonths), 6);
        assert_eq!(
            months_elapsed(start, as_of, 12, ElapsedConvention::FirstInstallmentPending),
            5
        );
    }

    #[test]
    fn test_months_elapsed_clamped() {
        let start = date(2024, 1, 15);

        // Before start
        assert_eq!(
            months_elapsed(start, date(2023, 6, 1), 12, ElapsedConvention::CalendarMonths),
            0
        );
        // Same month under the pending convention would be -1
        assert_eq!(
            months_elapsed(start, start, 12, ElapsedConvention::FirstInstallmentPending),
            0
        );
        // Long past the end of the tenure
        assert_eq!(
            months_elapsed(start, date(2030, 1, 1), 12, ElapsedConvention::CalendarMonths),
            12
        );
    }

    #[test]
    fn test_months_elapsed_across_year_boundary() {
        assert_eq!(
            months_elapsed(
                date(2023, 11, 5),
                date(2024, 2, 5),
                24,
                ElapsedConvention::CalendarMonths
            ),
            3
        );
    }

    #[test]
    fn test_linear_balance_at_zero_rate() {
        let result = compute_outstanding(
            &snapshot(date(2024, 7, 15)),
            0.0,
            ElapsedConvention::CalendarMonths,
        );

        assert_eq!(result.months_elapsed, 6);
        assert_eq!(result.months_remaining, 6);
        assert_eq!(result.outstanding_principal, 60_000.0);
        assert_eq!(result.amount_paid_to_date, 60_000.0);
        assert_abs_diff_eq!(result.progress_percent, 50.0);
        assert_eq!(result.next_due_date, Some(date(2024, 7, 15)));
        assert_eq!(result.end_date, Some(date(2025, 1, 15)));
    }

    #[test]
    fn test_balance_is_zero_at_full_term() {
        for rate in [0.0, 0.001, 0.01, 0.05] {
            let balance = outstanding_principal(120_000.0, 10_700.0, rate, 12, 12);
            assert_eq!(balance, 0.0);
        }

        let result = compute_outstanding(
            &snapshot(date(2026, 1, 1)),
            0.01,
            ElapsedConvention::CalendarMonths,
        );
        assert!(result.is_paid_off());
        assert_eq!(result.outstanding_principal, 0.0);
        assert_eq!(result.next_due_date, None);
    }

    #[test]
    fn test_interest_free_balance_is_zero_at_full_term() {
        // Within solver tolerance of 100,000 / 12, so inferred as interest free
        let payment = 8_333.333_333_3;
        assert_eq!(crate::amortization::infer_monthly_rate(100_000.0, payment, 12), 0.0);
        assert_eq!(outstanding_principal(100_000.0, payment, 0.0, 12, 12), 0.0);

        let mut loan = snapshot(date(2030, 1, 1));
        loan.total_amount_financed = 100_000.0;
        loan.monthly_payment = payment;
        let result = compute_outstanding(&loan, 0.0, ElapsedConvention::CalendarMonths);
        assert_eq!(result.months_remaining, 0);
        assert_eq!(result.outstanding_principal, 0.0);

        // One month earlier the straight-line balance still applies
        assert_abs_diff_eq!(
            outstanding_principal(100_000.0, payment, 0.0, 12, 11),
            payment,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_balance_at_day_zero_is_annuity_value() {
        // 8884.88/month at 1% over 12 months is a 100,000 loan
        let balance = outstanding_principal(100_000.0, 8_884.878867834, 0.01, 12, 0);
        assert_abs_diff_eq!(balance, 100_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_negative_rate_treated_as_zero() {
        let result = compute_outstanding(
            &snapshot(date(2024, 4, 15)),
            -0.02,
            ElapsedConvention::CalendarMonths,
        );
        assert_eq!(result.monthly_rate, 0.0);
        assert_eq!(result.outstanding_principal, 90_000.0);
    }

    #[test]
    fn test_overpaid_linear_balance_floors_at_zero() {
        let balance = outstanding_principal(50_000.0, 10_000.0, 0.0, 12, 8);
        assert_eq!(balance, 0.0);
    }
}
