//! Portfolio totals across a user's loans
//!
//! Only active loans contribute. Loans are evaluated in parallel and summed
//! sequentially in input order so totals are reproducible.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::amortization::AmortizationEngine;
use crate::error::Result;
use crate::loan::LoanRecord;

/// Dashboard totals for a set of loans
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub as_of_date: Option<NaiveDate>,
    pub total_monthly_payment: f64,
    pub total_outstanding: f64,
    /// Sum of total amounts financed
    pub total_principal: f64,
    pub total_paid: f64,
    pub active_count: usize,
    /// Loans in any status
    pub loan_count: usize,
}

/// Aggregate active loans at `as_of`
///
/// An empty slice, or one with no active loans, gives all-zero totals.
pub fn aggregate(
    engine: &AmortizationEngine,
    loans: &[LoanRecord],
    as_of: NaiveDate,
) -> Result<PortfolioSummary> {
    let active: Vec<&LoanRecord> = loans.iter().filter(|loan| loan.is_active()).collect();

    let evaluations = active
        .par_iter()
        .map(|loan| engine.evaluate_record(loan, as_of))
        .collect::<Result<Vec<_>>>()?;

    let mut summary = PortfolioSummary {
        as_of_date: Some(as_of),
        active_count: active.len(),
        loan_count: loans.len(),
        ..Default::default()
    };

    for evaluation in &evaluations {
        summary.total_monthly_payment += evaluation.monthly_payment;
        summary.total_outstanding += evaluation.result.outstanding_principal;
        summary.total_principal += evaluation.total_amount;
        summary.total_paid += evaluation.result.amount_paid_to_date;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amortization::{ElapsedConvention, EngineConfig};
    use crate::loan::LoanStatus;
    use approx::assert_abs_diff_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn loans() -> Vec<LoanRecord> {
        vec![
            LoanRecord::new("Home", 900_000.0, 15_000.0, date(2024, 1, 1), 120),
            LoanRecord::new("Bike", 60_000.0, 5_000.0, date(2024, 1, 1), 12),
            LoanRecord::new("Old car", 300_000.0, 9_000.0, date(2019, 1, 1), 36)
                .with_status(LoanStatus::Completed),
        ]
    }

    #[test]
    fn test_only_active_loans_counted() {
        let engine = AmortizationEngine::default();
        let summary = aggregate(&engine, &loans(), date(2024, 7, 1)).unwrap();

        assert_eq!(summary.active_count, 2);
        assert_eq!(summary.loan_count, 3);
        assert_eq!(summary.total_monthly_payment, 20_000.0);
        assert_eq!(summary.total_principal, 960_000.0);
        assert_eq!(summary.total_paid, 6.0 * 20_000.0);
    }

    #[test]
    fn test_outstanding_is_sum_of_evaluations() {
        let engine = AmortizationEngine::default();
        let as_of = date(2024, 7, 1);
        let summary = aggregate(&engine, &loans(), as_of).unwrap();

        let expected: f64 = loans()
            .iter()
            .filter(|l| l.is_active())
            .map(|l| engine.evaluate_record(l, as_of).unwrap().result.outstanding_principal)
            .sum();
        assert_abs_diff_eq!(summary.total_outstanding, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_empty_portfolio() {
        let engine = AmortizationEngine::default();
        let summary = aggregate(&engine, &[], date(2024, 7, 1)).unwrap();

        assert_eq!(summary.active_count, 0);
        assert_eq!(summary.total_monthly_payment, 0.0);
        assert_eq!(summary.total_outstanding, 0.0);
        assert_eq!(summary.total_principal, 0.0);
        assert_eq!(summary.total_paid, 0.0);
    }

    #[test]
    fn test_convention_changes_paid_total() {
        let engine = AmortizationEngine::new(
            EngineConfig::default().with_elapsed_convention(ElapsedConvention::FirstInstallmentPending),
        );
        let summary = aggregate(&engine, &loans(), date(2024, 7, 1)).unwrap();
        assert_eq!(summary.total_paid, 5.0 * 20_000.0);
    }

    #[test]
    fn test_invalid_active_loan_fails_aggregation() {
        let mut loans = loans();
        loans[1].monthly_amount = 0.0;
        assert!(aggregate(&AmortizationEngine::default(), &loans, date(2024, 7, 1)).is_err());
    }
}
