//! Amortization engine: rate inference plus point-in-time evaluation of loans

use chrono::NaiveDate;
use log::trace;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::balance::{compute_outstanding, AmortizationResult};
use super::config::EngineConfig;
use super::rate::{
    annual_percent, infer_monthly_rate_with, monthly_from_annual_percent, quantize_percent,
    solve_monthly_rate, RateSolution,
};
use crate::error::{RateInferenceError, Result};
use crate::loan::{LoanCategory, LoanRecord, LoanSnapshot, LoanStatus};

/// Annual rates of one loan measured against both principal bases
///
/// Serialized as `interestRate` / `interestRateWithoutFees`, the stored field names.
/// For the same payment and tenure a smaller principal implies a higher rate, so
/// `without_fees_percent >= with_fees_percent` whenever a fee is withheld.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatePair {
    /// Solved against the total amount financed, fee included
    #[serde(rename = "interestRate")]
    pub with_fees_percent: f64,

    /// Solved against the amount actually disbursed
    #[serde(rename = "interestRateWithoutFees")]
    pub without_fees_percent: f64,

    pub with_fees_converged: bool,
    pub without_fees_converged: bool,
}

/// A loan record evaluated at a date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanEvaluation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub category: LoanCategory,
    pub status: LoanStatus,
    pub monthly_payment: f64,
    pub total_amount: f64,
    #[serde(flatten)]
    pub result: AmortizationResult,
}

/// Stateless engine; holds only its configuration
#[derive(Debug, Clone, Default)]
pub struct AmortizationEngine {
    config: EngineConfig,
}

impl AmortizationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Strict solve with this engine's solver settings
    pub fn solve_rate(
        &self,
        principal: f64,
        payment: f64,
        tenure_months: u32,
    ) -> std::result::Result<RateSolution, RateInferenceError> {
        solve_monthly_rate(principal, payment, tenure_months, &self.config.solver)
    }

    /// Annual percentage implied by the loan terms; zero when no rate can be inferred
    pub fn annual_rate_percent(&self, principal: f64, payment: f64, tenure_months: u32) -> f64 {
        let monthly = infer_monthly_rate_with(principal, payment, tenure_months, &self.config.solver);
        self.quantize(annual_percent(monthly))
    }

    /// With-fees and without-fees annual rates for a snapshot
    pub fn rate_pair(&self, snapshot: &LoanSnapshot) -> RatePair {
        let (with_fees_percent, with_fees_converged) = self.solve_percent(
            snapshot.total_amount_financed,
            snapshot.monthly_payment,
            snapshot.total_tenure_months,
        );
        let (without_fees_percent, without_fees_converged) = self.solve_percent(
            snapshot.principal_disbursed,
            snapshot.monthly_payment,
            snapshot.total_tenure_months,
        );

        RatePair {
            with_fees_percent,
            without_fees_percent,
            with_fees_converged,
            without_fees_converged,
        }
    }

    /// Evaluate a snapshot at its `as_of_date`
    ///
    /// Uses the stated rate when present, otherwise the rate inferred against the
    /// total amount financed, rounded like a persisted rate.
    pub fn evaluate(&self, snapshot: &LoanSnapshot) -> AmortizationResult {
        let (monthly_rate, converged) = self.balance_rate(snapshot);
        let mut result = compute_outstanding(snapshot, monthly_rate, self.config.elapsed_convention);
        result.converged = converged;

        trace!(
            "evaluated loan at {}: elapsed={} outstanding={:.2}",
            snapshot.as_of_date,
            result.months_elapsed,
            result.outstanding_principal
        );

        result
    }

    /// Build a snapshot from a record and evaluate it
    pub fn evaluate_record(&self, record: &LoanRecord, as_of: NaiveDate) -> Result<LoanEvaluation> {
        let snapshot = LoanSnapshot::from_record(record, as_of)?;
        let result = self.evaluate(&snapshot);

        Ok(LoanEvaluation {
            id: record.id.clone(),
            name: record.name.clone(),
            category: record.category,
            status: record.status,
            monthly_payment: record.monthly_amount,
            total_amount: record.total_amount,
            result,
        })
    }

    /// Evaluate many records in parallel; output order matches input order
    pub fn evaluate_batch(
        &self,
        records: &[LoanRecord],
        as_of: NaiveDate,
    ) -> Vec<Result<LoanEvaluation>> {
        records
            .par_iter()
            .map(|record| self.evaluate_record(record, as_of))
            .collect()
    }

    fn balance_rate(&self, snapshot: &LoanSnapshot) -> (f64, bool) {
        if let Some(stated) = snapshot.stated_rate() {
            return (monthly_from_annual_percent(stated), true);
        }

        let (percent, converged) = self.solve_percent(
            snapshot.total_amount_financed,
            snapshot.monthly_payment,
            snapshot.total_tenure_months,
        );
        (monthly_from_annual_percent(percent), converged)
    }

    fn solve_percent(&self, principal: f64, payment: f64, tenure_months: u32) -> (f64, bool) {
        match self.solve_rate(principal, payment, tenure_months) {
            Ok(solution) => (self.quantize(solution.annual_rate_percent()), solution.converged),
            Err(e) => {
                log::warn!("rate inference fell back to zero: {}", e);
                (0.0, false)
            }
        }
    }

    fn quantize(&self, percent: f64) -> f64 {
        match self.config.rate_decimals {
            Some(decimals) => quantize_percent(percent, decimals),
            None => percent,
        }
    }
}
