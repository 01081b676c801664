//! Immutable input to every amortization computation

use chrono::{Local, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::LoanRecord;
use crate::error::Result;

/// Loan terms frozen at an evaluation date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanSnapshot {
    /// Amount received by the borrower (total minus fee)
    pub principal_disbursed: f64,

    /// Principal basis including the fee
    pub total_amount_financed: f64,

    pub monthly_payment: f64,
    pub total_tenure_months: u32,
    pub start_date: NaiveDate,
    pub as_of_date: NaiveDate,

    /// Known annual rate, if any
    pub stated_annual_rate_percent: Option<f64>,
}

impl LoanSnapshot {
    /// Validate a record and freeze it at `as_of`
    pub fn from_record(record: &LoanRecord, as_of: NaiveDate) -> Result<Self> {
        record.validate()?;
        let fees = record.fee_terms()?;

        Ok(Self {
            principal_disbursed: fees.disbursal_amount,
            total_amount_financed: fees.total_amount,
            monthly_payment: record.monthly_amount,
            total_tenure_months: record.total_months,
            start_date: record.start_date,
            as_of_date: as_of,
            stated_annual_rate_percent: record.stated_rate(),
        })
    }

    /// Snapshot at the local calendar date
    pub fn as_of_today(record: &LoanRecord) -> Result<Self> {
        Self::from_record(record, Local::now().date_naive())
    }

    /// Same terms at a different evaluation date
    pub fn at(&self, as_of: NaiveDate) -> Self {
        Self {
            as_of_date: as_of,
            ..*self
        }
    }

    /// Stated rate if positive and finite
    pub fn stated_rate(&self) -> Option<f64> {
        self.stated_annual_rate_percent
            .filter(|rate| rate.is_finite() && *rate > 0.0)
    }

    pub fn total_payments(&self) -> f64 {
        self.monthly_payment * self.total_tenure_months as f64
    }

    /// Interest over the whole tenure, never negative
    pub fn total_interest(&self) -> f64 {
        (self.total_payments() - self.total_amount_financed).max(0.0)
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.start_date
            .checked_add_months(Months::new(self.total_tenure_months))
    }
}
