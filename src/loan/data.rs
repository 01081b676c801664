//! Loan record as stored by the EMI endpoints

use chrono::{DateTime, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::fees::FeeTerms;
use crate::error::{EmiError, Result};

/// Lifecycle status of a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    #[default]
    Active,
    Completed,
    Paused,
}

impl LoanStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, LoanStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Completed => "completed",
            LoanStatus::Paused => "paused",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "active" => Ok(LoanStatus::Active),
            "completed" => Ok(LoanStatus::Completed),
            "paused" => Ok(LoanStatus::Paused),
            other => Err(EmiError::invalid("status", format!("unknown status: {}", other))),
        }
    }
}

/// Display category of a loan. Not used in any computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoanCategory {
    #[default]
    #[serde(rename = "Home Loan")]
    HomeLoan,
    #[serde(rename = "Car Loan")]
    CarLoan,
    #[serde(rename = "Personal Loan")]
    PersonalLoan,
    #[serde(rename = "Education Loan")]
    EducationLoan,
    #[serde(rename = "Credit Card")]
    CreditCard,
    Other,
}

impl LoanCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanCategory::HomeLoan => "Home Loan",
            LoanCategory::CarLoan => "Car Loan",
            LoanCategory::PersonalLoan => "Personal Loan",
            LoanCategory::EducationLoan => "Education Loan",
            LoanCategory::CreditCard => "Credit Card",
            LoanCategory::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "" | "Home Loan" => Ok(LoanCategory::HomeLoan),
            "Car Loan" => Ok(LoanCategory::CarLoan),
            "Personal Loan" => Ok(LoanCategory::PersonalLoan),
            "Education Loan" => Ok(LoanCategory::EducationLoan),
            "Credit Card" => Ok(LoanCategory::CreditCard),
            "Other" => Ok(LoanCategory::Other),
            other => Err(EmiError::invalid("category", format!("unknown category: {}", other))),
        }
    }
}

/// A persisted loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanRecord {
    #[serde(default, rename = "_id", alias = "id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,

    /// Principal financed, including any processing fee
    pub total_amount: f64,

    /// Fixed installment
    pub monthly_amount: f64,

    #[serde(with = "date_format")]
    pub start_date: NaiveDate,

    /// Contracted number of installments
    pub total_months: u32,

    /// Annual percentage; 0 means not stated
    #[serde(default)]
    pub interest_rate: f64,

    /// Fee withheld from the disbursal
    #[serde(default)]
    pub processing_fee: f64,

    #[serde(default)]
    pub category: LoanCategory,

    #[serde(default)]
    pub status: LoanStatus,
}

impl LoanRecord {
    /// Create an active loan with no fee and no stated rate
    pub fn new(
        name: impl Into<String>,
        total_amount: f64,
        monthly_amount: f64,
        start_date: NaiveDate,
        total_months: u32,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            total_amount,
            monthly_amount,
            start_date,
            total_months,
            interest_rate: 0.0,
            processing_fee: 0.0,
            category: LoanCategory::default(),
            status: LoanStatus::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_processing_fee(mut self, fee: f64) -> Self {
        self.processing_fee = fee;
        self
    }

    pub fn with_interest_rate(mut self, annual_percent: f64) -> Self {
        self.interest_rate = annual_percent;
        self
    }

    pub fn with_category(mut self, category: LoanCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_status(mut self, status: LoanStatus) -> Self {
        self.status = status;
        self
    }

    /// Check the fields every computation relies on
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(EmiError::invalid("name", "must not be empty"));
        }
        positive("totalAmount", self.total_amount)?;
        positive("monthlyAmount", self.monthly_amount)?;
        if self.total_months == 0 {
            return Err(EmiError::invalid("totalMonths", "must be at least 1"));
        }
        if !self.interest_rate.is_finite() || self.interest_rate < 0.0 {
            return Err(EmiError::invalid("interestRate", "must be a non-negative number"));
        }
        self.fee_terms()?;
        self.end_date()?;
        Ok(())
    }

    /// Fee and disbursal derived from the stored fee
    pub fn fee_terms(&self) -> Result<FeeTerms> {
        FeeTerms::from_fee(self.total_amount, self.processing_fee)
    }

    /// Amount the borrower actually received
    pub fn principal_disbursed(&self) -> f64 {
        self.total_amount - self.processing_fee
    }

    /// Stated annual rate, if one was recorded
    pub fn stated_rate(&self) -> Option<f64> {
        (self.interest_rate.is_finite() && self.interest_rate > 0.0).then_some(self.interest_rate)
    }

    /// Date of the last installment month: start plus `total_months` months
    pub fn end_date(&self) -> Result<NaiveDate> {
        self.start_date
            .checked_add_months(Months::new(self.total_months))
            .ok_or_else(|| {
                EmiError::InvalidDate(format!(
                    "{} + {} months is out of range",
                    self.start_date, self.total_months
                ))
            })
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

fn positive(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EmiError::invalid(field, format!("must be positive, got {}", value)))
    }
}

/// Parse a calendar date from `YYYY-MM-DD` or an RFC 3339 timestamp
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.date_naive()))
        .map_err(|_| EmiError::InvalidDate(s.to_string()))
}

/// Dates are written as `YYYY-MM-DD`; timestamps are accepted on read
pub(crate) mod date_format {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_date(&raw).map_err(de::Error::custom)
    }
}
