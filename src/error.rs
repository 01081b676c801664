//! Error types for loan records and the amortization engine

use thiserror::Error;

/// Failure to infer a monthly rate from principal, payment and tenure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateInferenceError {
    #[error("degenerate loan terms: principal={principal}, payment={payment}, tenure={tenure_months} months")]
    DegenerateInput {
        principal: f64,
        payment: f64,
        tenure_months: u32,
    },

    #[error("no positive rate: total payments {total_payments} do not cover principal {principal}")]
    NoPositiveRate { principal: f64, total_payments: f64 },

    #[error("non-finite value produced at iteration {iteration}")]
    NonFinite { iteration: u32 },
}

#[derive(Debug, Error)]
pub enum EmiError {
    #[error("invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error(transparent)]
    RateInference(#[from] RateInferenceError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EmiError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        EmiError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EmiError>;
