//! EMI Tracker - loan amortization engine for a personal finance tracker
//!
//! This library provides:
//! - Implied interest rate inference for fixed-installment loans
//! - Months elapsed and outstanding principal at any evaluation date
//! - With-fees and without-fees rates for loans with a processing fee
//! - Portfolio totals across a user's active loans
//! - Loan record loading from CSV exports and the list endpoint's JSON

pub mod amortization;
pub mod error;
pub mod loan;
pub mod portfolio;

// Re-export commonly used types
pub use amortization::{AmortizationEngine, AmortizationResult, ElapsedConvention, EngineConfig, RatePair};
pub use error::{EmiError, RateInferenceError, Result};
pub use loan::{LoanCategory, LoanRecord, LoanSnapshot, LoanStatus};
pub use portfolio::{aggregate, PortfolioSummary};
