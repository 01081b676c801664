//! Processing fee and disbursal reconciliation
//!
//! A loan entry supplies either the amount received or the fee withheld; the
//! other follows from `total = disbursal + fee`.

use serde::{Deserialize, Serialize};

use crate::error::{EmiError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeTerms {
    pub total_amount: f64,
    pub disbursal_amount: f64,
    pub processing_fee: f64,
}

impl FeeTerms {
    /// Derive the fee from the amount actually received
    pub fn from_disbursal(total_amount: f64, disbursal_amount: f64) -> Result<Self> {
        check_total(total_amount)?;
        if !disbursal_amount.is_finite() || disbursal_amount <= 0.0 {
            return Err(EmiError::invalid("disbursalAmount", "must be positive"));
        }
        if disbursal_amount > total_amount {
            return Err(EmiError::invalid(
                "disbursalAmount",
                format!("{} exceeds total amount {}", disbursal_amount, total_amount),
            ));
        }

        Ok(Self {
            total_amount,
            disbursal_amount,
            processing_fee: total_amount - disbursal_amount,
        })
    }

    /// Derive the disbursal from the fee withheld
    pub fn from_fee(total_amount: f64, processing_fee: f64) -> Result<Self> {
        check_total(total_amount)?;
        if !processing_fee.is_finite() || processing_fee < 0.0 {
            return Err(EmiError::invalid("processingFee", "must be zero or positive"));
        }
        if processing_fee >= total_amount {
            return Err(EmiError::invalid(
                "processingFee",
                format!("{} leaves nothing to disburse from {}", processing_fee, total_amount),
            ));
        }

        Ok(Self {
            total_amount,
            disbursal_amount: total_amount - processing_fee,
            processing_fee,
        })
    }

    /// Fee as a percentage of the total amount
    pub fn fee_percent(&self) -> f64 {
        self.processing_fee / self.total_amount * 100.0
    }
}

fn check_total(total_amount: f64) -> Result<()> {
    if total_amount.is_finite() && total_amount > 0.0 {
        Ok(())
    } else {
        Err(EmiError::invalid("totalAmount", "must be positive"))
    }
}
