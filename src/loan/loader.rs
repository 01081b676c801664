//! Load loan records from CSV exports or the list endpoint's JSON

use csv::Reader;
use log::info;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::{parse_date, LoanCategory, LoanRecord, LoanStatus};
use crate::error::{EmiError, Result};

/// Raw CSV row using the stored document's column names
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "id", default)]
    id: Option<String>,
    #[serde(rename = "name")]
    name: String,
    #[serde(rename = "totalAmount")]
    total_amount: f64,
    #[serde(rename = "monthlyAmount")]
    monthly_amount: f64,
    #[serde(rename = "startDate")]
    start_date: String,
    #[serde(rename = "totalMonths")]
    total_months: u32,
    #[serde(rename = "interestRate", default)]
    interest_rate: Option<f64>,
    #[serde(rename = "processingFee", default)]
    processing_fee: Option<f64>,
    #[serde(rename = "category", default)]
    category: Option<String>,
    #[serde(rename = "status", default)]
    status: Option<String>,
}

impl CsvRow {
    fn to_record(self) -> Result<LoanRecord> {
        let record = LoanRecord {
            id: self.id.filter(|id| !id.trim().is_empty()),
            name: self.name,
            total_amount: self.total_amount,
            monthly_amount: self.monthly_amount,
            start_date: parse_date(&self.start_date)?,
            total_months: self.total_months,
            interest_rate: self.interest_rate.unwrap_or(0.0),
            processing_fee: self.processing_fee.unwrap_or(0.0),
            category: LoanCategory::parse(self.category.as_deref().unwrap_or(""))?,
            status: LoanStatus::parse(self.status.as_deref().unwrap_or(""))?,
        };
        record.validate()?;
        Ok(record)
    }
}

/// JSON input: a bare array or the `{ "emis": [...] }` list response
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonLoans {
    Envelope { emis: Vec<LoanRecord> },
    List(Vec<LoanRecord>),
}

/// Load all loans from a CSV file
pub fn load_loans<P: AsRef<Path>>(path: P) -> Result<Vec<LoanRecord>> {
    let file = File::open(path.as_ref())?;
    let loans = load_loans_from_reader(file)?;
    info!("loaded {} loans from {}", loans.len(), path.as_ref().display());
    Ok(loans)
}

/// Load loans from any CSV reader
pub fn load_loans_from_reader<R: Read>(reader: R) -> Result<Vec<LoanRecord>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut loans = Vec::new();

    for result in csv_reader.deserialize() {
        let row: CsvRow = result?;
        loans.push(row.to_record()?);
    }

    Ok(loans)
}

/// Load loans from JSON
pub fn load_loans_json<R: Read>(reader: R) -> Result<Vec<LoanRecord>> {
    let loans = match serde_json::from_reader(reader)? {
        JsonLoans::Envelope { emis } => emis,
        JsonLoans::List(loans) => loans,
    };

    for loan in &loans {
        loan.validate()?;
    }

    Ok(loans)
}

/// Load from a `.json` or `.csv` file, chosen by extension
pub fn load_loans_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<LoanRecord>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("json") => load_loans_json(File::open(path)?),
        Some("csv") => load_loans(path),
        _ => Err(EmiError::invalid(
            "file",
            format!("{}: expected a .csv or .json file", path.display()),
        )),
    }
}
