//! Loan records, fee reconciliation, snapshots and loading

mod data;
mod fees;
mod snapshot;
pub mod loader;

pub use data::{parse_date, LoanCategory, LoanRecord, LoanStatus};
pub use fees::FeeTerms;
pub use loader::{load_loans, load_loans_from_path, load_loans_from_reader, load_loans_json};
pub use snapshot::LoanSnapshot;
