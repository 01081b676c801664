//! EMI command-line interface
//!
//! Infer loan rates, evaluate outstanding balances and summarize a portfolio

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::warn;
use serde::Serialize;
use std::path::PathBuf;

use emi_tracker::amortization::{annual_percent, AmortizationEngine, EngineConfig, LoanEvaluation};
use emi_tracker::loan::{load_loans_from_path, FeeTerms};
use emi_tracker::{aggregate, ElapsedConvention};

/// Loan amortization calculations for tracked EMIs
#[derive(Parser)]
#[command(name = "emi", version, about = "Loan amortization calculations for tracked EMIs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    output: OutputFormat,

    /// Elapsed-month convention: calendar | first-installment-pending
    #[arg(long, global = true)]
    convention: Option<ElapsedConvention>,
}

#[derive(Subcommand)]
enum Commands {
    /// Infer the annual interest rate from loan terms
    Rate(RateArgs),
    /// Evaluate each loan in a file at a date
    Evaluate(BookArgs),
    /// Portfolio totals for the active loans in a file
    Summary(BookArgs),
}

#[derive(Args)]
struct RateArgs {
    /// Total amount financed
    #[arg(long)]
    principal: f64,

    /// Monthly installment
    #[arg(long)]
    payment: f64,

    /// Number of installments
    #[arg(long)]
    tenure: u32,

    /// Amount actually received, if a fee was withheld
    #[arg(long, conflicts_with = "fee")]
    disbursed: Option<f64>,

    /// Processing fee withheld from the disbursal
    #[arg(long)]
    fee: Option<f64>,
}

#[derive(Args)]
struct BookArgs {
    /// Loans as .csv or .json
    #[arg(long)]
    file: PathBuf,

    /// Evaluation date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RateOutput {
    monthly_rate: f64,
    #[serde(rename = "interestRate")]
    with_fees_percent: f64,
    converged: bool,
    iterations: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    fees: Option<FeeTerms>,
    #[serde(rename = "interestRateWithoutFees", skip_serializing_if = "Option::is_none")]
    without_fees_percent: Option<f64>,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let mut config = EngineConfig::from_env();
    if let Some(convention) = cli.convention {
        config = config.with_elapsed_convention(convention);
    }
    let engine = AmortizationEngine::new(config);

    match cli.command {
        Commands::Rate(args) => run_rate(&engine, &args, cli.output),
        Commands::Evaluate(args) => run_evaluate(&engine, &args, cli.output),
        Commands::Summary(args) => run_summary(&engine, &args, cli.output),
    }
}

fn run_rate(engine: &AmortizationEngine, args: &RateArgs, output: OutputFormat) -> Result<()> {
    let solution = engine
        .solve_rate(args.principal, args.payment, args.tenure)
        .context("could not infer a rate from these terms")?;

    let fees = match (args.disbursed, args.fee) {
        (Some(disbursed), _) => Some(FeeTerms::from_disbursal(args.principal, disbursed)?),
        (None, Some(fee)) => Some(FeeTerms::from_fee(args.principal, fee)?),
        (None, None) => None,
    };

    let without_fees_percent = fees
        .as_ref()
        .map(|f| engine.annual_rate_percent(f.disbursal_amount, args.payment, args.tenure));

    let result = RateOutput {
        monthly_rate: solution.monthly_rate,
        with_fees_percent: engine.annual_rate_percent(args.principal, args.payment, args.tenure),
        converged: solution.converged,
        iterations: solution.iterations,
        fees,
        without_fees_percent,
    };

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Table => {
            println!("Monthly rate:      {:.8}", result.monthly_rate);
            println!("Rate with fees:    {:.2}% p.a. (raw {:.6}%)", result.with_fees_percent, annual_percent(result.monthly_rate));
            if let (Some(fees), Some(without_fees)) = (result.fees, result.without_fees_percent) {
                println!("Disbursed:         {:.2} (fee {:.2}, {:.2}%)", fees.disbursal_amount, fees.processing_fee, fees.fee_percent());
                println!("Rate without fees: {:.2}% p.a.", without_fees);
            }
            println!("Converged:         {} ({} iterations)", result.converged, result.iterations);
        }
    }

    Ok(())
}

fn run_evaluate(engine: &AmortizationEngine, args: &BookArgs, output: OutputFormat) -> Result<()> {
    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());
    let loans = load_loans_from_path(&args.file)
        .with_context(|| format!("failed to load loans from {}", args.file.display()))?;

    let evaluations: Vec<LoanEvaluation> = engine
        .evaluate_batch(&loans, as_of)
        .into_iter()
        .zip(&loans)
        .filter_map(|(result, loan)| match result {
            Ok(evaluation) => Some(evaluation),
            Err(e) => {
                warn!("skipping loan '{}': {}", loan.name, e);
                None
            }
        })
        .collect();

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&evaluations)?),
        OutputFormat::Table => {
            println!("Loans as of {} ({} convention)", as_of, engine.config().elapsed_convention.as_str());
            println!("{:<20} {:>10} {:>12} {:>8} {:>7} {:>7} {:>14} {:>14}",
                "Name", "Status", "EMI", "Rate%", "Paid", "Left", "Outstanding", "Paid to date");
            println!("{}", "-".repeat(100));
            for e in &evaluations {
                println!("{:<20} {:>10} {:>12.2} {:>8.2} {:>7} {:>7} {:>14.2} {:>14.2}",
                    e.name,
                    e.status.as_str(),
                    e.monthly_payment,
                    e.result.annual_rate_percent,
                    e.result.months_elapsed,
                    e.result.months_remaining,
                    e.result.outstanding_principal,
                    e.result.amount_paid_to_date,
                );
            }
        }
    }

    Ok(())
}

fn run_summary(engine: &AmortizationEngine, args: &BookArgs, output: OutputFormat) -> Result<()> {
    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());
    let loans = load_loans_from_path(&args.file)
        .with_context(|| format!("failed to load loans from {}", args.file.display()))?;

    let summary = aggregate(engine, &loans, as_of)?;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Table => {
            println!("Portfolio as of {}", as_of);
            println!("  Active loans:     {} of {}", summary.active_count, summary.loan_count);
            println!("  Monthly payment:  {:.2}", summary.total_monthly_payment);
            println!("  Outstanding:      {:.2}", summary.total_outstanding);
            println!("  Principal:        {:.2}", summary.total_principal);
            println!("  Paid to date:     {:.2}", summary.total_paid);
        }
    }

    Ok(())
}
