pub mod init;
pub mod report;
pub mod status;
pub mod totals;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::accountant::build_report;
use crate::error::{AllowanceError, Result};
use crate::models::CycleReport;
use crate::money::Cents;
use crate::normalizer::normalize_sheet;
use crate::settings::{load_settings, shellexpand_path, Settings};
use crate::sheet::read_csv;

#[derive(Parser)]
#[command(
    name = "allowance",
    version,
    about = "Track six-month reset allowances for program clients."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Where the sheet comes from and what it is judged against.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// CSV export of the sheet (default: data_file from settings)
    #[arg(long)]
    pub file: Option<String>,
    /// Allowance per cycle in dollars (default: budget from settings)
    #[arg(long)]
    pub budget: Option<f64>,
    /// Reference date: YYYY-MM-DD (default: today)
    #[arg(long)]
    pub today: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write settings: sheet location, budget and log level.
    Init {
        /// Path to the CSV export of the sheet
        #[arg(long = "data-file")]
        data_file: Option<String>,
        /// Allowance per cycle in dollars
        #[arg(long)]
        budget: Option<f64>,
        /// Log level: error, warn, info, debug, trace
        #[arg(long = "log-level")]
        log_level: Option<String>,
    },
    /// Client overview: cycle totals, balance and next action per client.
    Report {
        #[command(flatten)]
        source: SourceArgs,
        /// Only show these statuses (repeatable): eligible, purchased,
        /// place-order, over-budget, not-eligible
        #[arg(long)]
        status: Vec<String>,
        /// Only show one client (case-insensitive)
        #[arg(long)]
        client: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// All-time purchased and pending totals, inactive clients included.
    Totals {
        #[command(flatten)]
        source: SourceArgs,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show settings in effect and sheet statistics.
    Status {
        /// CSV export of the sheet (default: data_file from settings)
        #[arg(long)]
        file: Option<String>,
    },
}

pub(crate) fn parse_today(today: Option<&str>) -> Result<NaiveDate> {
    match today {
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|_| AllowanceError::InvalidDate(raw.to_string())),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

pub(crate) fn resolve_file(settings: &Settings, file: Option<&str>) -> PathBuf {
    PathBuf::from(shellexpand_path(file.unwrap_or(&settings.data_file)))
}

pub(crate) fn resolve_budget(settings: &Settings, budget: Option<f64>) -> Result<Cents> {
    match budget {
        Some(b) if !b.is_finite() || b < 0.0 => Err(AllowanceError::Settings(format!(
            "budget must be a non-negative amount, got {b}"
        ))),
        Some(b) => Ok(Cents::from_dollars(b)),
        None => {
            settings.validate()?;
            Ok(settings.budget_cents())
        }
    }
}

/// Load, normalize and account the sheet. `today` is read exactly once here.
pub(crate) fn load_report(source: &SourceArgs) -> Result<CycleReport> {
    let settings = load_settings();
    let path = resolve_file(&settings, source.file.as_deref());
    let budget = resolve_budget(&settings, source.budget)?;
    let today = parse_today(source.today.as_deref())?;

    if !path.exists() {
        return Err(AllowanceError::Other(format!(
            "Sheet export not found: {} (pass --file or run `allowance init --data-file ...`)",
            path.display()
        )));
    }
    let sheet = read_csv(&path)?;
    let normalized = normalize_sheet(&sheet)?;
    Ok(build_report(&normalized, budget, today))
}
