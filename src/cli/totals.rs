use comfy_table::{Cell, Table};
use serde::Serialize;

use crate::cli::{load_report, SourceArgs};
use crate::error::Result;
use crate::models::{HistoricalTotals, RecordCounts};

#[derive(Serialize)]
struct TotalsJson {
    #[serde(flatten)]
    totals: HistoricalTotals,
    #[serde(flatten)]
    counts: RecordCounts,
}

pub fn run(source: &SourceArgs, json: bool) -> Result<()> {
    let report = load_report(source)?;
    let totals = report.totals;
    let counts = report.counts;

    if json {
        let out = TotalsJson { totals, counts };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["All Time", "Amount"]);
    table.add_row(vec![
        Cell::new("Total Purchased"),
        Cell::new(totals.total_purchased_all_time),
    ]);
    table.add_row(vec![
        Cell::new("Total Pending"),
        Cell::new(totals.total_pending_all_time),
    ]);
    println!("Historical Totals (active and inactive clients)\n{table}");
    println!(
        "{} records, {} from inactive clients",
        counts.records, counts.inactive_records
    );
    Ok(())
}
