use chrono::{NaiveDate, NaiveDateTime};
use colored::{ColoredString, Colorize};
use comfy_table::{Cell, Table};
use serde::Serialize;

use crate::cli::{load_report, SourceArgs};
use crate::error::{AllowanceError, Result};
use crate::models::{ActionStatus, ClientSummary, CycleReport, HistoricalTotals};
use crate::money::Cents;
use crate::normalizer::{client_key, normalize_name};

/// Figures over the rows actually shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Kpis {
    pub total_purchased: Cents,
    pub total_pending: Cents,
    pub clients_not_eligible: usize,
}

#[derive(Serialize)]
struct ReportJson<'a> {
    as_of: NaiveDate,
    budget: Cents,
    clients: Vec<&'a ClientSummary>,
    kpis: Kpis,
    totals: HistoricalTotals,
}

/// Apply the status and client filters after the report is computed.
pub fn filter_summaries<'a>(
    report: &'a CycleReport,
    statuses: &[ActionStatus],
    client: Option<&str>,
) -> Result<Vec<&'a ClientSummary>> {
    let wanted_key = client.map(|c| client_key(&normalize_name(c)));
    if let (Some(raw), Some(key)) = (client, wanted_key.as_deref()) {
        if !report.summaries.iter().any(|s| s.client_key == key) {
            return Err(AllowanceError::UnknownClient(raw.to_string()));
        }
    }

    Ok(report
        .summaries
        .iter()
        .filter(|s| statuses.is_empty() || statuses.contains(&s.action_status))
        .filter(|s| wanted_key.as_deref().map_or(true, |k| s.client_key == k))
        .collect())
}

pub fn kpis(rows: &[&ClientSummary]) -> Kpis {
    Kpis {
        total_purchased: rows.iter().map(|s| s.purchased_total).sum(),
        total_pending: rows.iter().map(|s| s.pending_total).sum(),
        clients_not_eligible: rows
            .iter()
            .filter(|s| s.action_status == ActionStatus::NotEligible)
            .count(),
    }
}

fn colored_status(status: ActionStatus) -> ColoredString {
    match status {
        ActionStatus::Eligible => status.label().green(),
        ActionStatus::Purchased => status.label().cyan(),
        ActionStatus::PlaceOrder => status.label().yellow(),
        ActionStatus::OverBudgetPending => status.label().red().bold(),
        ActionStatus::NotEligible => status.label().red(),
    }
}

fn date_cell(ts: Option<NaiveDateTime>) -> String {
    ts.map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "\u{2014}".to_string())
}

pub fn run(source: &SourceArgs, status: &[String], client: Option<&str>, json: bool) -> Result<()> {
    let statuses = status
        .iter()
        .map(|s| s.parse::<ActionStatus>())
        .collect::<Result<Vec<_>>>()?;

    let report = load_report(source)?;
    let rows = filter_summaries(&report, &statuses, client)?;
    let kpi = kpis(&rows);

    if json {
        let out = ReportJson {
            as_of: report.as_of,
            budget: report.budget,
            clients: rows,
            kpis: kpi,
            totals: report.totals,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "Client Overview (as of {}, {} every 6 months)",
        report.as_of, report.budget
    );
    if rows.is_empty() {
        println!("No clients match.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Client",
        "Purchased Total",
        "Pending Total",
        "Remaining Balance",
        "Action Status",
        "Last Purchase",
        "Next Reset",
    ]);
    for s in &rows {
        table.add_row(vec![
            Cell::new(&s.client_display_name),
            Cell::new(s.purchased_total),
            Cell::new(s.pending_total),
            Cell::new(s.remaining_balance),
            Cell::new(colored_status(s.action_status)),
            Cell::new(date_cell(s.last_purchase_timestamp)),
            Cell::new(date_cell(s.next_reset_timestamp)),
        ]);
    }
    println!("{table}");
    println!();
    println!("Total Purchased:       {}", kpi.total_purchased);
    println!("Total Pending:         {}", kpi.total_pending);
    println!("Clients Not Eligible:  {}", kpi.clients_not_eligible);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accountant::build_report;
    use crate::normalizer::normalize_sheet;
    use crate::sheet::RawSheet;

    fn sample() -> CycleReport {
        let sheet = RawSheet::from_rows(
            &["Timestamp", "Clients", "Purchased", "Inactive", "Clean Cost"],
            &[
                &["2025-03-01", "Ann", "yes", "", "25"],
                &["2025-03-01", "Bob", "yes", "", "10"],
                &["2025-03-02", "Bob", "no", "", "20"],
                &["2025-03-01", "Cy", "no", "", "0"],
                &["2025-03-01", "Dee", "yes", "", "25"],
            ],
        );
        let normalized = normalize_sheet(&sheet).unwrap();
        build_report(&normalized, Cents(2500), NaiveDate::from_ymd_opt(2025, 4, 1).unwrap())
    }

    #[test]
    fn test_no_filters_keeps_everything() {
        let report = sample();
        let rows = filter_summaries(&report, &[], None).unwrap();
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn test_status_filter() {
        let report = sample();
        let rows = filter_summaries(&report, &[ActionStatus::NotEligible], None).unwrap();
        let names: Vec<&str> = rows.iter().map(|s| s.client_display_name.as_str()).collect();
        assert_eq!(names, vec!["Ann", "Dee"]);
    }

    #[test]
    fn test_client_filter_normalizes_input() {
        let report = sample();
        let rows = filter_summaries(&report, &[], Some("  BOB ")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].action_status, ActionStatus::OverBudgetPending);
    }

    #[test]
    fn test_unknown_client_is_an_error() {
        let report = sample();
        let err = filter_summaries(&report, &[], Some("Zed")).unwrap_err();
        assert!(matches!(err, AllowanceError::UnknownClient(_)));
    }

    #[test]
    fn test_kpis_follow_filtered_rows() {
        let report = sample();
        let all = filter_summaries(&report, &[], None).unwrap();
        let k = kpis(&all);
        assert_eq!(k.total_purchased, Cents(6000));
        assert_eq!(k.total_pending, Cents(2000));
        assert_eq!(k.clients_not_eligible, 2);

        let eligible = filter_summaries(&report, &[ActionStatus::Eligible], None).unwrap();
        assert_eq!(kpis(&eligible).total_purchased, Cents::ZERO);
    }

    #[test]
    fn test_date_cell() {
        let ts = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap().and_hms_opt(9, 0, 0);
        assert_eq!(date_cell(ts), "2025-03-01");
        assert_eq!(date_cell(None), "\u{2014}");
    }
}
