use std::collections::HashMap;

use chrono::{Months, NaiveDate, NaiveDateTime};

use crate::models::{
    ActionStatus, ClientSummary, CycleReport, HistoricalTotals, RecordCounts, TransactionRecord,
};
use crate::money::Cents;
use crate::normalizer::NormalizedSheet;

/// Length of one allowance cycle.
pub const CYCLE_MONTHS: u32 = 6;

// ---------------------------------------------------------------------------
// Calendar arithmetic
// ---------------------------------------------------------------------------

/// Calendar-month addition. A day past the end of the target month clamps to
/// its last day: Aug 31 + 6 months is Feb 28 (Feb 29 in leap years).
pub fn add_months(ts: NaiveDateTime, months: u32) -> NaiveDateTime {
    ts.checked_add_months(Months::new(months)).unwrap_or(NaiveDateTime::MAX)
}

/// Calendar-month subtraction with the same end-of-month clamping.
pub fn sub_months(ts: NaiveDateTime, months: u32) -> NaiveDateTime {
    ts.checked_sub_months(Months::new(months)).unwrap_or(NaiveDateTime::MIN)
}

// ---------------------------------------------------------------------------
// Per-client fold
// ---------------------------------------------------------------------------

/// Pick the action for a client. Order matters: pending items dominate.
pub fn classify(pending: Cents, remaining: Cents, budget: Cents) -> ActionStatus {
    if pending.is_positive() && pending > remaining {
        ActionStatus::OverBudgetPending
    } else if pending.is_positive() {
        ActionStatus::PlaceOrder
    } else if remaining == budget {
        ActionStatus::Eligible
    } else if remaining == Cents::ZERO {
        ActionStatus::NotEligible
    } else {
        ActionStatus::Purchased
    }
}

/// Budget minus what the open cycle consumed, kept within `[0, budget]`.
fn remaining_after(budget: Cents, purchased_total: Cents) -> Cents {
    (budget - purchased_total).clamp(Cents::ZERO, budget.max(Cents::ZERO))
}

/// Reduce one client's active records to its cycle summary.
///
/// `today` is the run's reference date; the comparison against the reset
/// point happens at midnight of that day.
pub fn summarize_client(
    display_name: &str,
    key: &str,
    records: &[&TransactionRecord],
    budget: Cents,
    today: NaiveDate,
) -> ClientSummary {
    let (purchases, pending): (Vec<&TransactionRecord>, Vec<&TransactionRecord>) =
        records.iter().copied().partition(|r| r.purchased);

    let pending_total: Cents = pending.iter().map(|r| r.amount).sum();
    let last_purchase = purchases.iter().filter_map(|r| r.timestamp).max();

    let (purchased_total, next_reset) = match last_purchase {
        None => (Cents::ZERO, None),
        Some(last) => {
            let reset_at = add_months(last, CYCLE_MONTHS);
            if today.and_time(chrono::NaiveTime::MIN) >= reset_at {
                (Cents::ZERO, Some(reset_at))
            } else {
                let cycle_start = sub_months(last, CYCLE_MONTHS);
                let in_cycle: Cents = purchases
                    .iter()
                    .filter(|r| r.timestamp.is_some_and(|ts| ts >= cycle_start))
                    .map(|r| r.amount)
                    .sum();
                (in_cycle, Some(reset_at))
            }
        }
    };

    let remaining_balance = remaining_after(budget, purchased_total);

    ClientSummary {
        client_display_name: display_name.to_string(),
        client_key: key.to_string(),
        purchased_total,
        pending_total,
        remaining_balance,
        last_purchase_timestamp: last_purchase,
        next_reset_timestamp: next_reset,
        action_status: classify(pending_total, remaining_balance, budget),
    }
}

// ---------------------------------------------------------------------------
// Whole-sheet report
// ---------------------------------------------------------------------------

/// Sums over every record regardless of `inactive`.
pub fn historical_totals(records: &[TransactionRecord]) -> HistoricalTotals {
    let mut totals = HistoricalTotals::default();
    for r in records {
        if r.purchased {
            totals.total_purchased_all_time += r.amount;
        } else {
            totals.total_pending_all_time += r.amount;
        }
    }
    totals
}

/// Group active records by client key, preserving first-seen key order.
fn group_active(records: &[TransactionRecord]) -> Vec<(&str, Vec<&TransactionRecord>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&TransactionRecord>)> = Vec::new();
    for r in records.iter().filter(|r| !r.inactive) {
        let slot = *index.entry(r.client_key.as_str()).or_insert_with(|| {
            groups.push((r.client_key.as_str(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(r);
    }
    groups
}

pub fn build_report(sheet: &NormalizedSheet, budget: Cents, today: NaiveDate) -> CycleReport {
    let records = &sheet.records;

    let mut summaries: Vec<ClientSummary> = group_active(records)
        .into_iter()
        .map(|(key, group)| {
            summarize_client(sheet.directory.display_name(key), key, &group, budget, today)
        })
        .collect();
    summaries.sort_by(|a, b| {
        a.client_display_name
            .cmp(&b.client_display_name)
            .then_with(|| a.client_key.cmp(&b.client_key))
    });

    let inactive_records = records.iter().filter(|r| r.inactive).count();
    let counts = RecordCounts {
        records: records.len(),
        active_records: records.len() - inactive_records,
        inactive_records,
        unparseable_timestamps: sheet.unparseable_timestamps,
    };

    tracing::info!(
        clients = summaries.len(),
        records = counts.records,
        inactive = counts.inactive_records,
        %today,
        "cycle report built"
    );

    CycleReport {
        as_of: today,
        budget,
        summaries,
        totals: historical_totals(records),
        counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize_sheet;
    use crate::sheet::RawSheet;

    const HEADER: [&str; 5] = ["Timestamp", "Clients", "Purchased", "Inactive", "Clean Cost"];
    const BUDGET: Cents = Cents(2500);

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(0, 0, 0).unwrap()
    }

    fn report(rows: &[&[&str]], today: NaiveDate) -> CycleReport {
        let sheet = normalize_sheet(&RawSheet::from_rows(&HEADER, rows)).unwrap();
        build_report(&sheet, BUDGET, today)
    }

    fn only(report: &CycleReport) -> &ClientSummary {
        assert_eq!(report.summaries.len(), 1);
        &report.summaries[0]
    }

    #[test]
    fn test_add_months_clamps_to_month_end() {
        assert_eq!(add_months(at(2025, 1, 31), 6), at(2025, 7, 31));
        assert_eq!(add_months(at(2025, 8, 31), 6), at(2026, 2, 28));
        assert_eq!(add_months(at(2023, 8, 31), 6), at(2024, 2, 29));
        assert_eq!(add_months(at(2025, 12, 31), 6), at(2026, 6, 30));
        assert_eq!(sub_months(at(2025, 8, 31), 6), at(2025, 2, 28));
    }

    #[test]
    fn test_never_purchased_is_eligible() {
        let r = report(&[&["2025-03-01", "Ann", "no", "", "0"]], date(2025, 4, 1));
        let s = only(&r);
        assert_eq!(s.purchased_total, Cents::ZERO);
        assert_eq!(s.remaining_balance, BUDGET);
        assert_eq!(s.last_purchase_timestamp, None);
        assert_eq!(s.next_reset_timestamp, None);
        assert_eq!(s.action_status, ActionStatus::Eligible);
    }

    #[test]
    fn test_purchases_without_timestamps_count_as_never_purchased() {
        let r = report(&[&["garbage", "Ann", "yes", "", "20"]], date(2025, 4, 1));
        let s = only(&r);
        assert_eq!(s.purchased_total, Cents::ZERO);
        assert_eq!(s.remaining_balance, BUDGET);
        assert_eq!(s.action_status, ActionStatus::Eligible);
        assert_eq!(r.totals.total_purchased_all_time, Cents(2000));
    }

    #[test]
    fn test_full_budget_purchase_is_not_eligible() {
        let r = report(&[&["2025-03-01", "Ann", "yes", "", "$25.00"]], date(2025, 4, 1));
        let s = only(&r);
        assert_eq!(s.remaining_balance, Cents::ZERO);
        assert_eq!(s.next_reset_timestamp, Some(at(2025, 9, 1)));
        assert_eq!(s.action_status, ActionStatus::NotEligible);
    }

    #[test]
    fn test_pending_over_remaining_is_over_budget() {
        let r = report(
            &[
                &["2025-03-01", "A", "yes", "", "10"],
                &["2025-03-02", "A", "no", "", "20"],
            ],
            date(2025, 4, 1),
        );
        let s = only(&r);
        assert_eq!(s.purchased_total, Cents(1000));
        assert_eq!(s.remaining_balance, Cents(1500));
        assert_eq!(s.pending_total, Cents(2000));
        assert_eq!(s.action_status, ActionStatus::OverBudgetPending);
    }

    #[test]
    fn test_pending_within_remaining_is_place_order() {
        let r = report(
            &[
                &["2025-03-01", "A", "yes", "", "10"],
                &["2025-03-02", "A", "no", "", "10"],
            ],
            date(2025, 4, 1),
        );
        assert_eq!(only(&r).action_status, ActionStatus::PlaceOrder);
    }

    #[test]
    fn test_pending_equal_to_remaining_is_place_order() {
        let r = report(
            &[
                &["2025-03-01", "A", "yes", "", "10"],
                &["2025-03-02", "A", "no", "", "15"],
            ],
            date(2025, 4, 1),
        );
        assert_eq!(only(&r).action_status, ActionStatus::PlaceOrder);
    }

    #[test]
    fn test_cycle_resets_after_six_months() {
        let r = report(&[&["2025-01-10", "B", "yes", "", "25"]], date(2025, 7, 10));
        let s = only(&r);
        assert_eq!(s.purchased_total, Cents::ZERO);
        assert_eq!(s.remaining_balance, BUDGET);
        assert_eq!(s.last_purchase_timestamp, Some(at(2025, 1, 10)));
        assert_eq!(s.next_reset_timestamp, Some(at(2025, 7, 10)));
        assert_eq!(s.action_status, ActionStatus::Eligible);
    }

    #[test]
    fn test_cycle_still_open_the_day_before_reset() {
        let r = report(&[&["2025-01-10", "B", "yes", "", "25"]], date(2025, 7, 9));
        assert_eq!(only(&r).action_status, ActionStatus::NotEligible);
    }

    #[test]
    fn test_reset_compares_against_midnight() {
        // Purchase logged mid-afternoon resets from the following midnight.
        let r = report(&[&["2025-01-10 15:30:00", "B", "yes", "", "25"]], date(2025, 7, 10));
        assert_eq!(only(&r).purchased_total, Cents(2500));
        let r = report(&[&["2025-01-10 15:30:00", "B", "yes", "", "25"]], date(2025, 7, 11));
        assert_eq!(only(&r).purchased_total, Cents::ZERO);
    }

    #[test]
    fn test_huge_old_purchase_still_resets() {
        let r = report(&[&["2024-01-01", "B", "yes", "", "$9,999.00"]], date(2025, 4, 1));
        assert_eq!(only(&r).purchased_total, Cents::ZERO);
    }

    #[test]
    fn test_window_sums_purchases_within_six_months_of_last() {
        let r = report(
            &[
                &["2024-09-30", "C", "yes", "", "3"],
                &["2024-10-15", "C", "yes", "", "5"],
                &["2025-01-15", "C", "yes", "", "7"],
                &["2025-04-15", "C", "yes", "", "4"],
            ],
            date(2025, 5, 1),
        );
        let s = only(&r);
        // cycle_start = 2024-10-15; the September purchase falls outside.
        assert_eq!(s.purchased_total, Cents(1600));
        assert_eq!(s.remaining_balance, Cents(900));
        assert_eq!(s.action_status, ActionStatus::Purchased);
    }

    #[test]
    fn test_partial_purchases_summing_to_budget_are_exact() {
        let r = report(
            &[
                &["2025-03-01", "D", "yes", "", "8.10"],
                &["2025-03-02", "D", "yes", "", "8.20"],
                &["2025-03-03", "D", "yes", "", "8.70"],
            ],
            date(2025, 4, 1),
        );
        let s = only(&r);
        assert_eq!(s.remaining_balance, Cents::ZERO);
        assert_eq!(s.action_status, ActionStatus::NotEligible);
    }

    #[test]
    fn test_overspend_floors_at_zero() {
        let r = report(&[&["2025-03-01", "E", "yes", "", "40"]], date(2025, 4, 1));
        assert_eq!(only(&r).remaining_balance, Cents::ZERO);
    }

    #[test]
    fn test_negative_refund_caps_remaining_at_budget() {
        let r = report(
            &[
                &["2025-03-01", "F", "yes", "", "10"],
                &["2025-03-02", "F", "yes", "", "-15"],
            ],
            date(2025, 4, 1),
        );
        let s = only(&r);
        assert_eq!(s.purchased_total, Cents(-500));
        assert_eq!(s.remaining_balance, BUDGET);
        assert_eq!(s.action_status, ActionStatus::Eligible);
    }

    #[test]
    fn test_pending_ignores_cycle_window() {
        let r = report(
            &[
                &["2020-01-01", "G", "no", "", "5"],
                &["", "G", "no", "", "6"],
            ],
            date(2025, 4, 1),
        );
        assert_eq!(only(&r).pending_total, Cents(1100));
    }

    #[test]
    fn test_case_and_whitespace_variants_merge() {
        let r = report(
            &[
                &["2025-03-01", "  Jane   Doe ", "yes", "", "5"],
                &["2025-03-02", "jane doe", "yes", "", "5"],
                &["2025-03-03", "Jane Doe", "no", "", "1"],
            ],
            date(2025, 4, 1),
        );
        let s = only(&r);
        assert_eq!(s.client_display_name, "Jane Doe");
        assert_eq!(s.client_key, "jane doe");
        assert_eq!(s.purchased_total, Cents(1000));
        assert_eq!(s.pending_total, Cents(100));
    }

    #[test]
    fn test_summary_uses_active_spelling() {
        let r = report(
            &[
                &["2025-03-01", "JANE DOE", "yes", "yes", "5"],
                &["2025-03-02", "Jane Doe", "yes", "", "5"],
            ],
            date(2025, 4, 1),
        );
        let s = only(&r);
        assert_eq!(s.client_display_name, "Jane Doe");
        assert_eq!(s.purchased_total, Cents(500));
    }

    #[test]
    fn test_inactive_excluded_from_roster_but_not_totals() {
        let rows: &[&[&str]] = &[
            &["2025-03-01", "Active", "yes", "", "10"],
            &["2025-03-01", "Gone", "yes", "yes", "20"],
            &["2025-03-02", "Gone", "no", "TRUE", "4"],
            &["2025-03-02", "Active", "no", "", "1"],
        ];
        let r = report(rows, date(2025, 4, 1));
        assert_eq!(only(&r).client_display_name, "Active");
        assert_eq!(r.totals.total_purchased_all_time, Cents(3000));
        assert_eq!(r.totals.total_pending_all_time, Cents(500));
        assert_eq!(r.counts.inactive_records, 2);
        assert_eq!(r.counts.active_records, 2);

        let flipped: Vec<Vec<&str>> = rows
            .iter()
            .map(|row| {
                let mut row = row.to_vec();
                row[3] = "";
                row
            })
            .collect();
        let flipped: Vec<&[&str]> = flipped.iter().map(Vec::as_slice).collect();
        let r2 = report(&flipped, date(2025, 4, 1));
        assert_eq!(r2.totals, r.totals);
        assert_eq!(r2.summaries.len(), 2);
    }

    #[test]
    fn test_summaries_sorted_by_display_name() {
        let r = report(
            &[
                &["2025-03-01", "bob", "no", "", "0"],
                &["2025-03-01", "Zed", "no", "", "0"],
                &["2025-03-01", "Amy", "no", "", "0"],
            ],
            date(2025, 4, 1),
        );
        let names: Vec<&str> = r.summaries.iter().map(|s| s.client_display_name.as_str()).collect();
        assert_eq!(names, vec!["Amy", "Zed", "bob"]);
    }

    #[test]
    fn test_remaining_always_within_budget() {
        let amounts = ["-30", "0", "0.01", "12.49", "25", "26", "1000"];
        for purchased in amounts {
            for pending in amounts {
                let r = report(
                    &[
                        &["2025-03-01", "H", "yes", "", purchased],
                        &["2025-03-02", "H", "no", "", pending],
                    ],
                    date(2025, 4, 1),
                );
                let s = only(&r);
                assert!(s.remaining_balance >= Cents::ZERO);
                assert!(s.remaining_balance <= BUDGET);
            }
        }
    }

    #[test]
    fn test_classify_precedence() {
        assert_eq!(classify(Cents(1), Cents::ZERO, BUDGET), ActionStatus::OverBudgetPending);
        assert_eq!(classify(Cents(1), BUDGET, BUDGET), ActionStatus::PlaceOrder);
        assert_eq!(classify(Cents::ZERO, BUDGET, BUDGET), ActionStatus::Eligible);
        assert_eq!(classify(Cents(-5), Cents::ZERO, BUDGET), ActionStatus::NotEligible);
        assert_eq!(classify(Cents::ZERO, Cents(1), BUDGET), ActionStatus::Purchased);
    }

    #[test]
    fn test_empty_sheet() {
        let r = report(&[], date(2025, 4, 1));
        assert!(r.summaries.is_empty());
        assert_eq!(r.totals, HistoricalTotals::default());
        assert_eq!(r.as_of, date(2025, 4, 1));
    }
}
