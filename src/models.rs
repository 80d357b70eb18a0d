use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::AllowanceError;
use crate::money::Cents;

/// One normalized sheet row. Never mutated after the normalizer hands it on.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub client_name: String,
    pub client_key: String,
    pub timestamp: Option<NaiveDateTime>,
    pub purchased: bool,
    pub inactive: bool,
    pub amount: Cents,
}

/// What the program coordinator should do next for a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionStatus {
    Eligible,
    Purchased,
    PlaceOrder,
    OverBudgetPending,
    NotEligible,
}

impl ActionStatus {
    pub const ALL: [ActionStatus; 5] = [
        ActionStatus::Eligible,
        ActionStatus::Purchased,
        ActionStatus::PlaceOrder,
        ActionStatus::OverBudgetPending,
        ActionStatus::NotEligible,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Eligible => "Eligible",
            Self::Purchased => "Purchased",
            Self::PlaceOrder => "Place Order",
            Self::OverBudgetPending => "Over Budget \u{2014} Pending",
            Self::NotEligible => "Not Eligible \u{2014} Wait 6 Months",
        }
    }

    /// Short command-line spelling.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Eligible => "eligible",
            Self::Purchased => "purchased",
            Self::PlaceOrder => "place-order",
            Self::OverBudgetPending => "over-budget",
            Self::NotEligible => "not-eligible",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ActionStatus {
    type Err = AllowanceError;

    /// Accepts the slug or the full label, case-insensitively. A plain
    /// hyphen stands in for the em-dash in labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('\u{2014}', "-");
        ActionStatus::ALL
            .into_iter()
            .find(|status| {
                status.slug() == wanted
                    || status.label().to_lowercase().replace('\u{2014}', "-") == wanted
            })
            .ok_or_else(|| AllowanceError::InvalidStatus(s.to_string()))
    }
}

impl Serialize for ActionStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Allowance state for one active client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientSummary {
    pub client_display_name: String,
    pub client_key: String,
    pub purchased_total: Cents,
    pub pending_total: Cents,
    pub remaining_balance: Cents,
    pub last_purchase_timestamp: Option<NaiveDateTime>,
    pub next_reset_timestamp: Option<NaiveDateTime>,
    pub action_status: ActionStatus,
}

/// Lifetime figures over every record, active or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct HistoricalTotals {
    pub total_purchased_all_time: Cents,
    pub total_pending_all_time: Cents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RecordCounts {
    pub records: usize,
    pub active_records: usize,
    pub inactive_records: usize,
    pub unparseable_timestamps: usize,
}

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub as_of: NaiveDate,
    pub budget: Cents,
    pub summaries: Vec<ClientSummary>,
    pub totals: HistoricalTotals,
    pub counts: RecordCounts,
}
