use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::error::{AllowanceError, Result};
use crate::models::TransactionRecord;
use crate::money::Cents;
use crate::sheet::RawSheet;

pub const COL_TIMESTAMP: &str = "Timestamp";
pub const COL_CLIENTS: &str = "Clients";
pub const COL_PURCHASED: &str = "Purchased";
pub const COL_INACTIVE: &str = "Inactive";
pub const COL_CLEAN_COST: &str = "Clean Cost";

pub const REQUIRED_COLUMNS: [&str; 5] = [
    COL_TIMESTAMP,
    COL_CLIENTS,
    COL_PURCHASED,
    COL_INACTIVE,
    COL_CLEAN_COST,
];

const TRUTHY: &[&str] = &["true", "yes", "1", "y", "checked", "x"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

// %y before %Y: chrono's %Y also takes two digits and would read "25" as year 25.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y"];

// ---------------------------------------------------------------------------
// Field coercion
// ---------------------------------------------------------------------------

fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

/// Collapse internal whitespace runs to one space and trim the ends.
pub fn normalize_name(raw: &str) -> String {
    ws_re().replace_all(raw.trim(), " ").into_owned()
}

/// Grouping key for an already-normalized name.
pub fn client_key(normalized: &str) -> String {
    normalized.to_lowercase()
}

pub fn is_truthy(raw: &str) -> bool {
    let v = raw.trim().to_lowercase();
    TRUTHY.contains(&v.as_str())
}

/// Parse a form timestamp. Date-only values land on midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Proof that a sheet carries every required column.
#[derive(Debug, Clone, Copy)]
pub struct Schema(());

impl Schema {
    pub fn resolve(columns: &[String]) -> Result<Self> {
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|req| !columns.iter().any(|c| c.trim() == **req))
            .map(|req| req.to_string())
            .collect();
        if missing.is_empty() {
            Ok(Schema(()))
        } else {
            Err(AllowanceError::MissingColumns {
                missing,
                found: columns.iter().map(|c| c.trim().to_string()).collect(),
            })
        }
    }

    pub fn record(&self, row: &HashMap<String, String>) -> TransactionRecord {
        let cell = |name: &str| row.get(name).map(String::as_str).unwrap_or("");
        let client_name = normalize_name(cell(COL_CLIENTS));
        TransactionRecord {
            client_key: client_key(&client_name),
            client_name,
            timestamp: parse_timestamp(cell(COL_TIMESTAMP)),
            purchased: is_truthy(cell(COL_PURCHASED)),
            inactive: is_truthy(cell(COL_INACTIVE)),
            amount: Cents::parse_lenient(cell(COL_CLEAN_COST)),
        }
    }
}

// ---------------------------------------------------------------------------
// Display names
// ---------------------------------------------------------------------------

/// First-seen display form per client key. An active row's spelling beats
/// any earlier inactive one, since only active clients make the roster.
#[derive(Debug, Clone, Default)]
pub struct ClientDirectory {
    names: HashMap<String, DisplayName>,
}

#[derive(Debug, Clone)]
struct DisplayName {
    name: String,
    from_active: bool,
}

impl ClientDirectory {
    fn observe(&mut self, record: &TransactionRecord) {
        let from_active = !record.inactive;
        let slot = self
            .names
            .entry(record.client_key.clone())
            .or_insert_with(|| DisplayName {
                name: record.client_name.clone(),
                from_active,
            });
        if from_active && !slot.from_active {
            slot.name = record.client_name.clone();
            slot.from_active = true;
        }
    }

    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.names.get(key).map(|d| d.name.as_str()).unwrap_or(key)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

// ---------------------------------------------------------------------------
// normalize_sheet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct NormalizedSheet {
    pub records: Vec<TransactionRecord>,
    pub directory: ClientDirectory,
    pub unparseable_timestamps: usize,
}

pub fn normalize_sheet(sheet: &RawSheet) -> Result<NormalizedSheet> {
    let schema = Schema::resolve(&sheet.columns)?;

    let mut out = NormalizedSheet::default();
    for (i, row) in sheet.rows.iter().enumerate() {
        let record = schema.record(row);
        if record.timestamp.is_none() {
            out.unparseable_timestamps += 1;
            tracing::debug!(
                row = i + 2,
                value = row.get(COL_TIMESTAMP).map(String::as_str).unwrap_or(""),
                "unparseable timestamp"
            );
        }
        out.directory.observe(&record);
        out.records.push(record);
    }

    if out.unparseable_timestamps > 0 {
        tracing::warn!(
            count = out.unparseable_timestamps,
            "rows with unparseable timestamps are ignored for cycle dates"
        );
    }
    tracing::debug!(
        records = out.records.len(),
        clients = out.directory.len(),
        "normalized sheet"
    );
    Ok(out)
}
