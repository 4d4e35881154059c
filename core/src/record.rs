//! Raw record shapes handed over by the record store, plus the field parsers
//! every component shares.
//!
//! RULE: parsers never fail. An unparseable premium is 0, an unparseable
//! date is None. Callers decide per metric what an absent value means.

use crate::types::Period;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One policy row as it comes out of the source system.
///
/// Every field is kept as free text; `category` is never stored because it
/// is derived from `product_name` on every query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyRecord {
    pub policy_number:       String,
    /// Free-text entity field, usually "Name - Code".
    pub entity_text:         String,
    /// Direct entity code column, used when `entity_text` does not resolve.
    pub entity_code:         String,
    pub product_name:        String,
    pub company:             String,
    /// Locale-formatted amount, e.g. "1.234,56".
    pub premium:             String,
    pub effective_date:      String,
    pub cancellation_date:   String,
    pub cancellation_reason: String,
    pub status:              String,
    pub payment_method:      String,
    pub production_year:     String,
    pub production_month:    String,
}

/// A row of the advisor↔entity registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryLink {
    pub advisor_name:      String,
    /// Either "Name - Code" or a bare code.
    pub entity_identifier: String,
}

/// A known advisor. Seeds empty per-advisor buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorRecord {
    pub name: String,
}

// ── Lifecycle ────────────────────────────────────────────────────────────────

const CANCELLED_TOKENS: [&str; 2] = ["anula", "baja"];
const ACTIVE_TOKENS: [&str; 5] = ["vigor", "pendien", "cartera", "cobro", "suspension"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyState {
    Cancelled,
    Active,
    /// Neither token set matched.
    Other,
}

impl PolicyState {
    /// Classify a free-text status. Cancellation wins if both sets match.
    pub fn from_status(status: &str) -> Self {
        let lower = status.to_lowercase();
        if CANCELLED_TOKENS.iter().any(|t| lower.contains(t)) {
            PolicyState::Cancelled
        } else if ACTIVE_TOKENS.iter().any(|t| lower.contains(t)) {
            PolicyState::Active
        } else {
            PolicyState::Other
        }
    }

    pub fn is_cancelled(self) -> bool { self == PolicyState::Cancelled }
    pub fn is_active(self)    -> bool { self == PolicyState::Active }
}

// ── Field parsers ────────────────────────────────────────────────────────────

/// Parse a Spanish-locale amount. Comma is the decimal separator; when a
/// comma is present, dots are thousands separators.
pub fn parse_premium(raw: &str) -> f64 {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '€')
        .collect();
    if cleaned.is_empty() {
        return 0.0;
    }
    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned
    };
    match normalized.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Parse a date in any of the accepted layouts. ISO timestamps are cut to
/// their date part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let candidate = match trimmed.get(..10) {
        Some(head) if trimmed.len() > 10 && trimmed.as_bytes()[4] == b'-' => head,
        _ => trimmed,
    };
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(candidate, fmt).ok())
}

/// Parse a production period. Months outside 1..=12 are rejected.
pub fn parse_period(year: &str, month: &str) -> Option<Period> {
    let y = year.trim().parse::<i32>().ok()?;
    let m = month.trim().parse::<u32>().ok()?;
    (1..=12).contains(&m).then_some((y, m))
}
