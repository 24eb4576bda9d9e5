use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::mapping::{ColumnMapping, TargetField};
use crate::models::{NormalizedTransaction, RowError};
use crate::table::ParsedTable;

static ISO_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})").expect("valid regex"));
static SLASHED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})\b").expect("valid regex"));
static DASHED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})-(\d{1,2})-(\d{4})\b").expect("valid regex"));

const FALLBACK_FORMATS: &[&str] = &[
    "%Y/%m/%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d-%b-%Y",
    "%d-%b-%y",
];

/// How to read `NN/NN/YYYY` dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    #[default]
    DayFirst,
    MonthFirst,
}

fn ymd(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

/// Parse a statement date. Patterns are tried in order: ISO prefix, slashed
/// (order per `order`), day-first dashed, then a handful of textual forms.
pub fn parse_date(raw: &str, order: DateOrder) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(c) = ISO_PREFIX.captures(raw) {
        if let Some(d) = ymd(&c[1], &c[2], &c[3]) {
            return Some(d);
        }
    }
    if let Some(c) = SLASHED.captures(raw) {
        let parsed = match order {
            DateOrder::DayFirst => ymd(&c[3], &c[2], &c[1]),
            DateOrder::MonthFirst => ymd(&c[3], &c[1], &c[2]),
        };
        if parsed.is_some() {
            return parsed;
        }
    }
    if let Some(c) = DASHED.captures(raw) {
        if let Some(d) = ymd(&c[3], &c[2], &c[1]) {
            return Some(d);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.date_naive());
    }
    FALLBACK_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Keep digits, `.` and `-`, then parse. Returns `None` when nothing numeric
/// is left.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value)
}

#[derive(Debug, Clone, Default)]
pub struct Normalization {
    pub transactions: Vec<NormalizedTransaction>,
    pub errors: Vec<RowError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub ready: usize,
    pub rejected: usize,
    pub total: f64,
    pub debits: f64,
    pub credits: f64,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
}

impl Normalization {
    pub fn summary(&self) -> Summary {
        let total = self.transactions.iter().map(|t| t.amount).sum();
        let debits = self
            .transactions
            .iter()
            .filter(|t| t.amount < 0.0)
            .map(|t| t.amount)
            .sum();
        let credits = self
            .transactions
            .iter()
            .filter(|t| t.amount > 0.0)
            .map(|t| t.amount)
            .sum();
        let dates = self.transactions.iter().map(|t| t.transaction_date.clone());
        Summary {
            ready: self.transactions.len(),
            rejected: self.errors.len(),
            total,
            debits,
            credits,
            first_date: dates.clone().min(),
            last_date: dates.max(),
        }
    }
}

fn optional<'a>(table: &'a ParsedTable, row: usize, mapping: &ColumnMapping, field: TargetField) -> Option<&'a str> {
    let header = mapping.get(field)?;
    table.get(row, header).filter(|v| !v.is_empty())
}

/// Turn every data row into a transaction or a `RowError`. Never stops
/// early, so `transactions.len() + errors.len() == table.len()`.
pub fn normalize(
    table: &ParsedTable,
    mapping: &ColumnMapping,
    card_id: &str,
    order: DateOrder,
) -> Normalization {
    let mut out = Normalization::default();

    for row in 0..table.len() {
        let row_number = table.line_number(row);
        let reject = |message: String| RowError {
            row_number,
            message,
        };

        let raw_date = mapping
            .get(TargetField::TransactionDate)
            .and_then(|h| table.get(row, h))
            .unwrap_or("");
        let Some(date) = parse_date(raw_date, order) else {
            out.errors.push(reject(format!("Invalid date \"{raw_date}\"")));
            continue;
        };

        let raw_amount = mapping
            .get(TargetField::Amount)
            .and_then(|h| table.get(row, h))
            .unwrap_or("");
        let Some(amount) = parse_amount(raw_amount) else {
            out.errors.push(reject(format!("Invalid amount \"{raw_amount}\"")));
            continue;
        };

        let posting_date = optional(table, row, mapping, TargetField::PostingDate).map(|raw| {
            parse_date(raw, order)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| raw.to_string())
        });
        let original_amount = optional(table, row, mapping, TargetField::OriginalAmount).and_then(|raw| {
            let parsed = parse_amount(raw);
            if parsed.is_none() {
                tracing::debug!(row_number, raw, "ignoring unparseable original amount");
            }
            parsed
        });

        out.transactions.push(NormalizedTransaction {
            card_id: card_id.to_string(),
            transaction_date: date.format("%Y-%m-%d").to_string(),
            amount,
            merchant_name: optional(table, row, mapping, TargetField::MerchantName).map(str::to_string),
            description: optional(table, row, mapping, TargetField::Description).map(str::to_string),
            transaction_reference: optional(table, row, mapping, TargetField::TransactionReference)
                .map(str::to_string),
            posting_date,
            original_amount,
            original_currency: optional(table, row, mapping, TargetField::OriginalCurrency).map(str::to_string),
        });
    }

    tracing::info!(
        rows = table.len(),
        ready = out.transactions.len(),
        rejected = out.errors.len(),
        "normalized statement rows"
    );
    out
}
