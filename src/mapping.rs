use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{ImportError, Result};

/// Logical transaction fields a statement column can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TargetField {
    TransactionDate,
    Amount,
    MerchantName,
    Description,
    TransactionReference,
    PostingDate,
    OriginalAmount,
    OriginalCurrency,
}

/// Detection order. Earlier fields claim headers first.
pub const ALL_FIELDS: &[TargetField] = &[
    TargetField::TransactionDate,
    TargetField::Amount,
    TargetField::MerchantName,
    TargetField::Description,
    TargetField::TransactionReference,
    TargetField::PostingDate,
    TargetField::OriginalAmount,
    TargetField::OriginalCurrency,
];

impl TargetField {
    pub fn key(&self) -> &'static str {
        match self {
            Self::TransactionDate => "transaction_date",
            Self::Amount => "amount",
            Self::MerchantName => "merchant_name",
            Self::Description => "description",
            Self::TransactionReference => "transaction_reference",
            Self::PostingDate => "posting_date",
            Self::OriginalAmount => "original_amount",
            Self::OriginalCurrency => "original_currency",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::TransactionDate => "Transaction Date",
            Self::Amount => "Amount",
            Self::MerchantName => "Merchant",
            Self::Description => "Description",
            Self::TransactionReference => "Reference",
            Self::PostingDate => "Posting Date",
            Self::OriginalAmount => "Original Amount",
            Self::OriginalCurrency => "Original Currency",
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Self::TransactionDate | Self::Amount)
    }

    /// Lowercase substrings that suggest a header belongs to this field,
    /// in priority order.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::TransactionDate => &["date", "transaction date", "trans date", "txn date"],
            Self::Amount => &["amount", "transaction amount", "debit", "value", "amt"],
            Self::MerchantName => &["merchant", "payee", "vendor", "name"],
            Self::Description => &["description", "narration", "details", "memo", "desc"],
            Self::TransactionReference => &["reference", "ref", "transaction id"],
            Self::PostingDate => &["posting date", "post date", "posted", "value date"],
            Self::OriginalAmount => &["original amount", "foreign amount"],
            Self::OriginalCurrency => &["original currency", "currency"],
        }
    }
}

impl fmt::Display for TargetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for TargetField {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace(|c: char| c == '-' || c == ' ', "_");
        ALL_FIELDS
            .iter()
            .find(|f| f.key() == wanted)
            .copied()
            .ok_or_else(|| ImportError::UnknownField(s.to_string()))
    }
}

/// Which source header feeds each logical field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    columns: BTreeMap<TargetField, String>,
}

impl ColumnMapping {
    /// Best-effort guess from header text. Scans headers case-insensitively;
    /// for each field the first header containing one of its keywords (tried
    /// in keyword order) wins, unless an earlier field already took it.
    pub fn auto_detect(headers: &[String]) -> Self {
        let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
        let mut claimed = vec![false; headers.len()];
        let mut columns = BTreeMap::new();

        for field in ALL_FIELDS {
            let hit = field.keywords().iter().find_map(|kw| {
                lowered
                    .iter()
                    .enumerate()
                    .find(|(i, h)| !claimed[*i] && h.contains(kw))
                    .map(|(i, _)| i)
            });
            if let Some(i) = hit {
                claimed[i] = true;
                columns.insert(*field, headers[i].clone());
            }
        }

        tracing::debug!(mapped = columns.len(), headers = headers.len(), "auto-detected column mapping");
        Self { columns }
    }

    pub fn get(&self, field: TargetField) -> Option<&str> {
        self.columns.get(&field).map(String::as_str)
    }

    /// Assign or clear a field. Assigning replaces any previous header.
    pub fn set(&mut self, field: TargetField, header: Option<String>) {
        match header {
            Some(h) if !h.is_empty() => {
                self.columns.insert(field, h);
            }
            _ => {
                self.columns.remove(&field);
            }
        }
    }

    pub fn missing_required(&self) -> Vec<TargetField> {
        ALL_FIELDS
            .iter()
            .filter(|f| f.is_required() && !self.columns.contains_key(f))
            .copied()
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TargetField, &str)> {
        self.columns.iter().map(|(f, h)| (*f, h.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Parse a `field=Header` override. An empty header (`field=`) unmaps the
/// field.
pub fn parse_override(raw: &str) -> Result<(TargetField, Option<String>)> {
    let (field, header) = raw
        .split_once('=')
        .ok_or_else(|| ImportError::InvalidOverride(raw.to_string()))?;
    let field: TargetField = field.parse()?;
    let header = header.trim();
    Ok((field, (!header.is_empty()).then(|| header.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_auto_detect_simple_headers() {
        let m = ColumnMapping::auto_detect(&headers(&["Date", "Amount", "Merchant"]));
        assert_eq!(m.get(TargetField::TransactionDate), Some("Date"));
        assert_eq!(m.get(TargetField::Amount), Some("Amount"));
        assert_eq!(m.get(TargetField::MerchantName), Some("Merchant"));
        assert!(m.is_complete());
    }

    #[test]
    fn test_value_date_is_left_for_posting_date() {
        let m = ColumnMapping::auto_detect(&headers(&["Date", "Value Date", "Amount"]));
        assert_eq!(m.get(TargetField::TransactionDate), Some("Date"));
        assert_eq!(m.get(TargetField::Amount), Some("Amount"));
        assert_eq!(m.get(TargetField::PostingDate), Some("Value Date"));
    }

    #[test]
    fn test_auto_detect_is_case_insensitive() {
        let m = ColumnMapping::auto_detect(&headers(&["TRANSACTION DATE", "DEBIT", "PAYEE NAME"]));
        assert_eq!(m.get(TargetField::TransactionDate), Some("TRANSACTION DATE"));
        assert_eq!(m.get(TargetField::Amount), Some("DEBIT"));
        assert_eq!(m.get(TargetField::MerchantName), Some("PAYEE NAME"));
    }

    #[test]
    fn test_claimed_header_is_not_reused() {
        // "Posting Date" would match posting_date, but transaction_date runs first.
        let m = ColumnMapping::auto_detect(&headers(&["Posting Date", "Amount"]));
        assert_eq!(m.get(TargetField::TransactionDate), Some("Posting Date"));
        assert_eq!(m.get(TargetField::PostingDate), None);
    }

    #[test]
    fn test_keyword_order_beats_header_order() {
        // "amount" is tried before "debit", so the Amount column wins even
        // though Debit comes first.
        let m = ColumnMapping::auto_detect(&headers(&["Date", "Debit", "Amount"]));
        assert_eq!(m.get(TargetField::Amount), Some("Amount"));
    }

    #[test]
    fn test_original_amount_takes_leftover_column() {
        let m = ColumnMapping::auto_detect(&headers(&["Date", "Amount", "Original Amount", "Currency"]));
        assert_eq!(m.get(TargetField::Amount), Some("Amount"));
        assert_eq!(m.get(TargetField::OriginalAmount), Some("Original Amount"));
        assert_eq!(m.get(TargetField::OriginalCurrency), Some("Currency"));
    }

    #[test]
    fn test_unrecognized_headers_leave_required_missing() {
        let m = ColumnMapping::auto_detect(&headers(&["TxDate", "Amt", "Desc"]));
        assert_eq!(m.get(TargetField::TransactionDate), Some("TxDate"));
        assert_eq!(m.get(TargetField::Amount), Some("Amt"));
        assert_eq!(m.get(TargetField::Description), Some("Desc"));

        let m = ColumnMapping::auto_detect(&headers(&["When", "How much"]));
        assert!(m.is_empty());
        assert_eq!(
            m.missing_required(),
            vec![TargetField::TransactionDate, TargetField::Amount]
        );
    }

    #[test]
    fn test_set_and_clear() {
        let mut m = ColumnMapping::default();
        m.set(TargetField::Amount, Some("Value".to_string()));
        assert_eq!(m.get(TargetField::Amount), Some("Value"));
        m.set(TargetField::Amount, None);
        assert_eq!(m.get(TargetField::Amount), None);
    }

    #[test]
    fn test_field_from_str() {
        assert_eq!("amount".parse::<TargetField>().unwrap(), TargetField::Amount);
        assert_eq!("Posting-Date".parse::<TargetField>().unwrap(), TargetField::PostingDate);
        assert!("balance".parse::<TargetField>().is_err());
    }

    #[test]
    fn test_parse_override() {
        let (f, h) = parse_override("merchant_name=Payee Name").unwrap();
        assert_eq!(f, TargetField::MerchantName);
        assert_eq!(h.as_deref(), Some("Payee Name"));

        let (f, h) = parse_override("description=").unwrap();
        assert_eq!(f, TargetField::Description);
        assert_eq!(h, None);

        assert!(matches!(parse_override("amount"), Err(ImportError::InvalidOverride(_))));
    }
}
