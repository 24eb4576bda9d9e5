use serde::{Deserialize, Serialize};

/// One statement line ready to send to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTransaction {
    pub card_id: String,
    /// ISO date, `YYYY-MM-DD`.
    pub transaction_date: String,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posting_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_currency: Option<String>,
}

/// A data row that could not be normalized. `row_number` is the line in the
/// source file, so the header is line 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row_number: usize,
    pub message: String,
}

/// Request body for the statement import endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ImportBatch {
    pub card_id: String,
    pub period_start: String,
    pub period_end: String,
    pub import_source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
    pub transactions: Vec<NormalizedTransaction>,
}

/// What the backend told us after accepting a batch. Every field is optional
/// because the response shape belongs to the backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReceipt {
    pub status: u16,
    pub statement_id: Option<String>,
    pub imported: Option<u64>,
    pub message: Option<String>,
}
