use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{ImportError, Result};

/// A data line that was left out because its field count did not match the
/// header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedLine {
    pub line: usize,
    pub fields: usize,
}

/// Raw tokenized statement: the header row plus every data row whose width
/// matches it. Built once per file and never mutated.
#[derive(Debug, Clone)]
pub struct ParsedTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    lines: Vec<usize>,
    dropped: Vec<DroppedLine>,
}

impl ParsedTable {
    pub fn parse(text: &str) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let mut records = rdr.records();
        let headers: Vec<String> = match records.next() {
            Some(record) => record?.iter().map(str::to_string).collect(),
            None => return Err(ImportError::EmptyFile),
        };
        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::EmptyFile);
        }

        let mut rows = Vec::new();
        let mut lines = Vec::new();
        let mut dropped = Vec::new();
        for result in records {
            let record = result?;
            let line = record.position().map_or(0, |p| p.line() as usize);
            if record.len() != headers.len() {
                tracing::warn!(line, fields = record.len(), expected = headers.len(), "dropping row with mismatched field count");
                dropped.push(DroppedLine {
                    line,
                    fields: record.len(),
                });
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
            lines.push(line);
        }

        tracing::debug!(headers = headers.len(), rows = rows.len(), dropped = dropped.len(), "tokenized statement");
        Ok(Self {
            headers,
            rows,
            lines,
            dropped,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dropped(&self) -> &[DroppedLine] {
        &self.dropped
    }

    /// Source line of a data row (header is line 1).
    pub fn line_number(&self, row: usize) -> usize {
        self.lines.get(row).copied().unwrap_or(row + 2)
    }

    pub fn has_header(&self, header: &str) -> bool {
        self.headers.iter().any(|h| h == header)
    }

    /// Value of `header` in data row `row`. Duplicate headers resolve to the
    /// leftmost column.
    pub fn get(&self, row: usize, header: &str) -> Option<&str> {
        let idx = self.headers.iter().position(|h| h == header)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }
}

/// Loose file type check: `.csv` extension or a `text/csv` content type.
pub fn is_csv_file(name: &str, content_type: Option<&str>) -> bool {
    let by_ext = Path::new(name)
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    let by_type = content_type.is_some_and(|t| {
        t.split(';')
            .next()
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("text/csv"))
    });
    by_ext || by_type
}

pub fn fingerprint(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_headers_and_rows() {
        let table = ParsedTable::parse("Date,Amount,Merchant\n2024-01-01,10.00,Shop\n2024-01-02,5.50,Cafe\n").unwrap();
        assert_eq!(table.headers(), &["Date", "Amount", "Merchant"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "Merchant"), Some("Shop"));
        assert_eq!(table.get(1, "Amount"), Some("5.50"));
        assert_eq!(table.get(1, "Missing"), None);
    }

    #[test]
    fn test_quoted_comma_stays_in_one_field() {
        let table = ParsedTable::parse("Merchant,Date,Amount\n\"Acme, Inc.\",2024-01-01,100.00\n").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0, "Merchant"), Some("Acme, Inc."));
        assert_eq!(table.get(0, "Amount"), Some("100.00"));
    }

    #[test]
    fn test_mismatched_rows_are_dropped_and_recorded() {
        let text = "Date,Amount\n2024-01-01,1.00\n2024-01-02,2.00,extra\n2024-01-03,3.00\n";
        let table = ParsedTable::parse(text).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.dropped(), &[DroppedLine { line: 3, fields: 3 }]);
        assert_eq!(table.line_number(0), 2);
        assert_eq!(table.line_number(1), 4);
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let table = ParsedTable::parse("Date,Amount\r\n2024-01-01,1.00\r\n\r\n2024-01-02,2.00\r\n").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1, "Date"), Some("2024-01-02"));
    }

    #[test]
    fn test_row_of_empty_fields_is_kept() {
        let table = ParsedTable::parse("Date,Amount\n,\n2024-01-01,1\n").unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.dropped().is_empty());
        assert_eq!(table.get(0, "Date"), Some(""));
        assert_eq!(table.line_number(0), 2);
        assert_eq!(table.line_number(1), 3);
    }

    #[test]
    fn test_fields_are_trimmed() {
        let table = ParsedTable::parse(" Date , Amount \n 2024-01-01 , 9.99 \n").unwrap();
        assert_eq!(table.headers(), &["Date", "Amount"]);
        assert_eq!(table.get(0, "Amount"), Some("9.99"));
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(matches!(ParsedTable::parse(""), Err(ImportError::EmptyFile)));
        assert!(matches!(ParsedTable::parse(",,\n1,2,3\n"), Err(ImportError::EmptyFile)));
    }

    #[test]
    fn test_header_only_file_has_no_rows() {
        let table = ParsedTable::parse("Date,Amount\n").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.headers().len(), 2);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let text = "Date,Amount\n2024-01-01,1.00\n";
        let a = ParsedTable::parse(text).unwrap();
        let b = ParsedTable::parse(text).unwrap();
        assert_eq!(a.headers(), b.headers());
        assert_eq!(a.get(0, "Amount"), b.get(0, "Amount"));
    }

    #[test]
    fn test_is_csv_file() {
        assert!(is_csv_file("statement.CSV", None));
        assert!(is_csv_file("export", Some("text/csv; charset=utf-8")));
        assert!(!is_csv_file("statement.pdf", Some("application/pdf")));
        assert!(!is_csv_file("statement", None));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(fingerprint(b"abc"), fingerprint(b"abc"));
        assert_ne!(fingerprint(b"abc"), fingerprint(b"abd"));
        assert_eq!(fingerprint(b"").len(), 64);
    }
}
