use std::fmt;

use chrono::NaiveDate;

use crate::error::{ImportError, Result};
use crate::mapping::{ColumnMapping, TargetField};
use crate::models::{ImportBatch, ImportReceipt};
use crate::normalize::{normalize, DateOrder, Normalization, Summary};
use crate::submit::{SubmitError, Submitter};
use crate::table::{fingerprint, is_csv_file, ParsedTable};

const IMPORT_SOURCE: &str = "csv";

#[derive(Debug, Clone, PartialEq)]
pub enum WizardStep {
    Upload,
    Mapping,
    Preview,
    Importing,
    ImportFailed { message: String },
    Imported { receipt: ImportReceipt },
}

impl WizardStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Mapping => "mapping",
            Self::Preview => "preview",
            Self::Importing => "importing",
            Self::ImportFailed { .. } => "import failed",
            Self::Imported { .. } => "imported",
        }
    }
}

/// Something that keeps the wizard on the mapping step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    Unmapped(TargetField),
    NoCard,
    NoPeriodStart,
    NoPeriodEnd,
    PeriodReversed { start: NaiveDate, end: NaiveDate },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unmapped(field) => write!(f, "{} column is not mapped", field.label()),
            Self::NoCard => f.write_str("no card selected"),
            Self::NoPeriodStart => f.write_str("statement period start is missing"),
            Self::NoPeriodEnd => f.write_str("statement period end is missing"),
            Self::PeriodReversed { start, end } => {
                write!(f, "statement period starts ({start}) after it ends ({end})")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub fingerprint: String,
    pub table: ParsedTable,
}

/// One statement import, upload through submission. Each instance owns its
/// state; nothing is shared between wizards.
#[derive(Debug)]
pub struct Wizard {
    step: WizardStep,
    file: Option<UploadedFile>,
    mapping: ColumnMapping,
    card_id: Option<String>,
    period_start: Option<NaiveDate>,
    period_end: Option<NaiveDate>,
    date_order: DateOrder,
    summary: Option<Summary>,
}

impl Wizard {
    pub fn new(date_order: DateOrder) -> Self {
        Self {
            step: WizardStep::Upload,
            file: None,
            mapping: ColumnMapping::default(),
            card_id: None,
            period_start: None,
            period_end: None,
            date_order,
            summary: None,
        }
    }

    pub fn step(&self) -> &WizardStep {
        &self.step
    }

    pub fn file(&self) -> Option<&UploadedFile> {
        self.file.as_ref()
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    pub fn card_id(&self) -> Option<&str> {
        self.card_id.as_deref()
    }

    /// Counts computed when the preview step was entered.
    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    fn invalid(&self, action: &'static str) -> ImportError {
        ImportError::InvalidTransition {
            action,
            step: self.step.name(),
        }
    }

    fn transition(&mut self, next: WizardStep) {
        tracing::debug!(from = self.step.name(), to = next.name(), "wizard step");
        self.step = next;
    }

    /// Upload -> mapping. Also accepted on the mapping step, where a new file
    /// replaces the old one and its mapping wholesale. On error the wizard
    /// does not move.
    pub fn load_file(&mut self, name: &str, content_type: Option<&str>, data: &[u8]) -> Result<()> {
        if !matches!(self.step, WizardStep::Upload | WizardStep::Mapping) {
            return Err(self.invalid("load a file"));
        }
        if !is_csv_file(name, content_type) {
            return Err(ImportError::UnsupportedFile(name.to_string()));
        }
        let text = std::str::from_utf8(data).map_err(|e| {
            ImportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        let text = text.trim_start_matches('\u{feff}');
        if text.trim().is_empty() {
            return Err(ImportError::EmptyFile);
        }

        let table = ParsedTable::parse(text)?;
        self.mapping = ColumnMapping::auto_detect(table.headers());
        tracing::info!(file = name, rows = table.len(), dropped = table.dropped().len(), "loaded statement file");
        self.file = Some(UploadedFile {
            name: name.to_string(),
            fingerprint: fingerprint(data),
            table,
        });
        self.summary = None;
        self.transition(WizardStep::Mapping);
        Ok(())
    }

    /// Point `field` at a column of the loaded file, or clear it.
    pub fn map_field(&mut self, field: TargetField, header: Option<&str>) -> Result<()> {
        if self.step != WizardStep::Mapping {
            return Err(self.invalid("change the column mapping"));
        }
        if let (Some(h), Some(file)) = (header, &self.file) {
            if !file.table.has_header(h) {
                return Err(ImportError::UnknownColumn(h.to_string()));
            }
        }
        self.mapping.set(field, header.map(str::to_string));
        Ok(())
    }

    fn ensure_editable(&self, action: &'static str) -> Result<()> {
        match self.step {
            WizardStep::Upload | WizardStep::Mapping => Ok(()),
            _ => Err(self.invalid(action)),
        }
    }

    pub fn select_card(&mut self, card_id: &str) -> Result<()> {
        self.ensure_editable("select a card")?;
        let card_id = card_id.trim();
        self.card_id = (!card_id.is_empty()).then(|| card_id.to_string());
        Ok(())
    }

    pub fn set_period(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<()> {
        self.ensure_editable("set the statement period")?;
        self.period_start = start;
        self.period_end = end;
        Ok(())
    }

    /// Everything blocking the move to preview, one entry per problem.
    pub fn validation_issues(&self) -> Vec<ValidationIssue> {
        let mut issues: Vec<ValidationIssue> = self
            .mapping
            .missing_required()
            .into_iter()
            .map(ValidationIssue::Unmapped)
            .collect();
        if self.card_id.is_none() {
            issues.push(ValidationIssue::NoCard);
        }
        match (self.period_start, self.period_end) {
            (None, None) => {
                issues.push(ValidationIssue::NoPeriodStart);
                issues.push(ValidationIssue::NoPeriodEnd);
            }
            (None, Some(_)) => issues.push(ValidationIssue::NoPeriodStart),
            (Some(_), None) => issues.push(ValidationIssue::NoPeriodEnd),
            (Some(start), Some(end)) if start > end => {
                issues.push(ValidationIssue::PeriodReversed { start, end })
            }
            _ => {}
        }
        issues
    }

    /// Mapping -> preview. Runs the normalizer once for the summary counts.
    pub fn advance_to_preview(&mut self) -> Result<Summary> {
        if self.step != WizardStep::Mapping {
            return Err(self.invalid("preview"));
        }
        let issues = self.validation_issues();
        if !issues.is_empty() {
            return Err(ImportError::Validation(issues));
        }
        let summary = self.preview_rows()?.summary();
        self.summary = Some(summary.clone());
        self.transition(WizardStep::Preview);
        Ok(summary)
    }

    fn preview_rows(&self) -> Result<Normalization> {
        let (Some(file), Some(card_id)) = (&self.file, &self.card_id) else {
            return Err(self.invalid("preview"));
        };
        Ok(normalize(&file.table, &self.mapping, card_id, self.date_order))
    }

    /// Normalized rows and row errors, recomputed on every call.
    pub fn preview(&self) -> Result<Normalization> {
        match self.step {
            WizardStep::Preview | WizardStep::Importing | WizardStep::ImportFailed { .. } => self.preview_rows(),
            _ => Err(self.invalid("preview")),
        }
    }

    /// Submission is possible from preview, or from a failed import as a
    /// manual retry, when at least one row is valid.
    pub fn can_submit(&self) -> bool {
        matches!(self.step, WizardStep::Preview | WizardStep::ImportFailed { .. })
            && self.preview().is_ok_and(|n| !n.transactions.is_empty())
    }

    /// Step back one stage. Going back to upload forgets the file and its
    /// mapping; going back to mapping only forgets the preview counts.
    pub fn back(&mut self) -> Result<()> {
        match self.step {
            WizardStep::Mapping => {
                self.file = None;
                self.mapping = ColumnMapping::default();
                self.summary = None;
                self.transition(WizardStep::Upload);
                Ok(())
            }
            WizardStep::Preview | WizardStep::ImportFailed { .. } => {
                self.summary = None;
                self.transition(WizardStep::Mapping);
                Ok(())
            }
            _ => Err(self.invalid("go back")),
        }
    }

    /// Preview -> importing. Returns the batch to send; the wizard stays in
    /// `Importing` until `complete_import` is called.
    pub fn begin_import(&mut self) -> Result<ImportBatch> {
        match self.step {
            WizardStep::Importing => return Err(ImportError::ImportInProgress),
            WizardStep::Preview | WizardStep::ImportFailed { .. } => {}
            _ => return Err(self.invalid("import")),
        }
        let rows = self.preview_rows()?;
        if rows.transactions.is_empty() {
            return Err(ImportError::NothingToImport);
        }
        let (Some(file), Some(card_id), Some(start), Some(end)) =
            (&self.file, &self.card_id, self.period_start, self.period_end)
        else {
            return Err(self.invalid("import"));
        };

        let batch = ImportBatch {
            card_id: card_id.clone(),
            period_start: start.format("%Y-%m-%d").to_string(),
            period_end: end.format("%Y-%m-%d").to_string(),
            import_source: IMPORT_SOURCE.to_string(),
            original_filename: Some(file.name.clone()),
            transactions: rows.transactions,
        };
        self.transition(WizardStep::Importing);
        Ok(batch)
    }

    /// Importing -> imported, or importing -> import failed.
    pub fn complete_import(
        &mut self,
        outcome: std::result::Result<ImportReceipt, SubmitError>,
    ) -> Result<ImportReceipt> {
        if self.step != WizardStep::Importing {
            return Err(self.invalid("finish an import"));
        }
        match outcome {
            Ok(receipt) => {
                self.transition(WizardStep::Imported {
                    receipt: receipt.clone(),
                });
                Ok(receipt)
            }
            Err(e) => {
                self.transition(WizardStep::ImportFailed {
                    message: e.to_string(),
                });
                Err(ImportError::Submit(e))
            }
        }
    }

    pub fn submit(&mut self, submitter: &dyn Submitter) -> Result<ImportReceipt> {
        let batch = self.begin_import()?;
        let outcome = submitter.submit(&batch);
        self.complete_import(outcome)
    }
}
