//! CSV import/export for the recipient directory.
//!
//! Imports are per-row: each data row is classified as imported,
//! duplicate-skipped, or a row-level error. A partial failure never aborts
//! the import; only a file with zero parseable data rows is rejected.

use crate::store::{DirectoryStore, RecipientDraft};
use csv::{ReaderBuilder, WriterBuilder};
use invite_core::types::{Recipient, RecipientKind, RecipientProfile};
use invite_core::{InviteError, InviteResult};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// Columns that must appear in the header row for a kind.
fn required_columns(kind: RecipientKind) -> &'static [&'static str] {
    match kind {
        RecipientKind::Student => &["name", "email", "course", "year"],
        RecipientKind::Guest => &["name", "email", "organization", "designation"],
        RecipientKind::Professor => &["name", "email", "college", "department", "designation"],
    }
}

/// Full column set written on export.
fn export_columns(kind: RecipientKind) -> &'static [&'static str] {
    match kind {
        RecipientKind::Student => &["name", "email", "phone", "course", "year"],
        RecipientKind::Guest => &[
            "name",
            "email",
            "phone",
            "organization",
            "designation",
            "category",
        ],
        RecipientKind::Professor => &[
            "name",
            "email",
            "phone",
            "college",
            "department",
            "designation",
            "expertise",
        ],
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    /// 1-based data-row number (the header row is not counted).
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    /// Emails skipped because they already exist in this kind's table.
    pub duplicates: Vec<String>,
    pub errors: Vec<RowError>,
}

/// Per-row classification, exposed for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported,
    DuplicateSkipped,
    RowFailed,
}

/// Parse and import a CSV document into the directory.
pub fn import_csv(
    store: &DirectoryStore,
    kind: RecipientKind,
    csv_text: &str,
) -> InviteResult<ImportReport> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| InviteError::Validation(format!("unreadable CSV header: {e}")))?
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();

    let missing: Vec<&str> = required_columns(kind)
        .iter()
        .filter(|c| !headers.iter().any(|h| h == *c))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(InviteError::Validation(format!(
            "CSV is missing required columns: {}",
            missing.join(", ")
        )));
    }

    let mut report = ImportReport::default();
    let mut parsed_rows = 0usize;

    for (idx, record) in reader.records().enumerate() {
        let row = idx + 1;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                report.errors.push(RowError {
                    row,
                    message: format!("unparseable row: {e}"),
                });
                continue;
            }
        };
        parsed_rows += 1;

        let fields: HashMap<&str, &str> = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.as_str(), v))
            .collect();

        match import_row(store, kind, &fields) {
            Ok(ImportOutcome::Imported) => report.imported += 1,
            Ok(ImportOutcome::DuplicateSkipped) => {
                report
                    .duplicates
                    .push(fields.get("email").unwrap_or(&"").to_string());
            }
            Ok(ImportOutcome::RowFailed) => unreachable!("row failures carry an error"),
            Err(e) => report.errors.push(RowError {
                row,
                message: e.to_string(),
            }),
        }
    }

    if parsed_rows == 0 && report.errors.is_empty() {
        return Err(InviteError::Validation(
            "CSV contains no data rows".to_string(),
        ));
    }

    info!(
        kind = kind.display_name(),
        imported = report.imported,
        duplicates = report.duplicates.len(),
        errors = report.errors.len(),
        "CSV import finished"
    );
    metrics::counter!(
        "directory.csv.imported",
        "kind" => kind.path_segment()
    )
    .increment(report.imported as u64);

    Ok(report)
}

fn import_row(
    store: &DirectoryStore,
    kind: RecipientKind,
    fields: &HashMap<&str, &str>,
) -> InviteResult<ImportOutcome> {
    let get = |col: &str| fields.get(col).map(|v| v.to_string()).unwrap_or_default();
    let opt = |col: &str| {
        let v = get(col);
        if v.is_empty() {
            None
        } else {
            Some(v)
        }
    };

    let profile = match kind {
        RecipientKind::Student => RecipientProfile::Student {
            course: get("course"),
            year: get("year"),
        },
        RecipientKind::Guest => RecipientProfile::Guest {
            organization: get("organization"),
            designation: get("designation"),
            category: opt("category"),
        },
        RecipientKind::Professor => RecipientProfile::Professor {
            college: get("college"),
            department: get("department"),
            designation: get("designation"),
            expertise: opt("expertise"),
        },
    };

    let draft = RecipientDraft {
        name: get("name"),
        email: get("email"),
        phone: opt("phone"),
        profile,
    };

    match store.create(draft) {
        Ok(_) => Ok(ImportOutcome::Imported),
        Err(InviteError::DuplicateEmail(_)) => Ok(ImportOutcome::DuplicateSkipped),
        Err(e) => Err(e),
    }
}

/// Render all recipients of a kind as a CSV document.
pub fn export_csv(store: &DirectoryStore, kind: RecipientKind) -> InviteResult<String> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(export_columns(kind))
        .map_err(|e| InviteError::Internal(e.into()))?;

    for recipient in store.list(kind) {
        writer
            .write_record(export_row(&recipient))
            .map_err(|e| InviteError::Internal(e.into()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| InviteError::Internal(e.into()))?;
    String::from_utf8(bytes).map_err(|e| InviteError::Internal(e.into()))
}

fn export_row(recipient: &Recipient) -> Vec<String> {
    let phone = recipient.phone.clone().unwrap_or_default();
    let mut row = vec![
        recipient.name.clone(),
        recipient.email.clone(),
        phone,
    ];
    match &recipient.profile {
        RecipientProfile::Student { course, year } => {
            row.push(course.clone());
            row.push(year.clone());
        }
        RecipientProfile::Guest {
            organization,
            designation,
            category,
        } => {
            row.push(organization.clone());
            row.push(designation.clone());
            row.push(category.clone().unwrap_or_default());
        }
        RecipientProfile::Professor {
            college,
            department,
            designation,
            expertise,
        } => {
            row.push(college.clone());
            row.push(department.clone());
            row.push(designation.clone());
            row.push(expertise.clone().unwrap_or_default());
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_skips_bad_row_and_reports_it() {
        let store = DirectoryStore::new();
        let csv_text = "\
name,email,phone,course,year
Ana,ana@x.edu,,CS,2nd Year
Bo,bo@x.edu,+15550001111,EE,1st Year
Cleo,,,ME,3rd Year
Dev,dev@x.edu,,CS,4th Year
Eli,eli@x.edu,,CE,2nd Year
";
        let report = import_csv(&store, RecipientKind::Student, csv_text).unwrap();
        assert_eq!(report.imported, 4);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row, 3);
        assert!(report.errors[0].message.contains("email"));
        assert_eq!(store.list(RecipientKind::Student).len(), 4);
    }

    #[test]
    fn test_import_classifies_duplicates() {
        let store = DirectoryStore::new();
        let csv_text = "\
name,email,course,year
Ana,ana@x.edu,CS,2nd Year
Ana Again,ana@x.edu,CS,2nd Year
";
        let report = import_csv(&store, RecipientKind::Student, csv_text).unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.duplicates, vec!["ana@x.edu".to_string()]);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_import_missing_required_column() {
        let store = DirectoryStore::new();
        let csv_text = "name,email\nAna,ana@x.edu\n";
        let err = import_csv(&store, RecipientKind::Student, csv_text).unwrap_err();
        assert!(matches!(err, InviteError::Validation(_)));
        assert!(err.to_string().contains("course"));
    }

    #[test]
    fn test_import_zero_rows_rejected() {
        let store = DirectoryStore::new();
        let csv_text = "name,email,course,year\n";
        let err = import_csv(&store, RecipientKind::Student, csv_text).unwrap_err();
        assert!(matches!(err, InviteError::Validation(_)));
    }

    #[test]
    fn test_import_invalid_email_is_row_error() {
        let store = DirectoryStore::new();
        let csv_text = "\
name,email,course,year
Ana,not-an-address,CS,2nd Year
Bo,bo@x.edu,EE,1st Year
";
        let report = import_csv(&store, RecipientKind::Student, csv_text).unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row, 1);
    }

    #[test]
    fn test_export_round_trips() {
        let store = DirectoryStore::new();
        let csv_text = "\
name,email,phone,organization,designation,category
Dev,dev@acme.io,+15551230000,Acme Labs,Director,industry
";
        import_csv(&store, RecipientKind::Guest, csv_text).unwrap();

        let exported = export_csv(&store, RecipientKind::Guest).unwrap();
        let mut lines = exported.lines();
        assert_eq!(
            lines.next().unwrap(),
            "name,email,phone,organization,designation,category"
        );
        assert_eq!(
            lines.next().unwrap(),
            "Dev,dev@acme.io,+15551230000,Acme Labs,Director,industry"
        );

        let fresh = DirectoryStore::new();
        let report = import_csv(&fresh, RecipientKind::Guest, &exported).unwrap();
        assert_eq!(report.imported, 1);
    }
}
