//! CSV export of all persons and row-by-row CSV import of core person fields.

use crate::error::AppError;
use crate::model::{EducationRecord, NewPerson, PersonRecord};
use crate::service::RecordService;
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;

pub const EXPORT_HEADERS: &[&str] = &[
    "id",
    "full_name",
    "birth_date",
    "address",
    "high_school",
    "primary_email",
    "remark1",
    "remark2",
    "remark3",
    "secondary_emails",
    "educations",
];

pub const REQUIRED_IMPORT_HEADERS: &[&str] = &["primary_email", "full_name"];

/// Row messages kept in an import summary; counts are never capped.
pub const MAX_REPORTED_ERRORS: usize = 50;

pub const EXPORT_FILENAME: &str = "users_export.csv";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ImportSummary {
    pub message: String,
    pub imported: u64,
    pub skipped: u64,
    pub errors: Vec<String>,
}

impl ImportSummary {
    fn skip(&mut self, row: usize, reason: impl std::fmt::Display) {
        self.skipped += 1;
        if self.errors.len() < MAX_REPORTED_ERRORS {
            self.errors.push(format!("Row {}: {}", row, reason));
        }
    }
}

/// `"<type|N/A>: <name|N/A>"`, then ` (<degree>)` and ` [<start|?> - <end|Present>]` when present.
pub fn format_education(record: &EducationRecord) -> String {
    let kind = non_empty(record.institution_type.as_deref()).unwrap_or("N/A");
    let name = non_empty(Some(record.institution_name.as_str())).unwrap_or("N/A");
    let mut out = format!("{}: {}", kind, name);
    if let Some(degree) = non_empty(record.degree.as_deref()) {
        out.push_str(&format!(" ({})", degree));
    }
    if record.start_date.is_some() || record.end_date.is_some() {
        let start = record
            .start_date
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| "?".into());
        let end = record
            .end_date
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| "Present".into());
        out.push_str(&format!(" [{} - {}]", start, end));
    }
    out
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}

fn export_row(record: &PersonRecord) -> Vec<String> {
    let p = &record.person;
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    vec![
        p.id.to_string(),
        p.full_name.clone(),
        p.birth_date.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default(),
        text(&p.address),
        text(&p.high_school),
        p.primary_email.clone(),
        text(&p.remark1),
        text(&p.remark2),
        text(&p.remark3),
        record
            .secondary_contacts
            .iter()
            .map(|c| c.email.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        record
            .education_records
            .iter()
            .map(format_education)
            .collect::<Vec<_>>()
            .join("; "),
    ]
}

/// Serialize records as CSV with the export header row.
pub fn write_csv(records: &[PersonRecord]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADERS)?;
    for record in records {
        writer.write_record(export_row(record))?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Csv(csv::Error::from(e.into_error())))
}

pub async fn export_csv(pool: &SqlitePool) -> Result<Vec<u8>, AppError> {
    let records = RecordService::all_persons(pool).await?;
    let bytes = write_csv(&records)?;
    tracing::info!(rows = records.len(), "csv export");
    Ok(bytes)
}

/// Column positions by header name.
struct Columns(HashMap<String, usize>);

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, AppError> {
        let map: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_lowercase(), i))
            .collect();
        let missing: Vec<&str> = REQUIRED_IMPORT_HEADERS
            .iter()
            .copied()
            .filter(|h| !map.contains_key(*h))
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "CSV is missing required columns: {}",
                missing.join(", ")
            )));
        }
        Ok(Columns(map))
    }

    /// Trimmed cell value; empty cells and absent columns are `None`.
    fn get(&self, record: &csv::StringRecord, name: &str) -> Option<String> {
        self.0
            .get(name)
            .and_then(|&i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    }
}

/// Build a person from one row. Children are never imported.
fn person_from_row(columns: &Columns, record: &csv::StringRecord) -> Result<NewPerson, String> {
    let primary_email = columns
        .get(record, "primary_email")
        .ok_or_else(|| "missing primary_email".to_string())?;
    let full_name = columns
        .get(record, "full_name")
        .ok_or_else(|| format!("missing full_name for {}", primary_email))?;
    let birth_date = match columns.get(record, "birth_date") {
        Some(raw) => Some(
            NaiveDate::parse_from_str(&raw, DATE_FORMAT)
                .map_err(|_| format!("invalid birth_date '{}' (expected YYYY-MM-DD)", raw))?,
        ),
        None => None,
    };
    Ok(NewPerson {
        full_name,
        birth_date,
        address: columns.get(record, "address"),
        high_school: columns.get(record, "high_school"),
        primary_email,
        remark1: columns.get(record, "remark1"),
        remark2: columns.get(record, "remark2"),
        remark3: columns.get(record, "remark3"),
        secondary_contacts: Vec::new(),
        education_records: Vec::new(),
    })
}

/// Import persons from CSV bytes. File-level problems (encoding, missing headers) fail the
/// whole import before any row is written; row-level problems, database errors included,
/// skip that row only.
pub async fn import_csv(pool: &SqlitePool, bytes: &[u8]) -> Result<ImportSummary, AppError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| AppError::Validation(format!("CSV must be UTF-8 encoded: {}", e)))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| AppError::Validation(format!("could not read CSV header: {}", e)))?
        .clone();
    let columns = Columns::from_headers(&headers)?;

    let mut summary = ImportSummary::default();
    for (i, result) in reader.records().enumerate() {
        let row = i + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                summary.skip(row, format!("could not parse record: {}", e));
                continue;
            }
        };
        let person = match person_from_row(&columns, &record) {
            Ok(person) => person,
            Err(reason) => {
                summary.skip(row, reason);
                continue;
            }
        };
        match RecordService::find_person_by_primary_email(pool, &person.primary_email).await {
            Ok(None) => {}
            Ok(Some(_)) => {
                summary.skip(row, format!("primary_email {} already registered", person.primary_email));
                continue;
            }
            Err(e) => {
                tracing::warn!(row, error = %e, "csv import lookup failed");
                summary.skip(row, e);
                continue;
            }
        }
        match RecordService::create_person(pool, person).await {
            Ok(_) => summary.imported += 1,
            Err(e) => {
                if let AppError::Db(_) = e {
                    tracing::warn!(row, error = %e, "csv import row failed");
                }
                summary.skip(row, e);
            }
        }
    }
    summary.message = format!(
        "Import finished: {} imported, {} skipped.",
        summary.imported, summary.skipped
    );
    tracing::info!(imported = summary.imported, skipped = summary.skipped, "csv import");
    Ok(summary)
}
