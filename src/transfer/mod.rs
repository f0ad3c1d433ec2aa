//! Bulk transfer of records in and out of the store.

pub mod csv;

pub use self::csv::{export_csv, import_csv, write_csv, ImportSummary, EXPORT_FILENAME, MAX_REPORTED_ERRORS};
