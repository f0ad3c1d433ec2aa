//! Dossier: person and education record service with partial-text search and CSV transfer.

pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;
pub mod transfer;

pub use config::Settings;
pub use error::{AppError, ConfigError};
pub use model::{
    EducationRecord, NewEducationRecord, NewPerson, NewSecondaryContact, Pagination, Patch, Person, PersonPatch,
    PersonRecord, SearchQuery, SecondaryContact,
};
pub use response::{created, listed, ok, paged};
pub use routes::{api_routes, app, common_routes};
pub use service::RecordService;
pub use state::AppState;
pub use store::{connect, connect_in_memory, ensure_tables};
pub use transfer::{export_csv, import_csv, ImportSummary};
