//! RecordService: person/contact/education CRUD using the SQL builder.

mod crud;
mod validation;
pub use crud::{RecordService, DEFAULT_LIMIT};
pub use validation::RequestValidator;
