//! Domain types: persons, their secondary contacts and education records.

pub mod patch;
pub mod types;

pub use patch::*;
pub use types::*;
