//! HTTP handlers for person records and CSV transfer.

pub mod person;
pub mod transfer;
pub use person::*;
pub use transfer::*;
