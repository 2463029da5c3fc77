//! Pure domain logic for the server monitoring alert engine.
//!
//! Nothing in this crate performs I/O. The database, notification and HTTP
//! crates build on these types so the evaluation rules can be tested in
//! isolation.

pub mod alert;
pub mod channels;
pub mod condition;
pub mod error;
pub mod metric;
pub mod roles;
pub mod threshold;
pub mod types;
