//! Row models and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts, where the entity is created over the API

pub mod alert;
pub mod metric;
pub mod server;
pub mod threshold;
