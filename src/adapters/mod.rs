//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod dataset;
pub mod file_config_adapter;
#[cfg(feature = "parquet")]
pub mod parquet_adapter;
#[cfg(feature = "postgres")]
pub mod postgres_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;

use crate::domain::error::TicksimError;

/// Accept `name` or `schema.name` made of ASCII identifiers, so the name can
/// be spliced into SQL.
pub(crate) fn validate_table_name(name: &str) -> Result<&str, TicksimError> {
    let is_identifier = |part: &str| {
        let mut chars = part.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    };

    if name.split('.').all(is_identifier) && name.split('.').count() <= 2 {
        Ok(name)
    } else {
        Err(TicksimError::InvalidDataset {
            source_name: name.to_string(),
            reason: "table name must be an identifier".to_string(),
        })
    }
}
