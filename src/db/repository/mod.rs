pub mod checkpoint;
pub mod document;
pub mod question;
pub mod queue;
pub mod vocabulary;

pub use checkpoint::*;
pub use document::*;
pub use question::*;
pub use queue::*;
pub use vocabulary::*;

use chrono::NaiveDateTime;
use uuid::Uuid;

use super::DatabaseError;

pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn now_string() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value).map_err(|e| DatabaseError::InvalidColumn {
        field: field.into(),
        reason: e.to_string(),
    })
}

pub(crate) fn parse_timestamp(field: &str, value: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|e| {
        DatabaseError::InvalidColumn {
            field: field.into(),
            reason: e.to_string(),
        }
    })
}

pub(crate) fn parse_string_list(field: &str, value: &str) -> Result<Vec<String>, DatabaseError> {
    serde_json::from_str(value).map_err(|e| DatabaseError::InvalidColumn {
        field: field.into(),
        reason: e.to_string(),
    })
}
