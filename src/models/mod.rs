pub mod enums;

pub use enums::*;

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentinel classification meaning no permitted standard code fits.
pub const OUT_OF_SCOPE: &str = "OUT_OF_SCOPE";

/// An uploaded assessment document. Created by the upload surface; only the
/// processing pipeline mutates `status` and `error_message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub title: Option<String>,
    pub storage_path: String,
    pub media_type: MediaType,
    pub jurisdictions: Vec<String>,
    pub course: Option<String>,
    pub tenant_id: Option<Uuid>,
    pub status: DocumentStatus,
    pub error_message: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Durable queue entry referencing a document awaiting classification.
/// At most one entry per document exists at a time.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub id: i64,
    pub document_id: Uuid,
    pub priority: i64,
    pub enqueued_at: NaiveDateTime,
}

/// A single extracted question, persisted after classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub document_id: Uuid,
    pub ordinal: i64,
    pub instruction_text: String,
    pub created_at: NaiveDateTime,
}

/// Classification attached to a question: standard code(s), rigor, and the
/// engine that produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub id: Uuid,
    pub question_id: Uuid,
    pub standard_codes: Vec<String>,
    pub rigor: RigorLevel,
    pub justification: Option<String>,
    pub confidence: Option<f64>,
    pub engine: String,
    pub created_at: NaiveDateTime,
}

/// Permitted standard-code vocabulary for one course + jurisdiction,
/// resolved from classroom settings. Read-only for the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularySet {
    pub jurisdiction: String,
    pub course: String,
    pub codes: BTreeSet<String>,
}

impl VocabularySet {
    pub fn new(
        jurisdiction: impl Into<String>,
        course: impl Into<String>,
        codes: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            jurisdiction: jurisdiction.into(),
            course: course.into(),
            codes: codes.into_iter().collect(),
        }
    }

    /// A code is permitted if it is in the vocabulary or is the
    /// OUT_OF_SCOPE sentinel.
    pub fn permits(&self, code: &str) -> bool {
        code == OUT_OF_SCOPE || self.codes.contains(code)
    }
}
