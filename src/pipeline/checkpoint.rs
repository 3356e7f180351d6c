//! Debug checkpoints: the intermediate payload of each pipeline stage is
//! persisted with a checksum so failed documents can be diagnosed after
//! the fact. Recording is best effort and never fails the pipeline.

use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

use crate::db::SqliteStore;

/// Pipeline stages that leave a checkpoint behind. One row per document
/// and stage; reprocessing overwrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointStage {
    ExtractedText,
    ExtractionRaw,
    ExtractionParsed,
    ClassificationRaw,
    ClassificationParsed,
    Persisted,
}

impl CheckpointStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtractedText => "extracted_text",
            Self::ExtractionRaw => "extraction_raw",
            Self::ExtractionParsed => "extraction_parsed",
            Self::ClassificationRaw => "classification_raw",
            Self::ClassificationParsed => "classification_parsed",
            Self::Persisted => "persisted",
        }
    }
}

pub struct CheckpointRecorder {
    store: SqliteStore,
}

impl CheckpointRecorder {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }

    /// Persist one stage payload. A write failure is logged and swallowed;
    /// diagnostics must not take down the document they exist to explain.
    pub fn record(&self, document_id: &Uuid, stage: CheckpointStage, payload: &str) {
        let checksum = format!("{:x}", Sha256::digest(payload.as_bytes()));
        if let Err(e) =
            self.store
                .record_checkpoint(document_id, stage.as_str(), payload, &checksum)
        {
            warn!(
                document_id = %document_id,
                stage = stage.as_str(),
                error = %e,
                "Failed to record debug checkpoint"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::new_document;
    use crate::db::sqlite::open_memory_database;
    use crate::models::MediaType;

    #[test]
    fn records_payload_with_sha256_checksum() {
        let store = SqliteStore::new(open_memory_database().unwrap());
        let doc = new_document("/uploads/a.pdf", MediaType::Pdf, vec![], None);
        store.insert_document(&doc).unwrap();

        let recorder = CheckpointRecorder::new(store.clone());
        recorder.record(&doc.id, CheckpointStage::ExtractionRaw, "{\"items\":[]}");

        let row = store
            .get_checkpoint(&doc.id, "extraction_raw")
            .unwrap()
            .unwrap();
        assert_eq!(row.payload, "{\"items\":[]}");
        assert_eq!(row.checksum.len(), 64);
    }

    #[test]
    fn reprocessing_overwrites_the_stage_row() {
        let store = SqliteStore::new(open_memory_database().unwrap());
        let doc = new_document("/uploads/a.pdf", MediaType::Pdf, vec![], None);
        store.insert_document(&doc).unwrap();

        let recorder = CheckpointRecorder::new(store.clone());
        recorder.record(&doc.id, CheckpointStage::ExtractedText, "first");
        recorder.record(&doc.id, CheckpointStage::ExtractedText, "second");

        let row = store
            .get_checkpoint(&doc.id, "extracted_text")
            .unwrap()
            .unwrap();
        assert_eq!(row.payload, "second");
    }
}
