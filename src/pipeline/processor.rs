//! Pipeline orchestrator: claims a document, runs analysis with the
//! file-then-text strategy fallback, persists the results, and fires the
//! completion callback. The document's terminal status is durable before
//! any callback leaves the process.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::{DatabaseError, SqliteStore};
use crate::models::{Document, DocumentStatus, VocabularySet};

use super::analyzer::{AnalysisError, AnalysisResult, TwoPassAnalyzer};
use super::callback::{CompletionNotice, CompletionNotifier};
use super::checkpoint::{CheckpointRecorder, CheckpointStage};
use super::extraction::{ExtractionError, TextExtractor};

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Document {0} not found")]
    DocumentNotFound(Uuid),

    /// The document was not in `pending` when the worker got to it, so
    /// this queue entry is stale and the pipeline never started.
    #[error("Document {id} is '{status}', not pending")]
    NotPending { id: Uuid, status: String },

    #[error("No text extracted from document")]
    NoTextExtracted,

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub struct DocumentProcessor {
    store: SqliteStore,
    analyzer: TwoPassAnalyzer,
    extractor: Box<dyn TextExtractor>,
    notifier: Option<Box<dyn CompletionNotifier>>,
    checkpoints: CheckpointRecorder,
}

impl DocumentProcessor {
    /// The analyzer gets its own checkpoint recorder so each pass payload
    /// is durable the moment it exists, not only after a full success.
    pub fn new(
        store: SqliteStore,
        analyzer: TwoPassAnalyzer,
        extractor: Box<dyn TextExtractor>,
        notifier: Option<Box<dyn CompletionNotifier>>,
    ) -> Self {
        let checkpoints = CheckpointRecorder::new(store.clone());
        let analyzer = analyzer.with_checkpoints(CheckpointRecorder::new(store.clone()));
        Self {
            store,
            analyzer,
            extractor,
            notifier,
            checkpoints,
        }
    }

    /// Process one document end to end. Only a document still in `pending`
    /// can be claimed; anything else means the queue entry went stale and
    /// is reported without touching the document.
    pub fn process_document(&self, document_id: &Uuid) -> Result<(), ProcessingError> {
        let document = self
            .store
            .get_document(document_id)?
            .ok_or(ProcessingError::DocumentNotFound(*document_id))?;

        if !self.store.claim_pending(document_id)? {
            return Err(ProcessingError::NotPending {
                id: *document_id,
                status: document.status.as_str().to_string(),
            });
        }

        info!(
            document_id = %document_id,
            media_type = document.media_type.as_str(),
            "Processing document"
        );

        match self.run_pipeline(&document) {
            Ok(result) => {
                self.store
                    .update_document_status(document_id, DocumentStatus::Completed, None)?;
                info!(
                    document_id = %document_id,
                    questions = result.items.len(),
                    engine = %result.engine,
                    strategy = result.strategy.as_str(),
                    "Document processing complete"
                );
                self.notify(CompletionNotice::completed(
                    *document_id,
                    format!("/documents/{document_id}/results"),
                ));
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                error!(
                    document_id = %document_id,
                    error = %message,
                    "Document processing failed"
                );
                if let Err(db_err) = self.store.update_document_status(
                    document_id,
                    DocumentStatus::Failed,
                    Some(&message),
                ) {
                    error!(
                        document_id = %document_id,
                        error = %db_err,
                        "Could not record failure status"
                    );
                }
                self.notify(CompletionNotice::failed(*document_id, message));
                Err(e)
            }
        }
    }

    fn run_pipeline(&self, document: &Document) -> Result<AnalysisResult, ProcessingError> {
        let vocabulary = self
            .store
            .resolve_vocabulary(document.course.as_deref(), &document.jurisdictions)?;
        if vocabulary.is_none() {
            info!(
                document_id = %document.id,
                "No classroom vocabulary configured, oracle codes pass through unchecked"
            );
        }

        let result = self.run_strategies(document, vocabulary.as_ref())?;
        self.persist(document, &result)?;
        Ok(result)
    }

    /// Input strategy fallback: the oracle sees the file itself when it
    /// can, otherwise locally extracted text rides in the prompt.
    fn run_strategies(
        &self,
        document: &Document,
        vocabulary: Option<&VocabularySet>,
    ) -> Result<AnalysisResult, ProcessingError> {
        match self.analyzer.analyze_file(document, vocabulary) {
            Ok(result) => return Ok(result),
            Err(e) => {
                warn!(
                    document_id = %document.id,
                    error = %e,
                    "File strategy failed, falling back to local text extraction"
                );
            }
        }

        let text = self
            .extractor
            .extract(Path::new(&document.storage_path), &document.media_type)
            .map_err(|e| match e {
                ExtractionError::EmptyOutput => ProcessingError::NoTextExtracted,
                other => ProcessingError::Extraction(other),
            })?;
        self.checkpoints
            .record(&document.id, CheckpointStage::ExtractedText, &text);

        Ok(self.analyzer.analyze_text(document, &text, vocabulary)?)
    }

    /// Persist every question with its classification. Writes are row by
    /// row; a failure mid-way leaves earlier rows behind, and the document
    /// flips to `failed` so nothing downstream reads a partial result as
    /// complete.
    fn persist(&self, document: &Document, result: &AnalysisResult) -> Result<(), ProcessingError> {
        for item in &result.items {
            let question =
                self.store
                    .create_question(&document.id, item.ordinal, &item.instruction_text)?;
            self.store.create_classification(
                &question.id,
                vec![item.standard_code.clone()],
                item.rigor,
                item.justification.clone(),
                item.confidence,
                &result.engine,
            )?;
        }

        let summary = serde_json::json!({
            "questions": result.items.len(),
            "engine": result.engine,
            "strategy": result.strategy.as_str(),
            "vocabularyRewrites": result.vocabulary_rewrites,
            "duplicatesUnified": result.duplicates_unified,
            "extractionMs": result.extraction_ms,
            "classificationMs": result.classification_ms,
        });
        self.checkpoints.record(
            &document.id,
            CheckpointStage::Persisted,
            &summary.to_string(),
        );
        Ok(())
    }

    fn notify(&self, notice: CompletionNotice) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(notice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::new_document;
    use crate::db::sqlite::open_memory_database;
    use crate::models::{MediaType, RigorLevel};
    use crate::oracle::ScriptedClassifier;
    use crate::pipeline::extraction::FixedTextExtractor;
    use std::sync::Mutex;

    pub struct RecordingNotifier {
        pub notices: Mutex<Vec<CompletionNotice>>,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self {
                notices: Mutex::new(Vec::new()),
            }
        }
    }

    impl CompletionNotifier for RecordingNotifier {
        fn notify(&self, notice: CompletionNotice) {
            self.notices.lock().unwrap().push(notice);
        }
    }

    fn extraction_response() -> &'static str {
        r#"{"items": [
            {"ordinal": 1, "instructionText": "What is 7 x 8?"},
            {"ordinal": 2, "instructionText": "Explain how you solved it."}
        ]}"#
    }

    fn classification_response() -> &'static str {
        r#"{"items": [
            {"ordinal": 1, "standardCode": "3.OA.C.7", "rigor": 1},
            {"ordinal": 2, "standardCode": "3.OA.D.8", "rigor": 3, "confidence": 0.8}
        ]}"#
    }

    fn processor_with(
        oracle: ScriptedClassifier,
        extractor: FixedTextExtractor,
    ) -> (DocumentProcessor, SqliteStore, Arc<RecordingNotifier>) {
        let store = SqliteStore::new(open_memory_database().unwrap());
        let notifier = Arc::new(RecordingNotifier::new());

        struct Forward(Arc<RecordingNotifier>);
        impl CompletionNotifier for Forward {
            fn notify(&self, notice: CompletionNotice) {
                self.0.notify(notice);
            }
        }

        let processor = DocumentProcessor::new(
            store.clone(),
            TwoPassAnalyzer::new(Arc::new(oracle)),
            Box::new(extractor),
            Some(Box::new(Forward(notifier.clone()))),
        );
        (processor, store, notifier)
    }

    #[test]
    fn successful_run_persists_and_completes() {
        let (processor, store, notifier) = processor_with(
            ScriptedClassifier::new(&[extraction_response(), classification_response()]),
            FixedTextExtractor { text: None },
        );
        let doc = new_document("/uploads/quiz.pdf", MediaType::Pdf, vec![], None);
        store.insert_document(&doc).unwrap();

        processor.process_document(&doc.id).unwrap();

        let updated = store.get_document(&doc.id).unwrap().unwrap();
        assert_eq!(updated.status, DocumentStatus::Completed);

        let questions = store.questions_for_document(&doc.id).unwrap();
        assert_eq!(questions.len(), 2);
        let classifications = store
            .classifications_for_question(&questions[0].id)
            .unwrap();
        assert_eq!(classifications[0].standard_codes, vec!["3.OA.C.7"]);
        assert_eq!(classifications[0].rigor, RigorLevel::Recall);
        assert_eq!(classifications[0].engine, "scripted/test");

        let notices = notifier.notices.lock().unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].status, DocumentStatus::Completed);
        assert!(notices[0].results_url.as_deref().unwrap().contains("results"));
    }

    #[test]
    fn falls_back_to_text_strategy_when_upload_is_refused() {
        let (processor, store, _) = processor_with(
            ScriptedClassifier::failing_uploads(&[
                extraction_response(),
                classification_response(),
            ]),
            FixedTextExtractor {
                text: Some("Q1. What is 7 x 8?".into()),
            },
        );
        let doc = new_document("/uploads/quiz.docx", MediaType::Docx, vec![], None);
        store.insert_document(&doc).unwrap();

        processor.process_document(&doc.id).unwrap();

        let text_checkpoint = store.get_checkpoint(&doc.id, "extracted_text").unwrap();
        assert!(text_checkpoint.is_some());
        assert_eq!(
            store.get_document(&doc.id).unwrap().unwrap().status,
            DocumentStatus::Completed
        );
    }

    #[test]
    fn fails_the_document_when_both_strategies_are_exhausted() {
        let (processor, store, notifier) = processor_with(
            ScriptedClassifier::failing_uploads::<&str>(&[]),
            FixedTextExtractor { text: None },
        );
        let doc = new_document("/uploads/scan.png", MediaType::Other("image/png".into()), vec![], None);
        store.insert_document(&doc).unwrap();

        let err = processor.process_document(&doc.id).unwrap_err();
        assert!(matches!(err, ProcessingError::Extraction(_)));

        let updated = store.get_document(&doc.id).unwrap().unwrap();
        assert_eq!(updated.status, DocumentStatus::Failed);
        assert!(updated.error_message.is_some());

        let notices = notifier.notices.lock().unwrap();
        assert_eq!(notices[0].status, DocumentStatus::Failed);
        assert!(notices[0].error.is_some());
    }

    #[test]
    fn schema_failure_fails_document_but_keeps_raw_checkpoint() {
        let (processor, store, _) = processor_with(
            ScriptedClassifier::new(&["no json in this reply", "still no json"]),
            FixedTextExtractor {
                text: Some("Q1. What is 7 x 8?".into()),
            },
        );
        let doc = new_document("/uploads/quiz.pdf", MediaType::Pdf, vec![], None);
        store.insert_document(&doc).unwrap();

        // Both strategies get unparseable replies, so the document fails,
        // but the raw oracle payload is still there to diagnose it.
        let err = processor.process_document(&doc.id).unwrap_err();
        assert!(matches!(err, ProcessingError::Analysis(_)));

        let updated = store.get_document(&doc.id).unwrap().unwrap();
        assert_eq!(updated.status, DocumentStatus::Failed);
        assert!(updated.error_message.as_deref().unwrap().contains("rejected"));

        let raw = store.get_checkpoint(&doc.id, "extraction_raw").unwrap().unwrap();
        assert_eq!(raw.payload, "still no json");
    }

    #[test]
    fn non_pending_document_is_reported_stale() {
        let (processor, store, notifier) = processor_with(
            ScriptedClassifier::new::<&str>(&[]),
            FixedTextExtractor { text: None },
        );
        let doc = new_document("/uploads/quiz.pdf", MediaType::Pdf, vec![], None);
        store.insert_document(&doc).unwrap();
        store
            .update_document_status(&doc.id, DocumentStatus::Completed, None)
            .unwrap();

        let err = processor.process_document(&doc.id).unwrap_err();
        assert!(matches!(err, ProcessingError::NotPending { .. }));

        // Stale entries mutate nothing and notify no one.
        assert_eq!(
            store.get_document(&doc.id).unwrap().unwrap().status,
            DocumentStatus::Completed
        );
        assert!(notifier.notices.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_document_is_reported_not_found() {
        let (processor, _, _) = processor_with(
            ScriptedClassifier::new::<&str>(&[]),
            FixedTextExtractor { text: None },
        );
        let err = processor.process_document(&Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ProcessingError::DocumentNotFound(_)));
    }
}
