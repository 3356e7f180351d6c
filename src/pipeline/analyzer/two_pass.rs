//! Two-pass analysis over a classification oracle.
//!
//! Pass 1 extracts the questions from the document; pass 2 classifies the
//! extracted items against curriculum standards and rigor. Keeping the
//! passes separate means the oracle never mixes extraction and judgment in
//! one response, which is where single-shot prompts degrade first.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::models::{Document, VocabularySet};
use crate::oracle::Classifier;
use crate::pipeline::checkpoint::{CheckpointRecorder, CheckpointStage};

use super::consistency::ConsistencyMap;
use super::prompt;
use super::types::{
    AnalysisResult, AnalysisStrategy, ClassifiedItem, ExtractedItem, RawClassification,
};
use super::validator;
use super::vocabulary::enforce_vocabulary;
use super::AnalysisError;

pub struct TwoPassAnalyzer {
    classifier: Arc<dyn Classifier>,
    checkpoints: Option<CheckpointRecorder>,
}

enum PassInput<'a> {
    Attachment(&'a crate::oracle::FileAttachment),
    Text(&'a str),
}

impl TwoPassAnalyzer {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier,
            checkpoints: None,
        }
    }

    /// Record each pass's raw and parsed payload as it is produced, so a
    /// failed parse still leaves its raw payload behind for diagnosis.
    pub fn with_checkpoints(mut self, checkpoints: CheckpointRecorder) -> Self {
        self.checkpoints = Some(checkpoints);
        self
    }

    fn checkpoint(&self, document: &Document, stage: CheckpointStage, payload: &str) {
        if let Some(checkpoints) = &self.checkpoints {
            checkpoints.record(&document.id, stage, payload);
        }
    }

    /// File strategy: upload the document to the oracle, run both passes
    /// against the attachment, then delete it. Cleanup failures are logged
    /// and swallowed since the analysis itself already succeeded or failed
    /// on its own terms.
    pub fn analyze_file(
        &self,
        document: &Document,
        vocabulary: Option<&VocabularySet>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let attachment = self.classifier.upload_attachment(
            Path::new(&document.storage_path),
            document.media_type.as_str(),
        )?;

        let result = self.run_passes(
            document,
            AnalysisStrategy::FileAttachment,
            PassInput::Attachment(&attachment),
            vocabulary,
        );

        if let Err(e) = self.classifier.delete_attachment(&attachment) {
            warn!(
                document_id = %document.id,
                error = %e,
                "Failed to delete oracle attachment after analysis"
            );
        }
        result
    }

    /// Text strategy: locally extracted document text rides in the prompt.
    pub fn analyze_text(
        &self,
        document: &Document,
        text: &str,
        vocabulary: Option<&VocabularySet>,
    ) -> Result<AnalysisResult, AnalysisError> {
        self.run_passes(
            document,
            AnalysisStrategy::PlainText,
            PassInput::Text(text),
            vocabulary,
        )
    }

    fn run_passes(
        &self,
        document: &Document,
        strategy: AnalysisStrategy,
        input: PassInput<'_>,
        vocabulary: Option<&VocabularySet>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let span = tracing::info_span!(
            "two_pass_analysis",
            document_id = %document.id,
            strategy = strategy.as_str(),
        );
        let _guard = span.enter();

        // Pass 1: extraction.
        let started = Instant::now();
        let extraction_raw = match &input {
            PassInput::Attachment(attachment) => self.classifier.complete_with_attachment(
                prompt::EXTRACTION_SYSTEM_PROMPT,
                &prompt::extraction_user_content(None),
                attachment,
            )?,
            PassInput::Text(text) => self.classifier.complete(
                prompt::EXTRACTION_SYSTEM_PROMPT,
                &prompt::extraction_user_content(Some(text)),
            )?,
        };
        let extraction_ms = started.elapsed().as_millis() as u64;
        self.checkpoint(document, CheckpointStage::ExtractionRaw, &extraction_raw);

        let extracted = validator::parse_extraction_output(&extraction_raw)
            .map_err(|failure| AnalysisError::ExtractionSchema(failure.reason))?;
        if let Ok(parsed) = serde_json::to_string(&extracted) {
            self.checkpoint(document, CheckpointStage::ExtractionParsed, &parsed);
        }
        info!(
            items = extracted.len(),
            elapsed_ms = extraction_ms,
            "Extraction pass complete"
        );

        // Pass 2: classification of the extracted items. The attachment
        // rides along again so the oracle can consult the document's own
        // context, not just the extracted text.
        let started = Instant::now();
        let classification_content = prompt::classification_user_content(
            &extracted,
            document.course.as_deref(),
            &document.jurisdictions,
            vocabulary,
        );
        let classification_raw = match &input {
            PassInput::Attachment(attachment) => self.classifier.complete_with_attachment(
                prompt::CLASSIFICATION_SYSTEM_PROMPT,
                &classification_content,
                attachment,
            )?,
            PassInput::Text(_) => self
                .classifier
                .complete(prompt::CLASSIFICATION_SYSTEM_PROMPT, &classification_content)?,
        };
        let classification_ms = started.elapsed().as_millis() as u64;
        self.checkpoint(document, CheckpointStage::ClassificationRaw, &classification_raw);

        let classifications = validator::parse_classification_output(&classification_raw)
            .map_err(|failure| AnalysisError::ClassificationSchema(failure.reason))?;

        let mut items = join_on_ordinals(&extracted, classifications)?;

        let vocabulary_rewrites = match vocabulary {
            Some(vocabulary) => enforce_vocabulary(&mut items, vocabulary),
            None => 0,
        };
        let duplicates_unified = ConsistencyMap::new().enforce(&mut items);

        if let Ok(parsed) = serde_json::to_string(&items) {
            self.checkpoint(document, CheckpointStage::ClassificationParsed, &parsed);
        }

        info!(
            items = items.len(),
            elapsed_ms = classification_ms,
            vocabulary_rewrites,
            duplicates_unified,
            "Classification pass complete"
        );

        Ok(AnalysisResult {
            items,
            engine: self.classifier.engine_id().to_string(),
            strategy,
            extraction_raw,
            classification_raw,
            extraction_ms,
            classification_ms,
            vocabulary_rewrites,
            duplicates_unified,
        })
    }
}

/// Join pass-2 records back onto the pass-1 item list. Unknown ordinals are
/// dropped, duplicates keep the first record, and a pass-1 item with no
/// classification at all fails the analysis.
fn join_on_ordinals(
    extracted: &[ExtractedItem],
    classifications: Vec<RawClassification>,
) -> Result<Vec<ClassifiedItem>, AnalysisError> {
    let known: HashSet<i64> = extracted.iter().map(|item| item.ordinal).collect();
    let mut by_ordinal = HashMap::new();

    for record in classifications {
        if !known.contains(&record.ordinal) {
            warn!(
                ordinal = record.ordinal,
                "Dropping classification for unknown ordinal"
            );
            continue;
        }
        if by_ordinal.contains_key(&record.ordinal) {
            warn!(
                ordinal = record.ordinal,
                "Duplicate classification for ordinal, keeping the first"
            );
            continue;
        }
        by_ordinal.insert(record.ordinal, record);
    }

    let mut items = Vec::with_capacity(extracted.len());
    for item in extracted {
        let record = by_ordinal.remove(&item.ordinal).ok_or_else(|| {
            AnalysisError::ClassificationSchema(format!(
                "no classification returned for ordinal {}",
                item.ordinal
            ))
        })?;
        items.push(ClassifiedItem {
            ordinal: item.ordinal,
            instruction_text: item.instruction_text.clone(),
            standard_code: record.standard_code,
            rigor: record.rigor,
            justification: record.justification,
            confidence: record.confidence,
        });
    }
    Ok(items)
}
