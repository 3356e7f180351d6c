use serde::{Deserialize, Serialize};

use crate::models::RigorLevel;

/// Atomic unit produced by pass 1: one question found in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedItem {
    pub ordinal: i64,
    pub instruction_text: String,
}

/// Pass-2 record before it is joined back onto the pass-1 items.
#[derive(Debug, Clone, PartialEq)]
pub struct RawClassification {
    pub ordinal: i64,
    pub standard_code: String,
    pub rigor: RigorLevel,
    pub justification: Option<String>,
    pub confidence: Option<f64>,
}

/// An extracted question with its final classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedItem {
    pub ordinal: i64,
    pub instruction_text: String,
    pub standard_code: String,
    pub rigor: RigorLevel,
    pub justification: Option<String>,
    pub confidence: Option<f64>,
}

/// Which input strategy produced an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStrategy {
    FileAttachment,
    PlainText,
}

impl AnalysisStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileAttachment => "file_attachment",
            Self::PlainText => "plain_text",
        }
    }
}

/// Final output of the two-pass analysis, handed to persistence along with
/// the raw oracle payloads for the debug checkpoint side channel.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub items: Vec<ClassifiedItem>,
    pub engine: String,
    pub strategy: AnalysisStrategy,
    pub extraction_raw: String,
    pub classification_raw: String,
    pub extraction_ms: u64,
    pub classification_ms: u64,
    /// Out-of-vocabulary codes rewritten to OUT_OF_SCOPE.
    pub vocabulary_rewrites: usize,
    /// Items overwritten by the consistency enforcer.
    pub duplicates_unified: usize,
}
