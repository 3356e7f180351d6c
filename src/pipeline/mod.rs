//! Document processing pipeline: queue, orchestrator, two-pass analysis,
//! and the supporting extraction, checkpoint, and callback pieces.

pub mod analyzer;
pub mod callback;
pub mod checkpoint;
pub mod extraction;
pub mod processor;
pub mod queue;

pub use analyzer::{AnalysisError, AnalysisResult, TwoPassAnalyzer};
pub use callback::{CompletionNotice, CompletionNotifier, WebhookNotifier};
pub use checkpoint::{CheckpointRecorder, CheckpointStage};
pub use extraction::{ExtractionError, LocalTextExtractor, TextExtractor};
pub use processor::{DocumentProcessor, ProcessingError};
pub use queue::{ProcessingQueue, QueueError, DEFAULT_PRIORITY};
