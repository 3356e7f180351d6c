//! Oracle collaborators: LLM completion providers behind one `Classifier`
//! capability. Provider and model identity are configuration, not logic.

pub mod gemini;
pub mod mock;
pub mod openai;

pub use gemini::GeminiClient;
pub use mock::ScriptedClassifier;
pub use openai::OpenAiCompatClient;

use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Cannot reach oracle service at {0}")]
    Connection(String),

    #[error("Oracle returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Oracle response could not be read: {0}")]
    ResponseParsing(String),

    #[error("Provider does not support file attachments: {0}")]
    AttachmentUnsupported(String),

    #[error("Attachment upload failed: {0}")]
    AttachmentUpload(String),

    #[error("Oracle returned an empty completion")]
    EmptyCompletion,
}

/// Handle for a transient file resource held by the oracle service.
///
/// Attachments allocated for one analysis must be released when the
/// analysis finishes, successfully or not.
#[derive(Debug, Clone)]
pub struct FileAttachment {
    /// Provider-side reference (remote URI or inline data URL).
    pub uri: String,
    pub mime_type: String,
    /// Provider resource name used for deletion, when one exists.
    pub resource_name: Option<String>,
}

/// A completion oracle. One implementation per provider; the analyzer
/// depends only on this interface.
pub trait Classifier: Send + Sync {
    /// Stable identifier persisted with every classification (provider/model).
    fn engine_id(&self) -> &str;

    fn complete(&self, system_instruction: &str, user_content: &str)
        -> Result<String, OracleError>;

    fn complete_with_attachment(
        &self,
        system_instruction: &str,
        user_content: &str,
        attachment: &FileAttachment,
    ) -> Result<String, OracleError>;

    fn upload_attachment(&self, path: &Path, mime_type: &str)
        -> Result<FileAttachment, OracleError>;

    /// Release a provider-side attachment. Callers treat failure as
    /// log-only; it must never mask the original pipeline error.
    fn delete_attachment(&self, attachment: &FileAttachment) -> Result<(), OracleError>;
}
