//! Scripted oracle used by pipeline tests: pops canned responses in order
//! and records every call so tests can assert the two-pass protocol.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{Classifier, FileAttachment, OracleError};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system_instruction: String,
    pub user_content: String,
    pub with_attachment: bool,
}

pub struct ScriptedClassifier {
    responses: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<RecordedCall>>,
    uploads: AtomicUsize,
    deletes: AtomicUsize,
    fail_uploads: bool,
    fail_deletes: bool,
}

impl ScriptedClassifier {
    pub fn new<S: AsRef<str>>(responses: &[S]) -> Self {
        Self {
            responses: Mutex::new(
                responses.iter().map(|r| r.as_ref().to_string()).collect(),
            ),
            calls: Mutex::new(Vec::new()),
            uploads: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            fail_uploads: false,
            fail_deletes: false,
        }
    }

    /// Refuse attachment uploads, forcing the file strategy to fail.
    pub fn failing_uploads<S: AsRef<str>>(responses: &[S]) -> Self {
        Self {
            fail_uploads: true,
            ..Self::new(responses)
        }
    }

    /// Accept uploads but fail deletion, for cleanup-path tests.
    pub fn failing_deletes<S: AsRef<str>>(responses: &[S]) -> Self {
        Self {
            fail_deletes: true,
            ..Self::new(responses)
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    fn next_response(
        &self,
        system_instruction: &str,
        user_content: &str,
        with_attachment: bool,
    ) -> Result<String, OracleError> {
        self.calls.lock().unwrap().push(RecordedCall {
            system_instruction: system_instruction.to_string(),
            user_content: user_content.to_string(),
            with_attachment,
        });

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| OracleError::ResponseParsing("script exhausted".into()))
    }
}

impl Classifier for ScriptedClassifier {
    fn engine_id(&self) -> &str {
        "scripted/test"
    }

    fn complete(
        &self,
        system_instruction: &str,
        user_content: &str,
    ) -> Result<String, OracleError> {
        self.next_response(system_instruction, user_content, false)
    }

    fn complete_with_attachment(
        &self,
        system_instruction: &str,
        user_content: &str,
        _attachment: &FileAttachment,
    ) -> Result<String, OracleError> {
        self.next_response(system_instruction, user_content, true)
    }

    fn upload_attachment(
        &self,
        path: &Path,
        mime_type: &str,
    ) -> Result<FileAttachment, OracleError> {
        if self.fail_uploads {
            return Err(OracleError::AttachmentUnsupported(mime_type.to_string()));
        }
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(FileAttachment {
            uri: format!("scripted://{}", path.display()),
            mime_type: mime_type.to_string(),
            resource_name: Some("scripted-file".into()),
        })
    }

    fn delete_attachment(&self, _attachment: &FileAttachment) -> Result<(), OracleError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes {
            return Err(OracleError::HttpClient("delete refused by script".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn responses_pop_in_order_then_exhaust() {
        let oracle = ScriptedClassifier::new(&["one", "two"]);
        assert_eq!(oracle.complete("s", "u").unwrap(), "one");
        assert_eq!(oracle.complete("s", "u").unwrap(), "two");
        assert!(oracle.complete("s", "u").is_err());
        assert_eq!(oracle.calls().len(), 3);
    }

    #[test]
    fn failing_uploads_rejects_attachments() {
        let oracle = ScriptedClassifier::failing_uploads(&["unused"]);
        let err = oracle.upload_attachment(Path::new("/tmp/x.pdf"), "application/pdf");
        assert!(matches!(err, Err(OracleError::AttachmentUnsupported(_))));
        assert_eq!(oracle.upload_count(), 0);
    }
}
