//! Fire-and-forget completion callback. The processing outcome is already
//! durable in the database before the callback fires; delivery failures
//! are logged and never retried or surfaced.

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::models::DocumentStatus;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionNotice {
    pub document_id: Uuid,
    pub status: DocumentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompletionNotice {
    pub fn completed(document_id: Uuid, results_url: String) -> Self {
        Self {
            document_id,
            status: DocumentStatus::Completed,
            results_url: Some(results_url),
            error: None,
        }
    }

    pub fn failed(document_id: Uuid, error: String) -> Self {
        Self {
            document_id,
            status: DocumentStatus::Failed,
            results_url: None,
            error: Some(error),
        }
    }
}

pub trait CompletionNotifier: Send + Sync {
    fn notify(&self, notice: CompletionNotice);
}

/// POSTs the notice to a webhook from a detached thread so the worker loop
/// never blocks on a slow or dead endpoint.
pub struct WebhookNotifier {
    endpoint: String,
    timeout_secs: u64,
}

impl WebhookNotifier {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout_secs,
        }
    }
}

impl CompletionNotifier for WebhookNotifier {
    fn notify(&self, notice: CompletionNotice) {
        let endpoint = self.endpoint.clone();
        let timeout = std::time::Duration::from_secs(self.timeout_secs);

        std::thread::spawn(move || {
            let client = match reqwest::blocking::Client::builder().timeout(timeout).build() {
                Ok(client) => client,
                Err(e) => {
                    warn!(error = %e, "Could not build callback HTTP client");
                    return;
                }
            };

            match client.post(&endpoint).json(&notice).send() {
                Ok(response) if !response.status().is_success() => {
                    warn!(
                        document_id = %notice.document_id,
                        status = response.status().as_u16(),
                        "Completion callback rejected by endpoint"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        document_id = %notice.document_id,
                        error = %e,
                        "Completion callback delivery failed"
                    );
                }
            }
        });
    }
}
