//! OpenAI-compatible chat-completions provider.
//!
//! There is no server-side file store in this API shape: attachments are
//! inlined as base64 data URLs at completion time, and deletion is a no-op
//! because nothing remote was allocated.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::{Classifier, FileAttachment, OracleError};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub struct OpenAiCompatClient {
    base_url: String,
    api_key: String,
    model: String,
    engine_id: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OpenAiCompatClient {
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            engine_id: format!("openai/{model}"),
            client,
            timeout_secs,
        }
    }

    pub fn with_defaults(api_key: &str) -> Self {
        Self::new(DEFAULT_BASE_URL, api_key, DEFAULT_MODEL, 300)
    }

    fn chat(&self, messages: Vec<Message>) -> Result<String, OracleError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    OracleError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    OracleError::HttpClient(format!(
                        "Request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    OracleError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OracleError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| OracleError::ResponseParsing(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(OracleError::EmptyCompletion);
        }
        Ok(text)
    }
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: MessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "file")]
    File { file: FilePart },
}

#[derive(Serialize)]
struct FilePart {
    filename: String,
    file_data: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl Classifier for OpenAiCompatClient {
    fn engine_id(&self) -> &str {
        &self.engine_id
    }

    fn complete(
        &self,
        system_instruction: &str,
        user_content: &str,
    ) -> Result<String, OracleError> {
        self.chat(vec![
            Message {
                role: "system",
                content: MessageContent::Text(system_instruction.to_string()),
            },
            Message {
                role: "user",
                content: MessageContent::Text(user_content.to_string()),
            },
        ])
    }

    fn complete_with_attachment(
        &self,
        system_instruction: &str,
        user_content: &str,
        attachment: &FileAttachment,
    ) -> Result<String, OracleError> {
        self.chat(vec![
            Message {
                role: "system",
                content: MessageContent::Text(system_instruction.to_string()),
            },
            Message {
                role: "user",
                content: MessageContent::Parts(vec![
                    ContentPart::File {
                        file: FilePart {
                            filename: attachment
                                .resource_name
                                .clone()
                                .unwrap_or_else(|| "document".to_string()),
                            file_data: attachment.uri.clone(),
                        },
                    },
                    ContentPart::Text {
                        text: user_content.to_string(),
                    },
                ]),
            },
        ])
    }

    fn upload_attachment(
        &self,
        path: &Path,
        mime_type: &str,
    ) -> Result<FileAttachment, OracleError> {
        // Only PDF can ride the inline file content part; everything else
        // has to go through local text extraction instead.
        if mime_type != "application/pdf" {
            return Err(OracleError::AttachmentUnsupported(mime_type.to_string()));
        }

        let bytes = std::fs::read(path)
            .map_err(|e| OracleError::AttachmentUpload(format!("{}: {e}", path.display())))?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        Ok(FileAttachment {
            uri: format!("data:{mime_type};base64,{}", BASE64.encode(bytes)),
            mime_type: mime_type.to_string(),
            resource_name: Some(filename),
        })
    }

    fn delete_attachment(&self, _attachment: &FileAttachment) -> Result<(), OracleError> {
        // Inline attachments allocate nothing server-side.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn engine_id_names_provider_and_model() {
        let client = OpenAiCompatClient::new(DEFAULT_BASE_URL, "key", "gpt-4o-mini", 30);
        assert_eq!(client.engine_id(), "openai/gpt-4o-mini");
    }

    #[test]
    fn upload_inlines_pdf_as_data_url() {
        let client = OpenAiCompatClient::new(DEFAULT_BASE_URL, "key", DEFAULT_MODEL, 30);
        let mut file = tempfile::NamedTempFile::with_suffix(".pdf").unwrap();
        file.write_all(b"%PDF-1.4 fake").unwrap();

        let attachment = client
            .upload_attachment(file.path(), "application/pdf")
            .unwrap();
        assert!(attachment.uri.starts_with("data:application/pdf;base64,"));
        assert!(client.delete_attachment(&attachment).is_ok());
    }

    #[test]
    fn upload_rejects_non_pdf_media() {
        let client = OpenAiCompatClient::new(DEFAULT_BASE_URL, "key", DEFAULT_MODEL, 30);
        let file = tempfile::NamedTempFile::with_suffix(".png").unwrap();

        let err = client.upload_attachment(file.path(), "image/png");
        assert!(matches!(err, Err(OracleError::AttachmentUnsupported(_))));
    }

    #[test]
    fn file_part_serializes_with_type_tag() {
        let part = ContentPart::File {
            file: FilePart {
                filename: "quiz.pdf".into(),
                file_data: "data:application/pdf;base64,AAAA".into(),
            },
        };
        let json = serde_json::to_string(&part).unwrap();
        assert!(json.contains("\"type\":\"file\""));
        assert!(json.contains("\"filename\":\"quiz.pdf\""));
    }
}
