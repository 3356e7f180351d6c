//! Gemini provider: generateContent completions plus the Files API for
//! attachment upload/delete.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Classifier, FileAttachment, OracleError};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

pub struct GeminiClient {
    base_url: String,
    api_key: String,
    model: String,
    engine_id: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            engine_id: format!("gemini/{model}"),
            client,
            timeout_secs,
        }
    }

    pub fn with_defaults(api_key: &str) -> Self {
        Self::new(DEFAULT_BASE_URL, api_key, DEFAULT_MODEL, 300)
    }

    fn generate(&self, body: &GenerateRequest) -> Result<String, OracleError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OracleError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| OracleError::ResponseParsing(e.to_string()))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(OracleError::EmptyCompletion);
        }
        Ok(text)
    }

    fn map_transport_error(&self, e: reqwest::Error) -> OracleError {
        if e.is_connect() {
            OracleError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            OracleError::HttpClient(format!("Request timed out after {}s", self.timeout_secs))
        } else {
            OracleError::HttpClient(e.to_string())
        }
    }
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: SystemInstruction,
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
enum RequestPart {
    #[serde(rename = "text")]
    Text(String),
    #[serde(rename = "fileData", rename_all = "camelCase")]
    FileData { file_uri: String, mime_type: String },
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct UploadResponse {
    file: UploadedFile,
}

#[derive(Deserialize)]
struct UploadedFile {
    name: String,
    uri: String,
}

impl Classifier for GeminiClient {
    fn engine_id(&self) -> &str {
        &self.engine_id
    }

    fn complete(
        &self,
        system_instruction: &str,
        user_content: &str,
    ) -> Result<String, OracleError> {
        self.generate(&GenerateRequest {
            system_instruction: SystemInstruction {
                parts: vec![RequestPart::Text(system_instruction.to_string())],
            },
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart::Text(user_content.to_string())],
            }],
        })
    }

    fn complete_with_attachment(
        &self,
        system_instruction: &str,
        user_content: &str,
        attachment: &FileAttachment,
    ) -> Result<String, OracleError> {
        self.generate(&GenerateRequest {
            system_instruction: SystemInstruction {
                parts: vec![RequestPart::Text(system_instruction.to_string())],
            },
            contents: vec![Content {
                role: "user",
                parts: vec![
                    RequestPart::FileData {
                        file_uri: attachment.uri.clone(),
                        mime_type: attachment.mime_type.clone(),
                    },
                    RequestPart::Text(user_content.to_string()),
                ],
            }],
        })
    }

    fn upload_attachment(
        &self,
        path: &Path,
        mime_type: &str,
    ) -> Result<FileAttachment, OracleError> {
        let bytes = std::fs::read(path)
            .map_err(|e| OracleError::AttachmentUpload(format!("{}: {e}", path.display())))?;

        let url = format!("{}/upload/v1beta/files?key={}", self.base_url, self.api_key);

        let response = self
            .client
            .post(&url)
            .header("X-Goog-Upload-Protocol", "raw")
            .header("Content-Type", mime_type)
            .body(bytes)
            .send()
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OracleError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: UploadResponse = response
            .json()
            .map_err(|e| OracleError::ResponseParsing(e.to_string()))?;

        Ok(FileAttachment {
            uri: parsed.file.uri,
            mime_type: mime_type.to_string(),
            resource_name: Some(parsed.file.name),
        })
    }

    fn delete_attachment(&self, attachment: &FileAttachment) -> Result<(), OracleError> {
        let Some(name) = &attachment.resource_name else {
            return Ok(());
        };

        let url = format!("{}/v1beta/{}?key={}", self.base_url, name, self.api_key);
        let response = self
            .client
            .delete(&url)
            .send()
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OracleError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_id_names_provider_and_model() {
        let client = GeminiClient::new(DEFAULT_BASE_URL, "test-key", "gemini-2.0-flash", 30);
        assert_eq!(client.engine_id(), "gemini/gemini-2.0-flash");
    }

    #[test]
    fn delete_without_resource_name_is_noop() {
        let client = GeminiClient::new(DEFAULT_BASE_URL, "test-key", DEFAULT_MODEL, 30);
        let attachment = FileAttachment {
            uri: "data:application/pdf;base64,AAAA".into(),
            mime_type: "application/pdf".into(),
            resource_name: None,
        };
        assert!(client.delete_attachment(&attachment).is_ok());
    }

    #[test]
    fn request_serializes_file_part_in_camel_case() {
        let request = GenerateRequest {
            system_instruction: SystemInstruction {
                parts: vec![RequestPart::Text("sys".into())],
            },
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart::FileData {
                    file_uri: "files/abc".into(),
                    mime_type: "application/pdf".into(),
                }],
            }],
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("systemInstruction"));
        assert!(json.contains("fileData"));
        assert!(json.contains("fileUri"));
        assert!(json.contains("mimeType"));
    }
}
