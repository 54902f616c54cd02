//! The model boundary: upload files, generate text.
//!
//! The pipeline needs exactly two operations from the outside model —
//! `upload(file) -> handle` and `generate(contents) -> text`, where a content
//! list may mix uploaded handles and literal instruction strings. Everything
//! else (which provider, which wire format) hides behind [`ModelClient`], so
//! the describer and synthesizer are testable against stubs with no network.
//!
//! [`GeminiClient`] is the production implementation, speaking the
//! Generative Language REST API: media upload to `upload/v1beta/files`, then
//! `models/{model}:generateContent` with `file_data` and `text` parts.

use crate::error::Doc2AnkiError;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default Generative Language API root.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// A server-side handle for an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    /// The `file_uri` to reference from a generate call.
    pub uri: String,
    pub mime_type: String,
}

/// One element of a generate call's content list.
#[derive(Debug, Clone)]
pub enum ContentPart {
    /// A previously uploaded file.
    File(FileHandle),
    /// A literal instruction string.
    Text(String),
}

/// A failed model call, before the calling stage assigns it a place in the
/// run's error taxonomy.
///
/// The split exists because the same client serves two stages: an upload
/// failure during description is a `VisionService` error, the identical
/// failure during synthesis is a `Synthesis` error, but a rejected credential
/// is an `Auth` error from either stage.
#[derive(Debug, Error)]
pub enum ModelCallError {
    /// The API rejected the credential.
    #[error("credential rejected: {0}")]
    Auth(String),
    /// Anything else: transport failure, non-2xx status, missing response fields.
    #[error("{0}")]
    Api(String),
}

/// The two operations the pipeline needs from the model provider.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Upload a local file, returning a handle usable in [`Self::generate`].
    async fn upload(&self, path: &Path) -> Result<FileHandle, ModelCallError>;

    /// Run one generation call against `model` with the given content list.
    async fn generate(&self, model: &str, parts: &[ContentPart]) -> Result<String, ModelCallError>;
}

// ── Gemini implementation ────────────────────────────────────────────────

/// [`ModelClient`] backed by the Generative Language REST API.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Build a client with the given credential and per-call timeout.
    pub fn new(api_key: impl Into<String>, timeout_secs: u64) -> Result<Self, Doc2AnkiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Doc2AnkiError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    /// Point the client at a different API root. Used by tests against a
    /// local stub server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn read_failure(response: reqwest::Response) -> ModelCallError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        classify_api_failure(status.as_u16(), &body)
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn upload(&self, path: &Path) -> Result<FileHandle, ModelCallError> {
        let mime = mime_for_path(path)
            .ok_or_else(|| ModelCallError::Api(format!("no known MIME type for {:?}", path)))?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ModelCallError::Api(format!("read {:?}: {e}", path)))?;
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let metadata = serde_json::json!({ "file": { "display_name": display_name.clone() } });
        let form = reqwest::multipart::Form::new()
            .part(
                "metadata",
                reqwest::multipart::Part::text(metadata.to_string())
                    .mime_str("application/json")
                    .map_err(|e| ModelCallError::Api(e.to_string()))?,
            )
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes)
                    .file_name(display_name)
                    .mime_str(mime)
                    .map_err(|e| ModelCallError::Api(e.to_string()))?,
            );

        let response = self
            .http
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .header("X-Goog-Upload-Protocol", "multipart")
            .multipart(form)
            .send()
            .await
            .map_err(|e| ModelCallError::Api(format!("upload request: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::read_failure(response).await);
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ModelCallError::Api(format!("upload response: {e}")))?;
        let uri = json["file"]["uri"]
            .as_str()
            .ok_or_else(|| ModelCallError::Api("upload response missing file.uri".into()))?
            .to_string();
        let mime_type = json["file"]["mimeType"]
            .as_str()
            .unwrap_or(mime)
            .to_string();

        debug!("Uploaded {:?} → {}", path, uri);
        Ok(FileHandle { uri, mime_type })
    }

    async fn generate(&self, model: &str, parts: &[ContentPart]) -> Result<String, ModelCallError> {
        let body = serde_json::json!({
            "contents": [{ "parts": parts.iter().map(part_to_json).collect::<Vec<_>>() }]
        });

        let response = self
            .http
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, model
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelCallError::Api(format!("generate request: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::read_failure(response).await);
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ModelCallError::Api(format!("generate response: {e}")))?;
        let text = extract_candidate_text(&json)
            .ok_or_else(|| ModelCallError::Api("generate response has no candidate text".into()))?;

        debug!("Model {} returned {} chars", model, text.len());
        Ok(text)
    }
}

// ── Pure helpers ─────────────────────────────────────────────────────────

/// Map a file extension to the MIME type the upload endpoint expects.
pub(crate) fn mime_for_path(path: &Path) -> Option<&'static str> {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => Some("image/png"),
        Some("jpg") | Some("jpeg") => Some("image/jpeg"),
        _ => None,
    }
}

/// Turn an API failure into [`ModelCallError`], recognising the provider's
/// invalid-credential message so callers can surface it distinctly.
pub(crate) fn classify_api_failure(status: u16, body: &str) -> ModelCallError {
    if body.contains("API key not valid") || status == 401 || status == 403 {
        ModelCallError::Auth(format!("HTTP {status}: {}", first_line(body)))
    } else {
        ModelCallError::Api(format!("HTTP {status}: {}", first_line(body)))
    }
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or("")
}

fn part_to_json(part: &ContentPart) -> Value {
    match part {
        ContentPart::File(handle) => serde_json::json!({
            "file_data": { "file_uri": handle.uri, "mime_type": handle.mime_type }
        }),
        ContentPart::Text(text) => serde_json::json!({ "text": text }),
    }
}

/// Join the text of every part of the first candidate.
pub(crate) fn extract_candidate_text(json: &Value) -> Option<String> {
    let parts = json["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn mime_mapping_is_case_insensitive() {
        assert_eq!(
            mime_for_path(&PathBuf::from("a.PNG")),
            Some("image/png")
        );
        assert_eq!(
            mime_for_path(&PathBuf::from("b.JpEg")),
            Some("image/jpeg")
        );
        assert_eq!(mime_for_path(&PathBuf::from("c.gif")), None);
        assert_eq!(mime_for_path(&PathBuf::from("noext")), None);
    }

    #[test]
    fn invalid_key_message_classifies_as_auth() {
        let err = classify_api_failure(
            400,
            r#"{"error": {"message": "API key not valid. Please pass a valid API key."}}"#,
        );
        assert!(matches!(err, ModelCallError::Auth(_)));
    }

    #[test]
    fn unauthorized_status_classifies_as_auth() {
        assert!(matches!(
            classify_api_failure(401, "nope"),
            ModelCallError::Auth(_)
        ));
        assert!(matches!(
            classify_api_failure(403, "forbidden"),
            ModelCallError::Auth(_)
        ));
    }

    #[test]
    fn server_error_classifies_as_api() {
        assert!(matches!(
            classify_api_failure(503, "overloaded"),
            ModelCallError::Api(_)
        ));
    }

    #[test]
    fn candidate_text_joins_parts() {
        let json: Value = serde_json::json!({
            "candidates": [{ "content": { "parts": [
                { "text": "Hello " },
                { "text": "world" }
            ]}}]
        });
        assert_eq!(extract_candidate_text(&json).unwrap(), "Hello world");
    }

    #[test]
    fn candidate_text_none_when_empty() {
        let json: Value = serde_json::json!({ "candidates": [] });
        assert!(extract_candidate_text(&json).is_none());
    }

    #[test]
    fn content_parts_serialize_to_wire_shape() {
        let file = part_to_json(&ContentPart::File(FileHandle {
            uri: "https://example/files/x".into(),
            mime_type: "image/png".into(),
        }));
        assert_eq!(file["file_data"]["file_uri"], "https://example/files/x");
        let text = part_to_json(&ContentPart::Text("Explain".into()));
        assert_eq!(text["text"], "Explain");
    }
}
