//! The destination store: AnkiConnect over JSON-HTTP.
//!
//! AnkiConnect is a single-endpoint protocol: every call POSTs
//! `{action, version: 6, params}` and gets back `{result, error}` where
//! `error` is null on success. A non-2xx transport status or a non-null
//! `error` field is a failure — there is no other signal.
//!
//! The store sits behind the [`NoteStore`] trait so the delivery controller
//! can be exercised against an in-memory stub. Stubs must honour the same
//! idempotence contract the real store has: `createDeck` for an existing
//! deck is a no-op success, never an error.

use crate::error::Doc2AnkiError;
use crate::note::FlashcardNote;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// AnkiConnect protocol version carried in every request.
const ANKI_CONNECT_VERSION: u32 = 6;

/// The three store operations the pipeline needs.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Liveness probe (`version`). Must be cheap; runs before any
    /// extraction work is committed.
    async fn probe(&self) -> Result<u32, Doc2AnkiError>;

    /// Idempotently ensure the deck exists (`createDeck`).
    async fn create_deck(&self, deck: &str) -> Result<(), Doc2AnkiError>;

    /// Submit the full note array in one request (`addNotes`).
    ///
    /// The store answers with one entry per submitted note: the created
    /// note's identifier, or null where the note was rejected.
    async fn add_notes(
        &self,
        notes: &[FlashcardNote],
    ) -> Result<Vec<Option<u64>>, Doc2AnkiError>;
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnkiRequest<'a> {
    action: &'a str,
    version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct AnkiResponse<T> {
    result: Option<T>,
    error: Option<String>,
}

// ── HTTP implementation ──────────────────────────────────────────────────

/// [`NoteStore`] backed by a live AnkiConnect endpoint.
pub struct AnkiConnectClient {
    http: reqwest::Client,
    url: String,
}

impl AnkiConnectClient {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self, Doc2AnkiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Doc2AnkiError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    async fn request<T: DeserializeOwned>(
        &self,
        action: &str,
        params: Option<Value>,
    ) -> Result<Option<T>, Doc2AnkiError> {
        let body = AnkiRequest {
            action,
            version: ANKI_CONNECT_VERSION,
            params,
        };

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Doc2AnkiError::Connectivity {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Doc2AnkiError::Delivery {
                action: action.to_string(),
                message: format!("HTTP {status}"),
            });
        }

        let parsed: AnkiResponse<T> =
            response
                .json()
                .await
                .map_err(|e| Doc2AnkiError::Delivery {
                    action: action.to_string(),
                    message: format!("malformed response: {e}"),
                })?;

        if let Some(message) = parsed.error {
            return Err(Doc2AnkiError::Delivery {
                action: action.to_string(),
                message,
            });
        }

        debug!("AnkiConnect '{}' ok", action);
        Ok(parsed.result)
    }
}

#[async_trait]
impl NoteStore for AnkiConnectClient {
    async fn probe(&self) -> Result<u32, Doc2AnkiError> {
        // Any failure here — transport, HTTP status, or protocol error —
        // means the store is not usable, which is what the caller asks.
        let result = self
            .request::<u32>("version", None)
            .await
            .map_err(|e| match e {
                connectivity @ Doc2AnkiError::Connectivity { .. } => connectivity,
                other => Doc2AnkiError::Connectivity {
                    url: self.url.clone(),
                    reason: other.to_string(),
                },
            })?;
        result.ok_or_else(|| Doc2AnkiError::Connectivity {
            url: self.url.clone(),
            reason: "version probe returned no result".into(),
        })
    }

    async fn create_deck(&self, deck: &str) -> Result<(), Doc2AnkiError> {
        // createDeck answers the deck id (existing or new); the id itself
        // is not needed, only the success.
        self.request::<Value>("createDeck", Some(serde_json::json!({ "deck": deck })))
            .await?;
        info!("Deck '{}' ensured", deck);
        Ok(())
    }

    async fn add_notes(
        &self,
        notes: &[FlashcardNote],
    ) -> Result<Vec<Option<u64>>, Doc2AnkiError> {
        let result = self
            .request::<Vec<Option<u64>>>(
                "addNotes",
                Some(serde_json::json!({ "notes": notes })),
            )
            .await?;
        result.ok_or_else(|| Doc2AnkiError::Delivery {
            action: "addNotes".to_string(),
            message: "no result array returned".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_envelope_carries_action_and_version() {
        let body = AnkiRequest {
            action: "createDeck",
            version: ANKI_CONNECT_VERSION,
            params: Some(serde_json::json!({ "deck": "Chem" })),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["action"], "createDeck");
        assert_eq!(json["version"], 6);
        assert_eq!(json["params"]["deck"], "Chem");
    }

    #[test]
    fn probe_envelope_omits_params() {
        let body = AnkiRequest {
            action: "version",
            version: ANKI_CONNECT_VERSION,
            params: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("params").is_none());
    }

    #[test]
    fn response_error_field_is_detected() {
        let raw = r#"{"result": null, "error": "model was not found: AllInOne"}"#;
        let parsed: AnkiResponse<Vec<Option<u64>>> = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.error.as_deref(), Some("model was not found: AllInOne"));
    }

    #[test]
    fn add_notes_result_parses_nulls_for_rejections() {
        let raw = r#"{"result": [1496198395707, null, 1496198395708], "error": null}"#;
        let parsed: AnkiResponse<Vec<Option<u64>>> = serde_json::from_str(raw).unwrap();
        let ids = parsed.result.unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids.iter().flatten().count(), 2);
    }
}
