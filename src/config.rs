//! Configuration types for flashcard generation.
//!
//! All pipeline behaviour is controlled through [`GenerationConfig`], built
//! via its [`GenerationConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across components and to see in one place what
//! a run will do.
//!
//! The credential is an explicit field passed by value into the components
//! that need it (the model client), never read from or written to the process
//! environment by the library. Callers that want environment lookup do it at
//! the edge (the CLI reads `GEMINI_API_KEY` via clap).

use crate::error::Doc2AnkiError;
use crate::progress::StatusCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default AnkiConnect endpoint (the add-on's stock listen address).
pub const DEFAULT_ANKI_URL: &str = "http://127.0.0.1:8765";

/// Configuration for one document-to-flashcards run.
///
/// Built via [`GenerationConfig::builder()`].
///
/// # Example
/// ```rust
/// use doc2anki::GenerationConfig;
///
/// let config = GenerationConfig::builder("my-api-key")
///     .batch_size(3)
///     .batch_pause_ms(0)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// Credential for the generation and vision calls. Passed by value;
    /// redacted from `Debug` output.
    pub api_key: String,

    /// AnkiConnect endpoint. Default: [`DEFAULT_ANKI_URL`].
    pub anki_url: String,

    /// Model used to describe image batches. Default: "gemini-2.5-flash-lite".
    ///
    /// Descriptions are summaries, not transcriptions, so the cheapest vision
    /// tier is usually enough.
    pub vision_model: String,

    /// Model used to synthesize the note payload. Default: "gemini-2.5-flash".
    pub text_model: String,

    /// Which instruction template the synthesizer uses. Default:
    /// [`PromptVariant::Grounded`].
    pub prompt: PromptVariant,

    /// Number of images submitted to the vision model per call. Default: 3.
    ///
    /// Three images per call keeps each request comfortably under upload
    /// limits while amortising the per-call overhead of the vision endpoint.
    pub batch_size: usize,

    /// Pause between image batches, in milliseconds. Default: 4000.
    ///
    /// The vision endpoint rate-limits aggressively on free-tier keys; a
    /// four-second gap between batch calls stays under the stock per-minute
    /// quota. The pause is a cooperative `tokio::time::sleep`, not a thread
    /// block. Set to 0 in tests.
    pub batch_pause_ms: u64,

    /// Per-HTTP-call timeout in seconds. Default: 120.
    ///
    /// Synthesis over a long document can legitimately take more than a
    /// minute of model time; the timeout exists to bound a hung connection,
    /// not to police slow responses.
    pub api_timeout_secs: u64,

    /// Observer for run-stage transitions. Default: none (no-op).
    pub status_callback: Option<Arc<dyn StatusCallback>>,
}

impl GenerationConfig {
    /// Create a new builder seeded with the credential.
    pub fn builder(api_key: impl Into<String>) -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: GenerationConfig {
                api_key: api_key.into(),
                anki_url: DEFAULT_ANKI_URL.to_string(),
                vision_model: "gemini-2.5-flash-lite".to_string(),
                text_model: "gemini-2.5-flash".to_string(),
                prompt: PromptVariant::default(),
                batch_size: 3,
                batch_pause_ms: 4000,
                api_timeout_secs: 120,
                status_callback: None,
            },
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_key", &"<redacted>")
            .field("anki_url", &self.anki_url)
            .field("vision_model", &self.vision_model)
            .field("text_model", &self.text_model)
            .field("prompt", &self.prompt)
            .field("batch_size", &self.batch_size)
            .field("batch_pause_ms", &self.batch_pause_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field(
                "status_callback",
                &self.status_callback.as_ref().map(|_| "<dyn StatusCallback>"),
            )
            .finish()
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn anki_url(mut self, url: impl Into<String>) -> Self {
        self.config.anki_url = url.into();
        self
    }

    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.config.vision_model = model.into();
        self
    }

    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.config.text_model = model.into();
        self
    }

    pub fn prompt(mut self, variant: PromptVariant) -> Self {
        self.config.prompt = variant;
        self
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.config.batch_size = n.max(1);
        self
    }

    pub fn batch_pause_ms(mut self, ms: u64) -> Self {
        self.config.batch_pause_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn status_callback(mut self, cb: Arc<dyn StatusCallback>) -> Self {
        self.config.status_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, Doc2AnkiError> {
        let c = &self.config;
        if c.batch_size == 0 {
            return Err(Doc2AnkiError::InvalidConfig(
                "batch_size must be ≥ 1".into(),
            ));
        }
        if !c.anki_url.starts_with("http://") && !c.anki_url.starts_with("https://") {
            return Err(Doc2AnkiError::InvalidConfig(format!(
                "anki_url must be an HTTP(S) URL, got '{}'",
                c.anki_url
            )));
        }
        if c.vision_model.is_empty() || c.text_model.is_empty() {
            return Err(Doc2AnkiError::InvalidConfig(
                "model names must be non-empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which instruction template the synthesizer embeds the document text in.
///
/// Both variants demand the same JSON note schema; they differ only in
/// whether each question must carry a provenance tag. Selection is a
/// configuration choice, never content-driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PromptVariant {
    /// Questions are tagged "(From Content)" or "(AI-generated)", AI-generated
    /// questions must stay grounded in the source topic, and `Sources` must
    /// quote the inspiring snippet. (default)
    #[default]
    Grounded,
    /// Same schema, no provenance requirement.
    Simple,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = GenerationConfig::builder("key").build().unwrap();
        assert_eq!(config.anki_url, DEFAULT_ANKI_URL);
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.batch_pause_ms, 4000);
        assert_eq!(config.prompt, PromptVariant::Grounded);
    }

    #[test]
    fn batch_size_clamps_to_one() {
        let config = GenerationConfig::builder("key")
            .batch_size(0)
            .build()
            .unwrap();
        assert_eq!(config.batch_size, 1);
    }

    #[test]
    fn rejects_non_http_anki_url() {
        let err = GenerationConfig::builder("key")
            .anki_url("localhost:8765")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("anki_url"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = GenerationConfig::builder("secret-key-value")
            .build()
            .unwrap();
        let dbg = format!("{:?}", config);
        assert!(!dbg.contains("secret-key-value"));
        assert!(dbg.contains("<redacted>"));
    }
}
