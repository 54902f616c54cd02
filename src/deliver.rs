//! The delivery controller: one document in, one delivery report out.
//!
//! ## State machine
//!
//! ```text
//! Idle ─▶ Reading ─▶ Synthesizing ─▶ EnsuringDeck ─▶ Submitting ─▶ Done ─▶ Idle
//!            │             │               │              │
//!            └─────────────┴───────┬───────┴──────────────┘
//!                                  ▼
//!                                Error ─▶ Idle
//! ```
//!
//! Every transition is reported through the configured
//! [`crate::progress::StatusCallback`]. Both terminal states hand control
//! back to `Idle`, so one controller serves any number of sequential runs —
//! but only sequential ones: there is no parallelism across documents, no
//! cancellation, and no retry anywhere. A run proceeds to a terminal state
//! or returns the first error it meets.
//!
//! ## Ordering guarantees
//!
//! The store's liveness probe runs before any extraction work: if Anki is
//! down, the run aborts without having read the document or spent a single
//! model call. Deck creation runs before submission because the payload's
//! deck must exist for `addNotes` to land.

use crate::anki::NoteStore;
use crate::config::GenerationConfig;
use crate::error::Doc2AnkiError;
use crate::extract;
use crate::llm::ModelClient;
use crate::pipeline::input;
use crate::pipeline::synthesize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// The stages a run moves through, reported via the status callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Idle,
    Reading,
    Synthesizing,
    EnsuringDeck,
    Submitting,
    Done,
    Error,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunStage::Idle => "idle",
            RunStage::Reading => "reading document",
            RunStage::Synthesizing => "generating flashcards",
            RunStage::EnsuringDeck => "ensuring deck exists",
            RunStage::Submitting => "submitting notes",
            RunStage::Done => "done",
            RunStage::Error => "error",
        };
        f.write_str(label)
    }
}

/// What a successful run reports.
///
/// `created` counts the identifiers the store actually returned; `submitted`
/// counts the notes sent. The store may reject individual notes (duplicates,
/// template mismatches), in which case `created < submitted` — a degraded
/// success, logged as a warning, never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResult {
    pub created: usize,
    pub submitted: usize,
    pub deck_name: String,
}

/// Orchestrates extract → synthesize → ensure deck → submit.
pub struct DeliveryController {
    config: GenerationConfig,
    model: Arc<dyn ModelClient>,
    store: Arc<dyn NoteStore>,
}

impl DeliveryController {
    /// Build a controller over explicit model and store clients.
    ///
    /// Tests inject stubs here; production code usually goes through
    /// [`DeliveryController::from_config`].
    pub fn new(
        config: GenerationConfig,
        model: Arc<dyn ModelClient>,
        store: Arc<dyn NoteStore>,
    ) -> Self {
        Self {
            config,
            model,
            store,
        }
    }

    /// Build a controller with the production Gemini and AnkiConnect clients
    /// derived from the configuration.
    pub fn from_config(config: GenerationConfig) -> Result<Self, Doc2AnkiError> {
        let model = Arc::new(crate::llm::GeminiClient::new(
            config.api_key.clone(),
            config.api_timeout_secs,
        )?);
        let store = Arc::new(crate::anki::AnkiConnectClient::new(
            config.anki_url.clone(),
            config.api_timeout_secs,
        )?);
        Ok(Self::new(config, model, store))
    }

    /// Run the full pipeline for one document.
    ///
    /// Whatever the outcome, the controller reports `Done` or `Error` and
    /// then `Idle`, and is immediately reusable.
    pub async fn run(&self, path: &str) -> Result<DeliveryResult, Doc2AnkiError> {
        let result = self.run_stages(path).await;
        match &result {
            Ok(report) => {
                info!(
                    "Run complete: {}/{} notes created in deck '{}'",
                    report.created, report.submitted, report.deck_name
                );
                self.stage(RunStage::Done);
            }
            Err(e) => {
                error!("Run failed ({}): {e}", e.category().headline());
                self.stage(RunStage::Error);
            }
        }
        self.stage(RunStage::Idle);
        result
    }

    async fn run_stages(&self, path: &str) -> Result<DeliveryResult, Doc2AnkiError> {
        // Preconditions: credential and input file, checked before anything
        // moves past Idle.
        if self.config.api_key.trim().is_empty() {
            return Err(Doc2AnkiError::MissingCredential);
        }
        let document = input::resolve_input(path)?;

        // The store must be reachable before extraction commits any cost.
        let version = self.store.probe().await?;
        debug!("Store answered liveness probe (version {version})");

        self.stage(RunStage::Reading);
        let extracted = extract::extract(&document, self.model.as_ref(), &self.config).await?;
        if extracted.is_empty() {
            return Err(Doc2AnkiError::EmptyDocument {
                path: document.path,
            });
        }
        if let Some(ref cb) = self.config.status_callback {
            cb.on_extracted(extracted.text.len(), extracted.image_count);
        }

        self.stage(RunStage::Synthesizing);
        let payload =
            synthesize::synthesize(self.model.as_ref(), &extracted.text, &self.config).await?;
        let deck_name = payload.deck_name().to_string();

        self.stage(RunStage::EnsuringDeck);
        if let Err(e) = self.store.create_deck(&deck_name).await {
            error!("Deck creation failed for '{deck_name}': {e}");
            return Err(e);
        }

        self.stage(RunStage::Submitting);
        let submitted = payload.notes.len();
        let ids = self.store.add_notes(&payload.notes).await?;
        let created = ids.iter().flatten().count();
        if created < submitted {
            warn!(
                "Store accepted {created} of {submitted} notes; the rest were rejected"
            );
        }
        if let Some(ref cb) = self.config.status_callback {
            cb.on_notes_submitted(created, submitted);
        }

        Ok(DeliveryResult {
            created,
            submitted,
            deck_name,
        })
    }

    fn stage(&self, stage: RunStage) {
        debug!("Stage: {stage}");
        if let Some(ref cb) = self.config.status_callback {
            cb.on_stage(stage);
        }
    }
}
