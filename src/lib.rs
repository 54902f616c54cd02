//! # doc2anki
//!
//! Turn Word and PDF documents into Anki flashcards.
//!
//! ## Why this crate?
//!
//! Writing good flashcards by hand is the slowest part of spaced repetition.
//! This crate reads a document the way a student would — body text plus the
//! figures — has an LLM draft a set of multiple-choice notes from it, and
//! files them straight into a running Anki instance over the AnkiConnect
//! HTTP API. What it guarantees is *structural* validity: every note that
//! reaches Anki matches the note template's schema. Whether the questions
//! are any good is between you and the model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document (.docx / .doc / .pdf)
//!  │
//!  ├─ 1. Input       resolve the format tag, validate the file
//!  ├─ 2. Extract     DOCX: paragraphs + media ─ PDF: classify first page,
//!  │                 then text + embedded images, or page rasters (scanned)
//!  ├─ 3. Describe    image batches → vision model, paced by a rate gate
//!  ├─ 4. Synthesize  one LLM call → strict JSON recovery → validated notes
//!  └─ 5. Deliver     probe store → ensure deck → addNotes → report counts
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2anki::{DeliveryController, GenerationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GenerationConfig::builder("your-gemini-api-key").build()?;
//!     let controller = DeliveryController::from_config(config)?;
//!     let report = controller.run("lecture_notes.docx").await?;
//!     println!("{}/{} notes created in '{}'",
//!         report.created, report.submitted, report.deck_name);
//!     Ok(())
//! }
//! ```
//!
//! Anki must be running with the AnkiConnect add-on installed, and the
//! profile needs the "AllInOne (kprim, mc, sc)" note type.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2anki` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! doc2anki = { version = "0.3", default-features = false }
//! ```
//!
//! ## Scope
//!
//! One document per run, one run at a time. No retries, no cancellation, no
//! chunking of long documents — a run either reaches Anki or returns the
//! first error it met. PDF classification looks at the first page only: a
//! scanned cover sheet sends the whole document down the raster path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod anki;
pub mod config;
pub mod deliver;
pub mod error;
pub mod extract;
pub mod llm;
pub mod note;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use anki::{AnkiConnectClient, NoteStore};
pub use config::{GenerationConfig, GenerationConfigBuilder, PromptVariant, DEFAULT_ANKI_URL};
pub use deliver::{DeliveryController, DeliveryResult, RunStage};
pub use error::{Doc2AnkiError, ErrorCategory};
pub use extract::{extract, ExtractedText};
pub use llm::{ContentPart, FileHandle, GeminiClient, ModelCallError, ModelClient};
pub use note::{FlashcardNote, NoteFields, NotePayload, NOTE_MODEL_NAME};
pub use pipeline::describe::RateGate;
pub use pipeline::input::{resolve_input, DocumentFormat, ResolvedDocument};
pub use progress::{NoopStatusCallback, SharedStatusCallback, StatusCallback};
