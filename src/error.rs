//! Error types for the doc2anki library.
//!
//! One enum covers every way a run can die. The pipeline has no partial
//! success below the note level: a failure in any stage — extraction, image
//! description, synthesis, or delivery — aborts the remainder of the run, so
//! a single fatal [`Doc2AnkiError`] returned from the top-level entry points
//! is the whole story. (The one deliberate exception is a store-side partial
//! rejection of notes, which is reported as a degraded success count on
//! [`crate::deliver::DeliveryResult`], not as an error.)
//!
//! Each variant also maps to an [`ErrorCategory`], the coarse classification
//! shown to end users: a malformed file and an unreachable Anki instance call
//! for very different fixes, and the CLI leads with that distinction.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the doc2anki library.
#[derive(Debug, Error)]
pub enum Doc2AnkiError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but is zero bytes.
    #[error("Document is empty: '{path}'")]
    EmptyFile { path: PathBuf },

    /// The file extension is neither DOCX/DOC nor PDF.
    #[error("Unsupported document format '{extension}' for '{path}'\nSupported formats: .docx, .doc, .pdf")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// No credential was supplied for the model API.
    #[error("No API key provided.\nPass one explicitly or set GEMINI_API_KEY.")]
    MissingCredential,

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The underlying DOCX/PDF parse failed.
    #[error("Failed to extract content from '{path}': {detail}")]
    Extraction { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.")]
    PasswordRequired { path: PathBuf },

    /// The document produced no text and no image descriptions.
    ///
    /// Terminal and non-retryable: there is nothing to synthesize cards from.
    #[error("Document '{path}' yielded no text and no describable images.\nNothing to generate flashcards from.")]
    EmptyDocument { path: PathBuf },

    /// Could not write an extracted image into the scratch workspace.
    #[error("Failed to write scratch file '{path}': {source}")]
    ScratchWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Model errors ──────────────────────────────────────────────────────
    /// An image upload or vision call failed; the remaining batches were
    /// abandoned (no partial-description salvage).
    #[error("Vision service call failed: {detail}")]
    VisionService { detail: String },

    /// The flashcard-generation call itself failed.
    #[error("Flashcard synthesis call failed: {detail}")]
    Synthesis { detail: String },

    /// The model responded, but the response was not a valid note payload.
    ///
    /// `raw_response` preserves the full model output for diagnostics.
    #[error("Model response is not a valid note payload: {detail}\n--- raw response ---\n{raw_response}")]
    Schema { detail: String, raw_response: String },

    /// The model API rejected the credential.
    #[error("The model API rejected the credential: {detail}\nCheck the API key.")]
    Auth { detail: String },

    // ── Store errors ──────────────────────────────────────────────────────
    /// The destination store did not answer the liveness probe.
    #[error("Cannot reach Anki at '{url}': {reason}\nIs Anki running with the AnkiConnect add-on installed?")]
    Connectivity { url: String, reason: String },

    /// Deck creation or note submission failed at the store.
    #[error("AnkiConnect '{action}' failed: {message}")]
    Delivery { action: String, message: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse user-facing classification of a [`Doc2AnkiError`].
///
/// The CLI prints the category as the headline and the variant message as the
/// detail, so a user can tell at a glance whether to fix the file, start
/// Anki, or check their key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The document itself is the problem (missing, empty, wrong format,
    /// unparseable, or yields nothing to work with).
    Format,
    /// The destination store or the model endpoint could not be reached.
    Connectivity,
    /// The credential was missing or rejected.
    Authentication,
    /// Everything else.
    Unexpected,
}

impl ErrorCategory {
    /// Short headline used by the CLI.
    pub fn headline(&self) -> &'static str {
        match self {
            ErrorCategory::Format => "Document problem",
            ErrorCategory::Connectivity => "Connection problem",
            ErrorCategory::Authentication => "Authentication problem",
            ErrorCategory::Unexpected => "Unexpected problem",
        }
    }
}

impl Doc2AnkiError {
    /// Classify this error for user-facing reporting.
    pub fn category(&self) -> ErrorCategory {
        use Doc2AnkiError::*;
        match self {
            FileNotFound { .. }
            | PermissionDenied { .. }
            | EmptyFile { .. }
            | UnsupportedFormat { .. }
            | Extraction { .. }
            | PasswordRequired { .. }
            | EmptyDocument { .. } => ErrorCategory::Format,
            Connectivity { .. } => ErrorCategory::Connectivity,
            MissingCredential | Auth { .. } => ErrorCategory::Authentication,
            ScratchWrite { .. }
            | VisionService { .. }
            | Synthesis { .. }
            | Schema { .. }
            | Delivery { .. }
            | InvalidConfig(_)
            | Internal(_) => ErrorCategory::Unexpected,
        }
    }
}
