//! Pipeline stages for document-to-flashcard conversion.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch the PDF backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ docx | pdf ──▶ describe ──▶ synthesize
//! (path,     (text +       (batches ▶    (one LLM call ▶
//!  format)    scratch       vision        validated note
//!             images)       model)        payload)
//! ```
//!
//! 1. [`input`]      — validate the path and resolve the format tag once
//! 2. [`docx`]       — paragraph text + `word/media/` copy-out
//! 3. [`pdf`]        — classify first page, then extract text + embedded
//!    images (digitally-born) or rasterise every page (scanned); runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 4. [`describe`]   — batch scratch images through the vision model; the
//!    only stage with a pacing gate
//! 5. [`synthesize`] — one generation call, strict JSON extraction, schema
//!    validation
pub mod describe;
pub mod docx;
pub mod input;
pub mod pdf;
pub mod synthesize;
