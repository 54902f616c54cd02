//! Document extraction: format dispatch, scratch workspace, description merge.
//!
//! This is the mid-level orchestrator between the per-format handlers and the
//! delivery controller. One call here owns the complete lifecycle of a
//! scratch workspace: a fresh temporary directory is created before any
//! handler runs, the handlers fill it with extracted or rendered images, the
//! describer reads it back, and the directory is deleted when the call
//! returns — on success, on error, and on panic alike, because the `TempDir`
//! guard is dropped on every exit path. No two concurrent extractions can
//! collide: each call gets its own directory.

use crate::config::GenerationConfig;
use crate::error::Doc2AnkiError;
use crate::llm::ModelClient;
use crate::pipeline::describe::{self, RateGate};
use crate::pipeline::docx;
use crate::pipeline::input::{DocumentFormat, ResolvedDocument};
use crate::pipeline::pdf;
use tracing::info;

/// The combined textual content of one document: text blocks first, then for
/// each image batch its description and a provenance line, in batch order.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub format: DocumentFormat,
    /// Images handed to the describer (media entries for DOCX, extracted or
    /// rendered rasters for PDF).
    pub image_count: usize,
}

impl ExtractedText {
    /// True when the document and every description came back blank.
    ///
    /// The caller must treat this as terminal: there is nothing to
    /// synthesize from, and re-running will not change that.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Extract a document into [`ExtractedText`].
///
/// Dispatches on the format tag resolved at ingestion, then runs the
/// describer over whatever the handler put in the scratch workspace.
pub async fn extract(
    document: &ResolvedDocument,
    model: &dyn ModelClient,
    config: &GenerationConfig,
) -> Result<ExtractedText, Doc2AnkiError> {
    // Fresh scratch workspace per call; removed on drop, whatever happens.
    let scratch = tempfile::tempdir()
        .map_err(|e| Doc2AnkiError::Internal(format!("scratch workspace: {e}")))?;

    let (document_text, image_count) = match document.format {
        DocumentFormat::Docx => {
            let content = docx::extract_docx(&document.path, scratch.path())?;
            (content.text, content.media_count)
        }
        DocumentFormat::Pdf => {
            let content = pdf::extract_pdf(&document.path, scratch.path()).await?;
            info!("PDF classified as {:?}", content.kind);
            (content.text, content.image_count)
        }
    };

    let gate = RateGate::fixed_ms(config.batch_pause_ms);
    let descriptions =
        describe::describe_workspace(model, scratch.path(), gate, config).await?;

    let mut entries: Vec<String> = Vec::with_capacity(1 + descriptions.len() * 2);
    if !document_text.trim().is_empty() {
        entries.push(document_text);
    }
    for description in &descriptions {
        entries.push(description.text.clone());
        entries.push(description.provenance_line());
    }

    Ok(ExtractedText {
        text: entries.join("\n\n"),
        format: document.format,
        image_count,
    })
}
