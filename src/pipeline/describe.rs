//! Image description: batch scratch images through the vision model.
//!
//! The describer is the only stage that talks to the vision endpoint, and the
//! only stage with a pacing policy. Each batch costs one generate call
//! preceded by one upload per image; a [`RateGate`] pause after every batch
//! keeps the call rate under the endpoint's per-minute quota.
//!
//! Failure policy: the first upload or generate error aborts the remaining
//! batches and propagates — there is no partial-description salvage. A
//! half-described document would silently skew the flashcards toward
//! whichever images happened to come first.

use crate::config::GenerationConfig;
use crate::error::Doc2AnkiError;
use crate::llm::{ContentPart, ModelCallError, ModelClient};
use crate::prompts::DESCRIBE_IMAGES_INSTRUCTION;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Extensions the describer will submit, lower-cased.
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// One batch's result: the model's description and the files it covered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescription {
    pub text: String,
    pub sources: Vec<PathBuf>,
}

impl ImageDescription {
    /// The provenance line that follows the description text in the
    /// extracted-text sequence.
    pub fn provenance_line(&self) -> String {
        let paths: Vec<String> = self
            .sources
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        format!("The file names and locations are: [{}]", paths.join(", "))
    }
}

/// A fixed-interval pacing gate.
///
/// Replaces the blocking sleep a naive implementation would put between
/// batches: the pause is a cooperative `tokio::time::sleep`, and tests
/// inject [`RateGate::zero`] to run at full speed.
#[derive(Debug, Clone, Copy)]
pub struct RateGate {
    interval: Duration,
}

impl RateGate {
    /// Gate with a fixed pause between calls.
    pub fn fixed_ms(ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(ms),
        }
    }

    /// A no-delay gate for tests.
    pub fn zero() -> Self {
        Self {
            interval: Duration::ZERO,
        }
    }

    /// Wait out the configured interval.
    pub async fn pause(&self) {
        if !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
    }
}

/// List the describable images in `folder`: known extensions only
/// (case-insensitive), sorted by file name.
///
/// Sorting fixes the batch composition regardless of filesystem enumeration
/// order, so identical inputs always produce identical batches.
pub fn list_images(folder: &Path) -> Result<Vec<PathBuf>, Doc2AnkiError> {
    let entries = std::fs::read_dir(folder)
        .map_err(|e| Doc2AnkiError::Internal(format!("scratch listing {:?}: {e}", folder)))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_image_extension(path))
        .collect();
    files.sort();
    Ok(files)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}

/// Describe every image in the scratch workspace, in fixed-size batches.
///
/// Per batch: every asset is uploaded first, then one generate call runs
/// with the uploaded handles plus the fixed instruction. The gate pauses
/// after each batch call.
pub async fn describe_workspace(
    model: &dyn ModelClient,
    folder: &Path,
    gate: RateGate,
    config: &GenerationConfig,
) -> Result<Vec<ImageDescription>, Doc2AnkiError> {
    let files = list_images(folder)?;
    if files.is_empty() {
        debug!("No describable images in {:?}", folder);
        return Ok(Vec::new());
    }

    let batch_total = files.len().div_ceil(config.batch_size);
    info!(
        "Describing {} image(s) in {} batch(es) of up to {}",
        files.len(),
        batch_total,
        config.batch_size
    );

    let mut descriptions = Vec::with_capacity(batch_total);
    for (batch_index, batch) in files.chunks(config.batch_size).enumerate() {
        let mut parts: Vec<ContentPart> = Vec::with_capacity(batch.len() + 1);
        for file in batch {
            let handle = model.upload(file).await.map_err(vision_error)?;
            parts.push(ContentPart::File(handle));
        }
        parts.push(ContentPart::Text(DESCRIBE_IMAGES_INSTRUCTION.to_string()));

        let text = model
            .generate(&config.vision_model, &parts)
            .await
            .map_err(vision_error)?;

        descriptions.push(ImageDescription {
            text,
            sources: batch.to_vec(),
        });

        if let Some(ref cb) = config.status_callback {
            cb.on_batch_described(batch_index + 1, batch_total);
        }
        gate.pause().await;
    }

    Ok(descriptions)
}

fn vision_error(e: ModelCallError) -> Doc2AnkiError {
    match e {
        ModelCallError::Auth(detail) => Doc2AnkiError::Auth { detail },
        ModelCallError::Api(detail) => Doc2AnkiError::VisionService { detail },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn listing_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.PNG");
        touch(dir.path(), "a.jpg");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "c.jpeg");
        touch(dir.path(), "d.gif");

        let files = list_images(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG", "c.jpeg"]);
    }

    #[test]
    fn batching_is_size_stable() {
        // 7 files in batches of 3: 3 + 3 + 1
        let files: Vec<PathBuf> = (0..7).map(|i| PathBuf::from(format!("f{i}.png"))).collect();
        let batches: Vec<&[PathBuf]> = files.chunks(3).collect();
        assert_eq!(batches.len(), 7usize.div_ceil(3));
        assert_eq!(batches[0].len(), 3);
        assert_eq!(batches[1].len(), 3);
        assert_eq!(batches[2].len(), 1);
        assert_eq!(batches[0][0], PathBuf::from("f0.png"));
    }

    #[test]
    fn exact_multiple_fills_the_last_batch() {
        let files: Vec<PathBuf> = (0..6).map(|i| PathBuf::from(format!("f{i}.png"))).collect();
        let batches: Vec<&[PathBuf]> = files.chunks(3).collect();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].len(), 3);
    }

    #[test]
    fn provenance_line_names_all_sources() {
        let description = ImageDescription {
            text: "Two diagrams.".into(),
            sources: vec![PathBuf::from("/tmp/s/a.png"), PathBuf::from("/tmp/s/b.png")],
        };
        let line = description.provenance_line();
        assert!(line.starts_with("The file names and locations are:"));
        assert!(line.contains("/tmp/s/a.png"));
        assert!(line.contains("/tmp/s/b.png"));
    }

    #[tokio::test]
    async fn zero_gate_does_not_sleep() {
        // Just exercises the no-delay path; completion is the assertion.
        RateGate::zero().pause().await;
    }

    #[tokio::test]
    async fn fixed_gate_waits_the_interval() {
        tokio::time::pause();
        let gate = RateGate::fixed_ms(4000);
        let before = tokio::time::Instant::now();
        gate.pause().await;
        assert!(before.elapsed() >= Duration::from_millis(4000));
    }
}
