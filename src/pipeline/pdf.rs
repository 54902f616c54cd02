//! PDF extraction: classify, then pull text and images via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread designed for blocking operations, preventing the Tokio worker
//! threads from stalling during CPU-heavy rendering.
//!
//! ## Classification
//!
//! A PDF is either digitally-born (pages expose selectable text) or scanned
//! (pages are raster-only). The decision inspects ONLY the first page: if it
//! yields any extractable text the whole document is treated as
//! digitally-born, otherwise the whole document is treated as scanned. A
//! scanned cover page therefore forces raster treatment of every page even
//! when later pages are text-native. Known limitation, kept deliberately —
//! per-page classification would change which pages reach the vision model
//! and is a semantic change, not a fix.

use crate::error::Doc2AnkiError;
use image::ImageFormat;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Longest rendered edge for scanned-page rasters, in pixels.
///
/// Full pages go to the vision model as summaries, not transcription
/// targets, so a 2000 px cap keeps files small without losing layout.
const RENDER_TARGET_PX: i32 = 2000;

/// The classification verdict for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfKind {
    /// Pages expose extractable text; embedded rasters are pulled separately.
    DigitallyBorn,
    /// Raster-only; every page is rendered to an image and the describer
    /// recovers all meaning.
    Scanned,
}

/// What PDF extraction hands back to the extractor.
#[derive(Debug)]
pub struct PdfContent {
    /// Per-page text in page order (empty for scanned documents).
    pub text: String,
    pub kind: PdfKind,
    pub page_count: usize,
    /// Images written into the scratch workspace.
    pub image_count: usize,
}

/// Extract a PDF into text plus scratch-workspace images.
///
/// Digitally-born: per-page text in page order, then every embedded raster
/// saved as `page{N}_img{M}.png`. Scanned: no text, every page rendered to
/// `page{N}.png`. N and M are 1-indexed.
pub async fn extract_pdf(path: &Path, scratch: &Path) -> Result<PdfContent, Doc2AnkiError> {
    let path = path.to_path_buf();
    let scratch = scratch.to_path_buf();

    tokio::task::spawn_blocking(move || extract_pdf_blocking(&path, &scratch))
        .await
        .map_err(|e| Doc2AnkiError::Internal(format!("PDF task panicked: {e}")))?
}

/// Decide the document's kind from its first page's extractable text.
fn classify(first_page_text: &str) -> PdfKind {
    if first_page_text.trim().is_empty() {
        PdfKind::Scanned
    } else {
        PdfKind::DigitallyBorn
    }
}

fn embedded_image_name(page_num: usize, image_num: usize) -> String {
    format!("page{page_num}_img{image_num}.png")
}

fn rendered_page_name(page_num: usize) -> String {
    format!("page{page_num}.png")
}

/// Blocking implementation of PDF extraction.
fn extract_pdf_blocking(pdf_path: &Path, scratch: &Path) -> Result<PdfContent, Doc2AnkiError> {
    let pdfium = Pdfium::default();

    let document = pdfium.load_pdf_from_file(pdf_path, None).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            Doc2AnkiError::PasswordRequired {
                path: pdf_path.to_path_buf(),
            }
        } else {
            Doc2AnkiError::Extraction {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    let pages = document.pages();
    let page_count = pages.len() as usize;
    info!("PDF loaded: {} pages", page_count);

    let first_page_text = match pages.get(0) {
        Ok(page) => page_text(pdf_path, &page)?,
        Err(_) => String::new(),
    };
    let kind = classify(&first_page_text);
    debug!("Classified {:?} as {:?}", pdf_path, kind);

    match kind {
        PdfKind::DigitallyBorn => extract_digital(pdf_path, scratch, &pages, page_count),
        PdfKind::Scanned => extract_scanned(pdf_path, scratch, &pages, page_count),
    }
}

/// Per-page text in page order, then a second walk for embedded rasters.
fn extract_digital(
    pdf_path: &Path,
    scratch: &Path,
    pages: &PdfPages<'_>,
    page_count: usize,
) -> Result<PdfContent, Doc2AnkiError> {
    let mut page_texts: Vec<String> = Vec::with_capacity(page_count);
    for page in pages.iter() {
        page_texts.push(page_text(pdf_path, &page)?);
    }

    let mut image_count = 0;
    for (page_index, page) in pages.iter().enumerate() {
        let page_num = page_index + 1;
        let mut image_num = 0;
        for object in page.objects().iter() {
            let Some(image_object) = object.as_image_object() else {
                continue;
            };
            image_num += 1;
            let raster = image_object
                .get_raw_image()
                .map_err(|e| Doc2AnkiError::Extraction {
                    path: pdf_path.to_path_buf(),
                    detail: format!("page {page_num} image {image_num}: {:?}", e),
                })?;
            let target = scratch.join(embedded_image_name(page_num, image_num));
            save_png(&raster, &target)?;
            image_count += 1;
        }
        if image_num > 0 {
            debug!("Page {} has {} embedded image(s)", page_num, image_num);
        }
    }

    Ok(PdfContent {
        text: page_texts.join("\n"),
        kind: PdfKind::DigitallyBorn,
        page_count,
        image_count,
    })
}

/// Render every page to a full-page raster; no text extraction at all.
fn extract_scanned(
    pdf_path: &Path,
    scratch: &Path,
    pages: &PdfPages<'_>,
    page_count: usize,
) -> Result<PdfContent, Doc2AnkiError> {
    let render_config = PdfRenderConfig::new()
        .set_target_width(RENDER_TARGET_PX)
        .set_maximum_height(RENDER_TARGET_PX);

    let mut image_count = 0;
    for (page_index, page) in pages.iter().enumerate() {
        let page_num = page_index + 1;
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            Doc2AnkiError::Extraction {
                path: pdf_path.to_path_buf(),
                detail: format!("render page {page_num}: {:?}", e),
            }
        })?;
        let target = scratch.join(rendered_page_name(page_num));
        save_png(&bitmap.as_image(), &target)?;
        image_count += 1;
    }

    info!("Rendered {} scanned page(s) to scratch", image_count);
    Ok(PdfContent {
        text: String::new(),
        kind: PdfKind::Scanned,
        page_count,
        image_count,
    })
}

fn page_text(pdf_path: &Path, page: &PdfPage<'_>) -> Result<String, Doc2AnkiError> {
    Ok(page
        .text()
        .map_err(|e| Doc2AnkiError::Extraction {
            path: pdf_path.to_path_buf(),
            detail: format!("text extraction: {:?}", e),
        })?
        .all())
}

fn save_png(raster: &image::DynamicImage, target: &PathBuf) -> Result<(), Doc2AnkiError> {
    raster
        .save_with_format(target, ImageFormat::Png)
        .map_err(|e| Doc2AnkiError::ScratchWrite {
            path: target.clone(),
            source: std::io::Error::other(e),
        })
}
