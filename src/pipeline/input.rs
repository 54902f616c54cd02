//! Input resolution: validate the document path and fix its format tag.
//!
//! ## Why resolve the format once?
//!
//! The format decides which extraction handler runs, how the scratch
//! workspace is filled, and which failure modes are possible. Deciding it
//! once at ingestion — as a closed [`DocumentFormat`] variant — means no
//! later stage ever re-examines the file name, and an unknown extension is a
//! distinct error at the earliest possible moment instead of a silent no-op
//! somewhere downstream.

use crate::error::Doc2AnkiError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The two supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// `.docx` or legacy `.doc` — an OOXML zip archive.
    Docx,
    /// `.pdf` — digitally-born or scanned, decided later by classification.
    Pdf,
}

impl DocumentFormat {
    /// Resolve the format from a file extension, case-insensitive.
    pub fn from_path(path: &Path) -> Result<Self, Doc2AnkiError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "docx" | "doc" => Ok(DocumentFormat::Docx),
            "pdf" => Ok(DocumentFormat::Pdf),
            _ => Err(Doc2AnkiError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }
}

/// A validated input document: an existing, non-empty file with a known format.
#[derive(Debug, Clone)]
pub struct ResolvedDocument {
    pub path: PathBuf,
    pub format: DocumentFormat,
}

/// Validate the input path and resolve its format tag.
///
/// Distinguishes missing file, unreadable file, and empty file so the caller
/// can report each precisely.
pub fn resolve_input(path_str: &str) -> Result<ResolvedDocument, Doc2AnkiError> {
    let path = PathBuf::from(path_str);

    let metadata = match std::fs::metadata(&path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Doc2AnkiError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Doc2AnkiError::FileNotFound { path });
        }
    };

    if !metadata.is_file() {
        return Err(Doc2AnkiError::FileNotFound { path });
    }
    if metadata.len() == 0 {
        return Err(Doc2AnkiError::EmptyFile { path });
    }

    let format = DocumentFormat::from_path(&path)?;
    debug!("Resolved input {:?} as {:?}", path, format);

    Ok(ResolvedDocument { path, format })
}
