//! DOCX extraction: paragraph text plus embedded media copy-out.
//!
//! A `.docx` file is a zip archive. Paragraph text lives in
//! `word/document.xml` as `<w:p>` elements whose runs carry `<w:t>` text
//! nodes; embedded pictures live as opaque entries under `word/media/`.
//! Both are read in one pass over the archive: the XML is parsed as a flat
//! event stream (no DOM — documents can be large, paragraphs cannot), and
//! every media entry is copied byte-for-byte into the scratch workspace
//! under its own file name. Non-image media (OLE objects, thumbnails in
//! exotic formats) is copied too and silently dropped later by the
//! describer's extension filter.

use crate::error::Doc2AnkiError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};
use zip::ZipArchive;

/// What DOCX extraction hands back to the extractor.
#[derive(Debug)]
pub struct DocxContent {
    /// Non-blank paragraphs in document order, joined with newlines.
    pub text: String,
    /// Number of media entries copied into the scratch workspace.
    pub media_count: usize,
}

/// Extract paragraph text and copy `word/media/` entries into `scratch`.
pub fn extract_docx(path: &Path, scratch: &Path) -> Result<DocxContent, Doc2AnkiError> {
    let file = File::open(path).map_err(|e| Doc2AnkiError::Extraction {
        path: path.to_path_buf(),
        detail: format!("open: {e}"),
    })?;
    let mut archive = ZipArchive::new(file).map_err(|e| Doc2AnkiError::Extraction {
        path: path.to_path_buf(),
        detail: format!("not a valid DOCX archive: {e}"),
    })?;

    // Paragraph text first, while we still know the entry exists.
    let mut document_xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| Doc2AnkiError::Extraction {
            path: path.to_path_buf(),
            detail: format!("word/document.xml: {e}"),
        })?
        .read_to_string(&mut document_xml)
        .map_err(|e| Doc2AnkiError::Extraction {
            path: path.to_path_buf(),
            detail: format!("word/document.xml: {e}"),
        })?;

    let text = paragraphs_from_xml(&document_xml).map_err(|detail| Doc2AnkiError::Extraction {
        path: path.to_path_buf(),
        detail,
    })?;

    let media_count = copy_media_entries(&mut archive, path, scratch)?;
    info!(
        "DOCX extraction: {} chars of text, {} media entries",
        text.len(),
        media_count
    );

    Ok(DocxContent { text, media_count })
}

/// Pull non-blank paragraph text out of a `word/document.xml` body.
///
/// Paragraph boundaries are `<w:p>` elements; only `<w:t>` character data
/// counts as text. Blank paragraphs (spacing-only) are skipped, matching how
/// a reader would transcribe the document.
fn paragraphs_from_xml(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:p" => current.clear(),
                b"w:t" => in_text_run = true,
                _ => {}
            },
            Ok(Event::Text(t)) if in_text_run => {
                let chunk = t.unescape().map_err(|e| format!("XML text: {e}"))?;
                current.push_str(&chunk);
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => {
                    if !current.trim().is_empty() {
                        paragraphs.push(current.trim_end().to_string());
                    }
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML parse: {e}")),
            _ => {}
        }
    }

    Ok(paragraphs.join("\n"))
}

/// Copy every `word/media/` entry into `scratch`, preserving its file name.
fn copy_media_entries(
    archive: &mut ZipArchive<File>,
    doc_path: &Path,
    scratch: &Path,
) -> Result<usize, Doc2AnkiError> {
    let mut copied = 0;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| Doc2AnkiError::Extraction {
            path: doc_path.to_path_buf(),
            detail: format!("archive entry {index}: {e}"),
        })?;
        if !entry.is_file() || !entry.name().starts_with("word/media/") {
            continue;
        }
        let file_name = match Path::new(entry.name()).file_name() {
            Some(n) => n.to_owned(),
            None => continue,
        };
        let target = scratch.join(file_name);
        let mut out = File::create(&target).map_err(|e| Doc2AnkiError::ScratchWrite {
            path: target.clone(),
            source: e,
        })?;
        std::io::copy(&mut entry, &mut out).map_err(|e| Doc2AnkiError::ScratchWrite {
            path: target.clone(),
            source: e,
        })?;
        debug!("Copied media entry {:?}", target);
        copied += 1;
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const DOC_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Water boils at </w:t></w:r><w:r><w:t>100C.</w:t></w:r></w:p>
    <w:p><w:r><w:t>   </w:t></w:r></w:p>
    <w:p><w:r><w:t xml:space="preserve">Salt raises the boiling point.</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    /// Build a minimal .docx on disk with the given media entries.
    fn write_docx(dir: &Path, media: &[(&str, &[u8])]) -> std::path::PathBuf {
        let path = dir.join("fixture.docx");
        let file = File::create(&path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default();

        zip.start_file("word/document.xml", options).unwrap();
        zip.write_all(DOC_XML.as_bytes()).unwrap();
        for (name, bytes) in media {
            zip.start_file(format!("word/media/{name}"), options).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap();
        path
    }

    #[test]
    fn paragraphs_skip_blanks_and_join_runs() {
        let text = paragraphs_from_xml(DOC_XML).unwrap();
        assert_eq!(
            text,
            "Water boils at 100C.\nSalt raises the boiling point."
        );
    }

    #[test]
    fn entities_are_unescaped() {
        let xml = r#"<w:document xmlns:w="x"><w:body>
            <w:p><w:r><w:t>a &amp; b &lt; c</w:t></w:r></w:p>
        </w:body></w:document>"#;
        assert_eq!(paragraphs_from_xml(xml).unwrap(), "a & b < c");
    }

    #[test]
    fn extracts_text_and_copies_media() {
        let doc_dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let path = write_docx(
            doc_dir.path(),
            &[("image1.png", b"fake-png".as_slice()), ("image2.jpg", b"fake-jpg".as_slice())],
        );

        let content = extract_docx(&path, scratch.path()).unwrap();
        assert!(content.text.starts_with("Water boils"));
        assert_eq!(content.media_count, 2);
        assert!(scratch.path().join("image1.png").exists());
        assert!(scratch.path().join("image2.jpg").exists());
    }

    #[test]
    fn no_media_means_empty_scratch() {
        let doc_dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let path = write_docx(doc_dir.path(), &[]);

        let content = extract_docx(&path, scratch.path()).unwrap();
        assert_eq!(content.media_count, 0);
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn not_a_zip_is_an_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, b"this is not a zip archive").unwrap();
        let err = extract_docx(&path, dir.path()).unwrap_err();
        assert!(matches!(err, Doc2AnkiError::Extraction { .. }));
    }
}
