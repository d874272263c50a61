//! Document ingestion — turns uploaded or on-disk résumés into plain text.
//! The matcher itself only ever sees text.

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Only PDF files allowed")]
    UnsupportedType,

    #[error("File too large (limit {limit_bytes} bytes)")]
    TooLarge { limit_bytes: usize },

    #[error("Uploaded file is empty")]
    Empty,

    #[error("Failed to extract text from PDF: {0}")]
    Extraction(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn has_extension(filename: &str, ext: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

/// Checks an uploaded résumé before extraction: `.pdf` name, non-empty,
/// at most `max_bytes`.
pub fn validate_upload(filename: &str, len: usize, max_bytes: usize) -> Result<(), IngestError> {
    if !has_extension(filename, "pdf") {
        return Err(IngestError::UnsupportedType);
    }
    if len == 0 {
        return Err(IngestError::Empty);
    }
    if len > max_bytes {
        return Err(IngestError::TooLarge {
            limit_bytes: max_bytes,
        });
    }
    Ok(())
}

/// Extracts the text of every page, concatenated. CPU-bound; call from a
/// blocking task in async contexts.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, IngestError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| IngestError::Extraction(e.to_string()))
}

/// Loads a résumé from disk for offline evaluation. Accepts `.pdf` and `.txt`.
pub fn load_document_text(path: &Path) -> Result<String, IngestError> {
    let display = path.display().to_string();
    let io_err = |source| IngestError::Io {
        path: display.clone(),
        source,
    };

    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if has_extension(name, "pdf") {
        let bytes = std::fs::read(path).map_err(io_err)?;
        extract_pdf_text(&bytes)
    } else if has_extension(name, "txt") {
        std::fs::read_to_string(path).map_err(io_err)
    } else {
        Err(IngestError::UnsupportedType)
    }
}
