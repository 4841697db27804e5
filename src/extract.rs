//! Per-page PDF text extraction.
//!
//! Wraps `pdf-extract` and returns one [`PageText`] per readable page.
//! Pages that yield no text after extraction are omitted; a document whose
//! pages all come back empty still extracts successfully and fails later at
//! the chunking stage.

/// Text of a single PDF page, 1-based page numbering.
#[derive(Debug, Clone)]
pub struct PageText {
    pub number: i64,
    pub text: String,
}

/// Extraction error. Terminal for the document being ingested.
#[derive(Debug)]
pub enum ExtractError {
    Pdf(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extracts the text of every page of a PDF held in memory.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<PageText>, ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;

    Ok(pages
        .into_iter()
        .enumerate()
        .filter_map(|(i, text)| {
            if text.trim().is_empty() {
                None
            } else {
                Some(PageText {
                    number: i as i64 + 1,
                    text,
                })
            }
        })
        .collect())
}
