//! Page-aware document parsing for PDF and plain text

use std::panic::{self, AssertUnwindSafe};

use crate::error::{Error, Result};
use crate::types::{FileType, Page, SourceDocument};

/// Page separator in plain text files
const FORM_FEED: char = '\u{000C}';

/// Parses raw file bytes into ordered pages
pub struct DocumentParser;

impl DocumentParser {
    /// Parse a file based on its extension
    pub fn parse(source: &str, data: &[u8]) -> Result<SourceDocument> {
        let file_type = FileType::from_path(source);

        let pages = match file_type {
            FileType::Pdf => Self::parse_pdf(source, data)?,
            FileType::Txt | FileType::Markdown => Self::parse_text(data),
            FileType::Unknown => {
                let ext = std::path::Path::new(source)
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("(none)");
                return Err(Error::UnsupportedFileType(format!(
                    "{} - only PDF, TXT and Markdown files are accepted",
                    ext
                )));
            }
        };

        if pages.iter().all(|p| p.text.trim().is_empty()) {
            return Err(Error::document_parse(
                source,
                "no text content could be extracted",
            ));
        }

        tracing::debug!(
            "Parsed '{}' ({}): {} pages",
            source,
            file_type.display_name(),
            pages.len()
        );

        Ok(SourceDocument::new(source, pages))
    }

    /// Extract PDF text page by page, falling back to lopdf when pdf-extract fails
    fn parse_pdf(source: &str, data: &[u8]) -> Result<Vec<Page>> {
        // pdf-extract panics on some malformed fonts
        let extracted = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(data)
        }));

        let texts = match extracted {
            Ok(Ok(texts)) => texts,
            Ok(Err(e)) => {
                tracing::warn!("pdf-extract failed on '{}': {}, trying fallback", source, e);
                Self::extract_pdf_fallback(source, data)?
            }
            Err(_) => {
                tracing::warn!("pdf-extract panicked on '{}', trying fallback", source);
                Self::extract_pdf_fallback(source, data)?
            }
        };

        Ok(texts
            .iter()
            .enumerate()
            .map(|(i, text)| Page::new(i as u32 + 1, cleanup_pdf_text(text)))
            .collect())
    }

    /// Per-page text extraction with lopdf
    fn extract_pdf_fallback(source: &str, data: &[u8]) -> Result<Vec<String>> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::document_parse(source, format!("failed to load PDF: {}", e)))?;

        let texts = doc
            .get_pages()
            .keys()
            .map(|&number| match doc.extract_text(&[number]) {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!("No text for page {} of '{}': {}", number, source, e);
                    String::new()
                }
            })
            .collect();

        Ok(texts)
    }

    /// Plain text, one page per form-feed separated section
    fn parse_text(data: &[u8]) -> Vec<Page> {
        let content = String::from_utf8_lossy(data);
        content
            .split(FORM_FEED)
            .enumerate()
            .map(|(i, text)| Page::new(i as u32 + 1, text))
            .collect()
    }
}

/// Normalize extracted PDF text: expand ligatures, drop NULs and blank lines
fn cleanup_pdf_text(text: &str) -> String {
    let text = text
        .replace('\0', "")
        .replace('\u{00A0}', " ")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl");

    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
