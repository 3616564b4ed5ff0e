//! Page extraction and text normalisation.
//!
//! A [`DocumentParser`] turns a [`RawDocument`] into an ordered list of
//! [`Page`]s. Every extracted page goes through [`normalize_page_text`]:
//!
//! 1. words hyphen-broken across a line break are rejoined,
//! 2. single line breaks inside a paragraph become spaces,
//! 3. runs of blank lines collapse to exactly one blank line.
//!
//! Normalisation is idempotent, so re-parsing already clean text is a no-op.

use std::sync::LazyLock;

use regex::Regex;

use crate::document::{Page, RawDocument};
use crate::error::{RagError, Result};

static HYPHEN_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w+)-\n(\w+)").expect("unreachable error: invalid hyphenation pattern")
});
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n\s*\n").expect("unreachable error: invalid blank line pattern")
});

/// Extracts per-page text from a raw document.
///
/// A failure on any page fails the whole document: callers flag the document
/// as rejected rather than silently dropping the page.
pub trait DocumentParser: Send + Sync {
    /// Parse the document into normalised pages, in page order.
    fn parse(&self, document: &RawDocument) -> Result<Vec<Page>>;
}

/// Apply the three normalisation steps, in order.
pub fn normalize_page_text(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n").replace('\r', "\n");
    let text = rejoin_hyphenation(text.trim());
    let text = unwrap_lines(&text);
    collapse_blank_lines(&text).trim().to_string()
}

/// `infor-\nmation` becomes `information`.
fn rejoin_hyphenation(text: &str) -> String {
    HYPHEN_BREAK.replace_all(text, "${1}${2}").into_owned()
}

/// Replace line breaks that are not part of a blank-line paragraph boundary
/// with spaces. Paragraph boundaries are left untouched.
fn unwrap_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for boundary in BLANK_LINES.find_iter(text) {
        out.push_str(&text[last..boundary.start()].replace('\n', " "));
        out.push_str(boundary.as_str());
        last = boundary.end();
    }
    out.push_str(&text[last..].replace('\n', " "));
    out
}

fn collapse_blank_lines(text: &str) -> String {
    BLANK_LINES.replace_all(text, "\n\n").into_owned()
}

fn pages_from_texts<I>(document: &RawDocument, texts: I) -> Vec<Page>
where
    I: IntoIterator<Item = (u32, String)>,
{
    texts
        .into_iter()
        .map(|(number, raw)| Page {
            text: normalize_page_text(&raw),
            number,
            source: document.name.clone(),
        })
        .collect()
}

/// Parses UTF-8 text. Form feeds (`\x0c`) separate pages; a file without
/// form feeds is a single page.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextParser;

impl DocumentParser for PlainTextParser {
    fn parse(&self, document: &RawDocument) -> Result<Vec<Page>> {
        let text = std::str::from_utf8(&document.bytes).map_err(|e| RagError::ParseError {
            document: document.name.clone(),
            message: format!("document is not valid UTF-8: {e}"),
        })?;

        let texts = text.split('\x0c').enumerate().map(|(i, page)| (i as u32 + 1, page.to_string()));
        Ok(pages_from_texts(document, texts))
    }
}

/// Parses PDF documents with `lopdf`.
#[cfg(feature = "pdf")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfParser;

#[cfg(feature = "pdf")]
impl DocumentParser for PdfParser {
    fn parse(&self, document: &RawDocument) -> Result<Vec<Page>> {
        let parse_error = |message: String| RagError::ParseError {
            document: document.name.clone(),
            message,
        };

        let pdf = lopdf::Document::load_mem(&document.bytes)
            .map_err(|e| parse_error(format!("failed to load PDF: {e}")))?;

        let mut texts = Vec::new();
        for page_number in pdf.get_pages().into_keys() {
            let text = pdf.extract_text(&[page_number]).map_err(|e| {
                parse_error(format!("failed to extract text from page {page_number}: {e}"))
            })?;
            texts.push((page_number, text));
        }

        tracing::debug!(document = %document.name, pages = texts.len(), "parsed PDF");
        Ok(pages_from_texts(document, texts))
    }
}

/// Picks a parser by file extension: `.pdf` goes to [`PdfParser`], anything
/// else is read as plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionParser;

impl DocumentParser for ExtensionParser {
    fn parse(&self, document: &RawDocument) -> Result<Vec<Page>> {
        let is_pdf = document.name.to_ascii_lowercase().ends_with(".pdf");
        if is_pdf {
            #[cfg(feature = "pdf")]
            return PdfParser.parse(document);
            #[cfg(not(feature = "pdf"))]
            return Err(RagError::ParseError {
                document: document.name.clone(),
                message: "PDF support is disabled (enable the `pdf` feature)".to_string(),
            });
        }
        PlainTextParser.parse(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejoins_hyphen_broken_words() {
        assert_eq!(normalize_page_text("compu-\ntational linguistics"), "computational linguistics");
    }

    #[test]
    fn unwraps_single_newlines_and_keeps_paragraphs() {
        let raw = "Syntax studies\nsentence structure.\n\nSemantics studies\nmeaning.";
        assert_eq!(
            normalize_page_text(raw),
            "Syntax studies sentence structure.\n\nSemantics studies meaning."
        );
    }

    #[test]
    fn collapses_runs_of_blank_lines() {
        let raw = "First paragraph.\n\n\n\n  \nSecond paragraph.";
        assert_eq!(normalize_page_text(raw), "First paragraph.\n\nSecond paragraph.");
    }

    #[test]
    fn handles_carriage_returns() {
        assert_eq!(normalize_page_text("a\r\nb\r\n\r\nc"), "a b\n\nc");
    }

    #[test]
    fn normalisation_is_idempotent_on_sample() {
        let once = normalize_page_text("mor-\nphology is\n\n\n\nthe study\nof words");
        assert_eq!(normalize_page_text(&once), once);
    }

    #[test]
    fn plain_text_pages_are_split_on_form_feed() {
        let doc = RawDocument::new("notes.txt", "page one\x0cpage\ntwo".as_bytes().to_vec());
        let pages = PlainTextParser.parse(&doc).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[1].text, "page two");
        assert!(pages.iter().all(|p| p.source == "notes.txt"));
    }

    #[test]
    fn invalid_utf8_fails_whole_document() {
        let doc = RawDocument::new("broken.txt", vec![0xff, 0xfe, 0x00]);
        let err = PlainTextParser.parse(&doc).unwrap_err();
        assert!(matches!(err, RagError::ParseError { ref document, .. } if document == "broken.txt"));
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn corrupt_pdf_is_a_parse_error() {
        let doc = RawDocument::new("corrupt.pdf", b"%PDF-1.4 definitely not a pdf".to_vec());
        let err = ExtensionParser.parse(&doc).unwrap_err();
        assert!(matches!(err, RagError::ParseError { .. }));
    }
}
