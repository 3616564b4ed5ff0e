//! Page chunking.
//!
//! [`RecursiveChunker`] cuts each page into passages of at most `chunk_size`
//! characters. For every passage it looks for the coarsest separator that
//! still fits the size limit: paragraph breaks first, then line breaks, then
//! periods, then spaces, and only cuts mid-word when none of them occur.
//! Consecutive passages of one page share at least `chunk_overlap` characters.
//!
//! Chunking is a pure function of the page text and the two size parameters.

use crate::document::{Page, Passage};

/// Separators tried in order, coarsest first.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ".", " "];

/// A strategy for splitting pages into passages.
pub trait Chunker: Send + Sync {
    /// Split one page into passages. Chunk indices restart at 0.
    ///
    /// Returns an empty `Vec` for a page with empty text.
    fn chunk_page(&self, page: &Page) -> Vec<Passage>;

    /// Split every page of a document, preserving page order.
    fn chunk_pages(&self, pages: &[Page]) -> Vec<Passage> {
        pages.iter().flat_map(|page| self.chunk_page(page)).collect()
    }
}

/// Splits text hierarchically with overlapping windows.
///
/// # Example
///
/// ```rust,ignore
/// use lingua_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(4000, 200);
/// let passages = chunker.chunk_pages(&pages);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<Vec<char>>,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker` with the default separators.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - maximum number of characters per passage
    /// * `chunk_overlap` - characters shared by consecutive passages, clamped
    ///   below `chunk_size`
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.chars().collect()).collect(),
        }
    }

    /// Replace the separator cascade. Empty separators are ignored.
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.separators = separators
            .into_iter()
            .map(|s| s.as_ref().chars().collect::<Vec<_>>())
            .filter(|s| !s.is_empty())
            .collect();
        self
    }

    /// Split raw text into `(char_offset, content)` pieces.
    pub fn split_text(&self, text: &str) -> Vec<(usize, String)> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let mut pieces = Vec::new();
        if len == 0 {
            return pieces;
        }

        let mut start = 0;
        loop {
            let limit = start + self.chunk_size;
            if limit >= len {
                pieces.push((start, chars[start..].iter().collect()));
                break;
            }

            let end = self.find_cut(&chars, start, limit);
            pieces.push((start, chars[start..end].iter().collect()));
            start = self.next_start(&chars, start, end);
        }

        pieces
    }

    /// The last position in `(start + overlap, limit]` that directly follows
    /// a separator, trying separators coarsest first. Falls back to `limit`.
    fn find_cut(&self, chars: &[char], start: usize, limit: usize) -> usize {
        let earliest = start + self.chunk_overlap + 1;
        for separator in &self.separators {
            let width = separator.len();
            let found = (earliest.max(width)..=limit)
                .rev()
                .find(|&pos| chars[pos - width..pos] == separator[..]);
            if let Some(pos) = found {
                return pos;
            }
        }
        limit
    }

    /// Start of the next window: `overlap` characters before `end`, moved
    /// back to the start of a word when one begins within another `overlap`
    /// characters.
    fn next_start(&self, chars: &[char], start: usize, end: usize) -> usize {
        let base = end - self.chunk_overlap;
        let floor = (start + 1).max(end.saturating_sub(2 * self.chunk_overlap));
        (floor..=base).rev().find(|&pos| chars[pos - 1].is_whitespace()).unwrap_or(base)
    }
}

impl Chunker for RecursiveChunker {
    fn chunk_page(&self, page: &Page) -> Vec<Passage> {
        self.split_text(&page.text)
            .into_iter()
            .enumerate()
            .map(|(index, (offset, content))| {
                Passage::new(content, page.source.clone(), page.number, index, offset)
            })
            .collect()
    }
}
