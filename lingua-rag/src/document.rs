//! Data types for raw documents, pages, passages, and search results.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// An uploaded document: raw bytes plus the display name it was uploaded under.
///
/// The name is unique per upload session and becomes the `source` of every
/// passage cut from this document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// Display name, used in citations.
    pub name: String,
    /// The undecoded document contents.
    pub bytes: Vec<u8>,
}

impl RawDocument {
    /// Create a raw document from a name and its bytes.
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self { name: name.into(), bytes: bytes.into() }
    }

    /// SHA-256 of the document bytes, hex encoded.
    pub fn content_hash(&self) -> String {
        sha256_hex(&self.bytes)
    }
}

/// Normalised text of one page of a document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    /// Normalised page text.
    pub text: String,
    /// 1-based page number.
    pub number: u32,
    /// Display name of the document this page came from.
    pub source: String,
}

/// The atomic retrieval unit: a bounded slice of one page's text.
///
/// Every passage carries its document name and page so a citation can be
/// rebuilt from the passage alone. Passages are never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Passage {
    /// Content-derived identifier, see [`Passage::new`].
    pub id: String,
    /// The passage text.
    pub content: String,
    /// Display name of the source document.
    pub source: String,
    /// 1-based page number within the source document.
    pub page: u32,
    /// Position of this passage within its page, restarting at 0 per page.
    pub chunk_index: usize,
    /// Offset of the first character of `content` within the page text, in chars.
    pub char_offset: usize,
}

impl Passage {
    /// Create a passage. The id is the SHA-256 of source, page, chunk index,
    /// and content, so identical passages from the same document always map
    /// to the same id.
    pub fn new(
        content: impl Into<String>,
        source: impl Into<String>,
        page: u32,
        chunk_index: usize,
        char_offset: usize,
    ) -> Self {
        let content = content.into();
        let source = source.into();

        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hasher.update([0]);
        hasher.update(page.to_le_bytes());
        hasher.update((chunk_index as u64).to_le_bytes());
        hasher.update([0]);
        hasher.update(content.as_bytes());
        let id = format!("{:x}", hasher.finalize());

        Self { id, content, source, page, chunk_index, char_offset }
    }

    /// The `[Source: <name>, Page: <n>]` tag for this passage.
    pub fn citation(&self) -> String {
        format!("[Source: {}, Page: {}]", self.source, self.page)
    }

    /// Length of the content in characters.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// A [`Passage`] together with its embedding, as handed to a vector store.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedPassage {
    /// The passage being stored.
    pub passage: Passage,
    /// The vector embedding of `passage.content`.
    pub embedding: Vec<f32>,
}

/// A stored [`Passage`] paired with its similarity to a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The matching passage.
    pub passage: Passage,
    /// Cosine similarity to the query embedding (higher is more relevant).
    pub score: f32,
}

/// Hex-encoded SHA-256 digest of `bytes`.
pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
