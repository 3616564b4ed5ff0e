//! Keyword-based relevance filter.
//!
//! One canonical keyword set backs two admission modes:
//!
//! - [`RelevanceFilter::admits`] checks whole documents with case-insensitive
//!   *substring* matching. It is permissive: `"language"` also
//!   matches `"languages"` and `"nlp"` matches inside unrelated words, so some
//!   unrelated documents get through.
//! - [`RelevanceFilter::matches_topic`] checks free-text topics with exact,
//!   lower-cased *word* matching. Multi-word keywords match when their words
//!   appear consecutively in the topic.

use std::collections::BTreeSet;

use crate::document::Page;

/// The domain vocabulary shared by document admission and topic gating.
pub const NLP_KEYWORDS: &[&str] = &[
    "tokenization",
    "linguistics",
    "language",
    "parsing",
    "syntax",
    "semantics",
    "nlp",
    "natural language processing",
    "computational linguistics",
    "text analysis",
    "language model",
    "machine translation",
    "sentiment analysis",
    "named entity recognition",
    "part of speech",
    "morphology",
    "phonetics",
    "phonology",
    "pragmatics",
    "corpus",
];

/// Binary admission test over a fixed keyword set.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    keywords: Vec<String>,
    keyword_tokens: Vec<Vec<String>>,
}

impl Default for RelevanceFilter {
    fn default() -> Self {
        Self::new(NLP_KEYWORDS.iter().copied())
    }
}

impl RelevanceFilter {
    /// Create a filter over the given keywords. Keywords are lower-cased and
    /// deduplicated; iteration order is fixed so results are deterministic.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let keyword_tokens = keywords.iter().map(|k| tokenize(k)).collect();
        Self { keywords, keyword_tokens }
    }

    /// The canonical keyword list, lower-cased and sorted.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Document admission: true if any page contains any keyword as a
    /// case-insensitive substring. Pages are scanned in order and the scan
    /// stops at the first match.
    pub fn admits(&self, pages: &[Page]) -> bool {
        pages.iter().any(|page| self.text_matches(&page.text))
    }

    /// Substring test for a single piece of text.
    pub fn text_matches(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.keywords.iter().any(|keyword| lower.contains(keyword.as_str()))
    }

    /// Topic gate: true if the topic contains any keyword as whole words.
    pub fn matches_topic(&self, topic: &str) -> bool {
        let words = tokenize(topic);
        self.keyword_tokens.iter().any(|keyword| {
            !keyword.is_empty() && words.windows(keyword.len()).any(|window| window == keyword.as_slice())
        })
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(text: &str, number: u32) -> Page {
        Page { text: text.to_string(), number, source: "doc.pdf".to_string() }
    }

    #[test]
    fn admits_document_with_keyword_on_any_page() {
        let filter = RelevanceFilter::default();
        let pages = vec![page("Cooking pasta at home.", 1), page("A note on Tokenization.", 2)];
        assert!(filter.admits(&pages));
    }

    #[test]
    fn rejects_document_without_keywords() {
        let filter = RelevanceFilter::default();
        let pages = vec![page("Boil water, add salt.", 1), page("Serve warm.", 2)];
        assert!(!filter.admits(&pages));
        assert!(!filter.admits(&[]));
    }

    #[test]
    fn substring_mode_is_permissive() {
        let filter = RelevanceFilter::default();
        // "languages" contains "language"; "corpuscle" contains "corpus".
        assert!(filter.text_matches("Many languages are spoken here."));
        assert!(filter.text_matches("A red blood corpuscle."));
    }

    #[test]
    fn topic_mode_requires_whole_words() {
        let filter = RelevanceFilter::default();
        assert!(filter.matches_topic("Introduction to Syntax"));
        assert!(filter.matches_topic("how does machine translation work?"));
        assert!(!filter.matches_topic("corpuscles in blood"));
        assert!(!filter.matches_topic("machine learning for translation"));
        assert!(!filter.matches_topic(""));
    }

    #[test]
    fn both_modes_share_one_keyword_set() {
        let filter = RelevanceFilter::new(["Pragmatics", "pragmatics", " "]);
        assert_eq!(filter.keywords(), ["pragmatics"]);
        assert!(filter.text_matches("PRAGMATICS"));
        assert!(filter.matches_topic("pragmatics"));
        assert!(!filter.matches_topic("syntax"));
    }
}
