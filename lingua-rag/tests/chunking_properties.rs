//! Property tests for page normalisation and chunking.

use lingua_rag::{Chunker, Page, RecursiveChunker, normalize_page_text};
use proptest::prelude::*;

/// Text shaped like extracted PDF pages: words, hyphens, and ragged line breaks.
fn arb_page_text() -> impl Strategy<Value = String> {
    "[a-z \\n.-]{0,400}"
}

/// Long prose-like text with occasional sentence and paragraph breaks.
fn arb_long_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(("[a-z]{1,12}", prop_oneof![8 => Just(" "), 2 => Just(". "), 1 => Just("\n\n")]), 0..1500)
        .prop_map(|words| words.into_iter().map(|(w, sep)| format!("{w}{sep}")).collect())
}

mod prop_normalisation {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn normalisation_is_idempotent(raw in arb_page_text()) {
            let once = normalize_page_text(&raw);
            prop_assert_eq!(normalize_page_text(&once), once);
        }

        #[test]
        fn normalised_text_has_no_single_line_breaks(raw in arb_page_text()) {
            let text = normalize_page_text(&raw);
            let without_paragraphs = text.replace("\n\n", "");
            prop_assert!(!without_paragraphs.contains('\n'));
            prop_assert!(!text.contains("\n\n\n"));
        }
    }
}

mod prop_chunking {
    use super::*;

    const SIZE: usize = 4000;
    const OVERLAP: usize = 200;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Passages respect the size limit, overlap by at least the configured
        /// amount, and together cover the page exactly.
        #[test]
        fn passages_cover_the_page_with_bounded_size_and_overlap(text in arb_long_text()) {
            let chunker = RecursiveChunker::new(SIZE, OVERLAP);
            let page = Page { text: text.clone(), number: 7, source: "lecture.pdf".into() };
            let passages = chunker.chunk_page(&page);
            let chars: Vec<char> = text.chars().collect();

            if chars.is_empty() {
                prop_assert!(passages.is_empty());
                return Ok(());
            }

            prop_assert_eq!(passages[0].char_offset, 0);
            let last = passages.last().unwrap();
            prop_assert_eq!(last.char_offset + last.char_len(), chars.len());

            for (i, passage) in passages.iter().enumerate() {
                prop_assert!(passage.char_len() <= SIZE);
                prop_assert_eq!(passage.chunk_index, i);
                prop_assert_eq!(passage.page, 7);
                prop_assert_eq!(passage.source.as_str(), "lecture.pdf");

                let slice: String =
                    chars[passage.char_offset..passage.char_offset + passage.char_len()].iter().collect();
                prop_assert_eq!(&slice, &passage.content);
            }

            // Concatenating passages minus their overlaps rebuilds the page.
            let mut rebuilt: Vec<char> = Vec::with_capacity(chars.len());
            for window in passages.windows(2) {
                let end = window[0].char_offset + window[0].char_len();
                prop_assert!(window[1].char_offset > window[0].char_offset);
                prop_assert!(end >= window[1].char_offset + OVERLAP);
            }
            for passage in &passages {
                let skip = rebuilt.len() - passage.char_offset;
                rebuilt.extend(passage.content.chars().skip(skip));
            }
            prop_assert_eq!(rebuilt.into_iter().collect::<String>(), text);
        }
    }
}
