//! Formatting retrieved passages into a cited context block.

use crate::document::Passage;

/// Separator between passage blocks.
const BLOCK_SEPARATOR: &str = "\n\n";

/// Format one passage as its content followed by a citation line.
pub fn format_passage(passage: &Passage) -> String {
    format!("{}\n{}", passage.content, passage.citation())
}

/// Join passages into one context string, in the given order.
///
/// Each block is the passage text followed by
/// `[Source: <document>, Page: <page>]`. No passages yield an empty string.
pub fn assemble_context<'a, I>(passages: I) -> String
where
    I: IntoIterator<Item = &'a Passage>,
{
    passages.into_iter().map(format_passage).collect::<Vec<_>>().join(BLOCK_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_gives_empty_context() {
        assert_eq!(assemble_context(std::iter::empty()), "");
    }

    #[test]
    fn every_passage_gets_a_citation() {
        let passages = vec![
            Passage::new("Syntax studies sentence structure.", "intro.pdf", 3, 0, 0),
            Passage::new("Phonology studies sound systems.", "sounds.pdf", 1, 2, 10),
        ];
        let context = assemble_context(&passages);
        assert_eq!(
            context,
            "Syntax studies sentence structure.\n[Source: intro.pdf, Page: 3]\n\n\
             Phonology studies sound systems.\n[Source: sounds.pdf, Page: 1]"
        );
    }

    #[test]
    fn order_is_preserved() {
        let a = Passage::new("first", "a.pdf", 1, 0, 0);
        let b = Passage::new("second", "b.pdf", 2, 0, 0);
        let context = assemble_context([&b, &a]);
        assert!(context.find("second").unwrap() < context.find("first").unwrap());
    }
}
