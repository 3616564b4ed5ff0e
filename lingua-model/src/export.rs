//! Deterministic text renderings of a [`StudyMaterial`].

use std::fmt::Write;

use crate::study::{Flashcard, StudyMaterial};

/// Tab-separated flashcards, one card per line, for Quizlet import.
///
/// Tabs and line breaks inside a field become spaces so every card stays on
/// one line.
pub fn flashcards_to_tsv(flashcards: &[Flashcard]) -> String {
    let clean = |field: &str| field.replace(['\t', '\r', '\n'], " ");
    flashcards.iter().map(|card| format!("{}\t{}\n", clean(&card.front), clean(&card.back))).collect()
}

/// Flashcards as CSV with a `Front,Back` header and CRLF line endings.
pub fn flashcards_to_csv(flashcards: &[Flashcard]) -> String {
    let mut out = String::from("Front,Back\r\n");
    for card in flashcards {
        out.push_str(&csv_field(&card.front));
        out.push(',');
        out.push_str(&csv_field(&card.back));
        out.push_str("\r\n");
    }
    out
}

/// Quote a field if it contains a delimiter, a quote or a line break.
fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// The whole record as a Markdown document.
pub fn to_markdown(material: &StudyMaterial) -> String {
    let mut out = format!("# {}\n", material.title);

    for (heading, body) in material.study_guide.sections() {
        let _ = write!(out, "\n## {heading}\n\n{body}\n");
    }

    if !material.flashcards.is_empty() {
        out.push_str("\n## Flashcards\n");
        for (i, card) in material.flashcards.iter().enumerate() {
            let _ = write!(out, "\n**Card {}**\n\n- Front: {}\n- Back: {}\n", i + 1, card.front, card.back);
        }
    }

    if !material.exercises.is_empty() {
        out.push_str("\n## Exercises\n");
        for (i, exercise) in material.exercises.iter().enumerate() {
            let _ = write!(
                out,
                "\n**Exercise {}**\n\n{}\n\n*Solution:* {}\n",
                i + 1,
                exercise.question,
                exercise.solution
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::study::{Exercise, StudyGuide};

    fn card(front: &str, back: &str) -> Flashcard {
        Flashcard { front: front.into(), back: back.into() }
    }

    #[test]
    fn tsv_keeps_each_card_on_one_line() {
        let tsv = flashcards_to_tsv(&[card("Lemma\tform", "Dictionary\nform"), card("POS", "Tag")]);
        assert_eq!(tsv, "Lemma form\tDictionary form\nPOS\tTag\n");
    }

    #[test]
    fn csv_quotes_only_when_needed() {
        let csv = flashcards_to_csv(&[
            card("Token", "A unit of text"),
            card("Say \"hi\"", "greeting, informal"),
            card("Multi", "line\nanswer"),
        ]);
        assert_eq!(
            csv,
            "Front,Back\r\n\
             Token,A unit of text\r\n\
             \"Say \"\"hi\"\"\",\"greeting, informal\"\r\n\
             Multi,\"line\nanswer\"\r\n"
        );
    }

    #[test]
    fn csv_of_no_cards_is_just_the_header() {
        assert_eq!(flashcards_to_csv(&[]), "Front,Back\r\n");
    }

    #[test]
    fn markdown_lists_every_section_card_and_exercise() {
        let material = StudyMaterial {
            title: "Syntax Study Guide".into(),
            study_guide: StudyGuide {
                overview: "o".into(),
                core_concepts: "c".into(),
                technical_details: "t".into(),
                practical_applications: "p".into(),
                challenges: "ch".into(),
                future_directions: "f".into(),
            },
            flashcards: vec![card("Q", "A")],
            exercises: vec![Exercise { question: "Parse it".into(), solution: "S -> NP VP".into() }],
        };
        let md = to_markdown(&material);
        assert!(md.starts_with("# Syntax Study Guide\n"));
        assert_eq!(md.matches("\n## ").count(), 8);
        assert!(md.contains("**Card 1**"));
        assert!(md.contains("*Solution:* S -> NP VP"));
    }
}
