//! The study-material record and its output schema.
//!
//! A [`StudyMaterial`] is produced in one structured generation call and is
//! immutable afterwards. Responses are parsed with [`StudyMaterial::from_json`],
//! which rejects any response missing a required field, then capped to
//! [`MAX_FLASHCARDS`] flashcards and [`MAX_EXERCISES`] exercises.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{ModelError, Result};

/// Maximum number of flashcards kept in a record.
pub const MAX_FLASHCARDS: usize = 12;

/// Maximum number of exercises kept in a record.
pub const MAX_EXERCISES: usize = 4;

/// Name under which the schema is registered with the generation service.
pub const SCHEMA_NAME: &str = "study_materials_response";

/// A generated study pack for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyMaterial {
    /// Title of the study pack.
    pub title: String,
    /// The six-section study guide.
    pub study_guide: StudyGuide,
    /// Question/answer cards, at most [`MAX_FLASHCARDS`].
    pub flashcards: Vec<Flashcard>,
    /// Worked exercises, at most [`MAX_EXERCISES`].
    pub exercises: Vec<Exercise>,
}

/// University-level study guide split into fixed sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyGuide {
    /// Overview and introduction.
    pub overview: String,
    /// Core concepts and fundamentals.
    pub core_concepts: String,
    /// Technical details and methodology.
    pub technical_details: String,
    /// Practical applications.
    pub practical_applications: String,
    /// Challenges and limitations.
    pub challenges: String,
    /// Future directions and trends.
    pub future_directions: String,
}

impl StudyGuide {
    /// Sections paired with their display headings, in reading order.
    pub fn sections(&self) -> [(&'static str, &str); 6] {
        [
            ("Overview and Introduction", self.overview.as_str()),
            ("Core Concepts and Fundamentals", self.core_concepts.as_str()),
            ("Technical Details and Methodology", self.technical_details.as_str()),
            ("Practical Applications", self.practical_applications.as_str()),
            ("Challenges and Limitations", self.challenges.as_str()),
            ("Future Directions and Trends", self.future_directions.as_str()),
        ]
    }
}

/// One flashcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    /// Prompt side.
    pub front: String,
    /// Answer side.
    pub back: String,
}

/// One exercise with its worked solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    /// The task.
    pub question: String,
    /// The worked solution.
    pub solution: String,
}

impl StudyMaterial {
    /// Parse and validate a structured response.
    ///
    /// Every field of the schema is required; a response missing any of them,
    /// or carrying the wrong type, is rejected as a whole. Caps are applied to
    /// the returned record.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Schema`] if the response does not conform.
    pub fn from_json(raw: &str) -> Result<Self> {
        let material: Self = serde_json::from_str(raw)
            .map_err(|e| ModelError::Schema(format!("invalid study material: {e}")))?;
        if material.title.trim().is_empty() {
            return Err(ModelError::Schema("study material has an empty title".into()));
        }
        Ok(material.enforce_caps())
    }

    /// Truncate flashcards and exercises to their caps, keeping the first ones.
    pub fn enforce_caps(mut self) -> Self {
        self.flashcards.truncate(MAX_FLASHCARDS);
        self.exercises.truncate(MAX_EXERCISES);
        self
    }

    /// JSON Schema for strict structured output.
    pub fn json_schema() -> Value {
        fn object(properties: Value, required: &[&str]) -> Value {
            json!({
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false,
            })
        }

        let text = json!({ "type": "string" });

        object(
            json!({
                "title": text,
                "study_guide": object(
                    json!({
                        "overview": text,
                        "core_concepts": text,
                        "technical_details": text,
                        "practical_applications": text,
                        "challenges": text,
                        "future_directions": text,
                    }),
                    &[
                        "overview",
                        "core_concepts",
                        "technical_details",
                        "practical_applications",
                        "challenges",
                        "future_directions",
                    ],
                ),
                "flashcards": {
                    "type": "array",
                    "items": object(json!({ "front": text, "back": text }), &["front", "back"]),
                },
                "exercises": {
                    "type": "array",
                    "items": object(
                        json!({ "question": text, "solution": text }),
                        &["question", "solution"],
                    ),
                },
            }),
            &["title", "study_guide", "flashcards", "exercises"],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(flashcards: usize, exercises: usize) -> Value {
        json!({
            "title": "Tokenization Study Guide",
            "study_guide": {
                "overview": "o",
                "core_concepts": "c",
                "technical_details": "t",
                "practical_applications": "p",
                "challenges": "ch",
                "future_directions": "f",
            },
            "flashcards": (0..flashcards)
                .map(|i| json!({ "front": format!("Q{i}"), "back": format!("A{i}") }))
                .collect::<Vec<_>>(),
            "exercises": (0..exercises)
                .map(|i| json!({ "question": format!("E{i}"), "solution": format!("S{i}") }))
                .collect::<Vec<_>>(),
        })
    }

    #[test]
    fn twenty_flashcards_are_truncated_to_twelve() {
        let material = StudyMaterial::from_json(&response(20, 9).to_string()).unwrap();
        assert_eq!(material.flashcards.len(), MAX_FLASHCARDS);
        assert_eq!(material.flashcards[11].front, "Q11");
        assert_eq!(material.exercises.len(), MAX_EXERCISES);
    }

    #[test]
    fn fewer_items_than_the_caps_are_kept() {
        let material = StudyMaterial::from_json(&response(3, 1).to_string()).unwrap();
        assert_eq!(material.flashcards.len(), 3);
        assert_eq!(material.exercises.len(), 1);
    }

    #[test]
    fn missing_exercises_are_rejected() {
        let mut value = response(2, 2);
        value.as_object_mut().unwrap().remove("exercises");
        let err = StudyMaterial::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, ModelError::Schema(_)));
    }

    #[test]
    fn missing_guide_section_is_rejected() {
        let mut value = response(2, 2);
        value["study_guide"].as_object_mut().unwrap().remove("challenges");
        assert!(StudyMaterial::from_json(&value.to_string()).is_err());
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(StudyMaterial::from_json("{\"title\": "), Err(ModelError::Schema(_))));
    }

    #[test]
    fn schema_requires_every_field() {
        let schema = StudyMaterial::json_schema();
        assert_eq!(schema["required"].as_array().unwrap().len(), 4);
        assert_eq!(schema["properties"]["study_guide"]["required"].as_array().unwrap().len(), 6);
        assert_eq!(schema["additionalProperties"], json!(false));
        assert_eq!(
            schema["properties"]["flashcards"]["items"]["required"],
            json!(["front", "back"])
        );
    }

    #[test]
    fn sections_follow_reading_order() {
        let material = StudyMaterial::from_json(&response(0, 0).to_string()).unwrap();
        let headings: Vec<&str> = material.study_guide.sections().iter().map(|(h, _)| *h).collect();
        assert_eq!(headings[0], "Overview and Introduction");
        assert_eq!(headings[5], "Future Directions and Trends");
    }
}
