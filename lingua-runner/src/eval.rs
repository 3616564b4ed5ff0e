//! Answer quality against reference definitions.
//!
//! Each case is asked twice: once grounded on the index and, optionally, once
//! with retrieval switched off. Both answers are scored with ROUGE-1, ROUGE-2
//! and ROUGE-L against the reference. Text is lowercased and split on
//! anything that is not a letter or digit before scoring.

use std::collections::HashMap;
use std::sync::Arc;

use lingua_model::GenerationGateway;
use lingua_rag::Retriever;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::chat::ChatSession;
use crate::error::{Result, RunnerError};
use crate::prompts::EVAL_SYSTEM_PROMPT;

/// A question with the answer it should get.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalCase {
    pub question: String,
    pub reference: String,
}

impl EvalCase {
    pub fn new(question: impl Into<String>, reference: impl Into<String>) -> Self {
        Self { question: question.into(), reference: reference.into() }
    }
}

/// Five definitions from a linguistics glossary.
pub fn glossary_cases() -> Vec<EvalCase> {
    vec![
        EvalCase::new(
            "How would you define accent?",
            "Pronunciation, especially that associated with a particular regional or social group.",
        ),
        EvalCase::new(
            "How would you define classifier?",
            "A morpheme that is used to grammatically individuate mass nouns or specify a \
             subclass of nouns in a language, often on the basis of some semantic property of \
             the noun. In the Mandarin Chinese examples wǔ-ge rén 'five persons' and nèi-zhāng \
             zhǐ 'that (sheet of) paper,' the suffixes -ge and -zhang are classifiers which \
             specify units of people and paper, respectively.",
        ),
        EvalCase::new(
            "How would you define nucleus?",
            "The sonority peak of a syllable, usually the vowel.",
        ),
        EvalCase::new(
            "How would you define phoneme?",
            "One of the contrastive sounds of a language; a label for a group of sounds that are \
             perceived by the speaker to be the same.",
        ),
        EvalCase::new(
            "How would you define treebank?",
            "A corpus of sentences in a language that has been analyzed into parse trees.",
        ),
    ]
}

/// Precision, recall and F1 of one ROUGE variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rouge {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl Rouge {
    fn from_overlap(overlap: usize, candidate_len: usize, reference_len: usize) -> Self {
        if overlap == 0 {
            return Self::default();
        }
        let precision = overlap as f64 / candidate_len as f64;
        let recall = overlap as f64 / reference_len as f64;
        Self { precision, recall, f1: 2.0 * precision * recall / (precision + recall) }
    }

    /// Shared n-grams, each counted at most as often as it occurs in both.
    pub fn n_gram(reference: &str, candidate: &str, n: usize) -> Self {
        let (reference, candidate) = (tokens(reference), tokens(candidate));
        let reference = n_grams(&reference, n);
        let candidate = n_grams(&candidate, n);
        let reference_len: usize = reference.values().sum();
        let candidate_len: usize = candidate.values().sum();
        let overlap = candidate
            .iter()
            .map(|(gram, count)| (*count).min(reference.get(gram).copied().unwrap_or(0)))
            .sum();
        Self::from_overlap(overlap, candidate_len, reference_len)
    }

    /// Longest common subsequence of the two token sequences.
    pub fn longest_common_subsequence(reference: &str, candidate: &str) -> Self {
        let reference = tokens(reference);
        let candidate = tokens(candidate);
        Self::from_overlap(lcs_len(&reference, &candidate), candidate.len(), reference.len())
    }

    fn mean<'a>(scores: impl Iterator<Item = &'a Rouge>) -> Self {
        let (mut sum, mut count) = (Self::default(), 0usize);
        for score in scores {
            sum.precision += score.precision;
            sum.recall += score.recall;
            sum.f1 += score.f1;
            count += 1;
        }
        if count == 0 {
            return sum;
        }
        let n = count as f64;
        Self { precision: sum.precision / n, recall: sum.recall / n, f1: sum.f1 / n }
    }
}

/// ROUGE-1, ROUGE-2 and ROUGE-L of one answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RougeScores {
    pub rouge_1: Rouge,
    pub rouge_2: Rouge,
    pub rouge_l: Rouge,
}

impl RougeScores {
    /// Score `candidate` against `reference`. An empty candidate scores zero.
    pub fn compute(reference: &str, candidate: &str) -> Self {
        Self {
            rouge_1: Rouge::n_gram(reference, candidate, 1),
            rouge_2: Rouge::n_gram(reference, candidate, 2),
            rouge_l: Rouge::longest_common_subsequence(reference, candidate),
        }
    }

    fn mean<'a>(scores: impl Iterator<Item = &'a RougeScores> + Clone) -> Self {
        Self {
            rouge_1: Rouge::mean(scores.clone().map(|s| &s.rouge_1)),
            rouge_2: Rouge::mean(scores.clone().map(|s| &s.rouge_2)),
            rouge_l: Rouge::mean(scores.map(|s| &s.rouge_l)),
        }
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn n_grams(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut grams = HashMap::new();
    if n == 0 {
        return grams;
    }
    for gram in tokens.windows(n) {
        *grams.entry(gram).or_insert(0) += 1;
    }
    grams
}

fn lcs_len(a: &[String], b: &[String]) -> usize {
    let mut row = vec![0usize; b.len() + 1];
    for x in a {
        let mut diagonal = 0;
        for (j, y) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if x == y { diagonal + 1 } else { above.max(row[j]) };
            diagonal = above;
        }
    }
    row[b.len()]
}

/// One answer and its scores. A failed or empty answer has no text and
/// scores zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerScore {
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub scores: RougeScores,
}

/// Results for one case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseReport {
    pub question: String,
    pub reference: String,
    /// Answer grounded on retrieved passages.
    pub rag: AnswerScore,
    /// Answer without retrieval, when asked for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<AnswerScore>,
}

/// Per-case results and their means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalReport {
    pub cases: Vec<CaseReport>,
    pub rag: RougeScores,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<RougeScores>,
}

/// Runs [`EvalCase`]s through fresh chat sessions.
///
/// Every question starts a new session, so answers never see earlier cases.
pub struct Evaluator {
    gateway: Arc<dyn GenerationGateway>,
    retriever: Retriever,
    with_baseline: bool,
}

impl Evaluator {
    pub fn new(gateway: Arc<dyn GenerationGateway>, retriever: Retriever) -> Self {
        Self { gateway, retriever, with_baseline: false }
    }

    /// Also answer every case without retrieval.
    pub fn with_baseline(mut self, with_baseline: bool) -> Self {
        self.with_baseline = with_baseline;
        self
    }

    /// Ask and score every case in order.
    ///
    /// # Errors
    ///
    /// [`RunnerError::EmptyInput`] when there are no cases, and
    /// [`RunnerError::Generation`] when `cancel` fires. Other generation
    /// failures are recorded in the case and score zero.
    pub async fn run(&self, cases: &[EvalCase], cancel: CancellationToken) -> Result<EvalReport> {
        if cases.is_empty() {
            return Err(RunnerError::EmptyInput);
        }

        let mut reports = Vec::with_capacity(cases.len());
        for case in cases {
            let rag = self.answer(case, self.retriever.clone(), &cancel).await?;
            let baseline = if self.with_baseline {
                Some(self.answer(case, Retriever::new(None), &cancel).await?)
            } else {
                None
            };
            reports.push(CaseReport {
                question: case.question.clone(),
                reference: case.reference.clone(),
                rag,
                baseline,
            });
        }

        let rag = RougeScores::mean(reports.iter().map(|r| &r.rag.scores));
        let baseline = self.with_baseline.then(|| {
            RougeScores::mean(reports.iter().filter_map(|r| r.baseline.as_ref()).map(|b| &b.scores))
        });
        info!(
            cases = reports.len(),
            rouge_1_f1 = rag.rouge_1.f1,
            baseline_rouge_1_f1 = baseline.map(|b| b.rouge_1.f1),
            "evaluation finished"
        );
        Ok(EvalReport { cases: reports, rag, baseline })
    }

    async fn answer(
        &self,
        case: &EvalCase,
        retriever: Retriever,
        cancel: &CancellationToken,
    ) -> Result<AnswerScore> {
        let mut session = ChatSession::new(self.gateway.clone(), retriever)
            .with_system_prompt(EVAL_SYSTEM_PROMPT);
        match session.ask(&case.question, None, cancel.clone()).await {
            Ok(answer) => {
                let text = answer.text.trim().to_string();
                let scores = RougeScores::compute(&case.reference, &text);
                Ok(AnswerScore { answer: Some(text), error: None, scores })
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                warn!(question = %case.question, error = %e, "no answer to score");
                Ok(AnswerScore {
                    answer: None,
                    error: Some(e.to_string()),
                    scores: RougeScores::default(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn identical_text_scores_one() {
        let reference = "The sonority peak of a syllable, usually the vowel.";
        let scores =
            RougeScores::compute(reference, "the SONORITY peak of a syllable usually the vowel");
        for rouge in [scores.rouge_1, scores.rouge_2, scores.rouge_l] {
            assert!(close(rouge.f1, 1.0), "{rouge:?}");
        }
    }

    #[test]
    fn empty_or_unrelated_answer_scores_zero() {
        let reference = "A corpus of sentences analyzed into parse trees.";
        assert_eq!(RougeScores::compute(reference, ""), RougeScores::default());
        assert_eq!(RougeScores::compute(reference, "Whisk the eggs."), RougeScores::default());
    }

    #[test]
    fn unigram_counts_are_clipped() {
        // "the" appears once in the reference, three times in the candidate.
        let rouge = Rouge::n_gram("the cat sat", "the the the cat", 1);
        assert!(close(rouge.precision, 2.0 / 4.0));
        assert!(close(rouge.recall, 2.0 / 3.0));
        assert!(close(rouge.f1, 2.0 * 0.5 * (2.0 / 3.0) / (0.5 + 2.0 / 3.0)));
    }

    #[test]
    fn bigrams_respect_word_order() {
        let forward = Rouge::n_gram("parse trees of sentences", "parse trees of sentences", 2);
        let reversed = Rouge::n_gram("parse trees of sentences", "sentences of trees parse", 2);
        assert!(close(forward.f1, 1.0));
        assert!(close(reversed.f1, 0.0));
    }

    #[test]
    fn lcs_skips_inserted_words() {
        let rouge = Rouge::longest_common_subsequence(
            "a label for a group of sounds",
            "a useful label for a large group of similar sounds",
        );
        assert!(close(rouge.recall, 1.0));
        assert!(close(rouge.precision, 7.0 / 10.0));
    }

    #[test]
    fn glossary_has_five_distinct_questions() {
        let cases = glossary_cases();
        assert_eq!(cases.len(), 5);
        let mut questions: Vec<&str> = cases.iter().map(|c| c.question.as_str()).collect();
        questions.sort_unstable();
        questions.dedup();
        assert_eq!(questions.len(), 5);
        assert!(cases.iter().all(|c| !c.reference.trim().is_empty()));
    }

    #[test]
    fn means_average_each_field() {
        let scores = [
            RougeScores {
                rouge_1: Rouge { precision: 1.0, recall: 0.5, f1: 0.6 },
                ..Default::default()
            },
            RougeScores::default(),
        ];
        let mean = RougeScores::mean(scores.iter());
        assert!(close(mean.rouge_1.precision, 0.5));
        assert!(close(mean.rouge_1.recall, 0.25));
        assert!(close(mean.rouge_1.f1, 0.3));
        assert_eq!(mean.rouge_l, Rouge::default());
    }
}
