//! Subcommands against a SQLite index in a temporary directory, with local
//! embeddings and a scripted gateway.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lingua_cli::App;
use lingua_cli::commands;
use lingua_cli::config::{EmbeddingProviderKind, LinguaConfig};
use async_trait::async_trait;
use lingua_model::{MockGateway, StudyMaterial};
use lingua_rag::{EmbeddingProvider, HashingEmbeddingProvider, RagError};
use serde_json::json;
use tempfile::TempDir;

fn config(dir: &Path) -> LinguaConfig {
    let mut config = LinguaConfig::default();
    config.storage.path = dir.join("index.db");
    config.embedding.provider = EmbeddingProviderKind::Hashing;
    config
}

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

fn corpus(dir: &TempDir) -> Vec<PathBuf> {
    vec![
        write(
            dir.path(),
            "nlp.txt",
            "Natural language processing studies how computers handle human language.\x0c\
             Tokenization splits text into words and subwords.",
        ),
        write(dir.path(), "recipes.txt", "Whisk the eggs and fold in the flour."),
        dir.path().join("missing.pdf"),
    ]
}

fn study_json() -> String {
    json!({
        "title": "Tokenization Study Guide",
        "study_guide": {
            "overview": "o", "core_concepts": "c", "technical_details": "t",
            "practical_applications": "p", "challenges": "ch", "future_directions": "f",
        },
        "flashcards": (0..20)
            .map(|i| json!({ "front": format!("Term, {i}"), "back": format!("Definition {i}") }))
            .collect::<Vec<_>>(),
        "exercises": [{ "question": "Tokenize this.", "solution": "this ." }],
    })
    .to_string()
}

#[tokio::test]
async fn ingest_reports_admitted_and_flagged_files() {
    let dir = TempDir::new().unwrap();
    let app = App::new(config(dir.path()));
    let mut out = Vec::new();

    let report = commands::ingest(&app, &corpus(&dir), &mut out).await.unwrap();
    let out = String::from_utf8(out).unwrap();

    assert_eq!(report.admitted(), ["nlp.txt"]);
    assert_eq!(report.flagged(), ["recipes.txt"]);
    assert!(report.inserted >= 2);
    assert!(out.contains("Flagged files: recipes.txt, missing.pdf"), "{out}");
    assert!(out.contains("new passage(s) stored in collection `nlp_documents`"));
}

/// Embedding service that is always unreachable.
struct DownEmbedder;

#[async_trait]
impl EmbeddingProvider for DownEmbedder {
    async fn embed(&self, _text: &str) -> lingua_rag::Result<Vec<f32>> {
        Err(RagError::EmbeddingError { provider: "down".into(), message: "offline".into() })
    }

    fn dimensions(&self) -> usize {
        HashingEmbeddingProvider::default().dimensions()
    }
}

#[tokio::test]
async fn failed_ingest_still_reports_flagged_files_and_releases_the_index() {
    let dir = TempDir::new().unwrap();
    let app = App::new(config(dir.path())).with_embedder(Arc::new(DownEmbedder));
    let mut out = Vec::new();

    let err = commands::ingest(&app, &corpus(&dir), &mut out).await.unwrap_err();
    let out = String::from_utf8(out).unwrap();

    assert!(format!("{err:#}").contains("offline"), "{err:#}");
    assert!(out.contains("flagged   recipes.txt (not about NLP or linguistics)"), "{out}");
    assert!(out.contains("Flagged files: recipes.txt, missing.pdf"), "{out}");
    assert!(!out.contains("admitted"), "{out}");

    let stored = commands::stats(&App::new(config(dir.path())), &mut io::sink()).await.unwrap();
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn reingesting_after_restart_stores_nothing_new() {
    let dir = TempDir::new().unwrap();
    let files = corpus(&dir);

    let first = commands::ingest(&App::new(config(dir.path())), &files, &mut io::sink())
        .await
        .unwrap();
    let second = commands::ingest(&App::new(config(dir.path())), &files, &mut io::sink())
        .await
        .unwrap();

    assert_eq!(second.inserted, 0);
    let stored = commands::stats(&App::new(config(dir.path())), &mut io::sink()).await.unwrap();
    assert_eq!(stored, first.inserted);
}

#[tokio::test]
async fn stats_without_index_does_not_create_one() {
    let dir = TempDir::new().unwrap();
    let app = App::new(config(dir.path()));
    assert_eq!(commands::stats(&app, &mut io::sink()).await.unwrap(), 0);
    assert!(!dir.path().join("index.db").exists());
}

#[tokio::test]
async fn reset_requires_confirmation() {
    let dir = TempDir::new().unwrap();
    let app = App::new(config(dir.path()));
    commands::ingest(&app, &corpus(&dir), &mut io::sink()).await.unwrap();

    assert!(commands::reset(&app, false, &mut io::sink()).await.is_err());
    assert!(commands::stats(&app, &mut io::sink()).await.unwrap() > 0);

    commands::reset(&app, true, &mut io::sink()).await.unwrap();
    assert_eq!(commands::stats(&app, &mut io::sink()).await.unwrap(), 0);
}

#[tokio::test]
async fn ask_streams_answer_and_lists_sources() {
    let dir = TempDir::new().unwrap();
    let gateway = Arc::new(
        MockGateway::new().with_chat_segments(["Tokenization ", "splits text."]),
    );
    let app = App::new(config(dir.path())).with_gateway(gateway.clone());
    commands::ingest(&app, &corpus(&dir), &mut io::sink()).await.unwrap();

    let mut out = Vec::new();
    let answer = commands::ask(&app, "what is tokenization", &mut out).await.unwrap();
    let out = String::from_utf8(out).unwrap();

    assert_eq!(answer.text, "Tokenization splits text.");
    assert!(out.starts_with("Tokenization splits text."));
    assert!(out.contains("Sources:\n  [Source: nlp.txt, Page: "), "{out}");
    assert!(gateway.chat_requests()[0].context.contains("[Source: nlp.txt"));
}

#[tokio::test]
async fn study_writes_json_and_flashcard_exports() {
    let dir = TempDir::new().unwrap();
    let gateway = Arc::new(MockGateway::new().with_study_response(study_json()));
    let app = App::new(config(dir.path())).with_gateway(gateway);
    commands::ingest(&app, &corpus(&dir), &mut io::sink()).await.unwrap();

    let output = dir.path().join("out");
    let paths = commands::study(&app, "tokenization", &output, true, &mut io::sink())
        .await
        .unwrap();
    assert_eq!(paths.len(), 4);

    let names: Vec<String> =
        paths.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
    assert!(names.iter().all(|name| name.starts_with("NLP_material_")));
    assert!(names[0].ends_with(".json"));
    assert!(names[1].ends_with("_quizlet.txt"));
    assert!(names[2].ends_with("_flashcards.csv"));
    assert!(names[3].ends_with(".md"));

    let material: StudyMaterial =
        serde_json::from_str(&std::fs::read_to_string(&paths[0]).unwrap()).unwrap();
    assert_eq!(material.flashcards.len(), 12);

    let tsv = std::fs::read_to_string(&paths[1]).unwrap();
    assert_eq!(tsv.lines().count(), 12);
    let csv = std::fs::read_to_string(&paths[2]).unwrap();
    assert!(csv.starts_with("Front,Back\r\n\"Term, 0\",Definition 0\r\n"));
}

#[tokio::test]
async fn off_topic_study_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let app = App::new(config(dir.path())).with_gateway(Arc::new(MockGateway::new()));
    let output = dir.path().join("out");

    let err = commands::study(&app, "medieval siege warfare", &output, false, &mut io::sink())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("medieval siege warfare"));
    assert!(!output.exists());
}

#[tokio::test]
async fn eval_scores_cases_from_a_file_and_writes_the_report() {
    let dir = TempDir::new().unwrap();
    let gateway = Arc::new(
        MockGateway::new()
            .with_chat_segments(["Tokenization splits text into words."])
            .with_chat_segments(["It is about cooking."]),
    );
    let app = App::new(config(dir.path())).with_gateway(gateway.clone());
    commands::ingest(&app, &corpus(&dir), &mut io::sink()).await.unwrap();

    let cases = write(
        dir.path(),
        "cases.json",
        r#"[{"question": "What does tokenization do?", "reference": "Tokenization splits text into words and subwords."}]"#,
    );
    let output = dir.path().join("report.json");
    let mut out = Vec::new();
    let report = commands::eval(&app, Some(&cases), true, Some(&output), &mut out).await.unwrap();
    let out = String::from_utf8(out).unwrap();

    assert_eq!(report.cases.len(), 1);
    assert!(report.rag.rouge_1.f1 > report.baseline.unwrap().rouge_1.f1);
    assert!(out.contains("What does tokenization do?\n  rag     ROUGE-1 f="), "{out}");
    assert!(out.contains("  no rag  ROUGE-1 f="), "{out}");
    assert!(out.contains("Mean over 1 question(s):"), "{out}");

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["cases"][0]["rag"]["answer"], "Tokenization splits text into words.");
    assert!(gateway.chat_requests()[0].context.contains("[Source: nlp.txt"));
}

#[tokio::test]
async fn eval_defaults_to_the_glossary() {
    let dir = TempDir::new().unwrap();
    let app = App::new(config(dir.path())).with_gateway(Arc::new(MockGateway::new()));

    let report = commands::eval(&app, None, false, None, &mut io::sink()).await.unwrap();
    assert_eq!(report.cases.len(), 5);
    assert_eq!(report.cases[0].question, "How would you define accent?");
    assert!(report.baseline.is_none());
}

#[tokio::test]
async fn eval_rejects_an_empty_case_file() {
    let dir = TempDir::new().unwrap();
    let app = App::new(config(dir.path())).with_gateway(Arc::new(MockGateway::new()));
    let cases = write(dir.path(), "cases.json", "[]");

    let err = commands::eval(&app, Some(&cases), false, None, &mut io::sink()).await.unwrap_err();
    assert!(err.to_string().contains("holds no evaluation cases"), "{err}");
}
