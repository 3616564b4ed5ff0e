//! Subcommand implementations.
//!
//! Each command writes its user-facing output to the given writer; logs go
//! through `tracing`.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Local;
use lingua_model::StudyMaterial;
use lingua_model::export::{flashcards_to_csv, flashcards_to_tsv, to_markdown};
use lingua_rag::{DocumentOutcome, IngestReport, RawDocument, RejectReason, RetrievalResult};
use lingua_runner::{
    AnswerScore, ChatAnswer, ChatSession, EvalCase, EvalReport, Evaluator, RougeScores,
    RunnerError, StudyMaterialGenerator, glossary_cases,
};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::app::{App, close_index};

/// Read `files` and add them to the index.
///
/// Files that cannot be read are reported as flagged alongside the
/// documents the pipeline rejects.
pub async fn ingest(app: &App, files: &[PathBuf], out: &mut impl Write) -> Result<IngestReport> {
    let mut documents = Vec::with_capacity(files.len());
    let mut unreadable = Vec::new();
    for path in files {
        let name = display_name(path);
        match tokio::fs::read(path).await {
            Ok(bytes) => documents.push(RawDocument::new(name, bytes)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read file");
                unreadable.push((name, e.to_string()));
            }
        }
    }

    let report = if documents.is_empty() {
        IngestReport::default()
    } else {
        let index = app.open_index().await?;
        let pipeline = app.pipeline(index.clone())?;
        let result = pipeline.ingest(documents).await;
        drop(pipeline);
        match result {
            Ok(report) => {
                close_index(index).await?;
                report
            }
            Err(e) => {
                write_report(out, &e.report, &unreadable)?;
                if let Err(close_error) = close_index(index).await {
                    warn!(error = %close_error, "failed to close index after ingestion error");
                }
                return Err(e.into());
            }
        }
    };

    write_report(out, &report, &unreadable)?;
    writeln!(
        out,
        "{} new passage(s) stored in collection `{}`.",
        report.inserted,
        app.config().rag.collection
    )?;
    Ok(report)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn write_report(out: &mut impl Write, report: &IngestReport, unreadable: &[(String, String)]) -> Result<()> {
    for document in &report.documents {
        writeln!(out, "{}", describe(&document.name, &document.outcome))?;
    }
    for (name, error) in unreadable {
        writeln!(out, "  flagged   {name} (unreadable: {error})")?;
    }

    let flagged = report.flagged();
    if !flagged.is_empty() || !unreadable.is_empty() {
        let mut names: Vec<&str> = flagged;
        names.extend(unreadable.iter().map(|(name, _)| name.as_str()));
        writeln!(out, "Flagged files: {}", names.join(", "))?;
    }
    Ok(())
}

fn describe(name: &str, outcome: &DocumentOutcome) -> String {
    match outcome {
        DocumentOutcome::Admitted { passages } => format!("  admitted  {name} ({passages} passages)"),
        DocumentOutcome::Rejected(RejectReason::NotRelevant) => {
            format!("  flagged   {name} (not about NLP or linguistics)")
        }
        DocumentOutcome::Rejected(RejectReason::ParseFailed(message)) => {
            format!("  flagged   {name} (could not be parsed: {message})")
        }
        DocumentOutcome::Cached(previous) => {
            let verdict = if previous.is_rejected() { "flagged" } else { "already indexed" };
            format!("  cached    {name} ({verdict})")
        }
    }
}

/// Answer one question, streaming it to `out`.
pub async fn ask(app: &App, question: &str, out: &mut impl Write) -> Result<ChatAnswer> {
    let mut session = ChatSession::new(app.gateway()?, app.retriever().await);
    let answer = answer_interruptibly(&mut session, question, out).await?;
    write_sources(out, &answer.retrieval)?;
    Ok(answer)
}

/// Interactive session. Ctrl-C cancels the answer in progress; Ctrl-D or
/// `exit` leaves.
pub async fn chat(app: &App) -> Result<()> {
    let mut session = ChatSession::new(app.gateway()?, app.retriever().await);
    let mut editor = DefaultEditor::new()?;
    let mut stdout = std::io::stdout();

    writeln!(stdout, "Ask anything about NLP and linguistics. Type `exit` or press Ctrl-D to leave.")?;
    loop {
        let line = match tokio::task::block_in_place(|| editor.readline("you> ")) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit") {
            break;
        }
        let _ = editor.add_history_entry(question);

        match answer_interruptibly(&mut session, question, &mut stdout).await {
            Ok(answer) => write_sources(&mut stdout, &answer.retrieval)?,
            Err(e) if e.is_cancelled() => writeln!(stdout, "\n[answer cancelled]")?,
            Err(e) => writeln!(stdout, "\nerror: {e}")?,
        }
        writeln!(stdout)?;
    }
    info!(turns = session.history().len(), "chat session ended");
    Ok(())
}

/// Stream an answer to `out` while Ctrl-C cancels it.
async fn answer_interruptibly(
    session: &mut ChatSession,
    question: &str,
    out: &mut impl Write,
) -> std::result::Result<ChatAnswer, RunnerError> {
    let (cancel, watcher) = cancel_on_ctrl_c();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let printer = async {
        while let Some(segment) = rx.recv().await {
            let _ = out.write_all(segment.as_bytes());
            let _ = out.flush();
        }
    };
    let (answer, ()) = tokio::join!(session.ask(question, Some(tx), cancel), printer);
    watcher.abort();
    answer
}

/// A token cancelled by Ctrl-C; abort the returned task once done.
fn cancel_on_ctrl_c() -> (CancellationToken, JoinHandle<()>) {
    let cancel = CancellationToken::new();
    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });
    (cancel, watcher)
}

fn write_sources(out: &mut impl Write, retrieval: &RetrievalResult) -> Result<()> {
    writeln!(out)?;
    if retrieval.is_empty() {
        return Ok(());
    }
    let mut citations: Vec<String> = Vec::new();
    for passage in retrieval.passages() {
        let citation = passage.citation();
        if !citations.contains(&citation) {
            citations.push(citation);
        }
    }
    writeln!(out, "\nSources:")?;
    for citation in citations {
        writeln!(out, "  {citation}")?;
    }
    Ok(())
}

/// Generate study material for `topic` and write it under `output_dir`.
///
/// Returns the written paths: JSON record, Quizlet TSV, CSV flashcards and,
/// when asked for, Markdown.
pub async fn study(
    app: &App,
    topic: &str,
    output_dir: &Path,
    markdown: bool,
    out: &mut impl Write,
) -> Result<Vec<PathBuf>> {
    let generator = StudyMaterialGenerator::new(app.gateway()?, app.retriever().await);
    let material = generator.generate(topic).await?;

    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    let base = format!("NLP_material_{}", Local::now().format("%Y-%m-%d_%H-%M"));
    let paths = write_material(&material, output_dir, &base, markdown).await?;

    writeln!(out, "{}", material.title)?;
    writeln!(
        out,
        "{} flashcards, {} exercises",
        material.flashcards.len(),
        material.exercises.len()
    )?;
    for path in &paths {
        writeln!(out, "  wrote {}", path.display())?;
    }
    Ok(paths)
}

async fn write_material(
    material: &StudyMaterial,
    dir: &Path,
    base: &str,
    markdown: bool,
) -> Result<Vec<PathBuf>> {
    let mut files = vec![
        (format!("{base}.json"), serde_json::to_string_pretty(material)?),
        (format!("{base}_quizlet.txt"), flashcards_to_tsv(&material.flashcards)),
        (format!("{base}_flashcards.csv"), flashcards_to_csv(&material.flashcards)),
    ];
    if markdown {
        files.push((format!("{base}.md"), to_markdown(material)));
    }

    let mut paths = Vec::with_capacity(files.len());
    for (name, contents) in files {
        let path = dir.join(name);
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        paths.push(path);
    }
    Ok(paths)
}

/// Score answers to `cases` (or the built-in glossary) and print a summary.
///
/// With `baseline`, every question is also answered without retrieval. The
/// full report is written as JSON to `output` when given.
pub async fn eval(
    app: &App,
    cases: Option<&Path>,
    baseline: bool,
    output: Option<&Path>,
    out: &mut impl Write,
) -> Result<EvalReport> {
    let cases = match cases {
        Some(path) => load_cases(path).await?,
        None => glossary_cases(),
    };

    let evaluator = Evaluator::new(app.gateway()?, app.retriever().await).with_baseline(baseline);
    let (cancel, watcher) = cancel_on_ctrl_c();
    let result = evaluator.run(&cases, cancel).await;
    watcher.abort();
    let report = result?;

    for case in &report.cases {
        writeln!(out, "{}", case.question)?;
        write_score(out, "rag", &case.rag)?;
        if let Some(baseline) = &case.baseline {
            write_score(out, "no rag", baseline)?;
        }
    }
    writeln!(out, "\nMean over {} question(s):", report.cases.len())?;
    writeln!(out, "  {:<8}{}", "rag", summarize(&report.rag))?;
    if let Some(baseline) = &report.baseline {
        writeln!(out, "  {:<8}{}", "no rag", summarize(baseline))?;
    }

    if let Some(path) = output {
        tokio::fs::write(path, serde_json::to_string_pretty(&report)?)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        writeln!(out, "  wrote {}", path.display())?;
    }
    Ok(report)
}

async fn load_cases(path: &Path) -> Result<Vec<EvalCase>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let cases: Vec<EvalCase> = serde_json::from_str(&text)
        .with_context(|| format!("invalid evaluation cases in {}", path.display()))?;
    if cases.is_empty() {
        bail!("{} holds no evaluation cases", path.display());
    }
    Ok(cases)
}

fn write_score(out: &mut impl Write, label: &str, score: &AnswerScore) -> Result<()> {
    match &score.error {
        Some(error) => writeln!(out, "  {label:<8}no answer ({error})")?,
        None => writeln!(out, "  {label:<8}{}", summarize(&score.scores))?,
    }
    Ok(())
}

fn summarize(scores: &RougeScores) -> String {
    format!(
        "ROUGE-1 f={:.3} p={:.3} r={:.3}  ROUGE-2 f={:.3}  ROUGE-L f={:.3}",
        scores.rouge_1.f1,
        scores.rouge_1.precision,
        scores.rouge_1.recall,
        scores.rouge_2.f1,
        scores.rouge_l.f1
    )
}

/// Report the size of the knowledge base.
pub async fn stats(app: &App, out: &mut impl Write) -> Result<usize> {
    let config = app.config();
    let path = &config.storage.path;
    writeln!(out, "index:      {}", path.display())?;
    writeln!(out, "collection: {}", config.rag.collection)?;
    if !path.is_file() {
        writeln!(out, "passages:   0 (no index yet)")?;
        return Ok(0);
    }

    let index = app.open_index().await?;
    let count = index.len().await?;
    close_index(index).await?;
    writeln!(out, "passages:   {count}")?;
    Ok(count)
}

/// Empty the collection.
pub async fn reset(app: &App, confirmed: bool, out: &mut impl Write) -> Result<()> {
    let config = app.config();
    if !confirmed {
        bail!(
            "refusing to delete collection `{}` without --yes",
            config.rag.collection
        );
    }
    if !config.storage.path.is_file() {
        writeln!(out, "Nothing to reset.")?;
        return Ok(());
    }

    let index = app.open_index().await?;
    index.reset().await?;
    close_index(index).await?;
    writeln!(out, "Collection `{}` is now empty.", config.rag.collection)?;
    Ok(())
}
