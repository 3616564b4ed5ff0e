//! # lingua-cli
//!
//! The `lingua` command: ingest documents, ask questions, chat and generate
//! study material from the terminal.
//!
//! ```text
//! lingua ingest lecture_01.pdf syntax_notes.txt
//! lingua ask "what is a morpheme?"
//! lingua chat
//! lingua study named entity recognition --markdown
//! lingua eval --baseline
//! ```
//!
//! Settings come from `lingua.toml` (see [`config::LinguaConfig`]); the API
//! key comes from `OPENAI_API_KEY`, which may also be set in a `.env` file.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod telemetry;

use anyhow::Result;

pub use app::App;
pub use cli::{Cli, Commands};
pub use config::LinguaConfig;

/// Run a parsed command line.
pub async fn execute(cli: Cli) -> Result<()> {
    let config = LinguaConfig::load(cli.config.as_deref())?;
    let app = App::new(config);
    let mut stdout = std::io::stdout();

    match cli.command {
        Commands::Ingest { files } => commands::ingest(&app, &files, &mut stdout).await.map(drop),
        Commands::Ask { question } => {
            commands::ask(&app, &question.join(" "), &mut stdout).await.map(drop)
        }
        Commands::Chat => commands::chat(&app).await,
        Commands::Study { topic, output_dir, markdown } => {
            commands::study(&app, &topic.join(" "), &output_dir, markdown, &mut stdout)
                .await
                .map(drop)
        }
        Commands::Eval { cases, baseline, output } => {
            commands::eval(&app, cases.as_deref(), baseline, output.as_deref(), &mut stdout)
                .await
                .map(drop)
        }
        Commands::Stats => commands::stats(&app, &mut stdout).await.map(drop),
        Commands::Reset { yes } => commands::reset(&app, yes, &mut stdout).await,
    }
}
