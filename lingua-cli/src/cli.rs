//! Command-line surface.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// lingua: an NLP and linguistics study assistant grounded on your own documents
#[derive(Parser, Debug)]
#[command(name = "lingua", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./lingua.toml when present)
    #[arg(long, global = true, env = "LINGUA_CONFIG")]
    pub config: Option<PathBuf>,

    /// More log output (-v, -vv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add documents (PDF or text) to the knowledge base
    Ingest {
        /// Files to ingest
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Ask one question and stream the answer
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Interactive chat over the knowledge base
    Chat,

    /// Generate a study guide, flashcards and exercises for a topic
    Study {
        /// The topic, e.g. "syntax trees"
        #[arg(required = true, num_args = 1..)]
        topic: Vec<String>,

        /// Directory the files are written to
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Also write a Markdown rendering
        #[arg(long)]
        markdown: bool,
    },

    /// Score answers against reference definitions with ROUGE
    Eval {
        /// JSON array of {"question", "reference"} objects (defaults to a
        /// built-in linguistics glossary)
        #[arg(long)]
        cases: Option<PathBuf>,

        /// Also answer every question without retrieval
        #[arg(long)]
        baseline: bool,

        /// Write the full report as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show what the knowledge base holds
    Stats,

    /// Delete every passage in the knowledge base
    Reset {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}
