//! Tracing subscriber setup.
//!
//! Logs go to stderr so stdout carries only answers and reports.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter directive for a `-v` count.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "lingua=info,lingua_cli=info,lingua_runner=info,lingua_rag=warn,lingua_model=warn",
        1 => "lingua=debug,lingua_cli=debug,lingua_runner=debug,lingua_rag=info,lingua_model=info",
        _ => "debug",
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `verbosity`.
pub fn init(verbosity: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    // A second init (tests, embedding) keeps the first subscriber.
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        let _ = registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init();
    } else {
        let _ = registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_widens_the_filter() {
        assert!(default_directive(0).contains("lingua_cli=info"));
        assert!(default_directive(1).contains("lingua_rag=info"));
        assert_eq!(default_directive(5), "debug");
        for level in 0..3 {
            assert!(EnvFilter::try_new(default_directive(level)).is_ok());
        }
    }
}
