//! Structured logging for the compiler commands.
//!
//! Everything goes to stderr so `render --output -` can stream the compiled
//! configuration on stdout. Only switchyard's own events follow `--log-level`;
//! dependencies are held at `WARN` so a debug run shows compilation steps
//! rather than runtime internals. JSON output flattens event fields onto the
//! top-level object, which is what log shippers in a proxy container expect.

use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::LogLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// `--json` wins, then `--pretty`, then pretty only when stderr is a terminal.
#[must_use]
pub fn resolve_format(pretty: bool, json: bool) -> LogFormat {
    let interactive = std::io::IsTerminal::is_terminal(&std::io::stderr());
    choose_format(pretty, json, interactive)
}

const fn choose_format(pretty: bool, json: bool, interactive: bool) -> LogFormat {
    if json {
        LogFormat::Json
    } else if pretty || interactive {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

#[must_use]
pub fn filter(level: &LogLevel) -> Targets {
    Targets::new()
        .with_target(env!("CARGO_CRATE_NAME"), level.to_tracing_level())
        .with_default(Level::WARN)
}

/// Install the global subscriber. A second call is a no-op, which keeps
/// repeated `render` invocations inside one process (tests) from panicking.
pub fn init(level: &LogLevel, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(filter(level));
    let installed = match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
    };
    if installed.is_err() {
        tracing::debug!("log subscriber already installed");
    }
}
