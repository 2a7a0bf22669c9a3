//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (render, validate, init), and their associated argument
//! structs. Every flag has an environment variable equivalent for
//! container deployments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::certs::DEFAULT_CERTS_DIR;
use crate::settings::DEFAULT_SECRETS_DIR;

pub const DEFAULT_TEMPLATES_DIR: &str = "/cfg/tmpl";
pub const DEFAULT_OUTPUT: &str = "/cfg/haproxy.cfg";

#[derive(Parser)]
#[command(
    name = "switchyard",
    version,
    long_version = crate::LONG_VERSION,
    about = "Routing configuration compiler for HAProxy",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        switchyard init --templates ./tmpl             Write a starter skeleton\n  \
        switchyard render -s services.yaml -t ./tmpl -o -   Print the compiled config"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile services and templates into an HAProxy config
    Render(Box<RenderArgs>),

    /// Validate a services file without rendering
    Validate(ValidateArgs),

    /// Write a starter haproxy.tmpl skeleton
    Init(InitArgs),
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        switchyard render -s services.yaml                  Write /cfg/haproxy.cfg\n  \
        switchyard render -s services.yaml -o - --pretty    Print to stdout\n  \
        switchyard render -s services.yaml --watch          Re-render on change")]
pub struct RenderArgs {
    /// Services file (.yaml, .json); omit to render with zero services
    #[arg(short, long, env = "SERVICES_FILE")]
    pub services: Option<PathBuf>,

    /// Directory holding haproxy.tmpl, *-fe.cfg and *-be.cfg
    #[arg(short, long, env = "TEMPLATES_PATH", default_value = DEFAULT_TEMPLATES_DIR)]
    pub templates: PathBuf,

    /// Output file, or '-' for stdout
    #[arg(short, long, env = "CONFIG_OUTPUT", default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Directory searched for dfp_* settings and cert-* certificates
    #[arg(long, env = "SECRETS_DIR", default_value = DEFAULT_SECRETS_DIR)]
    pub secrets_dir: PathBuf,

    /// Certificate directory (repeatable)
    #[arg(
        long = "cert-dir",
        env = "CERT_DIRS",
        value_delimiter = ',',
        default_value = DEFAULT_CERTS_DIR
    )]
    pub cert_dirs: Vec<PathBuf>,

    /// Keep running and re-render when the services file changes
    #[arg(short, long, requires = "services")]
    pub watch: bool,

    /// Services file poll interval in seconds (with --watch)
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 5)]
    pub poll_interval: u64,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Services file to validate
    #[arg(default_value = "services.yaml")]
    pub services: PathBuf,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ValidateFormat,
}

#[derive(Args)]
pub struct InitArgs {
    /// Directory to write haproxy.tmpl into
    #[arg(short, long, default_value = ".")]
    pub templates: PathBuf,

    /// Overwrite an existing skeleton
    #[arg(long)]
    pub force: bool,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ValidateFormat {
    Text,
    Json,
}
