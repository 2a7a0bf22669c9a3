//! Switchyard compiles a set of service routing declarations into a
//! complete HAProxy configuration file.
//!
//! Services describe how traffic reaches a backend: by HTTP path and host
//! (`http`), by dedicated listening port (`tcp`), or by TLS server name on a
//! shared port (`sni`). The compiler orders them deterministically, emits
//! the frontend routing rules for each mode, and substitutes the result
//! together with resolved settings into a template skeleton plus optional
//! frontend and backend fragments.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (render, validate, init).
//! - [`service`] -- Service model, the concurrent [`ServiceRegistry`](service::registry::ServiceRegistry),
//!   validation, and file loading via the [`ServiceSource`](service::ServiceSource) trait.
//! - [`compiler`] -- Service ordering, per-mode routing text and document composition.
//! - [`template`] -- Parsing and substitution of `{{.Name}}` placeholders.
//! - [`fragments`] -- Discovery of the skeleton and `*-fe.cfg` / `*-be.cfg` fragments.
//! - [`settings`] -- Named settings from secret files and environment variables.
//! - [`certs`] -- Certificate discovery and the `ssl crt` bind string.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML services file support _(enabled by default)_ |
//! | `json` | JSON services file support |

// Binary crate: public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod certs;
pub mod cli;
pub mod cmd;
pub mod compiler;
pub mod error;
pub mod fragments;
pub mod logging;
pub mod service;
pub mod settings;
pub mod template;

/// Version string shown by `--version`, with the git revision and build profile.
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("SWITCHYARD_GIT_SHORT"),
    ", ",
    env!("SWITCHYARD_BUILD_PROFILE"),
    ")"
);
