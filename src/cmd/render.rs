//! `switchyard render` - compile services into an HAProxy config.
//!
//! Loads the services file into a [`ServiceRegistry`], resolves settings,
//! certificates and template fragments, compiles, and writes the result.
//! The output file is only rewritten when its content changes, and then
//! atomically, so the process supervisor can skip no-op reloads and never
//! reads a half-written file. With `--watch` the services file is polled
//! and the configuration re-rendered until shutdown.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::certs::{CertificateSource, DirCertificateSource};
use crate::cli::RenderArgs;
use crate::compiler;
use crate::error::SwitchyardError;
use crate::fragments::{self, FsFragmentSource};
use crate::logging;
use crate::service::model::Service;
use crate::service::registry::ServiceRegistry;
use crate::service::sources;
use crate::service::{ServiceSource, SourceVersion};
use crate::settings::EnvSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Written,
    Unchanged,
    Stdout,
}

/// Everything needed to turn a registry into an output file.
pub struct Renderer {
    pub templates: PathBuf,
    pub output: PathBuf,
    pub settings: EnvSettings,
    pub certificates: DirCertificateSource,
}

impl Renderer {
    #[must_use]
    pub fn from_args(args: &RenderArgs) -> Self {
        Self {
            templates: args.templates.clone(),
            output: args.output.clone(),
            settings: EnvSettings::new(&args.secrets_dir),
            certificates: DirCertificateSource::new(args.cert_dirs.clone(), &args.secrets_dir),
        }
    }

    /// Compile the current registry snapshot. Nothing is written.
    pub fn compile(&self, registry: &ServiceRegistry) -> Result<String, SwitchyardError> {
        let certificates = self.certificates.list_certificates();
        let fragments = fragments::load_fragments(&FsFragmentSource, &self.templates)?;
        compiler::compile_registry(registry, &self.settings, &certificates, &fragments)
    }

    pub async fn render(&self, registry: &ServiceRegistry) -> Result<RenderOutcome, SwitchyardError> {
        let document = self.compile(registry)?;
        let outcome = write_output(&self.output, &document).await?;
        match outcome {
            RenderOutcome::Written => tracing::info!(
                path = %self.output.display(),
                services = registry.len(),
                bytes = document.len(),
                "configuration written"
            ),
            RenderOutcome::Unchanged => tracing::debug!(
                path = %self.output.display(),
                "configuration unchanged, skipping write"
            ),
            RenderOutcome::Stdout => {}
        }
        Ok(outcome)
    }
}

/// `haproxy.cfg` is staged as `haproxy.cfg.tmp` beside it.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsStr::to_os_string).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `document` unless the file already holds identical bytes.
///
/// The new content is written to a sibling file and renamed over the
/// target, so readers see either the old or the new document in full.
pub async fn write_output(path: &Path, document: &str) -> Result<RenderOutcome, SwitchyardError> {
    if path.as_os_str() == "-" {
        print!("{document}");
        return Ok(RenderOutcome::Stdout);
    }

    if let Ok(existing) = tokio::fs::read(path).await {
        if existing == document.as_bytes() {
            return Ok(RenderOutcome::Unchanged);
        }
    }

    let staging = staging_path(path);
    if let Err(e) = tokio::fs::write(&staging, document).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(e.into());
    }
    tokio::fs::rename(&staging, path).await?;
    Ok(RenderOutcome::Written)
}

/// Make the registry hold exactly `services`.
pub fn sync_registry(registry: &ServiceRegistry, services: Vec<Service>) {
    let count = services.len();
    let removed = registry.replace_all(services);
    for name in &removed {
        tracing::info!(service = %name, "service removed");
    }
    tracing::info!(services = count, removed = removed.len(), "services loaded");
}

pub async fn execute(args: RenderArgs) -> Result<(), SwitchyardError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    let registry = ServiceRegistry::new();
    let source = args
        .services
        .as_deref()
        .map(sources::create_file_source)
        .transpose()?;

    let mut version = None;
    if let Some(ref source) = source {
        let loaded = source.load().await?;
        sync_registry(&registry, loaded.services);
        version = Some(loaded.version);
    }

    let renderer = Renderer::from_args(&args);
    renderer.render(&registry).await?;

    match (args.watch, source, version) {
        (true, Some(source), Some(version)) => {
            watch_loop(&renderer, &registry, source, version, args.poll_interval).await;
            tracing::info!("switchyard stopped");
            Ok(())
        }
        _ => Ok(()),
    }
}

async fn watch_loop(
    renderer: &Renderer,
    registry: &ServiceRegistry,
    source: Box<dyn ServiceSource>,
    mut version: SourceVersion,
    interval_secs: u64,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    interval.tick().await; // Skip first immediate tick

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    tracing::info!(origin = %source.origin(), interval_secs, "watching services");

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            () = &mut shutdown => return,
        }

        match source.has_changed(&version).await {
            Ok(true) => {
                tracing::info!("services change detected, reloading");
                match source.load().await {
                    Ok(loaded) => {
                        sync_registry(registry, loaded.services);
                        version = loaded.version;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "services reload failed, keeping current set");
                    }
                }
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(error = %e, "services change check failed");
            }
        }

        // Templates and certificates may change independently of the services file.
        if let Err(e) = renderer.render(registry).await {
            tracing::error!(error = %e, "render failed, keeping previous configuration");
        }
    }
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
