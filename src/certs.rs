//! Certificate discovery and TLS bind string assembly.
//!
//! [`DirCertificateSource`] lists every file in the configured certificate
//! directories, then the `cert-`/`cert_` prefixed files in the secrets
//! directory. Unreadable or missing directories contribute nothing.
//! [`bind_string`] turns the resulting paths into the fragment appended
//! to TLS-capable `bind` lines.

use std::path::{Path, PathBuf};

use crate::settings::DEFAULT_SECRETS_DIR;

pub const DEFAULT_CERTS_DIR: &str = "/certs";

pub trait CertificateSource: Send + Sync {
    fn list_certificates(&self) -> Vec<String>;
}

#[derive(Debug, Clone)]
pub struct DirCertificateSource {
    cert_dirs: Vec<PathBuf>,
    secrets_dir: PathBuf,
}

impl Default for DirCertificateSource {
    fn default() -> Self {
        Self::new(vec![PathBuf::from(DEFAULT_CERTS_DIR)], DEFAULT_SECRETS_DIR)
    }
}

impl DirCertificateSource {
    #[must_use]
    pub fn new(cert_dirs: Vec<PathBuf>, secrets_dir: impl Into<PathBuf>) -> Self {
        Self {
            cert_dirs,
            secrets_dir: secrets_dir.into(),
        }
    }
}

impl CertificateSource for DirCertificateSource {
    fn list_certificates(&self) -> Vec<String> {
        let mut paths = Vec::new();
        for dir in &self.cert_dirs {
            paths.extend(list_files(dir, |_| true));
        }
        paths.extend(list_files(&self.secrets_dir, |name| {
            let lower = name.to_lowercase();
            lower.starts_with("cert-") || lower.starts_with("cert_")
        }));
        paths
    }
}

/// Regular files in `dir` accepted by `keep`, sorted by file name.
fn list_files(dir: &Path, keep: impl Fn(&str) -> bool) -> Vec<String> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "skipping certificate directory");
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| !t.is_dir()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| keep(name))
        .collect();
    names.sort();

    names
        .into_iter()
        .map(|name| dir.join(name).display().to_string())
        .collect()
}

/// Build the TLS fragment for `bind` lines: ` ssl crt <a> crt <b> ...`.
///
/// Paths are referenced in the order given, without sorting or dedup.
/// No certificates means an empty fragment.
#[must_use]
pub fn bind_string(paths: &[String]) -> String {
    if paths.is_empty() {
        return String::new();
    }
    let mut out = String::from(" ssl");
    for path in paths {
        out.push_str(" crt ");
        out.push_str(path);
    }
    out
}
