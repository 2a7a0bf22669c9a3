//! Key/value settings lookup with per-key defaults.
//!
//! [`SettingsSource`] is the narrow interface the compiler resolves every
//! tunable through. [`EnvSettings`] reads a secrets file first
//! (`<secrets_dir>/dfp_<lowercase key>`) and falls back to a non-empty
//! environment variable. A plain `HashMap<String, String>` also implements
//! the trait, which is what tests and embedders use.

use std::collections::HashMap;
use std::path::PathBuf;

pub const DEFAULT_SECRETS_DIR: &str = "/run/secrets";

const SECRET_PREFIX: &str = "dfp_";

pub trait SettingsSource: Send + Sync {
    /// Raw lookup. Keys are case-sensitive.
    fn lookup(&self, key: &str) -> Option<String>;

    /// Lookup with fallback. Trailing line breaks are trimmed.
    fn resolve(&self, key: &str, default: &str) -> String {
        match self.lookup(key) {
            Some(value) => value.trim_end_matches(['\r', '\n']).to_string(),
            None => default.to_string(),
        }
    }
}

impl SettingsSource for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

#[derive(Debug, Clone)]
pub struct EnvSettings {
    secrets_dir: PathBuf,
}

impl Default for EnvSettings {
    fn default() -> Self {
        Self::new(DEFAULT_SECRETS_DIR)
    }
}

impl EnvSettings {
    #[must_use]
    pub fn new(secrets_dir: impl Into<PathBuf>) -> Self {
        Self {
            secrets_dir: secrets_dir.into(),
        }
    }

    fn secret_path(&self, key: &str) -> PathBuf {
        self.secrets_dir
            .join(format!("{SECRET_PREFIX}{}", key.to_lowercase()))
    }
}

impl SettingsSource for EnvSettings {
    fn lookup(&self, key: &str) -> Option<String> {
        let path = self.secret_path(key);
        if let Ok(content) = std::fs::read_to_string(&path) {
            tracing::trace!(key, path = %path.display(), "setting resolved from secret");
            return Some(content);
        }
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn resolve_falls_back_to_default() {
        let settings = map(&[]);
        assert_eq!(settings.resolve("TIMEOUT_CONNECT", "5"), "5");
    }

    #[test]
    fn resolve_trims_every_trailing_line_break() {
        let settings = map(&[
            ("STATS_PASS", "secret\n\n"),
            ("USERS", "a:b\r\n"),
            ("EXTRA_GLOBAL", "maxconn 10\n    nbthread 2\n"),
        ]);
        assert_eq!(settings.resolve("STATS_PASS", "admin"), "secret");
        assert_eq!(settings.resolve("USERS", ""), "a:b");
        assert_eq!(
            settings.resolve("EXTRA_GLOBAL", ""),
            "maxconn 10\n    nbthread 2"
        );
    }

    #[test]
    fn keys_are_case_sensitive() {
        let settings = map(&[("stats_user", "bob")]);
        assert_eq!(settings.resolve("STATS_USER", "admin"), "admin");
    }

    #[test]
    fn secret_file_wins_over_environment() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("dfp_switchyard_test_secret"), "from-file\n").unwrap();
        let settings = EnvSettings::new(dir.path());

        assert_eq!(
            settings.resolve("SWITCHYARD_TEST_SECRET", "default"),
            "from-file"
        );
    }

    #[test]
    fn missing_secret_and_env_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let settings = EnvSettings::new(dir.path());
        assert_eq!(
            settings.resolve("SWITCHYARD_TEST_UNSET_KEY", "fallback"),
            "fallback"
        );
    }
}
