//! Runtime settings: a YAML file overlaid with CLI flags and environment.
//!
//! Precedence, lowest to highest:
//! 1. built-in defaults
//! 2. the YAML file (`--config`, or `wp_actualites.yaml` when present)
//! 3. command-line flags and their `WP_*` environment variables
//!
//! ```yaml
//! source_url: https://fo-groupebouygues.com/wp-json
//! target_url: http://test-content.local/wp-json
//! username: admin
//! app_password: "abcd efgh ijkl mnop"
//! export_file: ./exports/actualites.json
//! batch_size: 20
//! pauses:
//!   export_post_ms: 500
//! retry:
//!   max_retries: 5
//! ```

use crate::api::RetryPolicy;
use crate::wordpress::Credentials;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "wp_actualites.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("missing setting `{0}` (set it in the config file, with a flag, or via the environment)")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// REST root of the legacy site.
    pub source_url: String,
    /// REST root of the new site.
    pub target_url: String,
    pub username: Option<String>,
    /// WordPress application password for `username`.
    pub app_password: Option<String>,
    pub export_file: PathBuf,
    /// Posts listed per export batch.
    pub batch_size: usize,
    pub pauses: Pauses,
    pub retry: RetrySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_url: "https://fo-groupebouygues.com/wp-json".into(),
            target_url: "http://test-content.local/wp-json".into(),
            username: None,
            app_password: None,
            export_file: PathBuf::from("./exports/actualites.json"),
            batch_size: 20,
            pauses: Pauses::default(),
            retry: RetrySettings::default(),
        }
    }
}

/// Pauses that keep the legacy and new servers from being hammered.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Pauses {
    pub export_post_ms: u64,
    pub export_batch_ms: u64,
    pub import_post_ms: u64,
    pub clean_post_ms: u64,
}

impl Default for Pauses {
    fn default() -> Self {
        Self {
            export_post_ms: 500,
            export_batch_ms: 1000,
            import_post_ms: 300,
            clean_post_ms: 200,
        }
    }
}

impl Pauses {
    pub fn export_post(&self) -> Duration {
        Duration::from_millis(self.export_post_ms)
    }

    pub fn export_batch(&self) -> Duration {
        Duration::from_millis(self.export_batch_ms)
    }

    pub fn import_post(&self) -> Duration {
        Duration::from_millis(self.import_post_ms)
    }

    pub fn clean_post(&self) -> Duration {
        Duration::from_millis(self.clean_post_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_jitter_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            max_jitter_ms: policy.max_jitter.as_millis() as u64,
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(s: &RetrySettings) -> Self {
        RetryPolicy {
            max_retries: s.max_retries,
            base_delay: Duration::from_millis(s.base_delay_ms),
            max_delay: Duration::from_millis(s.max_delay_ms),
            max_jitter: Duration::from_millis(s.max_jitter_ms),
        }
    }
}

/// Values given on the command line; `None` keeps the file or default value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub source_url: Option<String>,
    pub target_url: Option<String>,
    pub username: Option<String>,
    pub app_password: Option<String>,
    pub export_file: Option<PathBuf>,
    pub batch_size: Option<usize>,
}

impl Settings {
    /// Load settings from `path`, or from [`DEFAULT_CONFIG_FILE`] if it exists.
    ///
    /// # Errors
    ///
    /// An explicit `path` that cannot be read is an error; a missing default
    /// file is not. A file that is not valid YAML for [`Settings`] is always
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    debug!("No config file; using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let settings = Self::from_yaml_str(&raw).map_err(|source| ConfigError::Yaml {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "Loaded config file");
        Ok(settings)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Apply command-line values on top of the loaded settings.
    pub fn with_overrides(mut self, o: Overrides) -> Self {
        if let Some(v) = o.source_url {
            self.source_url = v;
        }
        if let Some(v) = o.target_url {
            self.target_url = v;
        }
        if o.username.is_some() {
            self.username = o.username;
        }
        if o.app_password.is_some() {
            self.app_password = o.app_password;
        }
        if let Some(v) = o.export_file {
            self.export_file = v;
        }
        if let Some(v) = o.batch_size {
            self.batch_size = v;
        }
        self
    }

    /// Credentials for the new site.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Missing`] when the username or application password
    /// is unset or blank.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let username = non_blank(&self.username).ok_or(ConfigError::Missing("username"))?;
        let app_password =
            non_blank(&self.app_password).ok_or(ConfigError::Missing("app_password"))?;
        Ok(Credentials {
            username: username.to_string(),
            app_password: app_password.to_string(),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.retry)
    }
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.batch_size, 20);
        assert_eq!(s.export_file, PathBuf::from("./exports/actualites.json"));
        assert_eq!(s.pauses.export_post(), Duration::from_millis(500));
        assert_eq!(s.retry_policy().max_retries, 3);
        assert_eq!(s.retry_policy().max_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let s = Settings::from_yaml_str(
            "target_url: https://new.example.org/wp-json\npauses:\n  import_post_ms: 50\nretry:\n  max_retries: 5\n",
        )
        .unwrap();
        assert_eq!(s.target_url, "https://new.example.org/wp-json");
        assert_eq!(s.source_url, Settings::default().source_url);
        assert_eq!(s.pauses.import_post_ms, 50);
        assert_eq!(s.pauses.export_post_ms, 500);
        assert_eq!(s.retry.max_retries, 5);
        assert_eq!(s.retry.base_delay_ms, 1000);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Settings::from_yaml_str("").unwrap(), Settings::default());
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(Settings::from_yaml_str("batch_size: beaucoup").is_err());
    }

    #[test]
    fn test_overrides_win() {
        let s = Settings::default().with_overrides(Overrides {
            username: Some("admin".into()),
            app_password: Some("abcd efgh".into()),
            batch_size: Some(5),
            ..Overrides::default()
        });
        assert_eq!(s.batch_size, 5);
        let c = s.credentials().unwrap();
        assert_eq!(c.username, "admin");
        assert_eq!(c.app_password, "abcd efgh");
    }

    #[test]
    fn test_missing_credentials() {
        let s = Settings {
            username: Some("admin".into()),
            app_password: Some("   ".into()),
            ..Settings::default()
        };
        assert!(matches!(s.credentials(), Err(ConfigError::Missing("app_password"))));
        assert!(matches!(
            Settings::default().credentials(),
            Err(ConfigError::Missing("username"))
        ));
    }

    #[test]
    fn test_load_reads_file_and_reports_bad_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("conf.yaml");
        std::fs::write(&path, "batch_size: 7\n").unwrap();
        assert_eq!(Settings::load(Some(&path)).unwrap().batch_size, 7);

        let missing = tmp.path().join("absent.yaml");
        assert!(matches!(
            Settings::load(Some(&missing)),
            Err(ConfigError::Io { .. })
        ));
    }
}
