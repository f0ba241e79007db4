//! Configuration module for bucketferry.
//!
//! Provides typed configuration structs that map to the JSON configuration
//! file, with loading, global-default merging, environment-variable fallback
//! for credentials, and validation.
//!
//! The invariants enforced here are what the watch engine relies on: every
//! path that reaches the engine has a non-empty root and bucket and a
//! positive delay, and the global delay driving the shared flush timer is
//! positive.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid JSON or does not match the schema.
    #[error("cannot parse configuration file: {0}")]
    Parse(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for bucketferry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Directories to watch, one entry per configured root.
    #[serde(default)]
    pub paths: Vec<PathConfig>,
    /// Defaults applied to paths that omit `bucket` or `delay`.
    #[serde(default)]
    pub global: GlobalConfig,
    /// Object storage credentials.
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Surface informational progress messages.
    #[serde(default)]
    pub verbose: bool,
}

/// One watched root directory and its upload policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathConfig {
    /// Absolute directory path to watch.
    pub root: PathBuf,
    /// Destination bucket. May be empty in the file when `global.bucket`
    /// is set; merging fills it in before validation.
    #[serde(default)]
    pub bucket: String,
    /// Watch the whole subtree under `root` rather than only `root`.
    #[serde(default)]
    pub recursive: bool,
    /// Remove the local file after a successful upload.
    #[serde(default)]
    pub delete: bool,
    /// Quiet period in seconds. Zero in the file means "use global.delay".
    #[serde(default)]
    pub delay: u64,
}

/// Global defaults merged into paths that don't set their own values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Fallback bucket for paths without an explicit one.
    #[serde(default)]
    pub bucket: String,
    /// Quiet period in seconds driving the shared flush timer.
    ///
    /// One timer serves all watched paths: the latest create event anywhere
    /// extends the quiet period for the whole pending batch. Per-path
    /// `delay` values are merged and validated but the runtime timer reads
    /// this value only.
    #[serde(default)]
    pub delay: u64,
}

impl GlobalConfig {
    /// The shared quiet period as a [`Duration`].
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay)
    }
}

/// Static object storage credentials.
///
/// Any field left empty in the configuration file falls back to the
/// `AWS_ACCESS` / `AWS_SECRET` / `AWS_REGION` environment variables at load
/// time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Access key ID.
    #[serde(default)]
    pub access: String,
    /// Secret access key.
    #[serde(default)]
    pub secret: String,
    /// Bucket region, e.g. `us-east-1`.
    #[serde(default)]
    pub region: String,
}

impl CredentialsConfig {
    /// Returns a copy with empty fields filled from the given environment
    /// lookup. [`Config::load`] passes `std::env::var`; tests pass a closure.
    pub fn resolved(&self, env: impl Fn(&str) -> Option<String>) -> Self {
        let fill = |current: &str, var: &str| {
            if current.is_empty() {
                env(var).unwrap_or_default()
            } else {
                current.to_string()
            }
        };

        Self {
            access: fill(&self.access, "AWS_ACCESS"),
            secret: fill(&self.secret, "AWS_SECRET"),
            region: fill(&self.region, "AWS_REGION"),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a JSON file at `path`.
    ///
    /// Applies global-default merging and environment-variable credential
    /// fallback, so the returned value is ready for [`Config::validate`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&content)?;
        config.merge_globals();
        config.credentials = config
            .credentials
            .resolved(|var| std::env::var(var).ok());
        Ok(config)
    }

    /// Apply `global.bucket` and `global.delay` to paths that omit them.
    pub fn merge_globals(&mut self) {
        for path in &mut self.paths {
            if path.bucket.is_empty() {
                path.bucket = self.global.bucket.clone();
            }
            if path.delay == 0 {
                path.delay = self.global.delay;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"paths[0].bucket"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid. Expects merging and
    /// credential fallback to have run already (as [`Config::load`] does).
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- paths ---
        if self.paths.is_empty() {
            errors.push(ValidationError {
                field: "paths".into(),
                message: "there must be at least one path to watch".into(),
            });
        }

        for (i, path) in self.paths.iter().enumerate() {
            if path.root.as_os_str().is_empty() {
                errors.push(ValidationError {
                    field: format!("paths[{i}].root"),
                    message: "missing root directory".into(),
                });
            }
            if path.bucket.is_empty() {
                errors.push(ValidationError {
                    field: format!("paths[{i}].bucket"),
                    message: "no explicit bucket and none set globally".into(),
                });
            }
            if path.delay == 0 {
                errors.push(ValidationError {
                    field: format!("paths[{i}].delay"),
                    message: "must be greater than 0".into(),
                });
            }
        }

        // --- global ---
        if self.global.delay == 0 {
            errors.push(ValidationError {
                field: "global.delay".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- credentials ---
        if self.credentials.access.is_empty() {
            errors.push(ValidationError {
                field: "credentials.access".into(),
                message: "access key not in config file and $AWS_ACCESS is not set".into(),
            });
        }
        if self.credentials.secret.is_empty() {
            errors.push(ValidationError {
                field: "credentials.secret".into(),
                message: "secret key not in config file and $AWS_SECRET is not set".into(),
            });
        }
        if self.credentials.region.is_empty() {
            errors.push(ValidationError {
                field: "credentials.region".into(),
                message: "region not in config file and $AWS_REGION is not set".into(),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
