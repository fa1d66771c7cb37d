//! Configuration file loading and validation.
//!
//! The file is YAML (JSON is accepted as a fallback) with three sections:
//! `log`, `bosh` and `github`. [`Config::resolve`] validates it into
//! [`Settings`], compiling every regex and parsing every duration, so that
//! nothing configuration-related can fail once refreshing has started.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::release::format::{DEFAULT_MATCH, DEFAULT_REPLACE};
use crate::release::{Formatter, ManifestSource, RefType, ReleaseSource};

/// Refresh interval used when `github.update_interval` is not set.
pub const DEFAULT_INTERVAL: &str = "4h";

/// Raw configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging options.
    pub log: LogConfig,
    /// Director connection.
    pub bosh: BoshConfig,
    /// GitHub access and tracked sources.
    pub github: GithubConfig,
}

/// `log` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// Default level filter, overridden by `RUST_LOG`.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { json: false, level: "info".to_string() }
    }
}

/// `bosh` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoshConfig {
    /// Director URL, e.g. `https://10.0.0.6:25555`.
    pub url: String,
    /// Path to a PEM CA certificate trusted for the director and UAA.
    pub ca_cert: String,
    /// Basic-auth user, or UAA user for the password grant.
    pub username: String,
    /// Password matching `username`.
    pub password: String,
    /// UAA client for the client-credentials grant.
    pub client_id: String,
    /// Secret matching `client_id`.
    pub client_secret: String,
    /// Manifest names to ignore.
    pub excludes: Vec<String>,
    /// Proxy URL for all director and UAA traffic.
    pub proxy: String,
}

/// `github` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// API token. Falls back to the `GITHUB_TOKEN` environment variable.
    pub token: String,
    /// Refresh interval, e.g. `4h` or `1h30m`.
    pub update_interval: Option<String>,
    /// API base URL, for GitHub Enterprise.
    pub api_url: Option<String>,
    /// Sources that also carry a deployable manifest.
    pub manifest_releases: BTreeMap<String, ManifestReleaseConfig>,
    /// Sources tracked for versions only.
    pub generic_releases: BTreeMap<String, GenericReleaseConfig>,
}

/// Match/replace pair applied to reference names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatConfig {
    /// Regex matched against the reference name.
    #[serde(rename = "match")]
    pub pattern: String,
    /// Replacement template with capture references.
    #[serde(default)]
    pub replace: String,
}

/// A version-only source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenericReleaseConfig {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Accepted reference kinds; defaults to `[release]`.
    pub types: Vec<String>,
    /// Version formatter; defaults to stripping a leading `v`.
    pub format: Option<FormatConfig>,
}

/// A source carrying a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestReleaseConfig {
    /// Owner, repository, types and format.
    #[serde(flatten)]
    pub generic: GenericReleaseConfig,
    /// Manifest path in the repository. Empty disables rendering.
    pub manifest: String,
    /// Ops files applied to the manifest, in order.
    pub ops: Vec<String>,
    /// Variable files, in order; later files win.
    pub vars: Vec<String>,
    /// Deployment manifest-name patterns.
    pub matchers: Vec<String>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Time between refreshes.
    pub interval: Duration,
    /// GitHub API token.
    pub github_token: String,
    /// GitHub API base URL override.
    pub github_url: Option<String>,
    /// Version-only sources, sorted by name.
    pub generic_sources: Vec<ReleaseSource>,
    /// Manifest sources, sorted by name.
    pub manifest_sources: Vec<ManifestSource>,
    /// Compiled `bosh.excludes`.
    pub excludes: Vec<Regex>,
    /// Director connection.
    pub bosh: BoshConfig,
    /// Logging options.
    pub log: LogConfig,
}

impl Config {
    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is neither YAML nor JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
        Self::parse(&content)
    }

    /// Parses configuration text, trying YAML first and JSON second.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] with the YAML error if both fail.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        match serde_yaml::from_str::<Option<Self>>(content) {
            Ok(config) => Ok(config.unwrap_or_default()),
            Err(yaml_err) => serde_json::from_str(content)
                .map_err(|_| ConfigError::Parse(yaml_err.to_string())),
        }
    }

    /// Validates the configuration, reading `GITHUB_TOKEN` when no token is
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first invalid section.
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        self.resolve_with(std::env::var("GITHUB_TOKEN").ok())
    }

    fn resolve_with(&self, env_token: Option<String>) -> Result<Settings, ConfigError> {
        let github = &self.github;

        let mut manifest_sources = Vec::with_capacity(github.manifest_releases.len());
        for (name, item) in &github.manifest_releases {
            let source = manifest_source(name, item).map_err(|e| {
                ConfigError::invalid("github", format!("invalid manifest release '{name}', {e}"))
            })?;
            manifest_sources.push(source);
        }

        let mut generic_sources = Vec::with_capacity(github.generic_releases.len());
        for (name, item) in &github.generic_releases {
            let source = release_source(name, item).map_err(|e| {
                ConfigError::invalid("github", format!("invalid generic release '{name}', {e}"))
            })?;
            generic_sources.push(source);
        }

        let github_token = if github.token.is_empty() {
            env_token.filter(|t| !t.is_empty())
        } else {
            Some(github.token.clone())
        }
        .ok_or_else(|| ConfigError::invalid("github", "missing mandatory github token"))?;

        let raw_interval = github.update_interval.as_deref().unwrap_or(DEFAULT_INTERVAL);
        let interval = humantime::parse_duration(raw_interval).map_err(|e| {
            ConfigError::invalid("github", format!("invalid duration '{raw_interval}' for update_interval: {e}"))
        })?;

        if self.bosh.url.is_empty() {
            return Err(ConfigError::invalid("bosh", "missing mandatory url"));
        }
        let excludes = self
            .bosh
            .excludes
            .iter()
            .map(|f| {
                Regex::new(f).map_err(|e| {
                    ConfigError::invalid("bosh", format!("invalid exclude filter regexp '{f}': {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Settings {
            interval,
            github_token,
            github_url: github.api_url.clone().filter(|u| !u.is_empty()),
            generic_sources,
            manifest_sources,
            excludes,
            bosh: self.bosh.clone(),
            log: self.log.clone(),
        })
    }
}

fn release_source(name: &str, item: &GenericReleaseConfig) -> Result<ReleaseSource, String> {
    if item.owner.is_empty() {
        return Err("missing mandatory owner".to_string());
    }
    if item.repo.is_empty() {
        return Err("missing mandatory repo".to_string());
    }

    let types = if item.types.is_empty() {
        vec![RefType::Release]
    } else {
        item.types.iter().map(|t| t.parse::<RefType>()).collect::<Result<Vec<_>, _>>()?
    };

    let (pattern, replace) = item
        .format
        .as_ref()
        .map_or((DEFAULT_MATCH, DEFAULT_REPLACE), |f| (f.pattern.as_str(), f.replace.as_str()));
    let formatter = Formatter::new(pattern, replace)
        .map_err(|e| format!("invalid supplied regexp '{pattern}' : {e}"))?;

    Ok(ReleaseSource {
        name: name.to_string(),
        owner: item.owner.clone(),
        repo: item.repo.clone(),
        types,
        formatter,
    })
}

fn manifest_source(name: &str, item: &ManifestReleaseConfig) -> Result<ManifestSource, String> {
    let release = release_source(name, &item.generic)?;
    let patterns = if item.matchers.is_empty() {
        vec![ManifestSource::default_matcher(name)]
    } else {
        item.matchers.clone()
    };
    let matchers = patterns
        .iter()
        .map(|m| Regex::new(m).map_err(|e| format!("invalid match regexp '{m}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ManifestSource {
        release,
        manifest: item.manifest.clone(),
        ops: item.ops.clone(),
        vars: item.vars.clone(),
        matchers,
    })
}
