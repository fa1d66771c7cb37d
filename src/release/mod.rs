//! Release sources, references and version history.
//!
//! A release source is a GitHub repository tracked for new versions. The
//! resolver ranks its references by creation time, the formatter turns them
//! into display versions, and the catalog builder assembles both into a
//! per-source version history.

pub mod catalog;
pub mod format;
pub mod refs;

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub use catalog::{build_catalog, build_manifest_catalog, build_versions, ReleaseCatalog, SourceKind};
pub use format::Formatter;
pub use refs::resolve_refs;

/// Kind of reference a source accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefType {
    /// A published, non-draft, non-pre-release release.
    Release,
    /// A release flagged as pre-release.
    PreRelease,
    /// A draft release.
    DraftRelease,
    /// A plain git tag.
    Tag,
}

impl FromStr for RefType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "release" => Ok(Self::Release),
            "pre_release" => Ok(Self::PreRelease),
            "draft_release" => Ok(Self::DraftRelease),
            "tag" => Ok(Self::Tag),
            _ => Err(format!("invalid release type '{s}'")),
        }
    }
}

impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Release => "release",
            Self::PreRelease => "pre_release",
            Self::DraftRelease => "draft_release",
            Self::Tag => "tag",
        };
        f.write_str(name)
    }
}

/// A repository tracked for versions.
#[derive(Debug, Clone)]
pub struct ReleaseSource {
    /// Configured source name.
    pub name: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Accepted reference kinds; never empty.
    pub types: Vec<RefType>,
    /// Display-version formatter.
    pub formatter: Formatter,
}

impl ReleaseSource {
    /// Returns `true` if `kind` is one of the accepted reference kinds.
    #[must_use]
    pub fn accepts(&self, kind: RefType) -> bool {
        self.types.contains(&kind)
    }
}

/// A release source that also carries a deployable manifest.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    /// Identity, accepted types and formatter.
    pub release: ReleaseSource,
    /// Path of the manifest inside the repository. Empty disables rendering.
    pub manifest: String,
    /// Ops files applied to the manifest, in order.
    pub ops: Vec<String>,
    /// Variable files interpolated into the manifest, in order.
    pub vars: Vec<String>,
    /// Patterns matched against a deployment's declared manifest name.
    pub matchers: Vec<Regex>,
}

impl ManifestSource {
    /// Default matcher for a source: the source name, optionally followed by
    /// a dash-separated suffix.
    #[must_use]
    pub fn default_matcher(name: &str) -> String {
        format!("^{}(-.*)?$", regex::escape(name))
    }

    /// Returns `true` if any matcher matches `manifest_name`.
    #[must_use]
    pub fn matches(&self, manifest_name: &str) -> bool {
        self.matchers.iter().any(|m| m.is_match(manifest_name))
    }

    /// Source name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.release.name
    }
}

/// A raw reference name and its creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRef {
    /// Reference name (tag name).
    pub name: String,
    /// Creation time, in seconds since the epoch.
    pub time: i64,
}

/// One entry of a source's version history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Display version produced by the source's formatter.
    pub version: String,
    /// Raw reference the version was built from.
    pub gitref: String,
    /// Creation time, in seconds since the epoch.
    pub time: i64,
    /// Time at which a newer version superseded this one; 0 for the latest.
    pub expired_since: i64,
}

impl Version {
    /// Creates a version that has not been superseded.
    #[must_use]
    pub fn new(gitref: &str, version: String, time: i64) -> Self {
        Self { version, gitref: gitref.to_string(), time, expired_since: 0 }
    }

    /// `"latest"` if this is the same display version as `latest`,
    /// `"deprecated"` otherwise.
    #[must_use]
    pub fn status(&self, latest: &Version) -> &'static str {
        if self.version == latest.version {
            "latest"
        } else {
            "deprecated"
        }
    }
}
