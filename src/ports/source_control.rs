//! Source-control port for listing releases, tags and repository content.

use serde::{Deserialize, Serialize};

use super::PortFuture;

/// A published release as reported by the source-control API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    /// Name of the tag the release points at.
    pub tag_name: String,
    /// Whether the release is flagged as a pre-release.
    #[serde(default)]
    pub prerelease: bool,
    /// Whether the release is still a draft.
    #[serde(default)]
    pub draft: bool,
    /// Creation time, in seconds since the epoch.
    pub created_at: i64,
}

/// A tag as reported by the source-control API.
///
/// Tag objects rarely carry a usable date, so only the commit they point at
/// is kept; the timestamp comes from [`SourceControl::get_commit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    /// Tag name.
    pub name: String,
    /// SHA of the tagged commit.
    pub commit_sha: String,
}

/// A commit as reported by the source-control API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Commit SHA.
    pub sha: String,
    /// Committer date, in seconds since the epoch.
    pub committer_date: i64,
}

/// Read access to hosted repositories.
pub trait SourceControl: Send + Sync {
    /// Lists the published releases of `owner/repo`.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream listing call fails.
    fn list_releases<'a>(&'a self, owner: &'a str, repo: &'a str)
        -> PortFuture<'a, Vec<ReleaseInfo>>;

    /// Lists the tags of `owner/repo`.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream listing call fails.
    fn list_tags<'a>(&'a self, owner: &'a str, repo: &'a str) -> PortFuture<'a, Vec<TagInfo>>;

    /// Fetches a single commit of `owner/repo`.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit cannot be fetched.
    fn get_commit<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        sha: &'a str,
    ) -> PortFuture<'a, CommitInfo>;

    /// Downloads the raw content of `path` at `gitref`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist at that reference or the
    /// download fails.
    fn download_content<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        path: &'a str,
        gitref: &'a str,
    ) -> PortFuture<'a, String>;
}
