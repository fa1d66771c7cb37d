//! GitHub REST adapter for the source-control port.

use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use serde::Deserialize;

use super::{status_error, REQUEST_TIMEOUT, USER_AGENT};
use crate::error::PortError;
use crate::ports::{CommitInfo, PortFuture, ReleaseInfo, SourceControl, TagInfo};

/// Public GitHub API.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const JSON: &str = "application/vnd.github+json";
const RAW: &str = "application/vnd.github.raw";
// Only the first page is read.
const PER_PAGE: &str = "100";

/// Source control backed by the GitHub REST API.
pub struct LiveGithub {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ReleaseResponse {
    tag_name: String,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    draft: bool,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct TagResponse {
    name: String,
    commit: ShaResponse,
}

#[derive(Deserialize)]
struct ShaResponse {
    sha: String,
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
    commit: CommitDetail,
}

#[derive(Deserialize)]
struct CommitDetail {
    committer: Option<Signature>,
}

#[derive(Deserialize)]
struct Signature {
    date: Option<DateTime<Utc>>,
}

impl LiveGithub {
    /// Creates a client authenticating with `token` (anonymous when empty).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(token: impl Into<String>) -> Result<Self, PortError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { base_url: DEFAULT_API_URL.to_string(), token: token.into(), client })
    }

    /// Points the client at another API root, e.g. GitHub Enterprise.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
        accept: &str,
    ) -> Result<reqwest::Response, PortError> {
        let url = format!("{}{path}", self.base_url.trim_end_matches('/'));
        let mut request = self.client.get(url).query(query).header(ACCEPT, accept);
        if !self.token.is_empty() {
            request = request.bearer_auth(&self.token);
        }
        let response = request.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(status_error(response).await)
        }
    }
}

impl SourceControl for LiveGithub {
    fn list_releases<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
    ) -> PortFuture<'a, Vec<ReleaseInfo>> {
        Box::pin(async move {
            let path = format!("/repos/{owner}/{repo}/releases");
            let releases: Vec<ReleaseResponse> =
                self.get(&path, &[("per_page", PER_PAGE)], JSON).await?.json().await?;
            Ok(releases
                .into_iter()
                .map(|r| ReleaseInfo {
                    tag_name: r.tag_name,
                    prerelease: r.prerelease,
                    draft: r.draft,
                    created_at: r.created_at.map_or(0, |t| t.timestamp()),
                })
                .collect())
        })
    }

    fn list_tags<'a>(&'a self, owner: &'a str, repo: &'a str) -> PortFuture<'a, Vec<TagInfo>> {
        Box::pin(async move {
            let path = format!("/repos/{owner}/{repo}/tags");
            let tags: Vec<TagResponse> =
                self.get(&path, &[("per_page", PER_PAGE)], JSON).await?.json().await?;
            Ok(tags.into_iter().map(|t| TagInfo { name: t.name, commit_sha: t.commit.sha }).collect())
        })
    }

    fn get_commit<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        sha: &'a str,
    ) -> PortFuture<'a, CommitInfo> {
        Box::pin(async move {
            let path = format!("/repos/{owner}/{repo}/commits/{sha}");
            let commit: CommitResponse = self.get(&path, &[], JSON).await?.json().await?;
            let committer_date =
                commit.commit.committer.and_then(|c| c.date).map_or(0, |d| d.timestamp());
            Ok(CommitInfo { sha: commit.sha, committer_date })
        })
    }

    fn download_content<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        path: &'a str,
        gitref: &'a str,
    ) -> PortFuture<'a, String> {
        Box::pin(async move {
            let url_path = format!("/repos/{owner}/{repo}/contents/{}", path.trim_start_matches('/'));
            let response = self.get(&url_path, &[("ref", gitref)], RAW).await?;
            Ok(response.text().await?)
        })
    }
}
