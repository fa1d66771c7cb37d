//! In-memory adapters used by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use crate::error::PortError;
use crate::ports::{
    Clock, CommitInfo, DeploymentInfo, Director, PortFuture, ReleaseInfo, SourceControl, TagInfo,
};

fn repo_key(owner: &str, repo: &str) -> String {
    format!("{owner}/{repo}")
}

/// Source-control fixture keyed by `owner/repo`.
#[derive(Default)]
pub(crate) struct MemorySourceControl {
    releases: HashMap<String, Result<Vec<ReleaseInfo>, String>>,
    tags: HashMap<String, Result<Vec<TagInfo>, String>>,
    commits: HashMap<String, CommitInfo>,
    files: HashMap<(String, String, String), String>,
    release_calls: Arc<AtomicUsize>,
}

impl MemorySourceControl {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_releases(mut self, slug: &str, releases: Vec<ReleaseInfo>) -> Self {
        self.releases.insert(slug.to_string(), Ok(releases));
        self
    }

    pub(crate) fn with_failing_releases(mut self, slug: &str, message: &str) -> Self {
        self.releases.insert(slug.to_string(), Err(message.to_string()));
        self
    }

    pub(crate) fn with_tags(mut self, slug: &str, tags: Vec<TagInfo>) -> Self {
        self.tags.insert(slug.to_string(), Ok(tags));
        self
    }

    pub(crate) fn with_commit(mut self, sha: &str, committer_date: i64) -> Self {
        self.commits.insert(sha.to_string(), CommitInfo { sha: sha.to_string(), committer_date });
        self
    }

    pub(crate) fn with_file(mut self, slug: &str, gitref: &str, path: &str, content: &str) -> Self {
        self.files.insert((slug.to_string(), gitref.to_string(), path.to_string()), content.into());
        self
    }

    /// Shared counter of `list_releases` calls, readable after the fixture is boxed.
    pub(crate) fn release_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.release_calls)
    }
}

pub(crate) fn release(tag: &str, created_at: i64) -> ReleaseInfo {
    ReleaseInfo { tag_name: tag.to_string(), prerelease: false, draft: false, created_at }
}

impl SourceControl for MemorySourceControl {
    fn list_releases<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
    ) -> PortFuture<'a, Vec<ReleaseInfo>> {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        let result: Result<Vec<ReleaseInfo>, PortError> = match self.releases.get(&repo_key(owner, repo)) {
            Some(Ok(releases)) => Ok(releases.clone()),
            Some(Err(message)) => Err(message.clone().into()),
            None => Ok(Vec::new()),
        };
        Box::pin(async move { result })
    }

    fn list_tags<'a>(&'a self, owner: &'a str, repo: &'a str) -> PortFuture<'a, Vec<TagInfo>> {
        let result: Result<Vec<TagInfo>, PortError> = match self.tags.get(&repo_key(owner, repo)) {
            Some(Ok(tags)) => Ok(tags.clone()),
            Some(Err(message)) => Err(message.clone().into()),
            None => Ok(Vec::new()),
        };
        Box::pin(async move { result })
    }

    fn get_commit<'a>(
        &'a self,
        _owner: &'a str,
        _repo: &'a str,
        sha: &'a str,
    ) -> PortFuture<'a, CommitInfo> {
        let result: Result<CommitInfo, PortError> =
            self.commits.get(sha).cloned().ok_or_else(|| format!("no commit {sha}").into());
        Box::pin(async move { result })
    }

    fn download_content<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        path: &'a str,
        gitref: &'a str,
    ) -> PortFuture<'a, String> {
        let key = (repo_key(owner, repo), gitref.to_string(), path.to_string());
        let result: Result<String, PortError> =
            self.files.get(&key).cloned().ok_or_else(|| format!("404 Not Found: {path}").into());
        Box::pin(async move { result })
    }
}

/// Director fixture: deployment name to manifest (or manifest error).
#[derive(Default)]
pub(crate) struct MemoryDirector {
    deployments: Vec<(String, Result<String, String>)>,
    unreachable: bool,
}

impl MemoryDirector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_deployment(mut self, name: &str, manifest: &str) -> Self {
        self.deployments.push((name.to_string(), Ok(manifest.to_string())));
        self
    }

    pub(crate) fn with_broken_deployment(mut self, name: &str, message: &str) -> Self {
        self.deployments.push((name.to_string(), Err(message.to_string())));
        self
    }

    pub(crate) fn unreachable() -> Self {
        Self { deployments: Vec::new(), unreachable: true }
    }
}

impl Director for MemoryDirector {
    fn list_deployments(&self) -> PortFuture<'_, Vec<DeploymentInfo>> {
        let result: Result<Vec<DeploymentInfo>, PortError> = if self.unreachable {
            Err("connection refused".into())
        } else {
            Ok(self
                .deployments
                .iter()
                .map(|(name, _)| DeploymentInfo { name: name.clone() })
                .collect())
        };
        Box::pin(async move { result })
    }

    fn deployment_manifest<'a>(&'a self, name: &'a str) -> PortFuture<'a, String> {
        let result: Result<String, PortError> = match self.deployments.iter().find(|(n, _)| n == name) {
            Some((_, Ok(manifest))) => Ok(manifest.clone()),
            Some((_, Err(message))) => Err(message.clone().into()),
            None => Err(format!("deployment '{name}' doesn't exist").into()),
        };
        Box::pin(async move { result })
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Clone)]
pub(crate) struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub(crate) fn at(timestamp: i64) -> Self {
        let now = DateTime::from_timestamp(timestamp, 0).expect("valid timestamp");
        Self { now: Arc::new(Mutex::new(now)) }
    }

    pub(crate) fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock poisoned")
    }
}
