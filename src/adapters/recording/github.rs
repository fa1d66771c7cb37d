//! Recording adapter for the source-control port.

use serde_json::json;

use super::record_result;
use crate::cassette::ports;
use crate::cassette::session::SharedRecorder;
use crate::ports::{CommitInfo, PortFuture, ReleaseInfo, SourceControl, TagInfo};

/// Records every source-control call of the wrapped adapter.
pub struct RecordingSourceControl {
    inner: Box<dyn SourceControl>,
    recorder: SharedRecorder,
}

impl RecordingSourceControl {
    /// Wraps `inner`, appending to `recorder`.
    pub fn new(inner: Box<dyn SourceControl>, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }
}

impl SourceControl for RecordingSourceControl {
    fn list_releases<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
    ) -> PortFuture<'a, Vec<ReleaseInfo>> {
        Box::pin(async move {
            let result = self.inner.list_releases(owner, repo).await;
            let input = json!({ "owner": owner, "repo": repo });
            record_result(&self.recorder, ports::GITHUB, "list_releases", &input, &result);
            result
        })
    }

    fn list_tags<'a>(&'a self, owner: &'a str, repo: &'a str) -> PortFuture<'a, Vec<TagInfo>> {
        Box::pin(async move {
            let result = self.inner.list_tags(owner, repo).await;
            let input = json!({ "owner": owner, "repo": repo });
            record_result(&self.recorder, ports::GITHUB, "list_tags", &input, &result);
            result
        })
    }

    fn get_commit<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        sha: &'a str,
    ) -> PortFuture<'a, CommitInfo> {
        Box::pin(async move {
            let result = self.inner.get_commit(owner, repo, sha).await;
            let input = json!({ "owner": owner, "repo": repo, "sha": sha });
            record_result(&self.recorder, ports::GITHUB, "get_commit", &input, &result);
            result
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
            let result = self.inner.download_content(owner, repo, path, gitref).await;
            let input = json!({ "owner": owner, "repo": repo, "path": path, "ref": gitref });
            record_result(&self.recorder, ports::GITHUB, "download_content", &input, &result);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{release, MemorySourceControl};
    use crate::cassette::recorder::CassetteRecorder;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn successes_and_failures_use_ok_err_outputs() {
        let path = std::env::temp_dir().join("boshupdate_rec_github_test.cassette.yaml");
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(&path, ports::GITHUB)));
        let inner = MemorySourceControl::new().with_releases("acme/widget", vec![release("v1.0.0", 100)]);
        let scm = RecordingSourceControl::new(Box::new(inner), Arc::clone(&recorder));

        assert_eq!(scm.list_releases("acme", "widget").await.unwrap().len(), 1);
        assert!(scm.download_content("acme", "widget", "missing.yml", "v1.0.0").await.is_err());

        let guard = recorder.lock().unwrap();
        assert_eq!(guard.len(), 2);
        guard.write().unwrap();
        drop(guard);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Ok"), "{content}");
        assert!(content.contains("Err"), "{content}");
        assert!(content.contains("missing.yml"), "{content}");
        let _ = std::fs::remove_file(&path);
    }
}
