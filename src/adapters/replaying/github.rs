//! Replaying adapter for the source-control port.

use std::sync::Mutex;

use super::{next_output, replay_result};
use crate::cassette::ports;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{CommitInfo, PortFuture, ReleaseInfo, SourceControl, TagInfo};

/// Serves recorded source-control results. Arguments are not checked against
/// the recording; calls must come in the recorded order per method.
pub struct ReplayingSourceControl {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingSourceControl {
    /// Creates an adapter over `replayer`.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }

    fn replay<T: serde::de::DeserializeOwned>(&self, method: &str) -> Result<T, crate::error::PortError> {
        replay_result(next_output(&self.replayer, ports::GITHUB, method)?)
    }
}

impl SourceControl for ReplayingSourceControl {
    fn list_releases<'a>(
        &'a self,
        _owner: &'a str,
        _repo: &'a str,
    ) -> PortFuture<'a, Vec<ReleaseInfo>> {
        let result = self.replay::<Vec<ReleaseInfo>>("list_releases");
        Box::pin(async move { result })
    }

    fn list_tags<'a>(&'a self, _owner: &'a str, _repo: &'a str) -> PortFuture<'a, Vec<TagInfo>> {
        let result = self.replay::<Vec<TagInfo>>("list_tags");
        Box::pin(async move { result })
    }

    fn get_commit<'a>(
        &'a self,
        _owner: &'a str,
        _repo: &'a str,
        _sha: &'a str,
    ) -> PortFuture<'a, CommitInfo> {
        let result = self.replay::<CommitInfo>("get_commit");
        Box::pin(async move { result })
    }

    fn download_content<'a>(
        &'a self,
        _owner: &'a str,
        _repo: &'a str,
        _path: &'a str,
        _gitref: &'a str,
    ) -> PortFuture<'a, String> {
        let result = self.replay::<String>("download_content");
        Box::pin(async move { result })
    }
}
