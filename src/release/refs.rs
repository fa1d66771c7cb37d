//! Reference discovery: releases and tags of a source, ranked by time.

use tracing::{debug, warn};

use super::{GitRef, RefType, ReleaseSource};
use crate::error::EngineError;
use crate::ports::{ReleaseInfo, SourceControl};

/// Decides whether a listed release is kept for `source`.
///
/// A pre-release or draft is kept when the source accepts that kind. The
/// three clauses are evaluated independently, so a release that is neither
/// a pre-release nor a draft also passes the first two clauses whenever the
/// source accepts neither of those kinds.
#[must_use]
pub fn accepts_release(source: &ReleaseSource, release: &ReleaseInfo) -> bool {
    release.prerelease == source.accepts(RefType::PreRelease)
        || release.draft == source.accepts(RefType::DraftRelease)
        || (!release.prerelease && !release.draft && source.accepts(RefType::Release))
}

/// Lists the candidate references of `source`, newest first.
///
/// Tags are only listed when the source accepts [`RefType::Tag`]. A tag
/// whose commit cannot be looked up keeps a timestamp of 0.
///
/// # Errors
///
/// Returns [`EngineError::Fetch`] if listing releases or tags fails. An empty
/// result is not an error at this level.
pub async fn resolve_refs(
    scm: &dyn SourceControl,
    source: &ReleaseSource,
) -> Result<Vec<GitRef>, EngineError> {
    let (owner, repo) = (source.owner.as_str(), source.repo.as_str());

    let releases = scm
        .list_releases(owner, repo)
        .await
        .map_err(|e| EngineError::fetch(format!("releases of {owner}/{repo}"), &e))?;

    let mut refs: Vec<GitRef> = releases
        .iter()
        .filter(|r| accepts_release(source, r))
        .map(|r| GitRef { name: r.tag_name.clone(), time: r.created_at })
        .collect();

    if source.accepts(RefType::Tag) {
        let tags = scm
            .list_tags(owner, repo)
            .await
            .map_err(|e| EngineError::fetch(format!("tags of {owner}/{repo}"), &e))?;
        for tag in tags {
            let time = match scm.get_commit(owner, repo, &tag.commit_sha).await {
                Ok(commit) => commit.committer_date,
                Err(e) => {
                    warn!(tag = %tag.name, error = %e, "unable to read tag commit, using time 0");
                    0
                }
            };
            refs.push(GitRef { name: tag.name, time });
        }
    }

    refs.sort_by(|a, b| b.time.cmp(&a.time));
    debug!(count = refs.len(), "resolved references");
    Ok(refs)
}
