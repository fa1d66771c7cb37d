//! Per-source version history, and for manifest sources the releases
//! requested by the latest manifest.

use serde::Serialize;
use tracing::{debug, error, info_span, warn, Instrument};

use super::{resolve_refs, Formatter, GitRef, ManifestSource, ReleaseSource, Version};
use crate::error::EngineError;
use crate::manifest::{extract_releases, BoshRelease, ManifestRenderer};
use crate::ports::SourceControl;

/// Which configuration family a catalog came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Version tracking only.
    Generic,
    /// Version tracking plus manifest rendering.
    Manifest,
}

/// Version history of one source for one refresh cycle.
///
/// An errored catalog is still published, with whatever stages succeeded
/// before the failure.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseCatalog {
    /// Configured source name.
    pub name: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Configuration family.
    pub kind: SourceKind,
    /// Versions, newest first.
    pub versions: Vec<Version>,
    /// Newest version; empty when no reference was found.
    pub latest: Version,
    /// Set when any stage of the build failed.
    pub has_error: bool,
    /// Releases requested by the rendered manifest of the latest version.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub releases: Vec<BoshRelease>,
    /// Rendered manifest text of the latest version.
    #[serde(skip)]
    pub manifest: Option<String>,
}

impl ReleaseCatalog {
    fn empty(source: &ReleaseSource, kind: SourceKind) -> Self {
        Self {
            name: source.name.clone(),
            owner: source.owner.clone(),
            repo: source.repo.clone(),
            kind,
            versions: Vec::new(),
            latest: Version::default(),
            has_error: false,
            releases: Vec::new(),
            manifest: None,
        }
    }

    /// Looks up a version by its display name.
    #[must_use]
    pub fn find_version(&self, version: &str) -> Option<&Version> {
        self.versions.iter().find(|v| v.version == version)
    }

    /// Looks up a requested release by name.
    #[must_use]
    pub fn find_release(&self, name: &str) -> Option<&BoshRelease> {
        self.releases.iter().find(|r| r.name == name)
    }
}

/// Turns ranked references into versions.
///
/// `refs` must already be sorted newest first. Each version expires at the
/// time of the version right before it; the newest never expires.
#[must_use]
pub fn build_versions(refs: &[GitRef], formatter: &Formatter) -> Vec<Version> {
    refs.iter()
        .enumerate()
        .map(|(idx, r)| {
            let mut version = Version::new(&r.name, formatter.format(&r.name), r.time);
            if idx > 0 {
                version.expired_since = refs[idx - 1].time;
            }
            version
        })
        .collect()
}

async fn fill_versions(
    scm: &dyn SourceControl,
    source: &ReleaseSource,
    catalog: &mut ReleaseCatalog,
) -> Result<(), EngineError> {
    let refs = resolve_refs(scm, source).await?;
    let newest = refs.first().ok_or(EngineError::NoReleaseFound)?;
    catalog.latest = Version::new(&newest.name, source.formatter.format(&newest.name), newest.time);
    catalog.versions = build_versions(&refs, &source.formatter);
    Ok(())
}

/// Builds the catalog of a version-only source.
///
/// Never fails: errors are logged and reported through `has_error`.
pub async fn build_catalog(scm: &dyn SourceControl, source: &ReleaseSource) -> ReleaseCatalog {
    let span = info_span!("release", source = %source.name, owner = %source.owner, repo = %source.repo);
    async {
        let mut catalog = ReleaseCatalog::empty(source, SourceKind::Generic);
        debug!("fetching release list");
        if let Err(e) = fill_versions(scm, source, &mut catalog).await {
            error!(error = %e, "skipping generic release");
            catalog.has_error = true;
        }
        catalog
    }
    .instrument(span)
    .await
}

/// Builds the catalog of a manifest source.
///
/// After the version history, the manifest is downloaded at the latest
/// reference, rendered with the source's ops and vars files, and the
/// `releases` it requests are extracted. A failure in those later stages
/// marks the catalog errored but keeps its versions.
pub async fn build_manifest_catalog(
    scm: &dyn SourceControl,
    source: &ManifestSource,
) -> ReleaseCatalog {
    let release = &source.release;
    let span = info_span!("manifest", source = %release.name, owner = %release.owner, repo = %release.repo);
    async {
        let mut catalog = ReleaseCatalog::empty(release, SourceKind::Manifest);
        debug!("fetching release list");
        if let Err(e) = fill_versions(scm, release, &mut catalog).await {
            error!(error = %e, "skipping manifest release");
            catalog.has_error = true;
            return catalog;
        }
        if source.manifest.is_empty() {
            return catalog;
        }

        let gitref = catalog.latest.gitref.clone();
        debug!(version = %catalog.latest.version, "downloading manifest");
        let content = match scm
            .download_content(&release.owner, &release.repo, &source.manifest, &gitref)
            .await
        {
            Ok(content) => content,
            Err(e) => {
                let e = EngineError::fetch(format!("manifest '{}'", source.manifest), &e);
                warn!(error = %e, "skipping manifest rendering");
                catalog.has_error = true;
                return catalog;
            }
        };

        let outcome = ManifestRenderer::new(scm, source, &gitref).render(&content).await;
        catalog.has_error |= outcome.has_error;

        debug!("extracting bosh release versions");
        match extract_releases(&outcome.manifest) {
            Ok(releases) => catalog.releases = releases,
            Err(e) => {
                warn!(error = %e, "unable to read releases of rendered manifest");
                catalog.has_error = true;
            }
        }
        catalog.manifest = Some(outcome.manifest);
        catalog
    }
    .instrument(span)
    .await
}
