//! Drift between live deployments and the manifest sources they come from.

use serde::Serialize;

use crate::deployment::DeploymentRecord;
use crate::error::EngineError;
use crate::release::{ManifestSource, ReleaseCatalog, Version};

/// Marker used in place of a version that could not be located.
pub const NOT_FOUND: &str = "not-found";

/// Whether a drift value could be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriftStatus {
    /// Located; the drift value is meaningful.
    Found,
    /// No source, version or release matched; drift is reported as 0.
    NotFound,
}

/// Drift of a whole deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentDrift {
    /// Director deployment name.
    pub deployment: String,
    /// Name of the matched source, or the declared manifest name when none matched.
    pub manifest_name: String,
    /// Declared version.
    pub current_version: String,
    /// Latest version of the matched source, or [`NOT_FOUND`].
    pub latest_version: String,
    /// Time the declared version was superseded; 0 when up to date.
    pub expired_since: i64,
    /// Whether the deployment was located.
    pub status: DriftStatus,
}

/// Drift of one release inside a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentDrift {
    /// Director deployment name.
    pub deployment: String,
    /// Name of the matched source.
    pub manifest_name: String,
    /// Declared deployment version.
    pub manifest_current: String,
    /// Latest version of the matched source.
    pub manifest_latest: String,
    /// Release name.
    pub component_name: String,
    /// Release version the deployment runs.
    pub component_current: String,
    /// Release version the latest manifest requests, or [`NOT_FOUND`].
    pub component_latest: String,
    /// 0 when up to date, otherwise the deployment's drift.
    pub expired_since: i64,
    /// Whether the release was located in the latest manifest.
    pub status: DriftStatus,
}

/// All drift records of one refresh cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Correlation {
    /// One entry per non-errored deployment.
    pub deployments: Vec<DeploymentDrift>,
    /// One entry per release of each located deployment.
    pub components: Vec<ComponentDrift>,
}

fn locate<'a>(
    record: &DeploymentRecord,
    sources: &[(&'a ManifestSource, &'a ReleaseCatalog)],
) -> Result<(&'a ReleaseCatalog, &'a Version), EngineError> {
    let catalog: &'a ReleaseCatalog = sources
        .iter()
        .find(|(source, _)| source.matches(&record.manifest_name))
        .map(|(_, catalog)| *catalog)
        .ok_or_else(|| EngineError::NotFound { what: format!("source for '{}'", record.manifest_name) })?;
    let version = catalog.find_version(&record.current_version).ok_or_else(|| EngineError::NotFound {
        what: format!("version '{}' of '{}'", record.current_version, catalog.name),
    })?;
    Ok((catalog, version))
}

/// Correlates deployments with manifest sources.
///
/// `sources` must be in evaluation order; the first source whose matchers
/// accept a deployment's manifest name is the only one searched for its
/// version. Errored deployments are skipped.
#[must_use]
pub fn correlate(
    records: &[DeploymentRecord],
    sources: &[(&ManifestSource, &ReleaseCatalog)],
) -> Correlation {
    let mut out = Correlation::default();
    for record in records.iter().filter(|r| !r.has_error) {
        let (catalog, version) = match locate(record, sources) {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!(deployment = %record.deployment, reason = %e, "deployment not correlated");
                out.deployments.push(DeploymentDrift {
                    deployment: record.deployment.clone(),
                    manifest_name: record.manifest_name.clone(),
                    current_version: record.current_version.clone(),
                    latest_version: NOT_FOUND.to_string(),
                    expired_since: 0,
                    status: DriftStatus::NotFound,
                });
                continue;
            }
        };

        out.deployments.push(DeploymentDrift {
            deployment: record.deployment.clone(),
            manifest_name: catalog.name.clone(),
            current_version: version.version.clone(),
            latest_version: catalog.latest.version.clone(),
            expired_since: version.expired_since,
            status: DriftStatus::Found,
        });

        for release in &record.releases {
            let (latest, expired_since, status) = match catalog.find_release(&release.name) {
                Some(wanted) if wanted.version == release.version => {
                    (wanted.version.clone(), 0, DriftStatus::Found)
                }
                Some(wanted) => (wanted.version.clone(), version.expired_since, DriftStatus::Found),
                None => (NOT_FOUND.to_string(), 0, DriftStatus::NotFound),
            };
            out.components.push(ComponentDrift {
                deployment: record.deployment.clone(),
                manifest_name: catalog.name.clone(),
                manifest_current: version.version.clone(),
                manifest_latest: catalog.latest.version.clone(),
                component_name: release.name.clone(),
                component_current: release.version.clone(),
                component_latest: latest,
                expired_since,
                status,
            });
        }
    }
    out
}
