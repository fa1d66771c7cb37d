//! Deployment records read from the director.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info_span, Instrument};

use crate::error::EngineError;
use crate::manifest::{scalar_string, BoshRelease};
use crate::ports::Director;

/// What a live deployment declares about itself.
///
/// An errored record keeps only its deployment name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeploymentRecord {
    /// Director deployment name.
    pub deployment: String,
    /// Declared `manifest_name`, defaulting to the deployment name.
    pub manifest_name: String,
    /// Declared `manifest_version`, without a leading `v`.
    pub current_version: String,
    /// Set when the manifest could not be fetched or read.
    pub has_error: bool,
    /// Releases the deployment runs.
    pub releases: Vec<BoshRelease>,
}

impl DeploymentRecord {
    fn errored(deployment: &str) -> Self {
        Self { deployment: deployment.to_string(), has_error: true, ..Self::default() }
    }
}

#[derive(Deserialize)]
struct DeclaredManifest {
    #[serde(default, rename = "manifest_version", deserialize_with = "scalar_string")]
    version: String,
    #[serde(default, rename = "manifest_name")]
    name: String,
    #[serde(default)]
    releases: Vec<BoshRelease>,
}

/// Drops the first `v` of a declared version.
fn strip_v(version: &str) -> String {
    version.replacen('v', "", 1)
}

/// Builds the record of one deployment from its manifest text.
///
/// Returns `None` when the declared manifest name matches one of
/// `excludes`.
#[must_use]
pub fn parse_deployment(name: &str, manifest: &str, excludes: &[Regex]) -> Option<DeploymentRecord> {
    let declared: DeclaredManifest = match serde_yaml::from_str(manifest) {
        Ok(declared) => declared,
        Err(e) => {
            error!(deployment = %name, error = %EngineError::parse("deployment manifest", e), "unable to parse manifest");
            return Some(DeploymentRecord::errored(name));
        }
    };

    let manifest_name = if declared.name.is_empty() { name.to_string() } else { declared.name };
    if excludes.iter().any(|re| re.is_match(&manifest_name)) {
        debug!(deployment = %name, manifest = %manifest_name, "excluding deployment");
        return None;
    }
    if declared.version.is_empty() {
        error!(deployment = %name, "unable to find manifest version");
        return Some(DeploymentRecord::errored(name));
    }

    Some(DeploymentRecord {
        deployment: name.to_string(),
        manifest_name,
        current_version: strip_v(&declared.version),
        has_error: false,
        releases: declared.releases,
    })
}

/// Reads every deployment of the director.
///
/// A deployment whose manifest cannot be fetched or parsed is kept as an
/// errored record.
///
/// # Errors
///
/// Returns [`EngineError::Fetch`] if the deployment list itself cannot be
/// read.
pub async fn collect_deployments(
    director: &dyn Director,
    excludes: &[Regex],
) -> Result<Vec<DeploymentRecord>, EngineError> {
    async {
        debug!("processing bosh deployments");
        let deployments = director
            .list_deployments()
            .await
            .map_err(|e| EngineError::fetch("deployments", &e))?;

        let mut records = Vec::with_capacity(deployments.len());
        for deployment in deployments {
            debug!(deployment = %deployment.name, "processing bosh deployment");
            let record = match director.deployment_manifest(&deployment.name).await {
                Ok(manifest) => parse_deployment(&deployment.name, &manifest, excludes),
                Err(e) => {
                    error!(deployment = %deployment.name, error = %e, "unable to fetch manifest");
                    Some(DeploymentRecord::errored(&deployment.name))
                }
            };
            records.extend(record);
        }
        Ok(records)
    }
    .instrument(info_span!("deployments"))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryDirector;

    const CF: &str = "\
manifest_name: cf
manifest_version: v21.3.0
releases:
- name: capi
  version: 1.90.0
  url: https://bosh.io/capi
";

    #[test]
    fn leading_v_is_stripped() {
        let record = parse_deployment("cf-prod", CF, &[]).unwrap();
        assert_eq!(record.manifest_name, "cf");
        assert_eq!(record.current_version, "21.3.0");
        assert_eq!(record.releases.len(), 1);
        assert!(!record.has_error);
    }

    #[test]
    fn only_the_first_v_is_dropped() {
        assert_eq!(strip_v("21.3.0"), "21.3.0");
        assert_eq!(strip_v("release-v2"), "release-2");
        assert_eq!(strip_v("vv1"), "v1");
    }

    #[test]
    fn unquoted_versions_keep_their_text() {
        let record = parse_deployment(
            "app-prod",
            "manifest_name: app\nmanifest_version: 1.10\nreleases:\n- name: web\n  version: 2.10\n",
            &[],
        )
        .unwrap();
        assert_eq!(record.current_version, "1.10");
        assert_eq!(record.releases[0].version, "2.10");
    }

    #[test]
    fn manifest_name_defaults_to_deployment() {
        let record = parse_deployment("redis", "manifest_version: 3\n", &[]).unwrap();
        assert_eq!(record.manifest_name, "redis");
        assert_eq!(record.current_version, "3");
    }

    #[test]
    fn excluded_names_are_dropped() {
        let excludes = vec![Regex::new("^cf$").unwrap()];
        assert!(parse_deployment("cf-prod", CF, &excludes).is_none());
    }

    #[test]
    fn missing_version_or_bad_yaml_is_errored() {
        let record = parse_deployment("x", "manifest_name: x\n", &[]).unwrap();
        assert!(record.has_error);
        assert!(record.manifest_name.is_empty());
        let record = parse_deployment("y", "releases: [\n", &[]).unwrap();
        assert!(record.has_error);
    }

    #[tokio::test]
    async fn broken_manifest_does_not_stop_collection() {
        let director = MemoryDirector::new()
            .with_broken_deployment("bad", "timeout")
            .with_deployment("cf-prod", CF);
        let records = collect_deployments(&director, &[]).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].has_error);
        assert_eq!(records[1].current_version, "21.3.0");
    }

    #[tokio::test]
    async fn unreachable_director_is_a_fetch_error() {
        let err = collect_deployments(&MemoryDirector::unreachable(), &[]).await.unwrap_err();
        assert!(matches!(err, EngineError::Fetch { .. }));
    }
}
