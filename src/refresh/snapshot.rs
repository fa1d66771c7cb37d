//! The immutable result of one refresh cycle.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::correlate::Correlation;
use crate::deployment::DeploymentRecord;
use crate::release::ReleaseCatalog;

/// Everything one refresh cycle computed. Readers share it behind an `Arc`;
/// a new cycle replaces it wholesale.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    /// Clock reading taken when the cycle started. The epoch for the
    /// placeholder published before the first cycle.
    pub timestamp: DateTime<Utc>,
    /// Wall time the cycle took.
    #[serde(serialize_with = "as_secs_f64")]
    pub duration: Duration,
    /// Catalogs of the version-only sources, sorted by name.
    pub generic_releases: Vec<ReleaseCatalog>,
    /// Catalogs of the manifest sources, sorted by name.
    pub manifest_releases: Vec<ReleaseCatalog>,
    /// Deployment records, in director order.
    pub deployments: Vec<DeploymentRecord>,
    /// Set when the deployment list itself could not be read.
    pub deployments_error: bool,
    /// Drift computed from the catalogs and deployments above.
    pub drift: Correlation,
}

fn as_secs_f64<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl Snapshot {
    /// `true` for the placeholder published before the first cycle.
    #[must_use]
    pub fn is_initial(&self) -> bool {
        self.timestamp.timestamp() == 0
    }

    /// `true` once more than `interval` has passed since the cycle started.
    /// A timestamp in the future never counts as stale.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        (now - self.timestamp).to_std().is_ok_and(|age| age > interval)
    }

    /// Number of entities flagged as errored, counting a failed deployment
    /// listing once.
    #[must_use]
    pub fn error_count(&self) -> usize {
        let catalogs = self.generic_releases.iter().chain(&self.manifest_releases).filter(|c| c.has_error).count();
        let deployments = self.deployments.iter().filter(|d| d.has_error).count();
        catalogs + deployments + usize::from(self.deployments_error)
    }
}
