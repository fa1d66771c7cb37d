//! Gauges describing a snapshot, exported through a Prometheus recorder.
//!
//! The recorder is owned by the [`Reporter`] and used as a local recorder,
//! so nothing is installed globally.

use metrics::{describe_gauge, gauge, Label};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusRecorder};
use tracing::warn;

use crate::refresh::Snapshot;

/// Default metric name prefix.
pub const DEFAULT_NAMESPACE: &str = "boshupdate";

/// Label carried by every sample.
pub const ENVIRONMENT_LABEL: &str = "environment";

/// A gauge family: metric name without namespace, help text and label names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Family {
    /// Metric name, prefixed with the namespace when exported.
    pub name: &'static str,
    /// `# HELP` text.
    pub help: &'static str,
    /// Label names, in sample order.
    pub labels: &'static [&'static str],
}

/// Every family the reporter exports.
pub mod families {
    use super::Family;

    /// Drift of each version of each manifest source.
    pub const MANIFEST_RELEASE: Family = Family {
        name: "manifest_release",
        help: "Seconds from epoch since deployment release is out of date, (0 means up to date)",
        labels: &["name", "version", "owner", "repo"],
    };

    /// Releases requested by the latest manifest of each manifest source.
    pub const MANIFEST_BOSH_RELEASE_INFO: Family = Family {
        name: "manifest_bosh_release_info",
        help: "Informational metric that gives the bosh release versions requests by the latest version of a manifest release, (always 0)",
        labels: &[
            "manifest_name",
            "manifest_version",
            "owner",
            "repo",
            "boshrelease_name",
            "boshrelease_version",
            "boshrelease_url",
        ],
    };

    /// Drift of each version of each generic source.
    pub const GENERIC_RELEASE: Family = Family {
        name: "generic_release",
        help: "Seconds from epoch since github release is out of date, (0 means up to date)",
        labels: &["name", "version", "owner", "repo"],
    };

    /// Drift of each deployment.
    pub const DEPLOYMENT_STATUS: Family = Family {
        name: "deployment_status",
        help: "Seconds from epoch since this deployment is out of date, (0 means up to date)",
        labels: &["deployment", "name", "current", "latest"],
    };

    /// Drift of each release of each deployment.
    pub const DEPLOYMENT_BOSH_RELEASE_STATUS: Family = Family {
        name: "deployment_bosh_release_status",
        help: "Seconds from epoch since this bosh release is out of date, (0 means up to date)",
        labels: &[
            "deployment",
            "manifest_name",
            "manifest_current",
            "manifest_latest",
            "boshrelease_name",
            "boshrelease_current",
            "boshrelease_latest",
        ],
    };

    /// Timestamp of the observed snapshot.
    pub const LAST_SCRAPE_TIMESTAMP: Family = Family {
        name: "last_scrape_timestamp",
        help: "Seconds from epoch since last scrape of metrics from boshupdate.",
        labels: &[],
    };

    /// Errored entities in the observed snapshot.
    pub const LAST_SCRAPE_ERROR: Family =
        Family { name: "last_scrape_error", help: "Number of errors in last scrape of metrics.", labels: &[] };

    /// Duration of the observed cycle, in seconds.
    pub const LAST_SCRAPE_DURATION: Family =
        Family { name: "last_scrape_duration", help: "Duration of the last scrape.", labels: &[] };

    /// All families, in export order.
    pub const ALL: [Family; 8] = [
        MANIFEST_RELEASE,
        MANIFEST_BOSH_RELEASE_INFO,
        GENERIC_RELEASE,
        DEPLOYMENT_STATUS,
        DEPLOYMENT_BOSH_RELEASE_STATUS,
        LAST_SCRAPE_TIMESTAMP,
        LAST_SCRAPE_ERROR,
        LAST_SCRAPE_DURATION,
    ];
}

/// Owns the Prometheus recorder and refills it from snapshots.
pub struct Reporter {
    namespace: String,
    environment: String,
    recorder: PrometheusRecorder,
}

impl Reporter {
    /// Creates an empty reporter naming metrics `<namespace>_<family>`, each
    /// sample carrying an `environment` label.
    #[must_use]
    pub fn new(namespace: &str, environment: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            environment: environment.to_string(),
            recorder: Self::build_recorder(environment),
        }
    }

    fn build_recorder(environment: &str) -> PrometheusRecorder {
        PrometheusBuilder::new().add_global_label(ENVIRONMENT_LABEL, environment).build_recorder()
    }

    /// Exported name of `family`.
    #[must_use]
    pub fn metric_name(&self, family: &Family) -> String {
        if self.namespace.is_empty() {
            family.name.to_string()
        } else {
            format!("{}_{}", self.namespace, family.name)
        }
    }

    /// Replaces every sample with the content of `snapshot`.
    ///
    /// Errored catalogs and deployments produce no samples and are counted
    /// in `last_scrape_error` instead.
    pub fn observe(&mut self, snapshot: &Snapshot) {
        // A fresh recorder drops label sets that vanished since the last cycle.
        let recorder = Self::build_recorder(&self.environment);
        metrics::with_local_recorder(&recorder, || {
            for family in &families::ALL {
                describe_gauge!(self.metric_name(family), family.help);
            }
            self.record(snapshot);
        });
        self.recorder = recorder;
    }

    /// Renders every sample in the Prometheus text format.
    #[must_use]
    pub fn render_text(&self) -> String {
        self.recorder.handle().render()
    }

    fn set(&self, family: &Family, values: &[&str], value: f64) {
        debug_assert_eq!(values.len(), family.labels.len(), "label count mismatch for {}", family.name);
        let labels: Vec<Label> =
            family.labels.iter().zip(values).map(|(key, value)| Label::new(*key, (*value).to_string())).collect();
        gauge!(self.metric_name(family), labels).set(value);
    }

    #[allow(clippy::cast_precision_loss)]
    fn record(&self, snapshot: &Snapshot) {
        use families::{
            DEPLOYMENT_BOSH_RELEASE_STATUS, DEPLOYMENT_STATUS, GENERIC_RELEASE, LAST_SCRAPE_DURATION,
            LAST_SCRAPE_ERROR, LAST_SCRAPE_TIMESTAMP, MANIFEST_BOSH_RELEASE_INFO, MANIFEST_RELEASE,
        };

        for catalog in &snapshot.manifest_releases {
            if catalog.has_error {
                warn!(source = %catalog.name, "error during analysis of manifest release");
                continue;
            }
            for v in &catalog.versions {
                self.set(
                    &MANIFEST_RELEASE,
                    &[&catalog.name, &v.version, &catalog.owner, &catalog.repo],
                    v.expired_since as f64,
                );
            }
            for r in &catalog.releases {
                self.set(
                    &MANIFEST_BOSH_RELEASE_INFO,
                    &[&catalog.name, &catalog.latest.version, &catalog.owner, &catalog.repo, &r.name, &r.version, &r.url],
                    0.0,
                );
            }
        }

        for catalog in &snapshot.generic_releases {
            if catalog.has_error {
                warn!(source = %catalog.name, "error during analysis of generic release");
                continue;
            }
            for v in &catalog.versions {
                self.set(
                    &GENERIC_RELEASE,
                    &[&catalog.name, &v.version, &catalog.owner, &catalog.repo],
                    v.expired_since as f64,
                );
            }
        }

        for record in snapshot.deployments.iter().filter(|d| d.has_error) {
            warn!(deployment = %record.deployment, "error during analysis of deployment");
        }
        for d in &snapshot.drift.deployments {
            self.set(
                &DEPLOYMENT_STATUS,
                &[&d.deployment, &d.manifest_name, &d.current_version, &d.latest_version],
                d.expired_since as f64,
            );
        }
        for c in &snapshot.drift.components {
            self.set(
                &DEPLOYMENT_BOSH_RELEASE_STATUS,
                &[
                    &c.deployment,
                    &c.manifest_name,
                    &c.manifest_current,
                    &c.manifest_latest,
                    &c.component_name,
                    &c.component_current,
                    &c.component_latest,
                ],
                c.expired_since as f64,
            );
        }

        self.set(&LAST_SCRAPE_ERROR, &[], snapshot.error_count() as f64);
        self.set(&LAST_SCRAPE_TIMESTAMP, &[], snapshot.timestamp.timestamp() as f64);
        self.set(&LAST_SCRAPE_DURATION, &[], snapshot.duration.as_secs_f64());
    }
}
