//! One refresh cycle: catalogs, deployments, drift.

use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, error, info};

use super::Snapshot;
use crate::config::Settings;
use crate::context::ServiceContext;
use crate::correlate::correlate;
use crate::deployment::collect_deployments;
use crate::release::{build_catalog, build_manifest_catalog};

fn cancelled(cancel: &watch::Receiver<bool>) -> bool {
    *cancel.borrow()
}

/// Runs one refresh cycle.
///
/// Sources are processed one at a time, manifest sources first, each family
/// in name order. `cancel` is checked between sources; once it reads `true`
/// the cycle stops and returns `None` so that nothing partial is published.
pub async fn run_cycle(
    ctx: &ServiceContext,
    settings: &Settings,
    cancel: &watch::Receiver<bool>,
) -> Option<Snapshot> {
    let timestamp = ctx.clock.now();
    let started = Instant::now();
    debug!(%timestamp, "starting refresh cycle");

    let mut manifest_releases = Vec::with_capacity(settings.manifest_sources.len());
    for source in &settings.manifest_sources {
        if cancelled(cancel) {
            info!("refresh cancelled");
            return None;
        }
        manifest_releases.push(build_manifest_catalog(ctx.scm.as_ref(), source).await);
    }

    let mut generic_releases = Vec::with_capacity(settings.generic_sources.len());
    for source in &settings.generic_sources {
        if cancelled(cancel) {
            info!("refresh cancelled");
            return None;
        }
        generic_releases.push(build_catalog(ctx.scm.as_ref(), source).await);
    }

    if cancelled(cancel) {
        info!("refresh cancelled");
        return None;
    }
    let (deployments, deployments_error) =
        match collect_deployments(ctx.director.as_ref(), &settings.excludes).await {
            Ok(records) => (records, false),
            Err(e) => {
                error!(error = %e, "unable to get bosh deployments");
                (Vec::new(), true)
            }
        };

    let sources: Vec<_> = settings.manifest_sources.iter().zip(&manifest_releases).collect();
    let drift = correlate(&deployments, &sources);

    let snapshot = Snapshot {
        timestamp,
        duration: started.elapsed(),
        generic_releases,
        manifest_releases,
        deployments,
        deployments_error,
        drift,
    };
    info!(
        errors = snapshot.error_count(),
        deployments = snapshot.deployments.len(),
        elapsed_ms = u64::try_from(snapshot.duration.as_millis()).unwrap_or(u64::MAX),
        "refresh cycle complete"
    );
    Some(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{release, ManualClock, MemoryDirector, MemorySourceControl};
    use crate::config::Config;
    use crate::correlate::DriftStatus;

    const CONFIG: &str = r#"
bosh: { url: "https://director:25555" }
github:
  token: test
  manifest_releases:
    app:
      owner: acme
      repo: app-deployment
      manifest: manifest.yml
  generic_releases:
    cli: { owner: acme, repo: cli }
"#;

    const MANIFEST: &str = "\
manifest_version: v2.0.0
releases:
- name: web
  version: \"2\"
";

    fn settings() -> Settings {
        Config::parse(CONFIG).unwrap().resolve().unwrap()
    }

    fn context(director: MemoryDirector) -> ServiceContext {
        let scm = MemorySourceControl::new()
            .with_releases("acme/app-deployment", vec![release("v2.0.0", 200), release("v1.0.0", 100)])
            .with_file("acme/app-deployment", "v2.0.0", "manifest.yml", MANIFEST)
            .with_failing_releases("acme/cli", "500 Internal Server Error");
        ServiceContext::new(Box::new(ManualClock::at(5_000)), Box::new(scm), Box::new(director))
    }

    #[tokio::test]
    async fn cycle_builds_catalogs_and_drift() {
        let director = MemoryDirector::new().with_deployment(
            "app-prod",
            "manifest_name: app\nmanifest_version: v1.0.0\nreleases:\n- name: web\n  version: \"1\"\n",
        );
        let (_tx, rx) = watch::channel(false);
        let snapshot = run_cycle(&context(director), &settings(), &rx).await.unwrap();

        assert_eq!(snapshot.timestamp.timestamp(), 5_000);
        assert_eq!(snapshot.manifest_releases[0].latest.version, "2.0.0");
        assert!(!snapshot.manifest_releases[0].has_error);
        assert!(snapshot.generic_releases[0].has_error);
        assert!(!snapshot.deployments_error);

        let drift = &snapshot.drift.deployments[0];
        assert_eq!(drift.status, DriftStatus::Found);
        assert_eq!(drift.expired_since, 200);
        assert_eq!(snapshot.drift.components[0].component_latest, "2");
        assert_eq!(snapshot.error_count(), 1);
    }

    #[tokio::test]
    async fn unreachable_director_still_publishes_catalogs() {
        let (_tx, rx) = watch::channel(false);
        let snapshot = run_cycle(&context(MemoryDirector::unreachable()), &settings(), &rx).await.unwrap();
        assert!(snapshot.deployments_error);
        assert!(snapshot.deployments.is_empty());
        assert_eq!(snapshot.manifest_releases.len(), 1);
    }

    #[tokio::test]
    async fn cancelled_cycle_publishes_nothing() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        assert!(run_cycle(&context(MemoryDirector::new()), &settings(), &rx).await.is_none());
    }
}
