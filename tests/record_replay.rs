//! Full refresh cycles driven by cassettes.
//!
//! 1. Replay a recorded fleet and check the published drift.
//! 2. Record that replay through the recording adapters.
//! 3. Replay the new recording and check it yields the same snapshot.

mod common;

use std::sync::Arc;

use tokio::sync::watch;

use boshupdate::adapters::recording::{RecordingClock, RecordingDirector, RecordingSourceControl};
use boshupdate::cassette::config::CassetteConfig;
use boshupdate::cassette::session::RecordingSession;
use boshupdate::config::{Config, Settings};
use boshupdate::context::ServiceContext;
use boshupdate::correlate::DriftStatus;
use boshupdate::refresh::{RefreshScheduler, Snapshot};

fn settings() -> Settings {
    Config::parse(common::CONFIG).unwrap().resolve().unwrap()
}

async fn cycle(ctx: ServiceContext) -> Arc<Snapshot> {
    let (_tx, rx) = watch::channel(false);
    RefreshScheduler::new(ctx, settings(), rx).refresh().await.unwrap()
}

fn comparable(snapshot: &Snapshot) -> serde_json::Value {
    let mut value = serde_json::to_value(snapshot).unwrap();
    value.as_object_mut().unwrap().remove("duration");
    value
}

#[tokio::test]
async fn replayed_cycle_computes_drift() {
    let dir = common::fresh_dir("boshupdate_replay_cycle");
    common::write_fleet_cassettes(&dir);

    let ctx = ServiceContext::replaying(&CassetteConfig::from_dir(&dir)).unwrap();
    let snapshot = cycle(ctx).await;

    let app = &snapshot.manifest_releases[0];
    assert!(!app.has_error);
    assert_eq!(app.versions.len(), 2);
    assert_eq!(app.versions[1].expired_since, 2_000);
    let web = app.releases.iter().find(|r| r.name == "web").unwrap();
    assert_eq!(web.version, "2.1");
    assert!(app.manifest.as_deref().unwrap().contains("instances: 3"));

    assert!(snapshot.generic_releases[0].has_error);
    assert_eq!(snapshot.error_count(), 1);

    let deployment = &snapshot.drift.deployments[0];
    assert_eq!(deployment.deployment, "app-prod");
    assert_eq!(deployment.status, DriftStatus::Found);
    assert_eq!(deployment.latest_version, "2.0.0");

    let component = |name: &str| snapshot.drift.components.iter().find(|c| c.component_name == name).unwrap();
    assert_eq!(component("web").expired_since, 2_000);
    assert_eq!(component("db").expired_since, 0);
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn recording_a_replay_reproduces_the_snapshot() {
    let source = common::fresh_dir("boshupdate_rerecord_source");
    common::write_fleet_cassettes(&source);
    let target = common::fresh_dir("boshupdate_rerecord_target");

    let replayed = ServiceContext::replaying(&CassetteConfig::from_dir(&source)).unwrap();
    let session = RecordingSession::new(&target).unwrap();
    let recording = ServiceContext::new(
        Box::new(RecordingClock::new(replayed.clock, Arc::clone(&session.clock))),
        Box::new(RecordingSourceControl::new(replayed.scm, Arc::clone(&session.github))),
        Box::new(RecordingDirector::new(replayed.director, Arc::clone(&session.director))),
    );
    let first = cycle(recording).await;
    session.write().unwrap();

    let second = cycle(ServiceContext::replaying(&CassetteConfig::from_dir(&target)).unwrap()).await;
    assert_eq!(comparable(&first), comparable(&second));

    let third = cycle(ServiceContext::replaying(&CassetteConfig::from_dir(&target)).unwrap()).await;
    assert_eq!(comparable(&second), comparable(&third), "replay is deterministic");

    let _ = std::fs::remove_dir_all(&source);
    let _ = std::fs::remove_dir_all(&target);
}
