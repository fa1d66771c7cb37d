//! Replaying adapter for the director port.

use std::sync::Mutex;

use super::{next_output, replay_result};
use crate::cassette::ports;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{DeploymentInfo, Director, PortFuture};

/// Serves recorded director results.
pub struct ReplayingDirector {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingDirector {
    /// Creates an adapter over `replayer`.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }
}

impl Director for ReplayingDirector {
    fn list_deployments(&self) -> PortFuture<'_, Vec<DeploymentInfo>> {
        let result = next_output(&self.replayer, ports::DIRECTOR, "list_deployments")
            .and_then(replay_result::<Vec<DeploymentInfo>>);
        Box::pin(async move { result })
    }

    fn deployment_manifest<'a>(&'a self, _name: &'a str) -> PortFuture<'a, String> {
        let result = next_output(&self.replayer, ports::DIRECTOR, "deployment_manifest")
            .and_then(replay_result::<String>);
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::{Cassette, Interaction};
    use chrono::Utc;
    use serde_json::json;

    #[tokio::test]
    async fn unconfigured_director_fails_every_call() {
        let director = ReplayingDirector::new(CassetteReplayer::default());
        assert!(director.list_deployments().await.is_err());
    }

    #[tokio::test]
    async fn replays_manifest() {
        let cassette = Cassette {
            name: "director".into(),
            recorded_at: Utc::now(),
            version: "0".into(),
            interactions: vec![Interaction {
                seq: 0,
                port: ports::DIRECTOR.into(),
                method: "deployment_manifest".into(),
                input: json!({"name": "cf"}),
                output: json!({"Ok": "manifest_version: 2\n"}),
            }],
        };
        let director = ReplayingDirector::new(CassetteReplayer::new(&cassette));
        assert_eq!(director.deployment_manifest("cf").await.unwrap(), "manifest_version: 2\n");
    }
}
