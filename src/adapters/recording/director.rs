//! Recording adapter for the director port.

use serde_json::json;

use super::record_result;
use crate::cassette::ports;
use crate::cassette::session::SharedRecorder;
use crate::ports::{DeploymentInfo, Director, PortFuture};

/// Records every director call of the wrapped adapter.
pub struct RecordingDirector {
    inner: Box<dyn Director>,
    recorder: SharedRecorder,
}

impl RecordingDirector {
    /// Wraps `inner`, appending to `recorder`.
    pub fn new(inner: Box<dyn Director>, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }
}

impl Director for RecordingDirector {
    fn list_deployments(&self) -> PortFuture<'_, Vec<DeploymentInfo>> {
        Box::pin(async move {
            let result = self.inner.list_deployments().await;
            record_result(&self.recorder, ports::DIRECTOR, "list_deployments", &(), &result);
            result
        })
    }

    fn deployment_manifest<'a>(&'a self, name: &'a str) -> PortFuture<'a, String> {
        Box::pin(async move {
            let result = self.inner.deployment_manifest(name).await;
            let input = json!({ "name": name });
            record_result(&self.recorder, ports::DIRECTOR, "deployment_manifest", &input, &result);
            result
        })
    }
}
