//! Director port for reading live deployment state.

use serde::{Deserialize, Serialize};

use super::PortFuture;

/// A deployment known to the director.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentInfo {
    /// Deployment name.
    pub name: String,
}

/// Read-only access to an already-authenticated BOSH director.
pub trait Director: Send + Sync {
    /// Lists all deployments.
    ///
    /// # Errors
    ///
    /// Returns an error if the director cannot be queried.
    fn list_deployments(&self) -> PortFuture<'_, Vec<DeploymentInfo>>;

    /// Returns the raw YAML manifest of the named deployment.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be fetched.
    fn deployment_manifest<'a>(&'a self, name: &'a str) -> PortFuture<'a, String>;
}
