//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the release engine and an
//! external system (time, the source-control API, the BOSH director).
//! Implementations live in `src/adapters/`.

pub mod clock;
pub mod director;
pub mod source_control;

use std::future::Future;
use std::pin::Pin;

use crate::error::PortError;

pub use clock::Clock;
pub use director::{DeploymentInfo, Director};
pub use source_control::{CommitInfo, ReleaseInfo, SourceControl, TagInfo};

/// Boxed future returned by async port methods, keeping the traits dyn-compatible.
pub type PortFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PortError>> + Send + 'a>>;
