//! Service context bundling the port trait objects.

use std::path::Path;
use std::sync::Arc;

use crate::adapters::live::{LiveClock, LiveDirector, LiveGithub};
use crate::adapters::recording::{RecordingClock, RecordingDirector, RecordingSourceControl};
use crate::adapters::replaying::{ReplayingClock, ReplayingDirector, ReplayingSourceControl};
use crate::cassette::config::CassetteConfig;
use crate::cassette::session::RecordingSession;
use crate::config::Settings;
use crate::ports::{Clock, Director, SourceControl};

/// Bundles the port trait objects a refresh cycle talks to.
///
/// Constructors wire live, recording or replaying adapters.
pub struct ServiceContext {
    /// Time source for snapshot timestamps and staleness checks.
    pub clock: Box<dyn Clock>,
    /// Source-control API.
    pub scm: Box<dyn SourceControl>,
    /// BOSH director.
    pub director: Box<dyn Director>,
}

impl ServiceContext {
    /// Creates a context from explicit adapters.
    #[must_use]
    pub fn new(clock: Box<dyn Clock>, scm: Box<dyn SourceControl>, director: Box<dyn Director>) -> Self {
        Self { clock, scm, director }
    }

    /// Creates a context talking to GitHub and the configured director.
    ///
    /// Connecting to the director selects its authentication scheme and,
    /// for UAA, obtains a first token.
    ///
    /// # Errors
    ///
    /// Returns an error if either client cannot be built or the director
    /// connection fails.
    pub async fn live(settings: &Settings) -> Result<Self, String> {
        let mut github = LiveGithub::new(settings.github_token.clone())
            .map_err(|e| format!("unable to create github client: {e}"))?;
        if let Some(url) = &settings.github_url {
            github = github.with_base_url(url.clone());
        }
        let director = LiveDirector::connect(&settings.bosh)
            .await
            .map_err(|e| format!("unable to connect to bosh director {}: {e}", settings.bosh.url))?;
        Ok(Self::new(Box::new(LiveClock), Box::new(github), Box::new(director)))
    }

    /// Creates a live context whose interactions are recorded to per-port
    /// cassettes in `dir`. Write them with [`RecordingSession::write`].
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the live
    /// context cannot be built.
    pub async fn recording(settings: &Settings, dir: &Path) -> Result<(Self, RecordingSession), String> {
        let session = RecordingSession::new(dir)?;
        let live = Self::live(settings).await?;
        let ctx = Self::new(
            Box::new(RecordingClock::new(live.clock, Arc::clone(&session.clock))),
            Box::new(RecordingSourceControl::new(live.scm, Arc::clone(&session.github))),
            Box::new(RecordingDirector::new(live.director, Arc::clone(&session.director))),
        );
        Ok((ctx, session))
    }

    /// Creates a context serving recorded cassettes instead of calling any
    /// backend.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured cassette cannot be loaded.
    pub fn replaying(config: &CassetteConfig) -> Result<Self, String> {
        let replayers = config.load_all()?;
        Ok(Self::new(
            Box::new(ReplayingClock::new(replayers.clock)),
            Box::new(ReplayingSourceControl::new(replayers.github)),
            Box::new(ReplayingDirector::new(replayers.director)),
        ))
    }
}
