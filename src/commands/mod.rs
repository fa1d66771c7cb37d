//! Command dispatch and handlers.

pub mod check;
pub mod report;
pub mod watch;

use std::env;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::cassette::config::CassetteConfig;
use crate::cassette::session::RecordingSession;
use crate::cli::Command;
use crate::config::{Config, Settings};
use crate::context::ServiceContext;
use crate::logging::init_logging;

/// Directory receiving per-port cassettes of a live run.
pub const RECORD_ENV: &str = "BOSHUPDATE_RECORD";
/// Cassette directory (or single cassette file) replayed instead of calling
/// GitHub and the director.
pub const REPLAY_ENV: &str = "BOSHUPDATE_REPLAY";

/// Dispatch a parsed command to its handler.
///
/// # Errors
///
/// Returns an error string if configuration is invalid or the selected
/// command handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    match command {
        Command::Check { config } => check::run(&config.config),
        Command::Report { config, yaml, metrics, naming } => {
            let settings = load_settings(&config.config)?;
            let format = report::OutputFormat::from_flags(*yaml, *metrics);
            runtime()?.block_on(report::run(settings, format, naming))
        }
        Command::Watch { config, naming } => {
            let settings = load_settings(&config.config)?;
            runtime()?.block_on(watch::run(settings, naming))
        }
    }
}

/// Loads and validates the configuration, then installs logging as it
/// configures.
fn load_settings(path: &Path) -> Result<Settings, String> {
    let settings = Config::load(path).and_then(|c| c.resolve()).map_err(|e| e.to_string())?;
    init_logging(&settings.log);
    Ok(settings)
}

fn runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("unable to start async runtime: {e}"))
}

/// Builds the service context selected by the environment: replayed
/// cassettes when `BOSHUPDATE_REPLAY` is set, a recorded live context when
/// `BOSHUPDATE_RECORD` is set, a live context otherwise.
pub(crate) async fn connect(settings: &Settings) -> Result<(ServiceContext, Option<RecordingSession>), String> {
    if let Ok(path) = env::var(REPLAY_ENV) {
        let path = PathBuf::from(path);
        let cassettes =
            if path.is_dir() { CassetteConfig::from_dir(&path) } else { CassetteConfig::monolithic(&path) };
        info!(path = %path.display(), "replaying cassettes");
        return Ok((ServiceContext::replaying(&cassettes)?, None));
    }
    if let Ok(dir) = env::var(RECORD_ENV) {
        let (ctx, session) = ServiceContext::recording(settings, Path::new(&dir)).await?;
        info!(dir = %dir, "recording port interactions");
        return Ok((ctx, Some(session)));
    }
    Ok((ServiceContext::live(settings).await?, None))
}

/// Writes the cassettes of a recording session, if any.
pub(crate) fn finish_recording(session: Option<&RecordingSession>) -> Result<(), String> {
    if let Some(session) = session {
        session.write()?;
        eprintln!("Recording saved to: {}", session.output_dir().display());
    }
    Ok(())
}
