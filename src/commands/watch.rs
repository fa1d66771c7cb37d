//! `watch`: refresh periodically until interrupted.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::{connect, finish_recording};
use crate::cli::MetricsArgs;
use crate::config::Settings;
use crate::correlate::DriftStatus;
use crate::refresh::{RefreshScheduler, Snapshot};
use crate::report::Reporter;

/// Runs the refresh loop until Ctrl-C.
///
/// After every cycle the drift of each deployment is logged and the gauges
/// are rendered at debug level. When recording, cassettes are rewritten
/// after every cycle so an interrupted run keeps what it captured.
///
/// # Errors
///
/// Returns an error if the backends cannot be reached or the signal handler
/// cannot be installed.
pub async fn run(settings: Settings, naming: &MetricsArgs) -> Result<(), String> {
    let (ctx, session) = connect(&settings).await?;
    let (cancel_tx, cancel_rx) = watch::channel(false);
    info!(interval = %humantime::format_duration(settings.interval), "starting refresh loop");
    let scheduler = Arc::new(RefreshScheduler::new(ctx, settings, cancel_rx));

    let mut reporter = Reporter::new(&naming.namespace, &naming.environment);
    let refresh_loop = tokio::spawn(Arc::clone(&scheduler).run(move |snapshot| {
        log_drift(snapshot);
        reporter.observe(snapshot);
        debug!(metrics = %reporter.render_text(), "gauges");
        if let Err(e) = finish_recording(session.as_ref()) {
            error!(error = %e, "unable to write cassettes");
        }
    }));

    let signal = tokio::signal::ctrl_c().await;
    info!("shutting down");
    request_stop(&cancel_tx);
    refresh_loop.await.map_err(|e| format!("refresh loop failed: {e}"))?;
    signal.map_err(|e| format!("unable to listen for ctrl-c: {e}"))
}

/// Asks the refresh loop to stop. Returns `false` when the loop had already
/// exited and dropped its receiver.
fn request_stop(cancel: &watch::Sender<bool>) -> bool {
    match cancel.send(true) {
        Ok(()) => true,
        Err(_) => {
            debug!("refresh loop already stopped");
            false
        }
    }
}

/// Logs one line per deployment drift.
fn log_drift(snapshot: &Snapshot) {
    for drift in &snapshot.drift.deployments {
        match drift.status {
            DriftStatus::NotFound => warn!(
                deployment = %drift.deployment,
                manifest = %drift.manifest_name,
                current = %drift.current_version,
                "deployment version not found in any manifest release"
            ),
            DriftStatus::Found if drift.expired_since == 0 => info!(
                deployment = %drift.deployment,
                manifest = %drift.manifest_name,
                current = %drift.current_version,
                "deployment up to date"
            ),
            DriftStatus::Found => info!(
                deployment = %drift.deployment,
                manifest = %drift.manifest_name,
                current = %drift.current_version,
                latest = %drift.latest_version,
                expired_since = drift.expired_since,
                "deployment out of date"
            ),
        }
    }
    if snapshot.deployments_error {
        warn!("deployment list unavailable this cycle");
    }
}
