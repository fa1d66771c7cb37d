//! `check`: validate a configuration file.

use std::path::Path;

use crate::config::Config;

/// Validates the configuration at `path` and prints a one-line summary.
///
/// # Errors
///
/// Returns the configuration error if the file is unreadable or invalid.
pub fn run(path: &Path) -> Result<(), String> {
    let config = Config::load(path).map_err(|e| e.to_string())?;
    let settings = config.resolve().map_err(|e| e.to_string())?;
    println!("{}", summary(&settings));
    Ok(())
}

fn summary(settings: &crate::config::Settings) -> String {
    format!(
        "configuration ok: {} manifest release(s), {} generic release(s), {} exclude filter(s), refresh every {}",
        settings.manifest_sources.len(),
        settings.generic_sources.len(),
        settings.excludes.len(),
        humantime::format_duration(settings.interval),
    )
}
