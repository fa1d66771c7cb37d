//! Core library entry for the `boshupdate` CLI.
//!
//! Tracks how far BOSH deployments lag behind the GitHub releases of the
//! manifests they were deployed from. A refresh cycle resolves the version
//! history of every configured source, renders the latest manifest of each
//! manifest source, reads every deployment from the director and correlates
//! the two into drift records.

pub mod adapters;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod correlate;
pub mod deployment;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod ports;
pub mod refresh;
pub mod release;
pub mod report;

use clap::error::ErrorKind;
use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{err}");
            return Ok(());
        }
        Err(err) => return Err(err.to_string()),
    };
    commands::dispatch(&cli.command)
}

#[cfg(test)]
mod tests {
    use super::run;

    #[test]
    fn run_prints_help() {
        assert!(run(["boshupdate", "--help"]).is_ok());
    }

    #[test]
    fn run_errors_on_unknown_subcommand() {
        let result = run(["boshupdate", "unknown"]);
        assert!(result.is_err());
    }

    #[test]
    fn run_reports_invalid_configuration() {
        let err = run(["boshupdate", "check", "--config", "/nonexistent/config.yml"]).unwrap_err();
        assert!(err.contains("/nonexistent/config.yml"), "{err}");
    }
}
