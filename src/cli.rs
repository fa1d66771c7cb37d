//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::report::DEFAULT_NAMESPACE;

/// Top-level CLI parser for `boshupdate`.
#[derive(Debug, Parser)]
#[command(
    name = "boshupdate",
    version,
    about = "Track version drift between BOSH deployments and their upstream GitHub releases"
)]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Location of the configuration file.
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Path to the YAML (or JSON) configuration file.
    #[arg(long, short = 'c', env = "BOSHUPDATE_CONFIG", default_value = "config.yml")]
    pub config: PathBuf,
}

/// Naming of the rendered gauges.
#[derive(Debug, Clone, Args)]
pub struct MetricsArgs {
    /// Prefix of every metric name.
    #[arg(long = "metrics-namespace", env = "BOSHUPDATE_METRICS_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,
    /// Value of the `environment` label carried by every sample.
    #[arg(long = "metrics-environment", env = "BOSHUPDATE_METRICS_ENVIRONMENT", default_value = "default")]
    pub environment: String,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one refresh cycle and print the snapshot.
    Report {
        /// Configuration file.
        #[command(flatten)]
        config: ConfigArgs,
        /// Print YAML instead of JSON.
        #[arg(long, conflicts_with = "metrics")]
        yaml: bool,
        /// Print the gauges in the Prometheus text format instead.
        #[arg(long)]
        metrics: bool,
        /// Gauge naming, used with `--metrics`.
        #[command(flatten)]
        naming: MetricsArgs,
    },
    /// Refresh periodically until interrupted, logging drift after every cycle.
    Watch {
        /// Configuration file.
        #[command(flatten)]
        config: ConfigArgs,
        /// Gauge naming.
        #[command(flatten)]
        naming: MetricsArgs,
    },
    /// Validate the configuration file and exit.
    Check {
        /// Configuration file.
        #[command(flatten)]
        config: ConfigArgs,
    },
}
