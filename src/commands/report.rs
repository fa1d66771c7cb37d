//! `report`: run one refresh cycle and print its snapshot.

use tokio::sync::watch;

use super::{connect, finish_recording};
use crate::cli::MetricsArgs;
use crate::config::Settings;
use crate::refresh::{RefreshScheduler, Snapshot};
use crate::report::Reporter;

/// How the snapshot is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed JSON.
    Json,
    /// YAML.
    Yaml,
    /// Gauges in the Prometheus text format.
    Metrics,
}

impl OutputFormat {
    /// Picks the format from the `--yaml` and `--metrics` flags.
    #[must_use]
    pub fn from_flags(yaml: bool, metrics: bool) -> Self {
        match (yaml, metrics) {
            (_, true) => Self::Metrics,
            (true, false) => Self::Yaml,
            (false, false) => Self::Json,
        }
    }
}

/// Runs one cycle against the backends selected by the environment and
/// prints the result to stdout.
///
/// # Errors
///
/// Returns an error if the backends cannot be reached, the cycle is
/// cancelled or the output cannot be serialized.
pub async fn run(settings: Settings, format: OutputFormat, naming: &MetricsArgs) -> Result<(), String> {
    let (ctx, session) = connect(&settings).await?;
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let scheduler = RefreshScheduler::new(ctx, settings, cancel_rx);
    let snapshot = scheduler.refresh().await.ok_or("refresh cycle cancelled")?;
    finish_recording(session.as_ref())?;
    print!("{}", render(&snapshot, format, naming)?);
    Ok(())
}

/// Serializes `snapshot` in `format`.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render(snapshot: &Snapshot, format: OutputFormat, naming: &MetricsArgs) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(snapshot)
            .map(|mut text| {
                text.push('\n');
                text
            })
            .map_err(|e| format!("unable to serialize snapshot: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(snapshot).map_err(|e| format!("unable to serialize snapshot: {e}"))
        }
        OutputFormat::Metrics => {
            let mut reporter = Reporter::new(&naming.namespace, &naming.environment);
            reporter.observe(snapshot);
            Ok(reporter.render_text())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naming() -> MetricsArgs {
        MetricsArgs { namespace: "boshupdate".into(), environment: "test".into() }
    }

    #[test]
    fn flags_select_format() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Yaml);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Metrics);
    }

    #[test]
    fn json_and_yaml_carry_the_same_fields() {
        let snapshot = Snapshot::default();
        let json: serde_json::Value =
            serde_json::from_str(&render(&snapshot, OutputFormat::Json, &naming()).unwrap()).unwrap();
        assert!(json["drift"]["deployments"].as_array().unwrap().is_empty());
        let yaml = render(&snapshot, OutputFormat::Yaml, &naming()).unwrap();
        assert!(yaml.contains("deployments_error: false"), "{yaml}");
    }

    #[test]
    fn metrics_render_scrape_gauges() {
        let text = render(&Snapshot::default(), OutputFormat::Metrics, &naming()).unwrap();
        assert!(text.contains(r#"boshupdate_last_scrape_error{environment="test"} 0"#), "{text}");
    }
}
