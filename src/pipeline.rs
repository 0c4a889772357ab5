use crate::collectors::{collect_reading, CollectError, MetricsSource, CPU_SAMPLE_INTERVAL};
use crate::config::{ConfigError, DeliveryConfig};
use crate::notify::{send_critical_alert, NotifyError};
use crate::record::{RecordError, RecordWriter};
use crate::score::Classification;
use crate::snapshot::Snapshot;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub data_dir: PathBuf,
    pub env_file: PathBuf,
    pub cpu_interval: Duration,
}

impl RunOptions {
    pub fn new(data_dir: impl Into<PathBuf>, env_file: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            env_file: env_file.into(),
            cpu_interval: CPU_SAMPLE_INTERVAL,
        }
    }
}

/// Errors that stop a run before an alert could be attempted.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to collect host metrics: {0}")]
    Collect(#[from] CollectError),
    #[error("failed to save snapshot: {0}")]
    Record(#[from] RecordError),
}

#[derive(Debug)]
pub enum AlertOutcome {
    Sent,
    ConfigFailed(ConfigError),
    DeliveryFailed(NotifyError),
}

impl AlertOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::ConfigFailed(_) => "config_failed",
            Self::DeliveryFailed(_) => "delivery_failed",
        }
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub artifact: PathBuf,
    pub score: f64,
    pub classification: Classification,
    /// Present only for critical runs.
    pub alert: Option<AlertOutcome>,
}

/// Collects, scores, persists and, for critical samples, alerts. Prints status lines to stdout.
pub async fn run<S: MetricsSource>(
    source: &mut S,
    opts: &RunOptions,
) -> Result<RunReport, RunError> {
    let reading = collect_reading(source, opts.cpu_interval).await?;
    let snapshot = Snapshot::from_reading(reading);
    let classification = Classification::of(snapshot.system_score);
    info!(
        hostname = %snapshot.hostname,
        cpu_usage = snapshot.cpu_usage,
        mem_used_percent = snapshot.memory_info.used_percent,
        disks = snapshot.disk_info.len(),
        score = snapshot.system_score,
        classification = classification.as_str(),
        "snapshot collected"
    );

    let artifact = RecordWriter::new(&opts.data_dir).persist(&snapshot)?;
    println!("System snapshot saved to {}", artifact.display());

    let alert = if classification.is_critical() {
        let outcome = dispatch_alert(opts, &artifact).await;
        match &outcome {
            AlertOutcome::Sent => println!("Alert email sent."),
            AlertOutcome::ConfigFailed(err) => {
                error!(error = %err, "alert configuration invalid");
                println!("Failed to load alert configuration: {err}");
            }
            AlertOutcome::DeliveryFailed(err) => {
                error!(error = %err, "alert delivery failed");
                println!("Failed to send alert email: {err}");
            }
        }
        Some(outcome)
    } else {
        None
    };

    Ok(RunReport {
        artifact,
        score: snapshot.system_score,
        classification,
        alert,
    })
}

async fn dispatch_alert(opts: &RunOptions, artifact: &std::path::Path) -> AlertOutcome {
    let config = match DeliveryConfig::load(&opts.env_file) {
        Ok(config) => config,
        Err(err) => return AlertOutcome::ConfigFailed(err),
    };
    match send_critical_alert(&config, artifact).await {
        Ok(()) => AlertOutcome::Sent,
        Err(err) => AlertOutcome::DeliveryFailed(err),
    }
}
