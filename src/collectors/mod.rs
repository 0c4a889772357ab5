pub mod system;

use crate::snapshot::{DiskStat, HostReading, MemoryStat};
use chrono::{Local, NaiveDateTime, Timelike};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// CPU utilization is measured over this window. Changing it makes scores
/// incomparable across runs.
pub const CPU_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("host name is unavailable")]
    HostIdentity,
    #[error("{metric} is unavailable: {reason}")]
    MetricsUnavailable { metric: &'static str, reason: String },
}

impl CollectError {
    pub fn unavailable(metric: &'static str, reason: impl Into<String>) -> Self {
        Self::MetricsUnavailable {
            metric,
            reason: reason.into(),
        }
    }
}

/// Host facilities the collector reads from.
pub trait MetricsSource {
    fn host_name(&mut self) -> Option<String>;
    /// Starts a CPU measurement window; `cpu_usage` reads its result.
    fn prime_cpu(&mut self);
    fn cpu_usage(&mut self) -> Result<f64, CollectError>;
    fn memory(&mut self) -> Result<MemoryStat, CollectError>;
    /// Mountpoints of every mounted partition, pseudo filesystems included.
    fn partitions(&mut self) -> Result<Vec<String>, CollectError>;
    fn disk_usage(&mut self, mountpoint: &str) -> Result<DiskStat, CollectError>;
    /// Celsius readings in sensor order.
    fn temperatures(&mut self) -> Result<Vec<f64>, CollectError>;
}

pub async fn collect_reading<S: MetricsSource>(
    source: &mut S,
    cpu_interval: Duration,
) -> Result<HostReading, CollectError> {
    let hostname = source.host_name().ok_or(CollectError::HostIdentity)?;

    source.prime_cpu();
    tokio::time::sleep(cpu_interval).await;
    let cpu_usage = source.cpu_usage()?;

    let memory = source.memory()?;

    let partitions = source.partitions()?;
    let mut disks = Vec::with_capacity(partitions.len());
    for mountpoint in &partitions {
        disks.push(source.disk_usage(mountpoint)?);
    }

    let temperature = match source.temperatures() {
        Ok(temps) => temps.first().copied().unwrap_or(0.0),
        Err(err) => {
            debug!(error = %err, "temperature unavailable, recording 0");
            0.0
        }
    };

    Ok(HostReading {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        hostname,
        captured_at: now_local_seconds(),
        cpu_usage,
        memory,
        disks,
        temperature,
    })
}

fn now_local_seconds() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}


#[cfg(test)]
mod tests {
    use super::fake::FakeSource;
    use super::*;

    #[tokio::test]
    async fn reading_keeps_mount_order_and_first_temperature() {
        let mut source = FakeSource::new(25.0, 30.0);
        source.mounts = vec!["/".into(), "/proc".into(), "/home".into()];

        let reading = collect_reading(&mut source, Duration::ZERO).await.unwrap();

        let mounts: Vec<_> = reading.disks.iter().map(|d| d.mountpoint.as_str()).collect();
        assert_eq!(mounts, ["/", "/proc", "/home"]);
        assert_eq!(reading.temperature, 47.0);
        assert_eq!(reading.cpu_usage, 25.0);
        assert_eq!(reading.hostname, "fake-host");
        assert_eq!(reading.os, std::env::consts::OS);
        assert_eq!(reading.captured_at.nanosecond(), 0);
    }

    #[tokio::test]
    async fn missing_host_name_is_fatal() {
        let mut source = FakeSource::new(25.0, 30.0);
        source.host = None;
        let err = collect_reading(&mut source, Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, CollectError::HostIdentity));
    }

    #[tokio::test]
    async fn cpu_failure_is_fatal() {
        let mut source = FakeSource::new(25.0, 30.0);
        source.cpu = None;
        let err = collect_reading(&mut source, Duration::ZERO).await.unwrap_err();
        assert!(matches!(
            err,
            CollectError::MetricsUnavailable { metric: "cpu usage", .. }
        ));
    }

    #[tokio::test]
    async fn one_bad_mount_aborts_collection() {
        let mut source = FakeSource::new(25.0, 30.0);
        source.failing_mount = Some("/boot".to_string());
        let err = collect_reading(&mut source, Duration::ZERO).await.unwrap_err();
        assert!(err.to_string().contains("/boot"));
    }

    #[tokio::test]
    async fn temperature_failure_or_absence_records_zero() {
        let mut source = FakeSource::new(25.0, 30.0);
        source.temps = None;
        let reading = collect_reading(&mut source, Duration::ZERO).await.unwrap();
        assert_eq!(reading.temperature, 0.0);

        source.temps = Some(Vec::new());
        let reading = collect_reading(&mut source, Duration::ZERO).await.unwrap();
        assert_eq!(reading.temperature, 0.0);
    }
}
