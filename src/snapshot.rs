use crate::score::health_score;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One complete host sample plus its derived health score.
///
/// Field order here is the field order of the persisted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub os: String,
    pub arch: String,
    pub hostname: String,
    #[serde(with = "record_time")]
    pub time: NaiveDateTime,
    pub cpu_usage: f64,
    pub memory_info: MemoryStat,
    pub disk_info: Vec<DiskStat>,
    pub temperature: f64,
    pub system_score: f64,
}

/// Raw readings produced by the collector, before scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct HostReading {
    pub os: String,
    pub arch: String,
    pub hostname: String,
    pub captured_at: NaiveDateTime,
    pub cpu_usage: f64,
    pub memory: MemoryStat,
    pub disks: Vec<DiskStat>,
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStat {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub used_percent: f64,
    pub free: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap_total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap_free: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskStat {
    pub mountpoint: String,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub used_percent: f64,
}

impl Snapshot {
    pub fn from_reading(reading: HostReading) -> Self {
        let system_score = health_score(reading.cpu_usage, reading.memory.used_percent);
        Self {
            os: reading.os,
            arch: reading.arch,
            hostname: reading.hostname,
            time: reading.captured_at,
            cpu_usage: reading.cpu_usage,
            memory_info: reading.memory,
            disk_info: reading.disks,
            temperature: reading.temperature,
            system_score,
        }
    }
}

impl MemoryStat {
    /// Builds the stat from byte counters, deriving `used_percent` from used/total.
    pub fn from_bytes(total: u64, available: u64, used: u64, free: u64) -> Self {
        let used_percent = if total > 0 {
            (used as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        Self {
            total,
            available,
            used,
            used_percent,
            free,
            swap_total: None,
            swap_used: None,
            swap_free: None,
        }
    }

    pub fn with_swap(mut self, total: u64, used: u64, free: u64) -> Self {
        self.swap_total = Some(total);
        self.swap_used = Some(used);
        self.swap_free = Some(free);
        self
    }
}

impl DiskStat {
    /// `used_percent` is taken against `used + free`, so reserved blocks are excluded.
    pub fn new(mountpoint: impl Into<String>, total: u64, used: u64, free: u64) -> Self {
        let denom = used.saturating_add(free);
        let used_percent = if denom > 0 {
            (used as f64 / denom as f64) * 100.0
        } else {
            0.0
        };
        Self {
            mountpoint: mountpoint.into(),
            total,
            used,
            free,
            used_percent,
        }
    }
}

pub const RECORD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

mod record_time {
    use super::RECORD_TIME_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&value.format(RECORD_TIME_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let text = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&text, RECORD_TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}
