use crate::score::Classification;
use crate::snapshot::Snapshot;
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CRITICAL_SUBDIR: &str = "critical";
pub const FILE_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to encode snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Persist {
        path: String,
        source: std::io::Error,
    },
}

/// Persists snapshots under a data directory, critical ones in its `critical/` subtree.
///
/// Neither directory is created here; both must already exist.
#[derive(Debug, Clone)]
pub struct RecordWriter {
    data_dir: PathBuf,
}

impl RecordWriter {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// JSON with 4-space indentation and no trailing newline.
    pub fn encode(snapshot: &Snapshot) -> Result<Vec<u8>, RecordError> {
        let mut buf = Vec::new();
        let mut ser =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        snapshot.serialize(&mut ser)?;
        Ok(buf)
    }

    pub fn artifact_path(
        &self,
        captured_at: &NaiveDateTime,
        classification: Classification,
    ) -> PathBuf {
        let name = format!("{}.json", captured_at.format(FILE_TIME_FORMAT));
        match classification {
            Classification::Critical => self.data_dir.join(CRITICAL_SUBDIR).join(name),
            Classification::Normal => self.data_dir.join(name),
        }
    }

    /// Writes the snapshot, replacing any artifact captured in the same second.
    pub fn persist(&self, snapshot: &Snapshot) -> Result<PathBuf, RecordError> {
        let classification = Classification::of(snapshot.system_score);
        let data = Self::encode(snapshot)?;
        let path = self.artifact_path(&snapshot.time, classification);
        write_file(&path, &data)?;
        Ok(path)
    }
}

fn write_file(path: &Path, data: &[u8]) -> Result<(), RecordError> {
    let persist_err = |source| RecordError::Persist {
        path: path.display().to_string(),
        source,
    };
    let mut file = File::create(path).map_err(persist_err)?;
    file.write_all(data).map_err(persist_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::tests::sample_reading;
    use std::fs;

    fn data_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(CRITICAL_SUBDIR)).unwrap();
        dir
    }

    #[test]
    fn encoding_is_stable_and_ordered() {
        let snap = Snapshot::from_reading(sample_reading(10.0, 10.0));
        let first = RecordWriter::encode(&snap).unwrap();
        let second = RecordWriter::encode(&snap).unwrap();
        assert_eq!(first, second);

        let text = String::from_utf8(first).unwrap();
        assert!(text.starts_with("{\n    \"os\": \"linux\",\n    \"arch\": \"x86_64\","));
        assert!(text.contains("\n        \"total\": 16000,"));
        assert!(!text.ends_with('\n'));

        let keys = [
            "\"os\"",
            "\"arch\"",
            "\"hostname\"",
            "\"time\"",
            "\"cpu_usage\"",
            "\"memory_info\"",
            "\"disk_info\"",
            "\"temperature\"",
            "\"system_score\"",
        ];
        let positions: Vec<usize> = keys.iter().map(|k| text.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn persisted_artifact_decodes_to_same_snapshot() {
        let dir = data_dir();
        let writer = RecordWriter::new(dir.path());
        let mut reading = sample_reading(12.25, 33.5);
        reading.disks.push(crate::snapshot::DiskStat::new("/home", 9, 3, 6));
        let snap = Snapshot::from_reading(reading);

        let path = writer.persist(&snap).unwrap();
        let decoded: Snapshot = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();

        assert_eq!(decoded, snap);
        let mounts: Vec<_> = decoded.disk_info.iter().map(|d| d.mountpoint.as_str()).collect();
        assert_eq!(mounts, ["/", "/proc", "/home"]);
    }

    #[test]
    fn normal_snapshot_lands_in_data_root() {
        let dir = data_dir();
        let writer = RecordWriter::new(dir.path());
        let snap = Snapshot::from_reading(sample_reading(10.0, 10.0));

        let path = writer.persist(&snap).unwrap();

        assert_eq!(path, dir.path().join("2024-03-05_07-08-09.json"));
        assert!(path.exists());
    }

    #[test]
    fn critical_snapshot_lands_in_critical_subtree() {
        let dir = data_dir();
        let writer = RecordWriter::new(dir.path());
        let snap = Snapshot::from_reading(sample_reading(90.0, 90.0));

        let path = writer.persist(&snap).unwrap();

        assert_eq!(
            path,
            dir.path().join("critical").join("2024-03-05_07-08-09.json")
        );
        assert!(path.exists());
    }

    #[test]
    fn same_second_rerun_overwrites() {
        let dir = data_dir();
        let writer = RecordWriter::new(dir.path());
        let first = Snapshot::from_reading(sample_reading(10.0, 10.0));
        let second = Snapshot::from_reading(sample_reading(20.0, 10.0));

        let p1 = writer.persist(&first).unwrap();
        let p2 = writer.persist(&second).unwrap();

        assert_eq!(p1, p2);
        let decoded: Snapshot = serde_json::from_slice(&fs::read(&p2).unwrap()).unwrap();
        assert_eq!(decoded.cpu_usage, 20.0);
    }

    #[test]
    fn missing_directory_is_a_persist_error() {
        let dir = tempfile::tempdir().unwrap();
        let writer = RecordWriter::new(dir.path().join("absent"));
        let snap = Snapshot::from_reading(sample_reading(10.0, 10.0));

        let err = writer.persist(&snap).unwrap_err();
        assert!(matches!(err, RecordError::Persist { .. }));
        assert!(!dir.path().join("absent").exists());
    }
}
