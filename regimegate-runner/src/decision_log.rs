//! Decision log: JSONL record of every per-regime decision.
//!
//! One JSON object per line:
//! `{"timestamp":…,"metrics":{"regime":…},"decision":…,"params":{…},"reason":…}`.
//! The file is truncated when a run opens it, flushed after every record and
//! closed when the log is dropped, so records appended before a failing
//! segment stay on disk.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::decision::Decision;

// ─── Clock ──────────────────────────────────────────────────────────

/// Source of record timestamps, in whole epoch seconds.
pub trait Clock {
    fn now(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A clock stuck at one instant; makes logs byte-for-byte reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}

// ─── Record ─────────────────────────────────────────────────────────

/// Observations the decision was based on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetrics {
    pub regime: String,
}

/// One line of the decision log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub timestamp: i64,
    pub metrics: RecordMetrics,
    pub decision: String,
    pub params: BTreeMap<String, f64>,
    pub reason: String,
}

impl DecisionRecord {
    pub fn new(timestamp: i64, regime: &str, decision: &Decision) -> Self {
        Self {
            timestamp,
            metrics: RecordMetrics {
                regime: regime.to_string(),
            },
            decision: decision.validator.clone(),
            params: decision.params.clone(),
            reason: decision.reason.clone(),
        }
    }
}

// ─── Sinks ──────────────────────────────────────────────────────────

/// Destination for decision records.
pub trait DecisionSink {
    fn append(&mut self, record: &DecisionRecord) -> io::Result<()>;
}

/// In-memory sink, used by the optimizer and tests.
impl DecisionSink for Vec<DecisionRecord> {
    fn append(&mut self, record: &DecisionRecord) -> io::Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DecisionSink for NullSink {
    fn append(&mut self, _record: &DecisionRecord) -> io::Result<()> {
        Ok(())
    }
}

/// JSONL decision log file.
pub struct DecisionLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl DecisionLog {
    /// Create (or truncate) the log at `path`, creating parent directories.
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record of a log file.
    ///
    /// Malformed lines are an error: the log is written by this crate only.
    pub fn read_all(path: &Path) -> io::Result<Vec<DecisionRecord>> {
        let reader = io::BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            records.push(record);
        }
        Ok(records)
    }
}

impl DecisionSink for DecisionLog {
    fn append(&mut self, record: &DecisionRecord) -> io::Result<()> {
        let json = serde_json::to_string(record)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regimegate_core::validator::ValidatorKind;
    use tempfile::TempDir;

    fn sample_decision() -> Decision {
        Decision::new(
            ValidatorKind::Volatility,
            [("window".to_string(), 60.0), ("max_vol".to_string(), 0.009)]
                .into_iter()
                .collect(),
            "Elevated return volatility; prefer volatility gate",
        )
    }

    #[test]
    fn record_json_shape() {
        let record = DecisionRecord::new(1_700_000_000, "volatile", &sample_decision());
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"timestamp":1700000000,"metrics":{"regime":"volatile"},"decision":"Volatility","params":{"max_vol":0.009,"window":60.0},"reason":"Elevated return volatility; prefer volatility gate"}"#
        );
    }

    #[test]
    fn append_and_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("decisions.jsonl");
        let record = DecisionRecord::new(42, "volatile", &sample_decision());
        {
            let mut log = DecisionLog::create(&path).unwrap();
            log.append(&record).unwrap();
            log.append(&record).unwrap();
        }
        let back = DecisionLog::read_all(&path).unwrap();
        assert_eq!(back, vec![record.clone(), record]);
    }

    #[test]
    fn create_truncates_previous_run() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("decisions.jsonl");
        let record = DecisionRecord::new(1, "jumpy", &sample_decision());
        {
            let mut log = DecisionLog::create(&path).unwrap();
            log.append(&record).unwrap();
            log.append(&record).unwrap();
        }
        {
            let mut log = DecisionLog::create(&path).unwrap();
            log.append(&record).unwrap();
        }
        assert_eq!(DecisionLog::read_all(&path).unwrap().len(), 1);
    }

    #[test]
    fn records_visible_before_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("decisions.jsonl");
        let mut log = DecisionLog::create(&path).unwrap();
        log.append(&DecisionRecord::new(1, "calm_trend", &sample_decision()))
            .unwrap();
        let text = fs::read_to_string(log.path()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn malformed_line_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("decisions.jsonl");
        fs::write(&path, "{not json}\n").unwrap();
        let err = DecisionLog::read_all(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn clocks() {
        assert_eq!(FixedClock(7).now(), 7);
        assert!(SystemClock.now() > 1_600_000_000);
    }

    #[test]
    fn vec_sink_collects() {
        let mut sink: Vec<DecisionRecord> = Vec::new();
        DecisionSink::append(&mut sink, &DecisionRecord::new(0, "jumpy", &sample_decision()))
            .unwrap();
        assert_eq!(sink[0].metrics.regime, "jumpy");
    }
}
