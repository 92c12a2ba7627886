//! Cross-tab signal file.
//!
//! Each running client writes `{ writer, at }` to a shared path whenever its
//! session state changes locally; sibling processes watching the same path
//! revalidate their own session when a record from another writer appears.
//! The writer id makes a process blind to its own writes, matching the
//! browser storage-event semantics this replaces.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub writer: Uuid,
    /// Milliseconds since the epoch at write time.
    pub at: i64,
}

#[derive(Debug, Clone)]
pub struct SignalFile {
    path: PathBuf,
    writer_id: Uuid,
}

impl SignalFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path, writer_id: Uuid::new_v4() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Stamp the signal with this process's writer id and the current time.
    /// Best-effort: failures are logged by the caller, never surfaced.
    pub fn write(&self) -> std::io::Result<()> {
        let record = SignalRecord { writer: self.writer_id, at: Utc::now().timestamp_millis() };
        let content = serde_json::to_string(&record)?;
        fs::write(&self.path, content)
    }

    /// Read the latest record, if the file exists and parses.
    pub fn load(&self) -> Option<SignalRecord> {
        let content = fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// A record counts as foreign when another process wrote it.
    pub fn is_foreign(&self, record: &SignalRecord) -> bool {
        record.writer != self.writer_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("aquawatch-signal-test-{}-{}", name, Uuid::new_v4()))
    }

    #[test]
    fn write_then_load_roundtrips() {
        let signal = SignalFile::new(temp_path("roundtrip"));
        signal.write().unwrap();
        let record = signal.load().unwrap();
        assert!(!signal.is_foreign(&record));
        let _ = fs::remove_file(signal.path());
    }

    #[test]
    fn sibling_writer_is_foreign() {
        let path = temp_path("foreign");
        let tab_a = SignalFile::new(path.clone());
        let tab_b = SignalFile::new(path.clone());

        tab_a.write().unwrap();
        let record = tab_b.load().unwrap();
        assert!(tab_b.is_foreign(&record));
        assert!(!tab_a.is_foreign(&record));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn load_missing_file_is_none() {
        let signal = SignalFile::new(temp_path("missing"));
        assert!(signal.load().is_none());
    }
}
