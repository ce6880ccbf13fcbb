use serde::Serialize;

use super::error::SnapshotError;
use super::process::ProcessRecord;

/// Point-in-time read of the host and every live process.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SystemSnapshot {
    pub cpu_usage_percent: f32,
    pub memory_total: u64,
    pub memory_used: u64,
    pub memory_available: u64,
    pub swap_total: u64,
    pub swap_used: u64,
    /// Ascending PID order.
    pub records: Vec<ProcessRecord>,
}

impl SystemSnapshot {
    pub fn from_records(mut records: Vec<ProcessRecord>) -> Self {
        records.sort_by_key(|r| r.pid);
        Self {
            records,
            ..Self::default()
        }
    }

    pub fn unavailable_count(&self) -> usize {
        self.records.iter().filter(|r| !r.is_available()).count()
    }

    pub fn memory_percent(&self) -> f64 {
        if self.memory_total == 0 {
            return 0.0;
        }
        self.memory_used as f64 / self.memory_total as f64 * 100.0
    }

    /// Fails with [`SnapshotError::Empty`] when no process was read.
    pub fn require_records(self) -> Result<Self, SnapshotError> {
        if self.records.is_empty() {
            Err(SnapshotError::Empty)
        } else {
            Ok(self)
        }
    }
}

/// Capability that yields process snapshots.
///
/// The tree and summary builders only ever see the records a source returns,
/// so tests can substitute synthetic sources for the operating system.
pub trait ProcessSource {
    fn snapshot(&mut self) -> Result<SystemSnapshot, SnapshotError>;
}

/// Source that hands out a fixed list of records.
#[derive(Clone, Debug, Default)]
pub struct StaticSource {
    records: Vec<ProcessRecord>,
}

impl StaticSource {
    pub fn new(records: Vec<ProcessRecord>) -> Self {
        Self { records }
    }
}

impl ProcessSource for StaticSource {
    fn snapshot(&mut self) -> Result<SystemSnapshot, SnapshotError> {
        Ok(SystemSnapshot::from_records(self.records.clone()))
    }
}
