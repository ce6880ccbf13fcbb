use std::fmt;

use serde::Serialize;

/// Coarse scheduling state of a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Running,
    Sleeping,
    Stopped,
    Zombie,
    Unknown,
}

impl ProcessState {
    pub fn label(self) -> &'static str {
        match self {
            ProcessState::Running => "running",
            ProcessState::Sleeping => "sleeping",
            ProcessState::Stopped => "stopped",
            ProcessState::Zombie => "zombie",
            ProcessState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One process as seen at snapshot time.
///
/// `cpu_percent` and `memory_bytes` are `None` when the process could not be
/// read; such records still count as processes but never feed numeric
/// aggregates.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessRecord {
    pub pid: u32,
    /// `None` or `Some(0)` both mean "no parent".
    pub ppid: Option<u32>,
    pub name: String,
    pub status: ProcessState,
    pub cpu_percent: Option<f32>,
    pub memory_bytes: Option<u64>,
    pub user: Option<String>,
    /// Seconds since the Unix epoch, 0 when unknown.
    pub start_time: u64,
}

impl ProcessRecord {
    pub fn new(pid: u32, ppid: Option<u32>, name: impl Into<String>) -> Self {
        Self {
            pid,
            ppid,
            name: name.into(),
            status: ProcessState::Unknown,
            cpu_percent: Some(0.0),
            memory_bytes: Some(0),
            user: None,
            start_time: 0,
        }
    }

    /// Placeholder for a process whose attributes could not be read.
    pub fn unavailable(pid: u32, ppid: Option<u32>, name: impl Into<String>) -> Self {
        Self {
            cpu_percent: None,
            memory_bytes: None,
            ..Self::new(pid, ppid, name)
        }
    }

    pub fn with_status(mut self, status: ProcessState) -> Self {
        self.status = status;
        self
    }

    pub fn with_cpu(mut self, cpu_percent: f32) -> Self {
        self.cpu_percent = Some(cpu_percent);
        self
    }

    pub fn with_memory(mut self, memory_bytes: u64) -> Self {
        self.memory_bytes = Some(memory_bytes);
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn is_available(&self) -> bool {
        self.cpu_percent.is_some() && self.memory_bytes.is_some()
    }

    /// Parent PID if it names a real ancestor candidate (non-zero, not self).
    pub fn parent_pid(&self) -> Option<u32> {
        self.ppid.filter(|&p| p != 0 && p != self.pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_record_is_unavailable() {
        let rec = ProcessRecord::unavailable(7, Some(1), "secret");
        assert!(!rec.is_available());
        assert_eq!(rec.memory_bytes, None);
        assert_eq!(rec.cpu_percent, None);

        let ok = ProcessRecord::new(8, Some(1), "open").with_memory(10);
        assert!(ok.is_available());
    }

    #[test]
    fn parent_pid_ignores_zero_and_self() {
        assert_eq!(ProcessRecord::new(2, Some(1), "a").parent_pid(), Some(1));
        assert_eq!(ProcessRecord::new(2, Some(0), "a").parent_pid(), None);
        assert_eq!(ProcessRecord::new(2, None, "a").parent_pid(), None);
        assert_eq!(ProcessRecord::new(5, Some(5), "a").parent_pid(), None);
    }
}
