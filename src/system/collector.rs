use std::thread;
use std::time::{Duration, Instant};

use sysinfo::{
    MINIMUM_CPU_UPDATE_INTERVAL, Pid, Process, ProcessRefreshKind, ProcessStatus,
    ProcessesToUpdate, System, ThreadKind, UpdateKind, Users,
};
use tracing::{debug, warn};

use super::error::{AccessError, SnapshotError};
use super::process::{ProcessRecord, ProcessState};
use super::snapshot::{ProcessSource, SystemSnapshot};

/// sysinfo-backed [`ProcessSource`].
pub struct Collector {
    sys: System,
    users: Users,
    sample_interval: Duration,
    primed_at: Instant,
}

impl Default for Collector {
    fn default() -> Self {
        Self::new(Duration::from_millis(250))
    }
}

impl Collector {
    /// Takes the first CPU reading right away; the second one is taken by
    /// [`ProcessSource::snapshot`] once `sample_interval` has elapsed.
    pub fn new(sample_interval: Duration) -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        sys.refresh_processes_specifics(ProcessesToUpdate::All, true, refresh_kind());
        Collector {
            sys,
            users: Users::new_with_refreshed_list(),
            sample_interval: sample_interval.max(MINIMUM_CPU_UPDATE_INTERVAL),
            primed_at: Instant::now(),
        }
    }

    fn wait_for_cpu_sample(&self) {
        let elapsed = self.primed_at.elapsed();
        if elapsed < self.sample_interval {
            thread::sleep(self.sample_interval - elapsed);
        }
    }

    fn read_process(&self, pid: Pid, process: &Process) -> Result<ProcessRecord, AccessError> {
        let status = map_status(process.status());
        check_readable(
            pid.as_u32(),
            process.memory(),
            process.virtual_memory(),
            matches!(process.thread_kind(), Some(ThreadKind::Kernel)),
            status,
        )?;

        let user = process
            .user_id()
            .and_then(|uid| self.users.get_user_by_id(uid))
            .map(|user| user.name().to_string());

        Ok(ProcessRecord {
            pid: pid.as_u32(),
            ppid: process.parent().map(|p| p.as_u32()),
            name: process.name().to_string_lossy().to_string(),
            status,
            cpu_percent: Some(process.cpu_usage()),
            memory_bytes: Some(process.memory()),
            user,
            start_time: process.start_time(),
        })
    }

    fn build_snapshot(&self) -> SystemSnapshot {
        let _span = tracing::debug_span!("collector.build_snapshot").entered();

        let mut tally = Tally::with_capacity(self.sys.processes().len());
        for (pid, process) in self.sys.processes() {
            // Threads of a process are not processes of their own.
            if process.thread_kind() == Some(ThreadKind::Userland) {
                continue;
            }
            tally.push(self.read_process(*pid, process), || {
                ProcessRecord::unavailable(
                    pid.as_u32(),
                    process.parent().map(|p| p.as_u32()),
                    process.name().to_string_lossy(),
                )
                .with_status(map_status(process.status()))
            });
        }

        if tally.inaccessible > 0 {
            warn!(
                count = tally.inaccessible,
                "processes could not be fully read (permission denied)"
            );
            if tally.mostly_inaccessible() {
                warn!("most processes are inaccessible; consider running with elevated privileges");
            }
        }

        let records = tally.records;
        let mut snapshot = SystemSnapshot::from_records(records);
        snapshot.cpu_usage_percent = self.sys.global_cpu_usage();
        snapshot.memory_total = self.sys.total_memory();
        snapshot.memory_used = self.sys.used_memory();
        snapshot.memory_available = self.sys.available_memory();
        snapshot.swap_total = self.sys.total_swap();
        snapshot.swap_used = self.sys.used_swap();
        snapshot
    }
}

impl ProcessSource for Collector {
    fn snapshot(&mut self) -> Result<SystemSnapshot, SnapshotError> {
        let _span = tracing::debug_span!("collector.refresh").entered();

        self.wait_for_cpu_sample();
        self.sys.refresh_memory();
        self.sys.refresh_cpu_all();
        self.sys
            .refresh_processes_specifics(ProcessesToUpdate::All, true, refresh_kind());
        self.primed_at = Instant::now();

        let snapshot = self.build_snapshot();
        debug!(
            processes = snapshot.records.len(),
            unavailable = snapshot.unavailable_count(),
            "snapshot collected"
        );
        Ok(snapshot)
    }
}

/// Records of one snapshot pass, with unreadable processes already replaced
/// by placeholders.
#[derive(Debug, Default)]
struct Tally {
    records: Vec<ProcessRecord>,
    inaccessible: usize,
}

impl Tally {
    fn with_capacity(capacity: usize) -> Self {
        Tally {
            records: Vec::with_capacity(capacity),
            inaccessible: 0,
        }
    }

    fn push(
        &mut self,
        read: Result<ProcessRecord, AccessError>,
        placeholder: impl FnOnce() -> ProcessRecord,
    ) {
        let record = read.unwrap_or_else(|err| {
            debug!(%err, "recording placeholder");
            self.inaccessible += 1;
            placeholder()
        });
        self.records.push(record);
    }

    /// Strictly more than half of the records are placeholders.
    fn mostly_inaccessible(&self) -> bool {
        self.inaccessible * 2 > self.records.len()
    }
}

/// Unreadable processes come back from the OS with every memory counter
/// zeroed. Kernel threads and zombies legitimately own no memory.
fn check_readable(
    pid: u32,
    memory: u64,
    virtual_memory: u64,
    kernel_thread: bool,
    status: ProcessState,
) -> Result<(), AccessError> {
    if memory == 0 && virtual_memory == 0 && !kernel_thread && status != ProcessState::Zombie {
        return Err(AccessError {
            pid,
            reason: "memory counters unreadable".to_string(),
        });
    }
    Ok(())
}

fn refresh_kind() -> ProcessRefreshKind {
    ProcessRefreshKind::nothing()
        .with_memory()
        .with_cpu()
        .with_user(UpdateKind::OnlyIfNotSet)
        .without_tasks()
}

fn map_status(status: ProcessStatus) -> ProcessState {
    match status {
        ProcessStatus::Run => ProcessState::Running,
        ProcessStatus::Sleep
        | ProcessStatus::Idle
        | ProcessStatus::UninterruptibleDiskSleep
        | ProcessStatus::Waking
        | ProcessStatus::Parked
        | ProcessStatus::LockBlocked => ProcessState::Sleeping,
        ProcessStatus::Stop | ProcessStatus::Tracing => ProcessState::Stopped,
        ProcessStatus::Zombie | ProcessStatus::Dead => ProcessState::Zombie,
        _ => ProcessState::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sysinfo_status_mapping() {
        assert_eq!(map_status(ProcessStatus::Run), ProcessState::Running);
        assert_eq!(map_status(ProcessStatus::Idle), ProcessState::Sleeping);
        assert_eq!(map_status(ProcessStatus::Stop), ProcessState::Stopped);
        assert_eq!(map_status(ProcessStatus::Dead), ProcessState::Zombie);
        assert_eq!(map_status(ProcessStatus::Unknown(99)), ProcessState::Unknown);
    }

    #[test]
    fn sample_interval_never_below_sysinfo_minimum() {
        let collector = Collector::new(Duration::ZERO);
        assert!(collector.sample_interval >= MINIMUM_CPU_UPDATE_INTERVAL);
    }

    #[test]
    fn refresh_skips_threads() {
        assert!(!refresh_kind().tasks());
        assert!(refresh_kind().memory());
    }

    #[test]
    fn zeroed_counters_mark_a_process_unreadable() {
        let err = check_readable(42, 0, 0, false, ProcessState::Sleeping).unwrap_err();
        assert_eq!(err.pid, 42);
        assert_eq!(err.reason, "memory counters unreadable");
    }

    #[test]
    fn kernel_threads_and_zombies_may_own_no_memory() {
        assert!(check_readable(2, 0, 0, true, ProcessState::Sleeping).is_ok());
        assert!(check_readable(7, 0, 0, false, ProcessState::Zombie).is_ok());
        assert!(check_readable(8, 4096, 0, false, ProcessState::Running).is_ok());
        assert!(check_readable(9, 0, 8192, false, ProcessState::Running).is_ok());
    }

    fn unreadable(pid: u32) -> Result<ProcessRecord, AccessError> {
        Err(AccessError {
            pid,
            reason: "memory counters unreadable".to_string(),
        })
    }

    fn readable(pid: u32) -> Result<ProcessRecord, AccessError> {
        Ok(ProcessRecord::new(pid, Some(1), "ok")
            .with_cpu(1.0)
            .with_memory(4096))
    }

    #[test]
    fn unreadable_records_become_counted_placeholders() {
        let mut tally = Tally::default();
        tally.push(readable(10), || unreachable!("readable record needs no placeholder"));
        tally.push(unreadable(11), || {
            ProcessRecord::unavailable(11, Some(1), "locked").with_status(ProcessState::Sleeping)
        });

        assert_eq!(tally.inaccessible, 1);
        assert_eq!(tally.records.len(), 2);
        assert!(tally.records[0].is_available());
        let placeholder = &tally.records[1];
        assert_eq!(placeholder.pid, 11);
        assert_eq!(placeholder.ppid, Some(1));
        assert_eq!(placeholder.name, "locked");
        assert_eq!(placeholder.status, ProcessState::Sleeping);
        assert!(!placeholder.is_available());
    }

    #[test]
    fn elevated_privilege_hint_needs_a_strict_majority() {
        let placeholder = || ProcessRecord::unavailable(0, None, "locked");

        let mut tally = Tally::default();
        assert!(!tally.mostly_inaccessible());

        tally.push(readable(1), placeholder);
        tally.push(unreadable(2), placeholder);
        assert!(!tally.mostly_inaccessible(), "exactly half is not most");

        tally.push(unreadable(3), placeholder);
        assert!(tally.mostly_inaccessible());

        tally.push(readable(4), placeholder);
        assert!(!tally.mostly_inaccessible());
    }
}
