//! Error kinds raised while reading and assembling a process snapshot.

use serde::Serialize;
use thiserror::Error;

/// Failure of the snapshot provider as a whole.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// The operating system returned no readable processes.
    #[error("no processes found; you may need elevated privileges")]
    Empty,
}

/// A single process whose attributes could not be read.
///
/// Recovered per record: the collector turns it into a placeholder record with
/// unavailable metrics instead of aborting the snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot read attributes of PID {pid}: {reason}")]
pub struct AccessError {
    pub pid: u32,
    pub reason: String,
}

/// Malformed parent linkage found while building the tree.
///
/// Never fatal: the offending record is promoted to a root and the issue is
/// reported next to the finished forest.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AncestryIssue {
    #[error("PID {pid} names itself as its parent")]
    SelfParent { pid: u32 },

    /// `chain` lists the cycle members in ascending PID order; `pid` is the
    /// member that was cut loose and made a root.
    #[error("PID {pid} is part of a parent cycle {chain:?}")]
    Cycle { pid: u32, chain: Vec<u32> },
}

impl AncestryIssue {
    pub fn pid(&self) -> u32 {
        match self {
            AncestryIssue::SelfParent { pid } | AncestryIssue::Cycle { pid, .. } => *pid,
        }
    }
}
