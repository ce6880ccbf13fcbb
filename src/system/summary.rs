use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use super::process::{ProcessRecord, ProcessState};

pub const DEFAULT_TOP_N: usize = 5;

/// One entry of a top-N list.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TopEntry<T> {
    pub pid: u32,
    pub name: String,
    pub value: T,
}

/// System-wide aggregates over one snapshot.
///
/// `process_count` covers every record. Sums, means and top-N lists only use
/// records whose metric was readable; a mean over zero such records is 0.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ResourceSummary {
    pub process_count: usize,
    pub unavailable_count: usize,
    pub cpu_total: f64,
    pub cpu_mean: f64,
    pub memory_total: u64,
    pub memory_mean: f64,
    pub status_counts: BTreeMap<ProcessState, usize>,
    pub top_cpu: Vec<TopEntry<f32>>,
    pub top_memory: Vec<TopEntry<u64>>,
}

pub fn summarize(records: &[ProcessRecord], top_n: usize) -> ResourceSummary {
    let _span = tracing::debug_span!("summary.build", records = records.len(), top_n).entered();

    let mut summary = ResourceSummary {
        process_count: records.len(),
        ..ResourceSummary::default()
    };
    let mut cpu_samples = 0usize;
    let mut memory_samples = 0usize;

    for record in records {
        *summary.status_counts.entry(record.status).or_insert(0) += 1;
        if !record.is_available() {
            summary.unavailable_count += 1;
        }
        if let Some(cpu) = record.cpu_percent {
            summary.cpu_total += f64::from(cpu);
            cpu_samples += 1;
        }
        if let Some(memory) = record.memory_bytes {
            summary.memory_total += memory;
            memory_samples += 1;
        }
    }

    summary.cpu_mean = mean(summary.cpu_total, cpu_samples);
    summary.memory_mean = mean(summary.memory_total as f64, memory_samples);
    summary.top_cpu = top_cpu(records, top_n);
    summary.top_memory = top_memory(records, top_n);
    summary
}

/// Highest CPU consumers among readable records.
pub fn top_cpu(records: &[ProcessRecord], n: usize) -> Vec<TopEntry<f32>> {
    top_by(records, n, |r| r.cpu_percent, |a, b| a.total_cmp(b))
}

/// Highest memory consumers among readable records.
pub fn top_memory(records: &[ProcessRecord], n: usize) -> Vec<TopEntry<u64>> {
    top_by(records, n, |r| r.memory_bytes, |a, b| a.cmp(b))
}

fn mean(total: f64, samples: usize) -> f64 {
    if samples == 0 {
        0.0
    } else {
        total / samples as f64
    }
}

/// The `n` records with the largest metric, largest first, ties by ascending
/// PID. Selects before sorting so only the kept entries are ordered.
fn top_by<T, M, C>(records: &[ProcessRecord], n: usize, metric: M, cmp: C) -> Vec<TopEntry<T>>
where
    T: Copy,
    M: Fn(&ProcessRecord) -> Option<T>,
    C: Fn(&T, &T) -> Ordering,
{
    if n == 0 {
        return Vec::new();
    }

    let mut candidates: Vec<(T, &ProcessRecord)> = records
        .iter()
        .filter_map(|r| metric(r).map(|value| (value, r)))
        .collect();
    let order = |a: &(T, &ProcessRecord), b: &(T, &ProcessRecord)| {
        cmp(&b.0, &a.0).then_with(|| a.1.pid.cmp(&b.1.pid))
    };

    if candidates.len() > n {
        candidates.select_nth_unstable_by(n - 1, order);
        candidates.truncate(n);
    }
    candidates.sort_unstable_by(order);

    candidates
        .into_iter()
        .map(|(value, r)| TopEntry {
            pid: r.pid,
            name: r.name.clone(),
            value,
        })
        .collect()
}
