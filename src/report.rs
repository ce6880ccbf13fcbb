//! Text rendering of the list, tree, top and summary views.

use std::collections::HashMap;
use std::fmt::Write;

use serde::Serialize;

use crate::format::{fit_unicode, format_bytes, format_optional_bytes, format_percent};
use crate::system::{
    ProcessForest, ProcessRecord, ProcessTreeNode, ResourceSummary, SystemSnapshot, TopEntry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Pid,
    Cpu,
    Memory,
    Name,
}

impl SortMode {
    pub fn from_str_config(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "cpu" => SortMode::Cpu,
            "memory" | "mem" => SortMode::Memory,
            "name" => SortMode::Name,
            _ => SortMode::Pid,
        }
    }

    /// Orders records in place. Metrics sort largest first with unavailable
    /// values last; every mode falls back to ascending PID.
    pub fn sort(self, records: &mut [ProcessRecord]) {
        match self {
            SortMode::Pid => records.sort_by_key(|r| r.pid),
            SortMode::Cpu => records.sort_by(|a, b| {
                let a_cpu = a.cpu_percent.unwrap_or(f32::NEG_INFINITY);
                let b_cpu = b.cpu_percent.unwrap_or(f32::NEG_INFINITY);
                b_cpu.total_cmp(&a_cpu).then(a.pid.cmp(&b.pid))
            }),
            SortMode::Memory => {
                records.sort_by(|a, b| b.memory_bytes.cmp(&a.memory_bytes).then(a.pid.cmp(&b.pid)))
            }
            SortMode::Name => records.sort_by(|a, b| {
                a.name
                    .to_lowercase()
                    .cmp(&b.name.to_lowercase())
                    .then(a.pid.cmp(&b.pid))
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DisplayOptions {
    pub name_width: usize,
    pub show_user: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            name_width: 28,
            show_user: true,
        }
    }
}

/// JSON shape of the summary view.
#[derive(Debug, Serialize)]
pub struct SummaryView<'a> {
    pub cpu_usage_percent: f32,
    pub memory_total: u64,
    pub memory_used: u64,
    pub memory_available: u64,
    pub swap_total: u64,
    pub swap_used: u64,
    pub processes: &'a ResourceSummary,
}

impl<'a> SummaryView<'a> {
    pub fn new(snapshot: &SystemSnapshot, summary: &'a ResourceSummary) -> Self {
        Self {
            cpu_usage_percent: snapshot.cpu_usage_percent,
            memory_total: snapshot.memory_total,
            memory_used: snapshot.memory_used,
            memory_available: snapshot.memory_available,
            swap_total: snapshot.swap_total,
            swap_used: snapshot.swap_used,
            processes: summary,
        }
    }
}

fn user_label(record: &ProcessRecord) -> &str {
    record.user.as_deref().unwrap_or("-")
}

fn ppid_label(record: &ProcessRecord) -> String {
    match record.ppid {
        Some(ppid) if ppid != 0 => ppid.to_string(),
        _ => "-".to_string(),
    }
}

pub fn render_list(records: &[ProcessRecord], opts: &DisplayOptions) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "{:>7} {} {:<9} {:>7} {:>10} {:>7}",
        "PID",
        fit_unicode("NAME", opts.name_width),
        "STATUS",
        "CPU%",
        "MEMORY",
        "PPID"
    );
    if opts.show_user {
        let _ = write!(out, " USER");
    }
    let _ = writeln!(out);

    for record in records {
        let _ = write!(
            out,
            "{:>7} {} {:<9} {:>7} {:>10} {:>7}",
            record.pid,
            fit_unicode(&record.name, opts.name_width),
            record.status.label(),
            format_percent(record.cpu_percent),
            format_optional_bytes(record.memory_bytes),
            ppid_label(record)
        );
        if opts.show_user {
            let _ = write!(out, " {}", user_label(record));
        }
        let _ = writeln!(out);
    }

    let unavailable = records.iter().filter(|r| !r.is_available()).count();
    let _ = writeln!(out);
    let _ = write!(out, "Total processes: {}", records.len());
    if unavailable > 0 {
        let _ = write!(out, " ({unavailable} unavailable)");
    }
    let _ = writeln!(out);
    out
}

fn node_label(node: &ProcessTreeNode) -> String {
    let record = &node.record;
    let mut label = format!(
        "{} {} ({}, cpu {}, mem {})",
        record.pid,
        record.name,
        record.status.label(),
        format_percent(record.cpu_percent),
        format_optional_bytes(record.memory_bytes)
    );
    if node.malformed_ancestry {
        label.push_str(" [malformed ancestry]");
    }
    label
}

fn render_node(out: &mut String, root: &ProcessTreeNode) {
    // (node, prefix, is_last_sibling, is_root)
    let mut stack: Vec<(&ProcessTreeNode, String, bool, bool)> =
        vec![(root, String::new(), true, true)];

    while let Some((node, prefix, last, is_root)) = stack.pop() {
        let connector = match (is_root, last) {
            (true, _) => "",
            (false, true) => "└─ ",
            (false, false) => "├─ ",
        };
        let _ = writeln!(out, "{prefix}{connector}{}", node_label(node));

        let child_prefix = match (is_root, last) {
            (true, _) => String::new(),
            (false, true) => format!("{prefix}   "),
            (false, false) => format!("{prefix}│  "),
        };
        let count = node.children.len();
        for (i, child) in node.children.iter().enumerate().rev() {
            stack.push((child, child_prefix.clone(), i + 1 == count, false));
        }
    }
}

pub fn render_tree(forest: &ProcessForest) -> String {
    let mut out = String::new();
    if forest.is_empty() {
        let _ = writeln!(out, "No process hierarchy found.");
        return out;
    }

    for root in &forest.roots {
        render_node(&mut out, root);
    }

    if !forest.issues.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Malformed ancestry:");
        for issue in &forest.issues {
            let _ = writeln!(out, "  - {issue}");
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Total: {} processes in {} trees",
        forest.len(),
        forest.roots.len()
    );
    out
}

/// Renders the hierarchy below one process.
pub fn render_subtree(node: &ProcessTreeNode) -> String {
    let mut out = String::new();
    render_node(&mut out, node);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Subtree: {} processes, {} total memory",
        node.descendant_count() + 1,
        format_bytes(node.subtree_memory())
    );
    out
}

/// Ranked table of the highest CPU consumers.
pub fn render_top(records: &[ProcessRecord], top: &[TopEntry<f32>], opts: &DisplayOptions) -> String {
    let by_pid: HashMap<u32, &ProcessRecord> = records.iter().map(|r| (r.pid, r)).collect();

    let mut out = String::new();
    let _ = write!(
        out,
        "{:>4} {:>7} {} {:>7} {:>10}",
        "RANK",
        "PID",
        fit_unicode("NAME", opts.name_width),
        "CPU%",
        "MEMORY"
    );
    if opts.show_user {
        let _ = write!(out, " USER");
    }
    let _ = writeln!(out);

    for (rank, entry) in top.iter().enumerate() {
        let record = by_pid.get(&entry.pid);
        let _ = write!(
            out,
            "{:>4} {:>7} {} {:>7} {:>10}",
            rank + 1,
            entry.pid,
            fit_unicode(&entry.name, opts.name_width),
            format_percent(Some(entry.value)),
            format_optional_bytes(record.and_then(|r| r.memory_bytes))
        );
        if opts.show_user {
            let _ = write!(out, " {}", record.map_or("-", |r| user_label(r)));
        }
        let _ = writeln!(out);
    }
    out
}

pub fn render_summary(snapshot: &SystemSnapshot, summary: &ResourceSummary) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "System");
    let _ = writeln!(out, "  CPU usage:         {:.1}%", snapshot.cpu_usage_percent);
    let _ = writeln!(
        out,
        "  Memory:            {} / {} ({:.1}%)",
        format_bytes(snapshot.memory_used),
        format_bytes(snapshot.memory_total),
        snapshot.memory_percent()
    );
    let _ = writeln!(
        out,
        "  Available memory:  {}",
        format_bytes(snapshot.memory_available)
    );
    let _ = writeln!(
        out,
        "  Swap:              {} / {}",
        format_bytes(snapshot.swap_used),
        format_bytes(snapshot.swap_total)
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "Processes");
    let _ = write!(out, "  Total:             {}", summary.process_count);
    if summary.unavailable_count > 0 {
        let _ = write!(out, " ({} unavailable)", summary.unavailable_count);
    }
    let _ = writeln!(out);
    if !summary.status_counts.is_empty() {
        let states = summary
            .status_counts
            .iter()
            .map(|(state, count)| format!("{state} {count}"))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "  By status:         {states}");
    }
    let _ = writeln!(
        out,
        "  CPU total / mean:  {:.1}% / {:.1}%",
        summary.cpu_total, summary.cpu_mean
    );
    let _ = writeln!(
        out,
        "  Memory total/mean: {} / {}",
        format_bytes(summary.memory_total),
        format_bytes(summary.memory_mean.round() as u64)
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "Top {} by CPU", summary.top_cpu.len());
    for (rank, entry) in summary.top_cpu.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. {} (PID {}) - {:.1}%",
            rank + 1,
            entry.name,
            entry.pid,
            entry.value
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Top {} by memory", summary.top_memory.len());
    for (rank, entry) in summary.top_memory.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. {} (PID {}) - {}",
            rank + 1,
            entry.name,
            entry.pid,
            format_bytes(entry.value)
        );
    }
    out
}
