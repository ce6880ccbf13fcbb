//! Parent/child forest built from a flat process list.
//!
//! Parent PIDs are never trusted to be acyclic. Every record ends up in the
//! forest exactly once: records whose parent is missing, zero, themselves or
//! part of a parent cycle become roots, and the malformed ones are reported as
//! [`AncestryIssue`]s.

use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use super::error::AncestryIssue;
use super::process::ProcessRecord;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessTreeNode {
    pub record: ProcessRecord,
    /// Ascending PID order.
    pub children: Vec<ProcessTreeNode>,
    /// Set when this node was promoted to a root because of a self-parent or a
    /// parent cycle.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub malformed_ancestry: bool,
}

impl ProcessTreeNode {
    pub fn pid(&self) -> u32 {
        self.record.pid
    }

    /// Number of nodes below this one.
    pub fn descendant_count(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&ProcessTreeNode> = self.children.iter().collect();
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Memory of this node plus all descendants; unavailable records add 0.
    pub fn subtree_memory(&self) -> u64 {
        let mut total = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            total += node.record.memory_bytes.unwrap_or(0);
            stack.extend(node.children.iter());
        }
        total
    }

    /// Depth-first, pre-order walk of this subtree; the node itself is depth 0.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![(0, self)],
        }
    }
}

/// Pre-order iterator over `(depth, node)` pairs.
pub struct Walk<'a> {
    stack: Vec<(usize, &'a ProcessTreeNode)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a ProcessTreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(|child| (depth + 1, child)));
        Some((depth, node))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProcessForest {
    /// Ascending PID order.
    pub roots: Vec<ProcessTreeNode>,
    pub issues: Vec<AncestryIssue>,
}

impl ProcessForest {
    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.roots.iter().map(|r| 1 + r.descendant_count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn walk(&self) -> impl Iterator<Item = (usize, &ProcessTreeNode)> {
        self.roots.iter().flat_map(ProcessTreeNode::walk)
    }

    pub fn find(&self, pid: u32) -> Option<&ProcessTreeNode> {
        self.walk().map(|(_, node)| node).find(|node| node.pid() == pid)
    }
}

// Visit marks for the ancestry walk.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

/// Builds the process forest from a flat list of records.
pub fn build_tree(records: &[ProcessRecord]) -> ProcessForest {
    let _span = tracing::debug_span!("tree.build", records = records.len()).entered();

    let mut sorted: Vec<&ProcessRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.pid);
    sorted.dedup_by(|later, first| {
        let duplicate = later.pid == first.pid;
        if duplicate {
            warn!(pid = later.pid, "duplicate PID in snapshot, keeping first record");
        }
        duplicate
    });

    let index: HashMap<u32, usize> = sorted
        .iter()
        .enumerate()
        .map(|(i, r)| (r.pid, i))
        .collect();

    let mut issues = Vec::new();
    let mut malformed = vec![false; sorted.len()];
    let mut parent: Vec<Option<usize>> = sorted
        .iter()
        .enumerate()
        .map(|(i, r)| {
            if r.ppid == Some(r.pid) {
                issues.push(AncestryIssue::SelfParent { pid: r.pid });
                malformed[i] = true;
                return None;
            }
            r.parent_pid().and_then(|p| index.get(&p).copied())
        })
        .collect();

    break_cycles(&sorted, &mut parent, &mut malformed, &mut issues);

    for issue in &issues {
        warn!(%issue, "malformed ancestry, promoting to root");
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); sorted.len()];
    let mut roots = Vec::new();
    for (i, p) in parent.iter().enumerate() {
        match p {
            Some(p) => children[*p].push(i),
            None => roots.push(i),
        }
    }

    // Pre-order so that every child comes after its parent; assembling in
    // reverse then always finds the children already built.
    let mut order = Vec::with_capacity(sorted.len());
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(i) = stack.pop() {
        order.push(i);
        stack.extend(children[i].iter().rev().copied());
    }

    let mut built: Vec<Option<ProcessTreeNode>> = vec![None; sorted.len()];
    for &i in order.iter().rev() {
        let node = ProcessTreeNode {
            record: sorted[i].clone(),
            children: children[i]
                .iter()
                .filter_map(|&c| built[c].take())
                .collect(),
            malformed_ancestry: malformed[i],
        };
        built[i] = Some(node);
    }

    ProcessForest {
        roots: roots.iter().filter_map(|&r| built[r].take()).collect(),
        issues,
    }
}

/// Walks every parent chain once and cuts each cycle at its lowest PID.
fn break_cycles(
    sorted: &[&ProcessRecord],
    parent: &mut [Option<usize>],
    malformed: &mut [bool],
    issues: &mut Vec<AncestryIssue>,
) {
    let mut marks = vec![Mark::Unvisited; sorted.len()];
    let mut path = Vec::new();

    for start in 0..sorted.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }

        let mut current = Some(start);
        while let Some(i) = current {
            match marks[i] {
                Mark::Done => break,
                Mark::OnPath => {
                    let Some(pos) = path.iter().position(|&p| p == i) else {
                        break;
                    };
                    let cycle = &path[pos..];
                    // Indices follow PID order, so the smallest index is the
                    // lowest PID.
                    let cut = cycle.iter().copied().min().unwrap_or(i);
                    let mut chain: Vec<u32> = cycle.iter().map(|&c| sorted[c].pid).collect();
                    chain.sort_unstable();

                    parent[cut] = None;
                    malformed[cut] = true;
                    issues.push(AncestryIssue::Cycle {
                        pid: sorted[cut].pid,
                        chain,
                    });
                    break;
                }
                Mark::Unvisited => {
                    marks[i] = Mark::OnPath;
                    path.push(i);
                    current = parent[i];
                }
            }
        }

        for &i in &path {
            marks[i] = Mark::Done;
        }
        path.clear();
    }
}
