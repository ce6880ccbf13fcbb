use std::collections::HashSet;

use proctree::system::{ProcessRecord, build_tree, summarize};
use proptest::prelude::*;

/// Unique PIDs with arbitrary parent links, including self-parents, links to
/// missing PIDs and cycles.
fn arb_records() -> impl Strategy<Value = Vec<ProcessRecord>> {
    prop::collection::hash_set(1u32..400, 0..80).prop_flat_map(|pids| {
        let pids: Vec<u32> = pids.into_iter().collect();
        let n = pids.len();
        (
            Just(pids),
            prop::collection::vec(
                prop_oneof![
                    Just(None),
                    Just(Some(0u32)),
                    (1u32..400).prop_map(Some),
                ],
                n,
            ),
            prop::collection::vec(prop::option::of(0.0f32..400.0), n),
            prop::collection::vec(prop::option::of(0u64..1_000_000), n),
        )
            .prop_map(|(pids, parents, cpus, mems)| {
                pids.into_iter()
                    .zip(parents)
                    .zip(cpus.into_iter().zip(mems))
                    .map(|((pid, ppid), (cpu, mem))| {
                        let mut record = ProcessRecord::new(pid, ppid, format!("p{pid}"));
                        record.cpu_percent = cpu;
                        record.memory_bytes = mem;
                        record
                    })
                    .collect()
            })
    })
}

proptest! {
    #[test]
    fn every_pid_appears_exactly_once(records in arb_records()) {
        let forest = build_tree(&records);

        let mut seen = HashSet::new();
        for (_, node) in forest.walk() {
            prop_assert!(seen.insert(node.pid()), "pid {} duplicated", node.pid());
        }
        let expected: HashSet<u32> = records.iter().map(|r| r.pid).collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn child_counts_plus_roots_equal_records(records in arb_records()) {
        let forest = build_tree(&records);
        let child_total: usize = forest.walk().map(|(_, n)| n.children.len()).sum();
        prop_assert_eq!(child_total + forest.roots.len(), records.len());
    }

    #[test]
    fn children_and_roots_are_in_pid_order(records in arb_records()) {
        let forest = build_tree(&records);
        let roots: Vec<u32> = forest.roots.iter().map(|r| r.pid()).collect();
        prop_assert!(roots.windows(2).all(|w| w[0] < w[1]));
        for (_, node) in forest.walk() {
            let pids: Vec<u32> = node.children.iter().map(|c| c.pid()).collect();
            prop_assert!(pids.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn every_flagged_root_has_an_issue(records in arb_records()) {
        let forest = build_tree(&records);
        let flagged: HashSet<u32> = forest
            .roots
            .iter()
            .filter(|r| r.malformed_ancestry)
            .map(|r| r.pid())
            .collect();
        let reported: HashSet<u32> = forest.issues.iter().map(|i| i.pid()).collect();
        prop_assert_eq!(flagged, reported);
    }

    #[test]
    fn build_tree_is_idempotent(records in arb_records()) {
        prop_assert_eq!(build_tree(&records), build_tree(&records));
    }

    #[test]
    fn input_order_does_not_matter(records in arb_records()) {
        let mut reversed = records.clone();
        reversed.reverse();
        prop_assert_eq!(build_tree(&records), build_tree(&reversed));
    }

    #[test]
    fn top_lists_are_bounded_and_sorted(records in arb_records(), n in 0usize..10) {
        let summary = summarize(&records, n);

        let cpu_available = records.iter().filter(|r| r.cpu_percent.is_some()).count();
        prop_assert_eq!(summary.top_cpu.len(), n.min(cpu_available));
        for pair in summary.top_cpu.windows(2) {
            prop_assert!(
                pair[0].value > pair[1].value
                    || (pair[0].value == pair[1].value && pair[0].pid < pair[1].pid)
            );
        }

        let mem_available = records.iter().filter(|r| r.memory_bytes.is_some()).count();
        prop_assert_eq!(summary.top_memory.len(), n.min(mem_available));
        for pair in summary.top_memory.windows(2) {
            prop_assert!(
                pair[0].value > pair[1].value
                    || (pair[0].value == pair[1].value && pair[0].pid < pair[1].pid)
            );
        }

        prop_assert_eq!(summary.process_count, records.len());
    }

    #[test]
    fn top_cpu_entries_beat_everything_left_out(records in arb_records(), n in 1usize..10) {
        let summary = summarize(&records, n);
        let kept: HashSet<u32> = summary.top_cpu.iter().map(|e| e.pid).collect();
        if let Some(last) = summary.top_cpu.last() {
            for r in records.iter().filter(|r| !kept.contains(&r.pid)) {
                if let Some(cpu) = r.cpu_percent {
                    prop_assert!(cpu < last.value || (cpu == last.value && r.pid > last.pid));
                }
            }
        }
    }
}
