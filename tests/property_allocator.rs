//! Property-based tests for planner correctness
//!
//! Uses proptest to verify validator and repacker invariants hold across many
//! random file sets and regions

use blockplan::geometry::blocks_needed;
use blockplan::{
    AllocationStatus, BlockSize, BlockState, FileDescriptor, Geometry, InvalidReason, Planner,
};
use proptest::prelude::*;
use std::collections::HashSet;

const BS: u64 = 4096;

/// (declared start, size in bytes) pairs turned into named descriptors
fn descriptors(specs: &[(u64, u64)]) -> Vec<FileDescriptor> {
    specs
        .iter()
        .enumerate()
        .map(|(i, &(start, size))| FileDescriptor::new(format!("{}_f{}.bin", start, i), size))
        .collect()
}

fn planner(start: u64, len: u64) -> Planner {
    Planner::new(Geometry::new(start, start + len - 1, BS).unwrap())
}

fn file_specs() -> impl Strategy<Value = Vec<(u64, u64)>> {
    prop::collection::vec((0u64..80, 0u64..6 * BS), 0..25)
}

proptest! {
    #[test]
    fn prop_packed_files_are_disjoint_and_in_range(
        start in 0u64..50,
        len in 1u64..40,
        specs in file_specs(),
    ) {
        let planner = planner(start, len);
        let range = planner.geometry().range;
        let packing = planner.pack(descriptors(&specs)).unwrap();

        let mut used = HashSet::new();
        for record in packing.iter().filter(|r| r.placeable()) {
            let extent = record.placement.unwrap();
            for block in extent.blocks() {
                prop_assert!(range.contains(block), "block {} outside range", block);
                prop_assert!(used.insert(block), "block {} placed twice", block);
            }
        }
    }

    #[test]
    fn prop_packing_is_contiguous_from_range_start(
        len in 1u64..40,
        specs in file_specs(),
    ) {
        let planner = planner(32, len);
        let packing = planner.pack(descriptors(&specs)).unwrap();

        let mut cursor = 32;
        for record in packing.iter().filter(|r| r.placeable()) {
            let extent = record.placement.unwrap();
            prop_assert_eq!(extent.start, cursor);
            cursor += extent.length;
        }
    }

    #[test]
    fn prop_unplaceable_file_could_not_fit(
        len in 1u64..20,
        specs in file_specs(),
    ) {
        let planner = planner(0, len);
        let packing = planner.pack(descriptors(&specs)).unwrap();

        let mut cursor = 0;
        for record in &packing {
            match record.placement {
                Some(extent) => cursor += extent.length,
                None => prop_assert!(cursor + record.blocks_needed > len),
            }
        }
    }

    #[test]
    fn prop_planning_is_deterministic(
        start in 0u64..50,
        len in 1u64..40,
        specs in file_specs(),
    ) {
        let planner = planner(start, len);
        let first = planner.plan(descriptors(&specs)).unwrap();
        let second = planner.plan(descriptors(&specs)).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_zero_size_files_do_not_change_packing(
        len in 1u64..40,
        specs in file_specs(),
        empties in prop::collection::vec(0u64..80, 0..5),
    ) {
        let planner = planner(0, len);
        let without = planner.pack(descriptors(&specs)).unwrap();

        let mut with_specs = specs.clone();
        with_specs.extend(empties.iter().map(|&start| (start, 0)));
        let with = planner.pack(descriptors(&with_specs)).unwrap();

        let placements = |records: &[blockplan::PackingRecord]| -> Vec<_> {
            records
                .iter()
                .filter(|r| r.blocks_needed > 0)
                .map(|r| (r.file.name.clone(), r.placement))
                .collect()
        };
        prop_assert_eq!(placements(&without[..]), placements(&with[..]));
    }

    #[test]
    fn prop_valid_files_own_their_blocks(
        start in 0u64..50,
        len in 1u64..40,
        specs in file_specs(),
    ) {
        let planner = planner(start, len);
        let outcome = planner.check(descriptors(&specs)).unwrap();
        let map = &outcome.block_map;

        let mut owned = HashSet::new();
        for record in outcome.records.iter().filter(|r| r.is_valid()) {
            for block in record.declared.blocks() {
                prop_assert_eq!(map.state(block), Some(BlockState::Occupied));
                prop_assert!(owned.insert(block), "block {} owned twice", block);
            }
        }
        prop_assert_eq!(owned.len(), map.count(BlockState::Occupied));
    }

    #[test]
    fn prop_overlap_flagged_files_hit_an_occupant(
        len in 1u64..40,
        specs in file_specs(),
    ) {
        let planner = planner(0, len);
        let outcome = planner.check(descriptors(&specs)).unwrap();

        for record in &outcome.records {
            if record.status == AllocationStatus::Invalid(InvalidReason::Overlap) {
                prop_assert!(record
                    .declared
                    .blocks()
                    .any(|b| outcome.block_map.state(b) == Some(BlockState::Occupied)));
            }
        }
    }

    #[test]
    fn prop_out_of_range_matches_containment(
        start in 0u64..50,
        len in 1u64..40,
        specs in file_specs(),
    ) {
        let planner = planner(start, len);
        let range = planner.geometry().range;
        let outcome = planner.check(descriptors(&specs)).unwrap();

        for record in &outcome.records {
            let out_of_range = record.status == AllocationStatus::Invalid(InvalidReason::OutOfRange);
            let contained = range.contains_extent(&record.declared);
            prop_assert_eq!(out_of_range, !contained);
        }
    }

    #[test]
    fn prop_blocks_needed_boundaries(
        block_size in 1u64..1_000_000,
        k in 0u64..1000,
    ) {
        let bs = BlockSize::new(block_size).unwrap();
        prop_assert_eq!(blocks_needed(k * block_size, bs), k);
        prop_assert_eq!(blocks_needed(k * block_size + 1, bs), k + 1);
    }
}
