//! First-fit sequential repacking
//!
//! Places files back to back from the start of the range in planning order.
//! The only state is a cursor that always points at the first block after
//! everything placed so far. A file that does not fit at the cursor is
//! marked unplaceable and the cursor stays put, so a later, smaller file may
//! still fit. Zero-size files are placed at the cursor without moving it.

use crate::core::address::{AddressedFile, FileDescriptor};
use crate::core::allocator::extent::Extent;
use crate::core::allocator::PlanningPass;
use crate::core::geometry::{BlockId, Geometry};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Packing result for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackingRecord {
    pub file: FileDescriptor,
    pub input_index: usize,
    /// Block the file's name declared; kept for renaming and reports
    pub declared_start: BlockId,
    pub blocks_needed: u64,
    /// New footprint, `None` when capacity ran out for this file
    pub placement: Option<Extent>,
}

impl PackingRecord {
    pub fn placeable(&self) -> bool {
        self.placement.is_some()
    }

    pub fn new_start(&self) -> Option<BlockId> {
        self.placement.map(|extent| extent.start)
    }

    /// Last placed block; `None` when unplaceable or zero-size
    pub fn new_end(&self) -> Option<BlockId> {
        self.placement.and_then(|extent| extent.last())
    }

    /// True when the file lands on the block its name already declares
    pub fn keeps_address(&self) -> bool {
        self.new_start() == Some(self.declared_start)
    }
}

/// First-fit packer over the configured range
#[derive(Debug, Clone)]
pub struct Repacker {
    geometry: Geometry,
}

impl Repacker {
    pub fn new(geometry: Geometry) -> Self {
        Repacker { geometry }
    }

    /// Try to place one file at `cursor`, returning its record and the next cursor
    fn place(&self, entry: &AddressedFile, cursor: BlockId) -> (PackingRecord, BlockId) {
        let candidate = self.geometry.footprint(cursor, entry.file.size_bytes);

        let fits = self.geometry.range.contains_extent(&candidate);
        let (placement, next_cursor) = match candidate.next_start() {
            Some(next) if fits => (Some(candidate), next),
            _ => (None, cursor),
        };

        match placement {
            Some(extent) => debug!(
                "'{}' packed at block {} ({} blocks)",
                entry.file.name, extent.start, extent.length
            ),
            None => warn!(
                "'{}' does not fit: needs {} blocks at {}, range ends at {}",
                entry.file.name,
                candidate.length,
                cursor,
                self.geometry.range.end()
            ),
        }

        let record = PackingRecord {
            file: entry.file.clone(),
            input_index: entry.input_index,
            declared_start: entry.declared_start,
            blocks_needed: candidate.length,
            placement,
        };
        (record, next_cursor)
    }
}

impl PlanningPass for Repacker {
    type Output = Vec<PackingRecord>;

    fn run(&self, files: &[AddressedFile]) -> Vec<PackingRecord> {
        let range = self.geometry.range;
        info!(
            "Packing {} files into blocks {}..={}",
            files.len(),
            range.start(),
            range.end()
        );

        let (records, cursor) = files.iter().fold(
            (Vec::with_capacity(files.len()), range.start()),
            |(mut records, cursor), entry| {
                let (record, cursor) = self.place(entry, cursor);
                records.push(record);
                (records, cursor)
            },
        );

        debug!("Packing finished with cursor at block {}", cursor);
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::DEFAULT_BLOCK_SIZE as BS;

    fn file(name: &str, declared_start: u64, size_bytes: u64, idx: usize) -> AddressedFile {
        AddressedFile {
            file: FileDescriptor::new(name, size_bytes),
            declared_start,
            input_index: idx,
        }
    }

    fn repacker(start: u64, end: u64) -> Repacker {
        Repacker::new(Geometry::new(start, end, BS).unwrap())
    }

    #[test]
    fn test_sequential_placement_from_range_start() {
        let records = repacker(32, 63).run(&[
            file("40_a.bin", 40, BS, 0),
            file("45_b.bin", 45, 2 * BS, 1),
            file("50_c.bin", 50, BS + 1, 2),
        ]);

        assert_eq!(records[0].placement, Some(Extent::new(32, 1)));
        assert_eq!(records[1].placement, Some(Extent::new(33, 2)));
        assert_eq!(records[2].placement, Some(Extent::new(35, 2)));
        assert_eq!(records[2].new_end(), Some(36));
        assert!(records.iter().all(PackingRecord::placeable));
    }

    #[test]
    fn test_oversized_file_is_unplaceable() {
        let records = repacker(0, 1).run(&[file("0_big.bin", 0, 3 * BS, 0)]);

        assert!(!records[0].placeable());
        assert_eq!(records[0].new_start(), None);
        assert_eq!(records[0].new_end(), None);
        assert_eq!(records[0].blocks_needed, 3);
    }

    #[test]
    fn test_failure_does_not_advance_cursor() {
        let records = repacker(0, 3).run(&[
            file("0_a", 0, 2 * BS, 0),
            file("1_big", 1, 5 * BS, 1),
            file("2_b", 2, 2 * BS, 2),
            file("3_c", 3, BS, 3),
        ]);

        assert_eq!(records[0].new_start(), Some(0));
        assert!(!records[1].placeable());
        // b still fits right after a.
        assert_eq!(records[2].placement, Some(Extent::new(2, 2)));
        // Range is now full.
        assert!(!records[3].placeable());
    }

    #[test]
    fn test_exact_fill() {
        let records = repacker(10, 13).run(&[
            file("10_a", 10, 2 * BS, 0),
            file("12_b", 12, 2 * BS, 1),
        ]);
        assert_eq!(records[1].new_end(), Some(13));
        assert!(records.iter().all(PackingRecord::placeable));
    }

    #[test]
    fn test_zero_size_file_keeps_cursor() {
        let records = repacker(32, 63).run(&[
            file("32_a", 32, BS, 0),
            file("33_empty", 33, 0, 1),
            file("34_b", 34, BS, 2),
        ]);

        assert!(records[1].placeable());
        assert_eq!(records[1].new_start(), Some(33));
        assert_eq!(records[1].new_end(), None);
        assert_eq!(records[2].new_start(), Some(33));
    }

    #[test]
    fn test_zero_size_file_placeable_when_range_full() {
        let records = repacker(0, 0).run(&[file("0_a", 0, BS, 0), file("0_empty", 0, 0, 1)]);
        assert!(records[1].placeable());
        assert_eq!(records[1].new_start(), Some(1));
    }

    #[test]
    fn test_keeps_address() {
        let records = repacker(32, 63).run(&[file("32_a", 32, BS, 0), file("40_b", 40, BS, 1)]);
        assert!(records[0].keeps_address());
        assert!(!records[1].keeps_address());
    }

    #[test]
    fn test_packing_near_block_id_ceiling() {
        let top = u64::MAX - 1;
        let records = repacker(top - 3, top).run(&[
            file("1_a", 1, 2 * BS, 0),
            file("2_b", 2, 2 * BS, 1),
            file("3_c", 3, BS, 2),
            file("4_empty", 4, 0, 3),
        ]);

        assert_eq!(records[0].placement, Some(Extent::new(top - 3, 2)));
        assert_eq!(records[1].placement, Some(Extent::new(top - 1, 2)));
        assert_eq!(records[1].new_end(), Some(top));
        assert!(!records[2].placeable());
        // Cursor sits at MAX, one past the range; an empty file still lands there.
        assert_eq!(records[3].new_start(), Some(u64::MAX));
    }

    #[test]
    fn test_deterministic() {
        let files = vec![
            file("3_a", 3, 3 * BS, 0),
            file("1_b", 1, BS, 1),
            file("2_c", 2, 7 * BS, 2),
        ];
        let packer = repacker(0, 9);
        assert_eq!(packer.run(&files), packer.run(&files));
    }
}
