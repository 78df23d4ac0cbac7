//! Validation of declared placements
//!
//! Walks the files in planning order and checks each declared extent against
//! the range and against blocks already claimed by earlier valid files.
//!
//! Collisions are resolved asymmetrically: the first occupant keeps its
//! blocks and stays valid, the later file is the one flagged. A flagged file
//! turns its free in-range blocks into [`BlockState::Conflict`] but never
//! downgrades a block some earlier valid file occupies, so later files are
//! still checked against the real occupants.

use crate::core::address::{AddressedFile, FileDescriptor};
use crate::core::allocator::extent::Extent;
use crate::core::allocator::PlanningPass;
use crate::core::geometry::{BlockId, BlockRange, Geometry};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Occupancy of one block after validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockState {
    Free,
    Occupied,
    Conflict,
}

impl BlockState {
    /// Single-character rendering used by the text block map
    pub fn glyph(self) -> char {
        match self {
            BlockState::Free => '.',
            BlockState::Occupied => '#',
            BlockState::Conflict => 'X',
        }
    }
}

/// Per-block state over the whole range, indexed by absolute block ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockMap {
    range: BlockRange,
    states: Vec<BlockState>,
}

impl BlockMap {
    /// A map with every block of `range` free
    pub fn free(range: BlockRange) -> Self {
        BlockMap {
            range,
            states: vec![BlockState::Free; range.len() as usize],
        }
    }

    /// State of an absolute block, `None` outside the range
    pub fn state(&self, block: BlockId) -> Option<BlockState> {
        self.index(block).map(|idx| self.states[idx])
    }

    /// States in block order, first entry is `range.start()`
    pub fn states(&self) -> &[BlockState] {
        &self.states
    }

    pub fn count(&self, state: BlockState) -> usize {
        self.states.iter().filter(|&&s| s == state).count()
    }

    fn index(&self, block: BlockId) -> Option<usize> {
        if self.range.contains(block) {
            Some((block - self.range.start()) as usize)
        } else {
            None
        }
    }

    /// Claim blocks for a valid file
    fn occupy(mut self, blocks: impl Iterator<Item = BlockId>) -> Self {
        for block in blocks {
            if let Some(idx) = self.index(block) {
                self.states[idx] = BlockState::Occupied;
            }
        }
        self
    }

    /// Record blocks claimed by an invalid file; occupied blocks are kept
    fn mark_conflict(mut self, blocks: impl Iterator<Item = BlockId>) -> Self {
        for block in blocks {
            if let Some(idx) = self.index(block) {
                if self.states[idx] != BlockState::Occupied {
                    self.states[idx] = BlockState::Conflict;
                }
            }
        }
        self
    }
}

/// Why a declared placement was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    /// Starts before or ends after the allocatable range
    OutOfRange,
    /// Claims a block an earlier valid file already occupies
    Overlap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    Valid,
    Invalid(InvalidReason),
}

/// Validation verdict for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationRecord {
    pub file: FileDescriptor,
    pub input_index: usize,
    /// Footprint the file's name declares
    pub declared: Extent,
    pub status: AllocationStatus,
}

impl AllocationRecord {
    pub fn declared_start(&self) -> BlockId {
        self.declared.start
    }

    /// Last declared block, `None` for a zero-size file
    pub fn declared_end(&self) -> Option<BlockId> {
        self.declared.last()
    }

    pub fn blocks_needed(&self) -> u64 {
        self.declared.length
    }

    pub fn is_valid(&self) -> bool {
        self.status == AllocationStatus::Valid
    }
}

/// Records in planning order plus the resulting block map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub records: Vec<AllocationRecord>,
    pub block_map: BlockMap,
}

impl ValidationOutcome {
    /// True when every declared placement is valid
    pub fn is_clean(&self) -> bool {
        self.records.iter().all(AllocationRecord::is_valid)
    }

    pub fn invalid(&self) -> impl Iterator<Item = &AllocationRecord> {
        self.records.iter().filter(|r| !r.is_valid())
    }
}

/// Checks declared placements for range containment and block exclusivity
#[derive(Debug, Clone)]
pub struct Validator {
    geometry: Geometry,
}

impl Validator {
    pub fn new(geometry: Geometry) -> Self {
        Validator { geometry }
    }

    /// Judge one file against the blocks claimed so far
    fn check(&self, entry: &AddressedFile, map: BlockMap) -> (AllocationRecord, BlockMap) {
        let range = self.geometry.range;
        let declared = self
            .geometry
            .footprint(entry.declared_start, entry.file.size_bytes);

        let status = if declared.is_empty() {
            AllocationStatus::Valid
        } else if !range.contains_extent(&declared) {
            AllocationStatus::Invalid(InvalidReason::OutOfRange)
        } else if declared
            .blocks()
            .any(|block| map.state(block) == Some(BlockState::Occupied))
        {
            AllocationStatus::Invalid(InvalidReason::Overlap)
        } else {
            AllocationStatus::Valid
        };

        let map = match status {
            AllocationStatus::Valid => {
                debug!(
                    "'{}' valid at {:?} ({} blocks)",
                    entry.file.name,
                    declared.last().map(|last| declared.start..=last),
                    declared.length
                );
                map.occupy(declared.blocks())
            }
            AllocationStatus::Invalid(reason) => {
                warn!(
                    "'{}' invalid: {:?} (declared start {}, {} blocks)",
                    entry.file.name, reason, declared.start, declared.length
                );
                map.mark_conflict(range.clip(&declared))
            }
        };

        let record = AllocationRecord {
            file: entry.file.clone(),
            input_index: entry.input_index,
            declared,
            status,
        };
        (record, map)
    }
}

impl PlanningPass for Validator {
    type Output = ValidationOutcome;

    fn run(&self, files: &[AddressedFile]) -> ValidationOutcome {
        let range = self.geometry.range;
        info!(
            "Validating {} files against blocks {}..={}",
            files.len(),
            range.start(),
            range.end()
        );

        let (records, block_map) = files.iter().fold(
            (Vec::with_capacity(files.len()), BlockMap::free(range)),
            |(mut records, map), entry| {
                let (record, map) = self.check(entry, map);
                records.push(record);
                (records, map)
            },
        );

        ValidationOutcome { records, block_map }
    }
}
