//! Geometry of the allocatable region
//!
//! A region is a run of equal-size blocks addressed by absolute [`BlockId`].
//! [`Geometry`] bundles the inclusive [`BlockRange`] with the [`BlockSize`]
//! and is the only way the planning passes learn about either, so a bad
//! range or a zero block size is rejected before any file is processed.

use crate::core::allocator::extent::Extent;
use crate::core::error::{PlanError, Result};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Absolute index of a block in the region
pub type BlockId = u64;

/// Bytes per block used by the reference flash layout (256KB)
pub const DEFAULT_BLOCK_SIZE: u64 = 256 * 1024;

/// Largest range a planning run will track block by block
pub const MAX_RANGE_BLOCKS: u64 = 1 << 20;

/// Number of blocks a file of `size_bytes` occupies
///
/// Rounds up: a partially filled block is still a whole block.
/// Zero-byte files need zero blocks.
pub fn blocks_needed(size_bytes: u64, block_size: BlockSize) -> u64 {
    size_bytes.div_ceil(block_size.get())
}

/// Number of bytes represented by one block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct BlockSize(u64);

impl BlockSize {
    /// Create a block size, rejecting zero
    pub fn new(bytes: u64) -> Result<Self> {
        if bytes == 0 {
            return Err(PlanError::InvalidBlockSize(bytes));
        }
        Ok(BlockSize(bytes))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        BlockSize(DEFAULT_BLOCK_SIZE)
    }
}

impl TryFrom<u64> for BlockSize {
    type Error = PlanError;

    fn try_from(bytes: u64) -> Result<Self> {
        BlockSize::new(bytes)
    }
}

impl From<BlockSize> for u64 {
    fn from(size: BlockSize) -> u64 {
        size.0
    }
}

/// Inclusive range of allocatable blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BlockRange {
    start: BlockId,
    end: BlockId,
}

impl BlockRange {
    /// Create a range `[start, end]`
    ///
    /// # Errors
    ///
    /// Returns `InvalidRange` when `end < start`, `RangeOverflow` when `end`
    /// is `BlockId::MAX` (the repacker cursor must be able to step past the
    /// last block), and `RangeTooLarge` when the range spans more than
    /// [`MAX_RANGE_BLOCKS`].
    pub fn new(start: BlockId, end: BlockId) -> Result<Self> {
        if end < start {
            return Err(PlanError::InvalidRange { start, end });
        }
        if end == BlockId::MAX {
            return Err(PlanError::RangeOverflow { end });
        }
        let blocks = end - start + 1;
        if blocks > MAX_RANGE_BLOCKS {
            return Err(PlanError::RangeTooLarge {
                blocks,
                max: MAX_RANGE_BLOCKS,
            });
        }
        Ok(BlockRange { start, end })
    }

    pub fn start(&self) -> BlockId {
        self.start
    }

    pub fn end(&self) -> BlockId {
        self.end
    }

    /// Number of blocks in the range (never zero)
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn contains(&self, block: BlockId) -> bool {
        block >= self.start && block <= self.end
    }

    /// Check that every block of a non-empty extent lies inside the range
    ///
    /// Empty extents claim nothing and are always contained; extents that
    /// run past `BlockId::MAX` never are.
    pub fn contains_extent(&self, extent: &Extent) -> bool {
        if extent.is_empty() {
            return true;
        }
        match extent.last() {
            None => false,
            Some(last) => extent.start >= self.start && last <= self.end,
        }
    }

    /// Blocks of `extent` that fall inside the range
    pub fn clip(&self, extent: &Extent) -> RangeInclusive<BlockId> {
        if extent.is_empty() {
            return RangeInclusive::new(1, 0);
        }
        // Saturating is exact here: `self.end` is below `BlockId::MAX`.
        let last = extent.start.saturating_add(extent.length - 1);
        extent.start.max(self.start)..=last.min(self.end)
    }
}

/// Range plus block size: everything a planning pass needs about the region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Geometry {
    pub range: BlockRange,
    pub block_size: BlockSize,
}

impl Geometry {
    pub fn new(start: BlockId, end: BlockId, block_size: u64) -> Result<Self> {
        Ok(Geometry {
            range: BlockRange::new(start, end)?,
            block_size: BlockSize::new(block_size)?,
        })
    }

    /// Footprint of a file declared (or placed) at `start`
    pub fn footprint(&self, start: BlockId, size_bytes: u64) -> Extent {
        Extent::new(start, blocks_needed(size_bytes, self.block_size))
    }

    /// Total capacity of the region in bytes
    pub fn capacity_bytes(&self) -> u64 {
        self.range.len().saturating_mul(self.block_size.get())
    }
}
