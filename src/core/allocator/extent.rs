//! Extents: contiguous runs of blocks
//!
//! The single notion of a file's footprint shared by the validator and the
//! repacker. An extent of length zero is legal and claims no block.

use crate::core::geometry::BlockId;
use serde::{Deserialize, Serialize};

/// An extent representing a contiguous range of blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent {
    /// Starting block ID
    pub start: BlockId,
    /// Number of contiguous blocks
    pub length: u64,
}

impl Extent {
    pub fn new(start: BlockId, length: u64) -> Self {
        Extent { start, length }
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Last block covered
    ///
    /// `None` for an empty extent, and for one that runs past
    /// `BlockId::MAX` (such an extent fits no range).
    pub fn last(&self) -> Option<BlockId> {
        if self.is_empty() {
            None
        } else {
            self.start.checked_add(self.length - 1)
        }
    }

    /// First block after the extent, `None` if that is past `BlockId::MAX`
    pub fn next_start(&self) -> Option<BlockId> {
        self.start.checked_add(self.length)
    }

    /// Block IDs covered, in ascending order, stopping at `BlockId::MAX`
    pub fn blocks(&self) -> impl Iterator<Item = BlockId> {
        let start = self.start;
        (0..self.length).map_while(move |offset| start.checked_add(offset))
    }
}
