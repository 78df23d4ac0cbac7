use std::path::PathBuf;
use thiserror::Error;

use crate::core::geometry::BlockId;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Invalid block range: end block {end} is before start block {start}")]
    InvalidRange { start: BlockId, end: BlockId },

    #[error("Invalid block range: end block {end} leaves no block number after it")]
    RangeOverflow { end: BlockId },

    #[error("Block range too large: {blocks} blocks (max {max})")]
    RangeTooLarge { blocks: u64, max: u64 },

    #[error("Invalid block size: {0} (must be at least one byte)")]
    InvalidBlockSize(u64),

    #[error("Malformed address: '{name}' has no leading block number")]
    MalformedAddress { name: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Export collision: more than one file would be written as '{name}'")]
    ExportCollision { name: String },

    #[error("Export directory {dir} contains input file {input}")]
    ExportOverlapsInput { dir: PathBuf, input: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PlanError {
    /// True for errors that abort a planning run before any file is looked at
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PlanError::InvalidRange { .. }
                | PlanError::RangeOverflow { .. }
                | PlanError::RangeTooLarge { .. }
                | PlanError::InvalidBlockSize(_)
                | PlanError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PlanError>;
