//! Planning configuration
//!
//! Loaded from TOML; every field is optional and falls back to the layout
//! of the reference flash part (blocks 32 to 63, 256KB blocks).
//!
//! ```toml
//! start_block = 32
//! end_block = 63
//! block_size = 262144
//! on_malformed = "reject"        # or { substitute = 0 }
//! ```

use crate::core::address::AddressPolicy;
use crate::core::error::{PlanError, Result};
use crate::core::geometry::{BlockId, Geometry, DEFAULT_BLOCK_SIZE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// First allocatable block when nothing else is configured
pub const DEFAULT_START_BLOCK: BlockId = 32;

/// Last allocatable block when nothing else is configured
pub const DEFAULT_END_BLOCK: BlockId = 63;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlanConfig {
    /// First allocatable block (inclusive)
    pub start_block: BlockId,
    /// Last allocatable block (inclusive)
    pub end_block: BlockId,
    /// Bytes per block
    pub block_size: u64,
    /// Handling of file names without a block number
    pub on_malformed: AddressPolicy,
}

impl Default for PlanConfig {
    fn default() -> Self {
        PlanConfig {
            start_block: DEFAULT_START_BLOCK,
            end_block: DEFAULT_END_BLOCK,
            block_size: DEFAULT_BLOCK_SIZE,
            on_malformed: AddressPolicy::Reject,
        }
    }
}

impl PlanConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| PlanError::Config(e.to_string()))
    }

    /// Read a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        info!("Loaded plan config from {:?}", path);
        Ok(config)
    }

    /// Validated geometry for this config
    ///
    /// # Errors
    ///
    /// `InvalidRange`, `RangeOverflow`, `RangeTooLarge` or `InvalidBlockSize`.
    pub fn geometry(&self) -> Result<Geometry> {
        Geometry::new(self.start_block, self.end_block, self.block_size)
    }
}
