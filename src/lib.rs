//! # Blockplan - Block Placement Planner
//!
//! `blockplan` checks and repacks files that are placed into a fixed region of
//! equal-size flash blocks. Each file declares its start block in its name
//! (`33_boot.icl`), and its length determines how many blocks it covers.
//!
//! - **Validation**: are the declared placements inside the region and
//!   free of overlaps? Produces a per-file verdict and a block map.
//! - **Repacking**: a first-fit layout that packs every file back to back
//!   from the start of the region, with new file names to match.
//! - **Export**: renamed copies plus a manifest with SHA-256 digests.
//!
//! ## Quick Start
//!
//! ```rust
//! use blockplan::{FileDescriptor, Planner, Result};
//!
//! # fn main() -> Result<()> {
//! let planner = Planner::builder()
//!     .start_block(32)
//!     .end_block(63)
//!     .block_size(256 * 1024)
//!     .build()?;
//!
//! let files = vec![
//!     FileDescriptor::new("32_a.bin", 256 * 1024),
//!     FileDescriptor::new("33_b.bin", 512 * 1024),
//!     FileDescriptor::new("34_c.bin", 256 * 1024),
//! ];
//!
//! let plan = planner.plan(files)?;
//! assert!(!plan.validation.is_clean());
//! assert_eq!(plan.packing[2].new_start(), Some(35));
//!
//! println!("{}", planner.report(&plan));
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! ```rust,no_run
//! use blockplan::{PlanConfig, Planner};
//!
//! # fn main() -> blockplan::Result<()> {
//! let config = PlanConfig::load("blockplan.toml")?;
//! let planner = Planner::builder().config(&config).build()?;
//! # Ok(())
//! # }
//! ```

// Planning engine
pub mod core;

pub use crate::core::{
    address, allocator, config, error, export, geometry, order, rename, report, source,
};

// Re-export the types most callers need
pub use crate::core::{
    address::{AddressPolicy, AddressedFile, FileDescriptor},
    allocator::{
        AllocationRecord, AllocationStatus, BlockMap, BlockState, InvalidReason, PackingRecord,
        PlanningPass, Repacker, ValidationOutcome, Validator,
    },
    config::PlanConfig,
    error::{PlanError, Result},
    export::{ExportEntry, ExportManifest},
    geometry::{BlockId, BlockRange, BlockSize, Geometry},
    order::{DeclaredAddressOrder, InputOrder, PlacementOrder},
    report::PlanReport,
    source::SourceFile,
};

use crate::core::config::{DEFAULT_END_BLOCK, DEFAULT_START_BLOCK};
use crate::core::geometry::DEFAULT_BLOCK_SIZE;
use std::path::Path;
use tracing::{debug, info};

/// Output of a full planning run
///
/// Both passes saw the same files in the same order; `files` is that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub files: Vec<AddressedFile>,
    pub validation: ValidationOutcome,
    pub packing: Vec<PackingRecord>,
}

/// Entry point for validating and repacking a set of files
///
/// A `Planner` holds a validated [`Geometry`], the policy for malformed
/// names and the planning order. It keeps no state between calls: the same
/// input always yields the same plan.
pub struct Planner {
    geometry: Geometry,
    policy: AddressPolicy,
    order: Box<dyn PlacementOrder + Send + Sync>,
}

impl Planner {
    /// Planner over `geometry` with default policy and canonical order
    pub fn new(geometry: Geometry) -> Self {
        Planner {
            geometry,
            policy: AddressPolicy::default(),
            order: Box::new(DeclaredAddressOrder),
        }
    }

    pub fn builder() -> PlannerBuilder {
        PlannerBuilder::new()
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn policy(&self) -> AddressPolicy {
        self.policy
    }

    /// Extract declared addresses and arrange files in planning order
    ///
    /// # Errors
    ///
    /// `MalformedAddress` if a name has no block number and the policy is
    /// [`AddressPolicy::Reject`].
    pub fn prepare(&self, files: Vec<FileDescriptor>) -> Result<Vec<AddressedFile>> {
        let addressed = address::resolve(files, self.policy)?;
        let ordered = self.order.arrange(addressed);
        debug!("Prepared {} files for planning", ordered.len());
        Ok(ordered)
    }

    /// Validate the placements the files declare
    pub fn check(&self, files: Vec<FileDescriptor>) -> Result<ValidationOutcome> {
        let ordered = self.prepare(files)?;
        Ok(Validator::new(self.geometry).run(&ordered))
    }

    /// Compute a first-fit repacking
    pub fn pack(&self, files: Vec<FileDescriptor>) -> Result<Vec<PackingRecord>> {
        let ordered = self.prepare(files)?;
        Ok(Repacker::new(self.geometry).run(&ordered))
    }

    /// Run both passes over the same ordered input
    pub fn plan(&self, files: Vec<FileDescriptor>) -> Result<Plan> {
        let ordered = self.prepare(files)?;
        let validation = Validator::new(self.geometry).run(&ordered);
        let packing = Repacker::new(self.geometry).run(&ordered);

        info!(
            "Plan ready: {} of {} declared placements valid, {} files placeable",
            validation.records.iter().filter(|r| r.is_valid()).count(),
            ordered.len(),
            packing.iter().filter(|r| r.placeable()).count()
        );

        Ok(Plan {
            files: ordered,
            validation,
            packing,
        })
    }

    /// Full report over a plan
    pub fn report(&self, plan: &Plan) -> PlanReport {
        PlanReport::new(&self.geometry)
            .with_validation(&plan.validation)
            .with_packing(&plan.packing)
    }

    /// Copy the placeable files of `packing` to `out_dir` under their new names
    ///
    /// `sources` must be the list the packing was computed from, in input
    /// order. See [`export::export_packing`].
    pub fn export(
        &self,
        packing: &[PackingRecord],
        sources: &[SourceFile],
        out_dir: impl AsRef<Path>,
    ) -> Result<Option<ExportManifest>> {
        export::export_packing(packing, sources, &self.geometry, out_dir.as_ref())
    }
}

/// Builder for a [`Planner`]
///
/// Unset values fall back to the reference layout (blocks 32 to 63, 256KB
/// blocks), malformed names are rejected, and files are planned in
/// ascending declared-address order.
///
/// # Examples
///
/// ```rust
/// use blockplan::{AddressPolicy, InputOrder, PlannerBuilder};
///
/// # fn main() -> blockplan::Result<()> {
/// let planner = PlannerBuilder::new()
///     .start_block(0)
///     .end_block(127)
///     .block_size(4096)
///     .address_policy(AddressPolicy::Substitute(0))
///     .order(InputOrder)
///     .build()?;
/// assert_eq!(planner.geometry().range.len(), 128);
/// # Ok(())
/// # }
/// ```
pub struct PlannerBuilder {
    start_block: BlockId,
    end_block: BlockId,
    block_size: u64,
    policy: AddressPolicy,
    order: Option<Box<dyn PlacementOrder + Send + Sync>>,
}

impl PlannerBuilder {
    pub fn new() -> Self {
        PlannerBuilder {
            start_block: DEFAULT_START_BLOCK,
            end_block: DEFAULT_END_BLOCK,
            block_size: DEFAULT_BLOCK_SIZE,
            policy: AddressPolicy::Reject,
            order: None,
        }
    }

    /// Take range, block size and policy from a loaded config
    pub fn config(mut self, config: &PlanConfig) -> Self {
        self.start_block = config.start_block;
        self.end_block = config.end_block;
        self.block_size = config.block_size;
        self.policy = config.on_malformed;
        self
    }

    /// First allocatable block (inclusive)
    pub fn start_block(mut self, block: BlockId) -> Self {
        self.start_block = block;
        self
    }

    /// Last allocatable block (inclusive)
    pub fn end_block(mut self, block: BlockId) -> Self {
        self.end_block = block;
        self
    }

    pub fn block_size(mut self, bytes: u64) -> Self {
        self.block_size = bytes;
        self
    }

    pub fn address_policy(mut self, policy: AddressPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the canonical declared-address order
    pub fn order<O>(mut self, order: O) -> Self
    where
        O: PlacementOrder + Send + Sync + 'static,
    {
        self.order = Some(Box::new(order));
        self
    }

    /// Build the planner
    ///
    /// # Errors
    ///
    /// `InvalidRange`, `RangeOverflow`, `RangeTooLarge` or `InvalidBlockSize`.
    /// These are
    /// raised here, before any file is processed.
    pub fn build(self) -> Result<Planner> {
        let geometry = Geometry::new(self.start_block, self.end_block, self.block_size)?;

        info!(
            "Planning blocks {}..={} with {} byte blocks",
            self.start_block, self.end_block, self.block_size
        );

        Ok(Planner {
            geometry,
            policy: self.policy,
            order: self
                .order
                .unwrap_or_else(|| Box::new(DeclaredAddressOrder)),
        })
    }
}

impl Default for PlannerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
