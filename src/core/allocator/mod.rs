//! Planning passes over the block region
//!
//! Two independent passes consume the same canonically ordered file list:
//! - [`validator`] checks the placements the files declare
//! - [`repacker`] computes a fresh first-fit placement
//!
//! Neither pass reads the other's output, and neither keeps state between
//! runs. Both derive a file's footprint through [`Geometry::footprint`].

pub mod extent;
pub mod repacker;
pub mod validator;

use crate::core::address::AddressedFile;
use crate::core::geometry::Geometry;

pub use repacker::{PackingRecord, Repacker};
pub use validator::{
    AllocationRecord, AllocationStatus, BlockMap, BlockState, InvalidReason, ValidationOutcome,
    Validator,
};

/// A single pass over an ordered file list
///
/// Implementations are pure: the same files in the same order always give
/// the same output.
pub trait PlanningPass {
    type Output;

    /// Run the pass over files already in their planning order
    fn run(&self, files: &[AddressedFile]) -> Self::Output;
}

/// Validate declared placements (see [`Validator`])
pub fn validate(files: &[AddressedFile], geometry: Geometry) -> ValidationOutcome {
    Validator::new(geometry).run(files)
}

/// Compute a first-fit packing (see [`Repacker`])
pub fn repack(files: &[AddressedFile], geometry: Geometry) -> Vec<PackingRecord> {
    Repacker::new(geometry).run(files)
}
