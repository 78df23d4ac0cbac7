//! Planning engine
//!
//! - [`error`] - Error type for planning operations
//! - [`geometry`] - Block size, allocatable range, footprints
//! - [`address`] - Declared start block from a file name
//! - [`order`] - Canonical planning order
//! - [`allocator`] - The two planning passes:
//!   - [`allocator::validator`] - Checks declared placements
//!   - [`allocator::repacker`] - First-fit repacking
//! - [`rename`] - New names after repacking
//! - [`config`] - TOML configuration
//! - [`report`] - Text and JSON reports
//! - [`source`] - Input files on disk
//! - [`export`] - Renamed copies plus manifest
//!
//! ## Architecture
//!
//! ```text
//! names + sizes ──► address::resolve ──► PlacementOrder::arrange
//!                                               │
//!                         ┌─────────────────────┴───────────────────┐
//!                         ▼                                         ▼
//!                  Validator::run                             Repacker::run
//!           (records + block map)                      (records + placements)
//!                         │                                         │
//!                         └──────────────► PlanReport ◄─────────────┘
//!                                                                   │
//!                                                    rename + export
//! ```

pub mod address;
pub mod allocator;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod order;
pub mod rename;
pub mod report;
pub mod source;
