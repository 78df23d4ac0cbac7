//! Human and machine readable plan reports
//!
//! A [`PlanReport`] is a flat, serializable view of a validation outcome
//! and/or a packing proposal. `Display` renders the text tables printed by
//! the CLI; [`PlanReport::to_json`] renders the same data as JSON.

use crate::core::allocator::{
    AllocationRecord, AllocationStatus, BlockState, InvalidReason, PackingRecord, ValidationOutcome,
};
use crate::core::error::Result;
use crate::core::geometry::{BlockId, Geometry};
use crate::core::rename::renamed_record;
use serde::Serialize;
use std::fmt;

/// Blocks per row in the rendered block map
const MAP_ROW_WIDTH: usize = 64;

/// Size in KiB rounded to one decimal
fn kib(size_bytes: u64) -> f64 {
    (size_bytes as f64 / 1024.0 * 10.0).round() / 10.0
}

fn status_label(status: AllocationStatus) -> &'static str {
    match status {
        AllocationStatus::Valid => "Valid",
        AllocationStatus::Invalid(InvalidReason::OutOfRange) => "Out of range",
        AllocationStatus::Invalid(InvalidReason::Overlap) => "Overlap",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegionSummary {
    pub start_block: BlockId,
    pub end_block: BlockId,
    pub block_count: u64,
    pub block_size: u64,
    pub capacity_bytes: u64,
}

impl From<&Geometry> for RegionSummary {
    fn from(geometry: &Geometry) -> Self {
        RegionSummary {
            start_block: geometry.range.start(),
            end_block: geometry.range.end(),
            block_count: geometry.range.len(),
            block_size: geometry.block_size.get(),
            capacity_bytes: geometry.capacity_bytes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationRow {
    pub file: String,
    pub size_kib: f64,
    pub blocks: u64,
    pub declared_start: BlockId,
    pub declared_end: Option<BlockId>,
    pub status: AllocationStatus,
}

impl From<&AllocationRecord> for ValidationRow {
    fn from(record: &AllocationRecord) -> Self {
        ValidationRow {
            file: record.file.name.clone(),
            size_kib: kib(record.file.size_bytes),
            blocks: record.blocks_needed(),
            declared_start: record.declared_start(),
            declared_end: record.declared_end(),
            status: record.status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidationStats {
    pub valid: usize,
    pub invalid: usize,
    pub occupied_blocks: usize,
    pub conflict_blocks: usize,
    pub free_blocks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationSection {
    pub rows: Vec<ValidationRow>,
    /// Names of invalid files, in planning order
    pub offending: Vec<String>,
    pub block_map: Vec<BlockState>,
    pub stats: ValidationStats,
}

impl From<&ValidationOutcome> for ValidationSection {
    fn from(outcome: &ValidationOutcome) -> Self {
        let map = &outcome.block_map;
        let valid = outcome.records.iter().filter(|r| r.is_valid()).count();
        ValidationSection {
            rows: outcome.records.iter().map(ValidationRow::from).collect(),
            offending: outcome.invalid().map(|r| r.file.name.clone()).collect(),
            block_map: map.states().to_vec(),
            stats: ValidationStats {
                valid,
                invalid: outcome.records.len() - valid,
                occupied_blocks: map.count(BlockState::Occupied),
                conflict_blocks: map.count(BlockState::Conflict),
                free_blocks: map.count(BlockState::Free),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackingRow {
    pub file: String,
    pub size_kib: f64,
    pub blocks: u64,
    pub declared_start: BlockId,
    /// `None` when the file is out of space
    pub new_start: Option<BlockId>,
    pub new_end: Option<BlockId>,
    pub new_name: Option<String>,
    /// Placed on the block its name already declares
    pub keeps_address: bool,
}

impl From<&PackingRecord> for PackingRow {
    fn from(record: &PackingRecord) -> Self {
        PackingRow {
            file: record.file.name.clone(),
            size_kib: kib(record.file.size_bytes),
            blocks: record.blocks_needed,
            declared_start: record.declared_start,
            new_start: record.new_start(),
            new_end: record.new_end(),
            new_name: renamed_record(record),
            keeps_address: record.keeps_address(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PackingStats {
    pub placed: usize,
    pub unplaceable: usize,
    pub kept_in_place: usize,
    pub packed_blocks: u64,
    /// Packed blocks over region blocks, 0.0 to 1.0
    pub utilization: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackingSection {
    pub rows: Vec<PackingRow>,
    pub stats: PackingStats,
}

impl PackingSection {
    fn new(records: &[PackingRecord], region: &RegionSummary) -> Self {
        let placed = records.iter().filter(|r| r.placeable()).count();
        let packed_blocks: u64 = records
            .iter()
            .filter_map(|r| r.placement)
            .map(|extent| extent.length)
            .sum();
        PackingSection {
            rows: records.iter().map(PackingRow::from).collect(),
            stats: PackingStats {
                placed,
                unplaceable: records.len() - placed,
                kept_in_place: records.iter().filter(|r| r.keeps_address()).count(),
                packed_blocks,
                utilization: packed_blocks as f64 / region.block_count as f64,
            },
        }
    }
}

/// Report over one planning run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanReport {
    pub region: RegionSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packing: Option<PackingSection>,
}

impl PlanReport {
    /// An empty report for `geometry`; add sections with the `with_*` methods
    pub fn new(geometry: &Geometry) -> Self {
        PlanReport {
            region: RegionSummary::from(geometry),
            validation: None,
            packing: None,
        }
    }

    pub fn with_validation(mut self, outcome: &ValidationOutcome) -> Self {
        self.validation = Some(ValidationSection::from(outcome));
        self
    }

    pub fn with_packing(mut self, records: &[PackingRecord]) -> Self {
        self.packing = Some(PackingSection::new(records, &self.region));
        self
    }

    /// True if any file is invalid or unplaceable
    pub fn has_problems(&self) -> bool {
        self.validation
            .as_ref()
            .is_some_and(|v| v.stats.invalid > 0)
            || self
                .packing
                .as_ref()
                .is_some_and(|p| p.stats.unplaceable > 0)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn write_validation(&self, f: &mut fmt::Formatter<'_>, v: &ValidationSection) -> fmt::Result {
        writeln!(f, "Declared placements")?;
        let width = name_width(v.rows.iter().map(|r| r.file.as_str()));
        writeln!(
            f,
            "{:<width$}  {:>10}  {:>6}  {:>6}  {:>6}  STATUS",
            "FILE", "SIZE (KiB)", "BLOCKS", "START", "END"
        )?;
        for row in &v.rows {
            writeln!(
                f,
                "{:<width$}  {:>10.1}  {:>6}  {:>6}  {:>6}  {}",
                row.file,
                row.size_kib,
                row.blocks,
                row.declared_start,
                opt(row.declared_end),
                status_label(row.status)
            )?;
        }
        writeln!(f)?;

        if v.offending.is_empty() {
            writeln!(f, "No overlapping or out-of-range files.")?;
        } else {
            writeln!(f, "Offending files:")?;
            for name in &v.offending {
                writeln!(f, "  {}", name)?;
            }
        }
        writeln!(f)?;

        writeln!(f, "Block map (. free, # occupied, X conflict)")?;
        write_block_map(f, self.region.start_block, &v.block_map)?;
        writeln!(
            f,
            "{} valid, {} invalid; {} occupied, {} conflict, {} free blocks",
            v.stats.valid,
            v.stats.invalid,
            v.stats.occupied_blocks,
            v.stats.conflict_blocks,
            v.stats.free_blocks
        )
    }

    fn write_packing(&self, f: &mut fmt::Formatter<'_>, p: &PackingSection) -> fmt::Result {
        writeln!(f, "Packing proposal")?;
        let width = name_width(p.rows.iter().map(|r| r.file.as_str()));
        writeln!(
            f,
            "{:<width$}  {:>10}  {:>6}  {:>12}  {:>6}  NEW NAME",
            "FILE", "SIZE (KiB)", "BLOCKS", "NEW START", "END"
        )?;
        for row in &p.rows {
            let start = match row.new_start {
                Some(start) => start.to_string(),
                None => "OUT OF SPACE".to_string(),
            };
            writeln!(
                f,
                "{:<width$}  {:>10.1}  {:>6}  {:>12}  {:>6}  {}",
                row.file,
                row.size_kib,
                row.blocks,
                start,
                opt(row.new_end),
                row.new_name.as_deref().unwrap_or("N/A")
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{} placed ({} at their declared block), {} out of space; {} of {} blocks used ({:.1}%)",
            p.stats.placed,
            p.stats.kept_in_place,
            p.stats.unplaceable,
            p.stats.packed_blocks,
            self.region.block_count,
            p.stats.utilization * 100.0
        )
    }
}

impl fmt::Display for PlanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Region: blocks {}..={} ({} blocks of {} bytes, {:.1} KiB)",
            self.region.start_block,
            self.region.end_block,
            self.region.block_count,
            self.region.block_size,
            kib(self.region.capacity_bytes)
        )?;

        if let Some(v) = &self.validation {
            writeln!(f)?;
            self.write_validation(f, v)?;
        }
        if let Some(p) = &self.packing {
            writeln!(f)?;
            self.write_packing(f, p)?;
        }
        Ok(())
    }
}

fn opt(value: Option<BlockId>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn name_width<'a>(names: impl Iterator<Item = &'a str>) -> usize {
    names.map(str::len).max().unwrap_or(0).max("FILE".len())
}

fn write_block_map(f: &mut fmt::Formatter<'_>, start: BlockId, states: &[BlockState]) -> fmt::Result {
    for (row, chunk) in states.chunks(MAP_ROW_WIDTH).enumerate() {
        let first = start + (row * MAP_ROW_WIDTH) as u64;
        let glyphs: String = chunk.iter().map(|s| s.glyph()).collect();
        writeln!(f, "{:>8} {}", first, glyphs)?;
    }
    Ok(())
}
