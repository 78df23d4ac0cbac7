//! Export of repacked files
//!
//! Copies every placeable file into an output directory under its new name
//! and records what was written in `export-manifest.json`, with a SHA-256
//! digest per file so the copies can be checked before flashing.

use crate::core::allocator::PackingRecord;
use crate::core::error::{PlanError, Result};
use crate::core::geometry::{BlockId, Geometry};
use crate::core::rename::renamed;
use crate::core::source::SourceFile;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

/// One exported file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEntry {
    pub original_name: String,
    pub new_name: String,
    pub new_start: BlockId,
    /// `None` for zero-size files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_end: Option<BlockId>,
    pub size_bytes: u64,
    /// Hex-encoded SHA-256 of the file contents
    pub sha256: String,
}

/// Contents of `export-manifest.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportManifest {
    /// Creation timestamp (RFC 3339)
    pub created: String,
    pub start_block: BlockId,
    pub end_block: BlockId,
    pub block_size: u64,
    pub entries: Vec<ExportEntry>,
    /// Files left out because they could not be placed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unplaced: Vec<String>,
}

impl ExportManifest {
    /// Manifest file name inside the export directory
    pub const FILE_NAME: &'static str = "export-manifest.json";

    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(dir.as_ref().join(Self::FILE_NAME))?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// A placeable file read into memory and checked against its plan
struct StagedFile<'a> {
    record: &'a PackingRecord,
    new_name: String,
    new_start: BlockId,
    content: Vec<u8>,
    sha256: String,
}

/// Write renamed copies of all placeable files into `out_dir`
///
/// `sources` must be indexed by input position, the same list the records'
/// `input_index` refers to. Every source is read and checked before the
/// first write, so a failed export leaves `out_dir` as it was. Returns
/// `Ok(None)` without touching the filesystem when no file is placeable.
///
/// # Errors
///
/// - `ExportCollision` if two files would get the same new name
/// - `ExportOverlapsInput` if `out_dir` holds any of the source files
/// - `Io` with `InvalidData` if a source changed length since planning
pub fn export_packing(
    records: &[PackingRecord],
    sources: &[SourceFile],
    geometry: &Geometry,
    out_dir: &Path,
) -> Result<Option<ExportManifest>> {
    let planned: Vec<(&PackingRecord, BlockId, String)> = records
        .iter()
        .filter_map(|r| {
            let new_start = r.new_start()?;
            Some((r, new_start, renamed(&r.file.name, new_start)))
        })
        .collect();

    if planned.is_empty() {
        warn!("No file could be placed, nothing to export");
        return Ok(None);
    }

    let mut seen = HashSet::new();
    for (_, _, name) in &planned {
        if !seen.insert(name.as_str()) {
            return Err(PlanError::ExportCollision { name: name.clone() });
        }
    }

    check_out_dir(out_dir, sources)?;

    let staged = planned
        .into_iter()
        .map(|(record, new_start, new_name)| -> Result<StagedFile> {
            let content = read_source(record, sources)?;
            let sha256 = hex::encode(Sha256::digest(&content));
            Ok(StagedFile {
                record,
                new_name,
                new_start,
                content,
                sha256,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    std::fs::create_dir_all(out_dir)?;
    info!("Exporting {} files to {:?}", staged.len(), out_dir);

    let mut entries = Vec::with_capacity(staged.len());
    for file in staged {
        std::fs::write(out_dir.join(&file.new_name), &file.content)?;
        debug!("Wrote {} as {}", file.record.file.name, file.new_name);

        entries.push(ExportEntry {
            original_name: file.record.file.name.clone(),
            new_name: file.new_name,
            new_start: file.new_start,
            new_end: file.record.new_end(),
            size_bytes: file.record.file.size_bytes,
            sha256: file.sha256,
        });
    }

    let manifest = ExportManifest {
        created: chrono::Utc::now().to_rfc3339(),
        start_block: geometry.range.start(),
        end_block: geometry.range.end(),
        block_size: geometry.block_size.get(),
        entries,
        unplaced: records
            .iter()
            .filter(|r| !r.placeable())
            .map(|r| r.file.name.clone())
            .collect(),
    };

    let json = serde_json::to_string_pretty(&manifest)?;
    std::fs::write(out_dir.join(ExportManifest::FILE_NAME), json)?;

    Ok(Some(manifest))
}

/// Refuse an output directory that already holds one of the inputs
fn check_out_dir(out_dir: &Path, sources: &[SourceFile]) -> Result<()> {
    // A directory that does not exist yet cannot hold an input.
    if !out_dir.exists() {
        return Ok(());
    }
    let dir = out_dir.canonicalize()?;
    for source in sources {
        let input = source.path.canonicalize()?;
        if input.starts_with(&dir) {
            return Err(PlanError::ExportOverlapsInput { dir, input });
        }
    }
    Ok(())
}

/// Read a source and check it still has the size it was planned with
fn read_source(record: &PackingRecord, sources: &[SourceFile]) -> Result<Vec<u8>> {
    let source = sources.get(record.input_index).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no source for '{}'", record.file.name),
        )
    })?;

    let content = std::fs::read(&source.path)?;
    if content.len() as u64 != record.file.size_bytes {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "{} changed since planning ({} bytes, planned {})",
                source.path.display(),
                content.len(),
                record.file.size_bytes
            ),
        )
        .into());
    }
    Ok(content)
}
