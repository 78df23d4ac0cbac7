//! Reading input files from disk
//!
//! The planner only needs a name and a length. Lengths are read once here,
//! from filesystem metadata, before any planning pass runs.

use crate::core::address::FileDescriptor;
use crate::core::error::Result;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// An input file on disk and the descriptor planned for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub descriptor: FileDescriptor,
}

/// Describe each path by its leaf file name and byte length
///
/// Order is preserved so a descriptor's position is its input index.
///
/// # Errors
///
/// I/O errors from metadata lookups, and `InvalidInput` for paths that are
/// not regular files or have no file name.
pub fn describe_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<SourceFile>> {
    paths.iter().map(|p| describe_path(p.as_ref())).collect()
}

fn describe_path(path: &Path) -> Result<SourceFile> {
    let metadata = std::fs::metadata(path)?;
    if !metadata.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a regular file", path.display()),
        )
        .into());
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no file name", path.display()),
            )
        })?;

    debug!("{} is {} bytes", name, metadata.len());

    Ok(SourceFile {
        path: path.to_path_buf(),
        descriptor: FileDescriptor::new(name, metadata.len()),
    })
}

/// Descriptors of the given sources, in the same order
pub fn descriptors(sources: &[SourceFile]) -> Vec<FileDescriptor> {
    sources.iter().map(|s| s.descriptor.clone()).collect()
}
