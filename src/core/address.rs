//! Declared-address extraction
//!
//! A file announces where it wants to live through its name: the leaf
//! component starts with a decimal block number terminated by the first `_`
//! or `.` (`33_boot.icl`, `40.icl`, `7`). Anything else is a malformed
//! address and is reported, never guessed.

use crate::core::error::{PlanError, Result};
use crate::core::geometry::BlockId;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Input file as seen by the planner: a name and a byte length
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    pub size_bytes: u64,
}

impl FileDescriptor {
    pub fn new(name: impl Into<String>, size_bytes: u64) -> Self {
        FileDescriptor {
            name: name.into(),
            size_bytes,
        }
    }
}

/// A file together with its declared start block and input position
///
/// `input_index` is the tie-breaker for canonical ordering and the key the
/// export step uses to find the file's bytes again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressedFile {
    pub file: FileDescriptor,
    pub declared_start: BlockId,
    pub input_index: usize,
}

/// What to do with a file whose name carries no block number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressPolicy {
    /// Abort the run with `MalformedAddress`
    #[default]
    Reject,
    /// Pretend the file declared this block
    Substitute(BlockId),
}

/// Leaf component of a path-like name
///
/// Both `/` and `\` count as directory separators so names coming from
/// either platform behave the same.
pub fn leaf_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Parse the declared start block from a file name
///
/// # Errors
///
/// Returns `MalformedAddress` when the token before the first `_` or `.` of
/// the leaf name is empty, contains anything but ASCII digits, or does not
/// fit a [`BlockId`].
///
/// # Examples
///
/// ```
/// use blockplan::address::extract;
///
/// assert_eq!(extract("33_b.bin").unwrap(), 33);
/// assert_eq!(extract("images/040.icl").unwrap(), 40);
/// assert!(extract("boot_33.bin").is_err());
/// ```
pub fn extract(name: &str) -> Result<BlockId> {
    let leaf = leaf_name(name);
    let token = leaf.split(['_', '.']).next().unwrap_or_default();

    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PlanError::MalformedAddress {
            name: name.to_string(),
        });
    }

    token.parse::<BlockId>().map_err(|_| PlanError::MalformedAddress {
        name: name.to_string(),
    })
}

/// Extract addresses for a whole input list, applying `policy` to failures
///
/// Preserves input order; ordering is a separate step (see `order`).
pub fn resolve(files: Vec<FileDescriptor>, policy: AddressPolicy) -> Result<Vec<AddressedFile>> {
    files
        .into_iter()
        .enumerate()
        .map(|(input_index, file)| {
            let declared_start = match (extract(&file.name), policy) {
                (Ok(block), _) => block,
                (Err(err), AddressPolicy::Reject) => return Err(err),
                (Err(_), AddressPolicy::Substitute(block)) => {
                    warn!(
                        "No block number in '{}', substituting block {}",
                        file.name, block
                    );
                    block
                }
            };
            Ok(AddressedFile {
                file,
                declared_start,
                input_index,
            })
        })
        .collect()
}
