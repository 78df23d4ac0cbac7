//! Renaming after repacking
//!
//! A repacked file keeps everything after its address token and gets the new
//! start block as a zero-padded (two digit minimum) prefix:
//! `45_logo.icl` placed at 3 becomes `03_logo.icl`.

use crate::core::address::leaf_name;
use crate::core::allocator::PackingRecord;
use crate::core::geometry::BlockId;

/// Build the new leaf name for a file moved to `new_start`
///
/// - with an `_`: `{new_start:02}_{rest after the first _}`
/// - without `_` but with a `.`: `{new_start:02}.{text after the last .}`
/// - with neither: `{new_start:02}`
pub fn renamed(original_name: &str, new_start: BlockId) -> String {
    let leaf = leaf_name(original_name);
    if let Some((_, rest)) = leaf.split_once('_') {
        format!("{:02}_{}", new_start, rest)
    } else if let Some((_, ext)) = leaf.rsplit_once('.') {
        format!("{:02}.{}", new_start, ext)
    } else {
        // A bare name is only its address token, so `45` becomes `03`, not `03.45`.
        format!("{:02}", new_start)
    }
}

/// New name for a packing record, `None` if the file could not be placed
pub fn renamed_record(record: &PackingRecord) -> Option<String> {
    record
        .new_start()
        .map(|start| renamed(&record.file.name, start))
}
