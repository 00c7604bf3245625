//! # Storage Layer
//!
//! Low-level pieces the [`Driver`](crate::driver::Driver) is built from.
//!
//! - [`atomic`]: write-to-temp-then-rename persistence and the matching reader
//! - [`locks`]: the per-collection lock registry
//!
//! ## Storage Format
//!
//! ```text
//! <root>/
//! ├── folio.json                # Optional store configuration
//! └── <collection>/
//!     ├── <id>.json             # One record per file
//!     └── <id>.json.tmp         # Only while a write is in flight
//! ```
//!
//! Collections are plain directories and records are plain files, so the store
//! can be inspected, diffed, and backed up with ordinary tools.

use crate::error::{FolioError, Result};

pub mod atomic;
pub mod locks;

pub const RECORD_EXT: &str = ".json";

/// Rejects names that would not map to exactly one entry directly below
/// their parent directory.
pub(crate) fn validate_name(name: &str, empty: FolioError) -> Result<()> {
    if name.is_empty() {
        return Err(empty);
    }
    let escapes = name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
        || name.chars().any(char::is_control);
    if escapes {
        return Err(FolioError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Parses a record file name (`42.json`) into its numeric id.
pub(crate) fn numeric_id(file_name: &str) -> Option<u64> {
    file_name.strip_suffix(RECORD_EXT)?.parse().ok()
}
