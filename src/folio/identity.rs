//! # Identity Policies
//!
//! A record's identifier is also its file name, so something has to decide it
//! before a write can happen. There are two ways:
//!
//! - [`ExplicitId`]: the payload names itself through [`Identified`](crate::model::Identified).
//! - [`AutoIncrement`]: the driver hands out `1`, `2`, `3`, ... per collection.
//!
//! The policy is a type parameter of [`Driver`](crate::driver::Driver), so a
//! store is one or the other for its whole life.
//!
//! ## Counter Recovery
//!
//! Auto-increment keeps no counter file. When a driver opens, every
//! collection directory is scanned and its counter is seeded with the largest
//! numeric file name found (`17.json` → 17). Non-numeric names, temp files and
//! subdirectories are ignored.

use crate::error::{FolioError, IoOp, Result};
use crate::store::numeric_id;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Per-root state for one identity strategy.
pub trait IdentityPolicy: Send + Sync + Sized {
    /// Builds the policy state for a store rooted at `root`.
    fn recover(root: &Path) -> Result<Self>;
}

/// Identifiers come from the payload itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExplicitId;

impl IdentityPolicy for ExplicitId {
    fn recover(_root: &Path) -> Result<Self> {
        Ok(ExplicitId)
    }
}

/// Store-assigned, per-collection increasing identifiers.
#[derive(Debug, Default)]
pub struct AutoIncrement {
    counters: Mutex<HashMap<String, u64>>,
}

impl AutoIncrement {
    /// Issues the next identifier for `collection`. The first one is 1.
    ///
    /// Fails with `IdSpaceExhausted` once the counter sits at `u64::MAX`; the
    /// counter is left where it is so no id is ever handed out twice.
    pub fn next_id(&self, collection: &str) -> Result<u64> {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let counter = counters.entry(collection.to_string()).or_insert(0);
        *counter = counter
            .checked_add(1)
            .ok_or_else(|| FolioError::IdSpaceExhausted(collection.to_string()))?;
        Ok(*counter)
    }

    /// The last identifier issued (or recovered) for `collection`; 0 if none.
    pub fn current(&self, collection: &str) -> u64 {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .copied()
            .unwrap_or(0)
    }
}

impl IdentityPolicy for AutoIncrement {
    fn recover(root: &Path) -> Result<Self> {
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(FolioError::io(IoOp::ReadDir, root)(e)),
        };

        let mut counters = HashMap::new();
        for entry in entries {
            let entry = entry.map_err(FolioError::io(IoOp::ReadDir, root))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let max = max_numeric_id(&path)?;
            debug!(collection = name, max, "recovered counter");
            counters.insert(name.to_string(), max);
        }

        Ok(Self {
            counters: Mutex::new(counters),
        })
    }
}

fn max_numeric_id(dir: &Path) -> Result<u64> {
    let mut max: u64 = 0;
    for entry in fs::read_dir(dir).map_err(FolioError::io(IoOp::ReadDir, dir))? {
        let entry = entry.map_err(FolioError::io(IoOp::ReadDir, dir))?;
        if !entry.path().is_file() {
            continue;
        }
        if let Some(id) = entry.file_name().to_str().and_then(numeric_id) {
            max = max.max(id);
        }
    }
    Ok(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_fresh_collection_starts_at_one() {
        let policy = AutoIncrement::default();
        assert_eq!(policy.current("posts"), 0);
        assert_eq!(policy.next_id("posts").unwrap(), 1);
        assert_eq!(policy.next_id("posts").unwrap(), 2);
        assert_eq!(policy.next_id("users").unwrap(), 1);
        assert_eq!(policy.current("posts"), 2);
    }

    #[test]
    fn test_recover_missing_root() {
        let dir = tempdir().unwrap();
        let policy = AutoIncrement::recover(&dir.path().join("absent")).unwrap();
        assert_eq!(policy.next_id("posts").unwrap(), 1);
    }

    #[test]
    fn test_recover_seeds_from_max_numeric_file() {
        let dir = tempdir().unwrap();
        let posts = dir.path().join("posts");
        fs::create_dir_all(posts.join("9.json")).unwrap(); // a directory, ignored
        for name in ["1.json", "12.json", "3.json", "40.json.tmp", "draft.json", "notes.txt"] {
            fs::write(posts.join(name), "{}").unwrap();
        }
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        fs::write(dir.path().join("folio.json"), "{}").unwrap();

        let policy = AutoIncrement::recover(dir.path()).unwrap();
        assert_eq!(policy.current("posts"), 12);
        assert_eq!(policy.next_id("posts").unwrap(), 13);
        assert_eq!(policy.current("empty"), 0);
        assert_eq!(policy.current("folio.json"), 0);
    }

    #[test]
    fn test_exhausted_counter_fails_without_wrapping() {
        let dir = tempdir().unwrap();
        let posts = dir.path().join("posts");
        fs::create_dir_all(&posts).unwrap();
        fs::write(posts.join("18446744073709551615.json"), "{}").unwrap();

        let policy = AutoIncrement::recover(dir.path()).unwrap();
        assert_eq!(policy.current("posts"), u64::MAX);

        let err = policy.next_id("posts").unwrap_err();
        assert!(matches!(err, FolioError::IdSpaceExhausted(ref c) if c == "posts"));
        // still exhausted, never wraps around to 0
        assert!(policy.next_id("posts").is_err());
        assert_eq!(policy.current("posts"), u64::MAX);
        assert_eq!(policy.next_id("users").unwrap(), 1);
    }
}
