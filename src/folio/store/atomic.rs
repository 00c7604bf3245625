//! Crash-safe file placement.
//!
//! Writes go to `<final>.tmp` in the same directory and are then renamed over
//! the final path. Rename within one filesystem is atomic, so the final path
//! only ever holds the old content or the complete new content.

use crate::error::{FolioError, IoOp, Result};
use crate::store::RECORD_EXT;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

pub const TEMP_SUFFIX: &str = ".tmp";

/// `<final>.tmp`, next to the final path.
pub fn temp_path_for(final_path: &Path) -> PathBuf {
    let mut name = OsString::from(final_path.as_os_str());
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// True for `<id>.json.tmp` files left by [`write_atomic`]; other `*.tmp`
/// files belong to somebody else.
pub fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_suffix(TEMP_SUFFIX))
        .is_some_and(|n| n.ends_with(RECORD_EXT))
}

/// Tab-indented JSON with a trailing newline.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser).map_err(FolioError::Serialization)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Serializes `value` and places it at `final_path` via `tmp_path`.
///
/// On any error before the rename, `final_path` is untouched. If the rename
/// itself fails the temp file is removed on a best-effort basis; whatever
/// survives is picked up by `Driver::doctor`.
pub fn write_atomic<T: Serialize + ?Sized>(
    dir: &Path,
    tmp_path: &Path,
    final_path: &Path,
    value: &T,
) -> Result<()> {
    fs::create_dir_all(dir).map_err(FolioError::io(IoOp::CreateDir, dir))?;

    let bytes = to_pretty_json(value)?;

    trace!(path = %tmp_path.display(), bytes = bytes.len(), "writing temp file");
    fs::write(tmp_path, &bytes).map_err(FolioError::io(IoOp::WriteTemp, tmp_path))?;

    if let Err(e) = fs::rename(tmp_path, final_path) {
        if let Err(cleanup) = fs::remove_file(tmp_path) {
            warn!(
                path = %tmp_path.display(),
                error = %cleanup,
                "could not remove temp file after failed rename"
            );
        }
        return Err(FolioError::io(IoOp::Rename, final_path)(e));
    }

    trace!(path = %final_path.display(), "renamed into place");
    Ok(())
}

/// Reads a whole file, mapping a missing file to `NotFound`.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => FolioError::NotFound(path.to_path_buf()),
        _ => FolioError::io(IoOp::Read, path)(e),
    })
}

/// Decodes bytes previously read from `path`; failures are `Corrupt`.
pub fn decode<T: DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|source| FolioError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = read_bytes(path)?;
    decode(path, &bytes)
}
