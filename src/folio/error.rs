use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The filesystem step that failed, carried by [`FolioError::Io`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    CreateDir,
    WriteTemp,
    Rename,
    Read,
    ReadDir,
    Remove,
}

impl fmt::Display for IoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            IoOp::CreateDir => "create directory",
            IoOp::WriteTemp => "write temporary file",
            IoOp::Rename => "rename into place",
            IoOp::Read => "read",
            IoOp::ReadDir => "list directory",
            IoOp::Remove => "remove",
        };
        f.write_str(verb)
    }
}

#[derive(Error, Debug)]
pub enum FolioError {
    #[error("missing collection - no place to save record")]
    MissingCollection,

    #[error("missing id - unable to address record")]
    MissingId,

    #[error("record reports an empty identity")]
    MissingIdentity,

    #[error("collection {0:?} has used up its id space")]
    IdSpaceExhausted(String),

    #[error("invalid JSON payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),

    #[error("invalid name {0:?}: names must not contain path separators or start with '.'")]
    InvalidName(String),

    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("corrupt record at {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to {op} {}: {source}", .path.display())]
    Io {
        op: IoOp,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FolioError {
    pub(crate) fn io(op: IoOp, path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| FolioError::Io { op, path, source }
    }

    /// True for the `NotFound` variant; handy for callers that treat absence as a
    /// normal outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FolioError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, FolioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_names_the_failed_step() {
        let err = FolioError::io(IoOp::Rename, "/tmp/x.json")(std::io::Error::other("boom"));
        let msg = err.to_string();
        assert!(msg.contains("rename into place"), "{}", msg);
        assert!(msg.contains("/tmp/x.json"), "{}", msg);
    }

    #[test]
    fn test_is_not_found() {
        assert!(FolioError::NotFound(PathBuf::from("a")).is_not_found());
        assert!(!FolioError::MissingId.is_not_found());
    }
}
