use std::io;
use std::path::{Path, PathBuf};

/// Fatal, typed failures. Malformed lyric lines are deliberately not here:
/// they are warned about and skipped during parsing.
#[derive(Debug, thiserror::Error)]
pub enum VerseError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("invalid format: {0}")]
    Format(String),
    #[error("playback failure: {0}")]
    Playback(String),
}

impl VerseError {
    /// Maps an IO error encountered while touching `path` onto the
    /// corresponding typed variant.
    pub fn from_io(err: io::Error, path: &Path) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Format(format!("{}: {err}", path.display())),
        }
    }
}
