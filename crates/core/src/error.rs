//! Error types for rattrap-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::profile::{Field, ProfileId};

/// Shown alongside [`Error::PermissionDenied`] so the user can fix udev access.
pub const PERMISSION_HINT: &str = "You may want to follow the instructions at \
https://gitlab.com/krayon/ratslap to allow your user to access the mouse.";

/// Core library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// libusb could not open the mouse (udev rules missing, not in group).
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The configured path does not point at a working ratslap binary.
    #[error("not a valid ratslap executable: {}", .0.display())]
    InvalidToolPath(PathBuf),

    /// The tool wrote something unexpected to stderr.
    #[error("ratslap failed: {0}")]
    ToolFailed(String),

    /// Tool output did not have the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// Profile name outside F3..F5.
    #[error("unknown profile: {0} (expected f3, f4 or f5)")]
    InvalidProfile(String),

    /// Unknown settings column.
    #[error("unknown field: {0}")]
    InvalidField(String),

    /// Field exists but cannot be edited from the front-end.
    #[error("field {0} is read-only")]
    NotEditable(Field),

    /// No stored row for the profile.
    #[error("profile {0} is not stored yet")]
    MissingProfile(ProfileId),

    /// SQLite failure.
    #[error("settings store: {0}")]
    Store(#[from] rusqlite::Error),

    /// Process spawning or file access failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Import/export serialization failure.
    #[error("profile file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
