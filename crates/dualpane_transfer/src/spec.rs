//! Transfer request/options models, notifications and top-level error types.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Which clipboard action armed the pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumTransferMode {
    /// Nothing armed.
    #[default]
    None,
    /// Armed by `copy`.
    Copy,
    /// Armed by `cut`. Paste still copies; the source is never removed.
    Cut,
}

impl EnumTransferMode {
    /// Lower-case label used in logs and by the Python bridge.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Copy => "copy",
            Self::Cut => "cut",
        }
    }
}

/// Symlink handling policy for the pasted entry and everything below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumTransferSymlinkStrategy {
    /// Follow the link and copy the target bytes/entries.
    Dereference,
    /// Create a symbolic link at destination (do not copy target bytes).
    CopySymlinks,
}

/// Result of [`crate::ops::delete_entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumDeleteOutcome {
    /// Entry removed (recursively for directories).
    Deleted,
    /// Directory name starts with `$`; left in place.
    SkippedProtected,
    /// Nothing exists at the path.
    NotFound,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndEvents

/// The engine's only piece of state: one pending source plus its mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecTransferRequest {
    /// Source path as given by the caller; empty when unset.
    pub path_source: PathBuf,
    /// Armed mode.
    pub mode: EnumTransferMode,
}

impl SpecTransferRequest {
    /// `true` when a paste would actually do something.
    pub fn is_armed(&self) -> bool {
        self.mode != EnumTransferMode::None && !self.path_source.as_os_str().is_empty()
    }
}

/// Input options for a paste.
#[derive(Debug, Clone)]
pub struct SpecTransferOptions {
    /// Symlink handling behavior.
    pub rule_symlink: EnumTransferSymlinkStrategy,
    /// Copy permission bits and access/modification times.
    pub if_preserve_metadata: bool,
    /// Copy extended attributes (Linux only, best effort).
    pub if_copy_xattrs: bool,
    /// Maximum worker threads for the file-copy stage of a directory paste.
    pub num_workers_max: Option<usize>,
}

impl Default for SpecTransferOptions {
    fn default() -> Self {
        Self {
            rule_symlink: EnumTransferSymlinkStrategy::Dereference,
            if_preserve_metadata: true,
            if_copy_xattrs: true,
            num_workers_max: None,
        }
    }
}

/// Notification delivered to engine observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTransfer {
    /// `copy` armed this path.
    Copied(PathBuf),
    /// `cut` armed this path.
    CutMarked(PathBuf),
    /// `paste` finished; carries the post-uniquing destination.
    Pasted(PathBuf),
}

impl EventTransfer {
    /// Path carried by the event.
    pub fn path(&self) -> &Path {
        match self {
            Self::Copied(path) | Self::CutMarked(path) | Self::Pasted(path) => path,
        }
    }

    /// Stable event name (`copied`, `cut`, `pasted`).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Copied(_) => "copied",
            Self::CutMarked(_) => "cut",
            Self::Pasted(_) => "pasted",
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Result alias for transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;

/// Filesystem failures surfaced by paste, delete and rename.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The armed source no longer exists.
    #[error("Source does not exist: {}", path.display())]
    SourceNotFound {
        /// Missing source path.
        path: PathBuf,
    },
    /// A symlink points nowhere while the strategy is `Dereference`.
    #[error("Broken symlink: {}", path.display())]
    BrokenSymlink {
        /// Dangling link.
        path: PathBuf,
    },
    /// Source is neither file, directory nor (copied) symlink.
    #[error("Unsupported source type: {}", path.display())]
    UnsupportedSourceType {
        /// Offending path.
        path: PathBuf,
    },
    /// Directory paste into its own subtree.
    #[error(
        "Destination lies inside source directory: {} <- {}",
        path_destination.display(),
        path_source.display()
    )]
    DestinationInsideSource {
        /// Normalized source directory.
        path_source: PathBuf,
        /// Normalized destination path.
        path_destination: PathBuf,
    },
    /// Rename target is already occupied.
    #[error("Destination exists: {}", path.display())]
    DestinationExists {
        /// Occupied path.
        path: PathBuf,
    },
    /// Rename target is not a single path segment.
    #[error("Invalid entry name: `{name}`")]
    InvalidName {
        /// Name as given.
        name: String,
    },
    /// Underlying IO failure.
    #[error("Failed to {operation} {}: {source}", path.display())]
    Io {
        /// Step that failed.
        operation: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl TransferError {
    /// Closure for `map_err` that wraps an [`io::Error`] with context.
    pub(crate) fn io(operation: &'static str, path: &Path) -> impl FnOnce(io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| Self::Io {
            operation,
            path,
            source,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
