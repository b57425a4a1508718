use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use filetime::{FileTime, set_file_times};
use tracing::debug;

use crate::spec::SpecTransferOptions;

////////////////////////////////////////////////////////////////////////////////
// #region UniqueNames

/// `true` when anything (including a dangling symlink) sits at `path`.
pub(crate) fn is_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Return the first free sibling `stem_N.ext` of `path`, probing `N = 1, 2, ...`.
///
/// The extension is the text after the last `.` of the final segment; a
/// hidden file's leading dot does not start one (`.bashrc` -> `.bashrc_1`).
/// The probe is unbounded and costs one `lstat` per taken candidate.
///
/// # Examples
/// ```ignore
/// // with /tmp/dst/file.txt and /tmp/dst/file_1.txt present
/// let path_free = derive_unique_path(Path::new("/tmp/dst/file.txt"));
/// assert_eq!(path_free, Path::new("/tmp/dst/file_2.txt"));
/// ```
pub fn derive_unique_path<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    let mut n_index: u64 = 1;
    loop {
        let path_candidate = derive_numbered_path(path, n_index);
        if !is_occupied(&path_candidate) {
            debug!(
                requested = %path.display(),
                resolved = %path_candidate.display(),
                probes = n_index,
                "resolved unique destination"
            );
            return path_candidate;
        }
        n_index += 1;
    }
}

fn derive_numbered_path(path: &Path, n_index: u64) -> PathBuf {
    let Some(name) = path.file_name() else {
        let mut raw_path = path.as_os_str().to_os_string();
        raw_path.push(format!("_{n_index}"));
        return PathBuf::from(raw_path);
    };

    let path_name = Path::new(name);
    let mut name_new: OsString = path_name.file_stem().unwrap_or(name).to_os_string();
    name_new.push(format!("_{n_index}"));
    if let Some(ext) = path_name.extension() {
        name_new.push(".");
        name_new.push(ext);
    }
    path.with_file_name(name_new)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

fn _absolutize_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

fn _normalize_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    // Destination usually does not exist yet; resolve through its parent.
    if let (Some(parent), Some(name)) = (path.parent(), path.file_name())
        && let Ok(parent_resolved) = fs::canonicalize(parent)
    {
        return parent_resolved.join(name);
    }
    _absolutize_path(path)
}

/// `true` when `path_dst` equals `path_src` or lies below it.
pub(crate) fn is_destination_inside_source(path_src: &Path, path_dst: &Path) -> bool {
    _normalize_path(path_dst).starts_with(_normalize_path(path_src))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CopyPrimitives

pub(crate) fn create_symbolic_link(path_src: &Path, path_dst: &Path) -> Result<(), io::Error> {
    let target = fs::read_link(path_src)?;

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(&target, path_dst)
    }
    #[cfg(windows)]
    {
        use std::os::windows::fs::{symlink_dir, symlink_file};
        if path_src.is_dir() {
            symlink_dir(&target, path_dst)
        } else {
            symlink_file(&target, path_dst)
        }
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = (target, path_dst);
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "Symbolic links are unsupported on this platform",
        ))
    }
}

/// Copy one regular file (following symlinks) and return the byte count.
pub(crate) fn copy_file_with_metadata(
    path_file_src: &Path,
    path_file_dst: &Path,
    spec_tf_options: &SpecTransferOptions,
) -> Result<u64, io::Error> {
    let n_bytes = fs::copy(path_file_src, path_file_dst)?;
    #[cfg(target_os = "linux")]
    {
        if spec_tf_options.if_copy_xattrs {
            copy_xattrs_linux(path_file_src, path_file_dst);
        }
    }
    if spec_tf_options.if_preserve_metadata {
        apply_metadata(path_file_src, path_file_dst)?;
    }
    Ok(n_bytes)
}

/// Copy access/modification times and permission bits from `path_src`.
///
/// Times go first: a read-only destination may refuse them afterwards.
pub(crate) fn apply_metadata(path_src: &Path, path_dst: &Path) -> Result<(), io::Error> {
    let stat_src = fs::metadata(path_src)?;
    let file_time_access = FileTime::from_last_access_time(&stat_src);
    let file_time_modify = FileTime::from_last_modification_time(&stat_src);
    set_file_times(path_dst, file_time_access, file_time_modify)?;
    fs::set_permissions(path_dst, stat_src.permissions())?;
    Ok(())
}

#[cfg(target_os = "linux")]
pub(crate) fn copy_xattrs_linux(path_src: &Path, path_dst: &Path) {
    let iter_xattr_names = match xattr::list(path_src) {
        Ok(v) => v,
        Err(e) => {
            debug!(path = %path_src.display(), error = %e, "xattrs unavailable");
            return;
        }
    };

    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_src, &name).ok().flatten() else {
            continue;
        };
        if let Err(e) = xattr::set(path_dst, &name, &raw_value) {
            debug!(
                path = %path_dst.display(),
                name = %name.to_string_lossy(),
                error = %e,
                "xattr not copied"
            );
        }
    }
}

pub(crate) fn calculate_worker_limit(num_workers_max: Option<usize>) -> usize {
    let n_cpu = std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1);

    match num_workers_max {
        Some(n) => n.clamp(1, n_cpu),
        None => n_cpu.clamp(1, 8),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
