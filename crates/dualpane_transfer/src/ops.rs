//! Delete and rename primitives used next to the transfer engine.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{info, warn};

use crate::spec::{EnumDeleteOutcome, TransferError, TransferResult};
use crate::util::is_occupied;

/// Directories whose name starts with this marker are never deleted.
const C_PROTECTED_DIR_PREFIX: &str = "$";

/// Remove `path`: directories recursively, anything else as a single entry.
///
/// Symlinks are removed themselves, never their target. Directories named
/// `$...` (recycle bins, system folders) are left in place.
pub fn delete_entry<P: AsRef<Path>>(path: P) -> TransferResult<EnumDeleteOutcome> {
    let path = path.as_ref();
    let meta_entry = match fs::symlink_metadata(path) {
        Ok(v) => v,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "delete skipped; nothing there");
            return Ok(EnumDeleteOutcome::NotFound);
        }
        Err(e) => return Err(TransferError::io("inspect entry", path)(e)),
    };

    if meta_entry.is_dir() {
        let if_protected = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with(C_PROTECTED_DIR_PREFIX));
        if if_protected {
            warn!(path = %path.display(), "delete skipped; protected directory");
            return Ok(EnumDeleteOutcome::SkippedProtected);
        }
        fs::remove_dir_all(path).map_err(TransferError::io("remove directory", path))?;
    } else {
        fs::remove_file(path).map_err(TransferError::io("remove file", path))?;
    }

    info!(path = %path.display(), "deleted");
    Ok(EnumDeleteOutcome::Deleted)
}

/// Rename `path` to `name_new` inside the same parent directory.
///
/// `name_new` must be one plain path segment. An occupied target is refused
/// rather than overwritten.
pub fn rename_entry<P: AsRef<Path>>(path: P, name_new: &str) -> TransferResult<PathBuf> {
    let path = path.as_ref();
    if !is_single_segment(name_new) {
        return Err(TransferError::InvalidName {
            name: name_new.to_string(),
        });
    }
    if !is_occupied(path) {
        return Err(TransferError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }

    let path_new = path.with_file_name(name_new);
    if path_new == path {
        return Ok(path_new);
    }
    if is_occupied(&path_new) {
        return Err(TransferError::DestinationExists { path: path_new });
    }

    fs::rename(path, &path_new).map_err(TransferError::io("rename entry", path))?;
    info!(from = %path.display(), to = %path_new.display(), "renamed");
    Ok(path_new)
}

fn is_single_segment(name: &str) -> bool {
    let mut iter_components = Path::new(name).components();
    matches!(
        (iter_components.next(), iter_components.next()),
        (Some(Component::Normal(part)), None) if part == name
    )
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{delete_entry, is_single_segment, rename_entry};
    use crate::spec::{EnumDeleteOutcome, TransferError};

    #[test]
    fn single_segment_names() {
        assert!(is_single_segment("report.txt"));
        assert!(is_single_segment(".hidden"));
        assert!(!is_single_segment(""));
        assert!(!is_single_segment("."));
        assert!(!is_single_segment(".."));
        assert!(!is_single_segment("a/b"));
        assert!(!is_single_segment("/abs"));
        assert!(!is_single_segment("trailing/"));
    }

    #[test]
    fn delete_file_and_tree() {
        let tmp = TempDir::new().expect("tempdir");
        let path_file = tmp.path().join("a.txt");
        let path_dir = tmp.path().join("tree");
        fs::write(&path_file, "a").expect("write");
        fs::create_dir_all(path_dir.join("x/y")).expect("mkdir");
        fs::write(path_dir.join("x/y/z.txt"), "z").expect("write");

        assert_eq!(
            delete_entry(&path_file).expect("delete file"),
            EnumDeleteOutcome::Deleted
        );
        assert_eq!(
            delete_entry(&path_dir).expect("delete dir"),
            EnumDeleteOutcome::Deleted
        );
        assert!(!path_file.exists());
        assert!(!path_dir.exists());
    }

    #[test]
    fn delete_protected_directory_is_skipped() {
        let tmp = TempDir::new().expect("tempdir");
        let path_dir = tmp.path().join("$Recycle.Bin");
        fs::create_dir_all(&path_dir).expect("mkdir");

        assert_eq!(
            delete_entry(&path_dir).expect("delete"),
            EnumDeleteOutcome::SkippedProtected
        );
        assert!(path_dir.is_dir());
    }

    #[test]
    fn delete_missing_is_reported() {
        let tmp = TempDir::new().expect("tempdir");
        assert_eq!(
            delete_entry(tmp.path().join("ghost")).expect("delete"),
            EnumDeleteOutcome::NotFound
        );
    }

    #[cfg(unix)]
    #[test]
    fn delete_symlink_keeps_target() {
        let tmp = TempDir::new().expect("tempdir");
        let path_target = tmp.path().join("target");
        let path_link = tmp.path().join("link");
        fs::create_dir_all(path_target.join("inner")).expect("mkdir");
        std::os::unix::fs::symlink(&path_target, &path_link).expect("symlink");

        assert_eq!(
            delete_entry(&path_link).expect("delete"),
            EnumDeleteOutcome::Deleted
        );
        assert!(!path_link.is_symlink());
        assert!(path_target.join("inner").is_dir());
    }

    #[test]
    fn rename_within_parent() {
        let tmp = TempDir::new().expect("tempdir");
        let path_old = tmp.path().join("old.txt");
        fs::write(&path_old, "x").expect("write");

        let path_new = rename_entry(&path_old, "new.txt").expect("rename");
        assert_eq!(path_new, tmp.path().join("new.txt"));
        assert!(!path_old.exists());
        assert_eq!(fs::read_to_string(&path_new).expect("read"), "x");
    }

    #[test]
    fn rename_refuses_occupied_target() {
        let tmp = TempDir::new().expect("tempdir");
        let path_old = tmp.path().join("old.txt");
        let path_taken = tmp.path().join("taken.txt");
        fs::write(&path_old, "old").expect("write");
        fs::write(&path_taken, "taken").expect("write");

        let err = rename_entry(&path_old, "taken.txt").expect_err("must fail");
        assert!(matches!(err, TransferError::DestinationExists { .. }));
        assert_eq!(fs::read_to_string(&path_taken).expect("read"), "taken");
    }

    #[test]
    fn rename_rejects_bad_names_and_missing_source() {
        let tmp = TempDir::new().expect("tempdir");
        let path_old = tmp.path().join("old.txt");
        fs::write(&path_old, "old").expect("write");

        let err = rename_entry(&path_old, "../escape.txt").expect_err("must fail");
        assert!(matches!(err, TransferError::InvalidName { .. }));
        let err = rename_entry(tmp.path().join("ghost"), "x").expect_err("must fail");
        assert!(matches!(err, TransferError::SourceNotFound { .. }));
    }
}
