//! Single-entry paste: one file, one symlink or one whole directory tree.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::warn;

use crate::report::{ReportPaste, ReportPasteBuilder};
use crate::spec::{EnumTransferSymlinkStrategy, SpecTransferOptions, TransferError, TransferResult};
use crate::util::{
    apply_metadata, calculate_worker_limit, copy_file_with_metadata, create_symbolic_link,
    derive_unique_path, is_destination_inside_source, is_occupied,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumEntryKind {
    Dir,
    File,
    Symlink,
    Special,
}

#[derive(Debug, Clone)]
struct SpecCopyTaskFile {
    path_file_src: PathBuf,
    path_file_dst: PathBuf,
}

#[cfg(unix)]
type DirIdentity = (u64, u64);
#[cfg(not(unix))]
type DirIdentity = PathBuf;

#[derive(Debug)]
struct SpecPasteContext<'a> {
    spec_tf_options: &'a SpecTransferOptions,
    n_workers_max: usize,
    builder_paste_report: ReportPasteBuilder,
    l_dirs_ancestor: Vec<DirIdentity>,
    l_tasks_file_copy: Vec<SpecCopyTaskFile>,
    l_dirs_metadata: Vec<(PathBuf, PathBuf)>,
}

/// Copy `path_source` to `path_destination`, renaming the destination first
/// when it is already occupied.
///
/// - Regular file: bytes plus metadata per [`SpecTransferOptions`].
/// - Directory: recursive copy into a freshly created directory; never merges.
/// - Symlink: dereferenced, or recreated under
///   [`EnumTransferSymlinkStrategy::CopySymlinks`].
///
/// Stops at the first failure and leaves whatever was already written on
/// disk. The report carries the resolved destination.
pub fn paste_entry<P, Q>(
    path_source: P,
    path_destination: Q,
    spec_tf_options: &SpecTransferOptions,
) -> TransferResult<ReportPaste>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_src = path_source.as_ref();
    let path_dst_requested = path_destination.as_ref();
    let enum_source_kind = classify_source(path_src, spec_tf_options.rule_symlink)?;

    let if_renamed = is_occupied(path_dst_requested);
    let path_dst = if if_renamed {
        derive_unique_path(path_dst_requested)
    } else {
        path_dst_requested.to_path_buf()
    };

    let builder_paste_report = match enum_source_kind {
        EnumEntryKind::File => {
            let n_bytes = copy_file_with_metadata(path_src, &path_dst, spec_tf_options)
                .map_err(TransferError::io("copy file", &path_dst))?;
            let mut builder_paste_report = ReportPasteBuilder::default();
            builder_paste_report.add_file(n_bytes);
            builder_paste_report
        }
        EnumEntryKind::Symlink => {
            create_symbolic_link(path_src, &path_dst)
                .map_err(TransferError::io("create symlink", &path_dst))?;
            let mut builder_paste_report = ReportPasteBuilder::default();
            builder_paste_report.add_symlink();
            builder_paste_report
        }
        EnumEntryKind::Dir => {
            if is_destination_inside_source(path_src, &path_dst) {
                return Err(TransferError::DestinationInsideSource {
                    path_source: path_src.to_path_buf(),
                    path_destination: path_dst,
                });
            }
            copy_tree_fresh(path_src, &path_dst, spec_tf_options)?
        }
        EnumEntryKind::Special => {
            return Err(TransferError::UnsupportedSourceType {
                path: path_src.to_path_buf(),
            });
        }
    };

    Ok(builder_paste_report.build(path_dst, if_renamed))
}

fn classify_source(
    path_src: &Path,
    rule_symlink: EnumTransferSymlinkStrategy,
) -> TransferResult<EnumEntryKind> {
    let meta_src = fs::symlink_metadata(path_src).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            TransferError::SourceNotFound {
                path: path_src.to_path_buf(),
            }
        } else {
            TransferError::io("inspect source", path_src)(e)
        }
    })?;
    let cfg_file_type = meta_src.file_type();
    if !cfg_file_type.is_symlink() {
        return Ok(kind_of(&meta_src));
    }
    if rule_symlink == EnumTransferSymlinkStrategy::CopySymlinks {
        return Ok(EnumEntryKind::Symlink);
    }
    resolve_symlink_target(path_src)
}

fn kind_of(meta: &fs::Metadata) -> EnumEntryKind {
    if meta.is_dir() {
        EnumEntryKind::Dir
    } else if meta.is_file() {
        EnumEntryKind::File
    } else {
        EnumEntryKind::Special
    }
}

fn resolve_symlink_target(path_link: &Path) -> TransferResult<EnumEntryKind> {
    match fs::metadata(path_link) {
        Ok(meta_target) => Ok(kind_of(&meta_target)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(TransferError::BrokenSymlink {
            path: path_link.to_path_buf(),
        }),
        Err(e) => Err(TransferError::io("inspect symlink target", path_link)(e)),
    }
}

fn copy_tree_fresh(
    path_dir_src: &Path,
    path_dir_dst: &Path,
    spec_tf_options: &SpecTransferOptions,
) -> TransferResult<ReportPasteBuilder> {
    let mut spec_paste_ctx = SpecPasteContext {
        spec_tf_options,
        n_workers_max: calculate_worker_limit(spec_tf_options.num_workers_max),
        builder_paste_report: ReportPasteBuilder::default(),
        l_dirs_ancestor: Vec::new(),
        l_tasks_file_copy: Vec::new(),
        l_dirs_metadata: Vec::new(),
    };

    walk_directory(path_dir_src, path_dir_dst, &mut spec_paste_ctx)?;
    flush_file_copy_tasks(&mut spec_paste_ctx)?;
    apply_directory_metadata(&spec_paste_ctx)?;
    Ok(spec_paste_ctx.builder_paste_report)
}

#[cfg(unix)]
fn identify_directory(path_dir: &Path) -> TransferResult<DirIdentity> {
    use std::os::unix::fs::MetadataExt;

    let stat_dir =
        fs::metadata(path_dir).map_err(TransferError::io("inspect directory", path_dir))?;
    Ok((stat_dir.dev(), stat_dir.ino()))
}

#[cfg(not(unix))]
fn identify_directory(path_dir: &Path) -> TransferResult<DirIdentity> {
    fs::canonicalize(path_dir).map_err(TransferError::io("inspect directory", path_dir))
}

/// Copies one directory level. Under `Dereference` a directory that is
/// already on the current descent chain is a loop and gets skipped; the same
/// directory reached again through a sibling link is copied again.
fn walk_directory(
    path_dir_src: &Path,
    path_dir_dst: &Path,
    spec_paste_ctx: &mut SpecPasteContext<'_>,
) -> TransferResult<()> {
    if spec_paste_ctx.spec_tf_options.rule_symlink != EnumTransferSymlinkStrategy::Dereference {
        return walk_directory_entries(path_dir_src, path_dir_dst, spec_paste_ctx);
    }

    let dir_identity = identify_directory(path_dir_src)?;
    if spec_paste_ctx.l_dirs_ancestor.contains(&dir_identity) {
        warn!(path = %path_dir_src.display(), "symlink loop skipped");
        spec_paste_ctx
            .builder_paste_report
            .add_warning(format!("Symlink loop skipped: {}", path_dir_src.display()));
        return Ok(());
    }

    spec_paste_ctx.l_dirs_ancestor.push(dir_identity);
    let result = walk_directory_entries(path_dir_src, path_dir_dst, spec_paste_ctx);
    spec_paste_ctx.l_dirs_ancestor.pop();
    result
}

fn walk_directory_entries(
    path_dir_src: &Path,
    path_dir_dst: &Path,
    spec_paste_ctx: &mut SpecPasteContext<'_>,
) -> TransferResult<()> {
    let enum_rule_symlink = spec_paste_ctx.spec_tf_options.rule_symlink;

    // Listing is taken before the destination exists so a paste next to the
    // source never sees its own output.
    let mut l_entries = fs::read_dir(path_dir_src)
        .map_err(TransferError::io("read directory", path_dir_src))?
        .collect::<Result<Vec<_>, io::Error>>()
        .map_err(TransferError::io("read directory entry", path_dir_src))?;
    l_entries.sort_by_key(|entry| entry.file_name());

    fs::create_dir(path_dir_dst).map_err(TransferError::io("create directory", path_dir_dst))?;
    spec_paste_ctx.builder_paste_report.add_dir();
    if spec_paste_ctx.spec_tf_options.if_preserve_metadata {
        spec_paste_ctx
            .l_dirs_metadata
            .push((path_dir_src.to_path_buf(), path_dir_dst.to_path_buf()));
    }

    for entry in l_entries {
        let path_entry_src = entry.path();
        let path_entry_dst = path_dir_dst.join(entry.file_name());
        let cfg_file_type = entry
            .file_type()
            .map_err(TransferError::io("inspect entry", &path_entry_src))?;

        let enum_entry_kind = if cfg_file_type.is_symlink() {
            match enum_rule_symlink {
                EnumTransferSymlinkStrategy::CopySymlinks => EnumEntryKind::Symlink,
                EnumTransferSymlinkStrategy::Dereference => {
                    resolve_symlink_target(&path_entry_src)?
                }
            }
        } else if cfg_file_type.is_dir() {
            EnumEntryKind::Dir
        } else if cfg_file_type.is_file() {
            EnumEntryKind::File
        } else {
            EnumEntryKind::Special
        };

        match enum_entry_kind {
            EnumEntryKind::Dir => walk_directory(&path_entry_src, &path_entry_dst, spec_paste_ctx)?,
            EnumEntryKind::File => {
                note_hard_link(&path_entry_src, cfg_file_type.is_symlink(), spec_paste_ctx);
                spec_paste_ctx.l_tasks_file_copy.push(SpecCopyTaskFile {
                    path_file_src: path_entry_src,
                    path_file_dst: path_entry_dst,
                });
            }
            EnumEntryKind::Symlink => {
                create_symbolic_link(&path_entry_src, &path_entry_dst)
                    .map_err(TransferError::io("create symlink", &path_entry_dst))?;
                spec_paste_ctx.builder_paste_report.add_symlink();
            }
            EnumEntryKind::Special => {
                warn!(path = %path_entry_src.display(), "special file skipped");
                spec_paste_ctx
                    .builder_paste_report
                    .add_warning(format!("Special file skipped: {}", path_entry_src.display()));
            }
        }
    }

    Ok(())
}

#[cfg(target_os = "linux")]
fn note_hard_link(
    path_file_src: &Path,
    if_is_symlink: bool,
    spec_paste_ctx: &mut SpecPasteContext<'_>,
) {
    use std::os::unix::fs::MetadataExt;

    if !if_is_symlink
        && let Ok(stat_src) = fs::metadata(path_file_src)
        && stat_src.nlink() > 1
    {
        spec_paste_ctx.builder_paste_report.add_warning(format!(
            "Hard link copied as independent file: {}",
            path_file_src.display()
        ));
    }
}

#[cfg(not(target_os = "linux"))]
fn note_hard_link(_: &Path, _: bool, _: &mut SpecPasteContext<'_>) {}

fn copy_task_file(
    spec_task: &SpecCopyTaskFile,
    spec_tf_options: &SpecTransferOptions,
) -> TransferResult<u64> {
    copy_file_with_metadata(
        &spec_task.path_file_src,
        &spec_task.path_file_dst,
        spec_tf_options,
    )
    .map_err(TransferError::io("copy file", &spec_task.path_file_dst))
}

fn copy_tasks_serial(
    l_tasks_file_copy: &[SpecCopyTaskFile],
    spec_tf_options: &SpecTransferOptions,
) -> TransferResult<u64> {
    let mut n_bytes = 0;
    for spec_task in l_tasks_file_copy {
        n_bytes += copy_task_file(spec_task, spec_tf_options)?;
    }
    Ok(n_bytes)
}

fn flush_file_copy_tasks(spec_paste_ctx: &mut SpecPasteContext<'_>) -> TransferResult<()> {
    let l_tasks_file_copy = std::mem::take(&mut spec_paste_ctx.l_tasks_file_copy);
    if l_tasks_file_copy.is_empty() {
        return Ok(());
    }
    let n_files = l_tasks_file_copy.len() as u64;
    let spec_tf_options = spec_paste_ctx.spec_tf_options;

    if spec_paste_ctx.n_workers_max <= 1 || l_tasks_file_copy.len() == 1 {
        let n_bytes = copy_tasks_serial(&l_tasks_file_copy, spec_tf_options)?;
        spec_paste_ctx.builder_paste_report.add_files(n_files, n_bytes);
        return Ok(());
    }

    let thread_pool = ThreadPoolBuilder::new()
        .num_threads(spec_paste_ctx.n_workers_max)
        .build();
    let n_bytes = match thread_pool {
        Ok(thread_pool) => thread_pool.install(|| {
            l_tasks_file_copy
                .par_iter()
                .map(|spec_task| copy_task_file(spec_task, spec_tf_options))
                .try_reduce(|| 0, |n_left, n_right| Ok(n_left + n_right))
        })?,
        Err(e) => {
            spec_paste_ctx.builder_paste_report.add_warning(format!(
                "Failed to initialize thread pool (workers={}, {e}); fallback to serial copy.",
                spec_paste_ctx.n_workers_max
            ));
            copy_tasks_serial(&l_tasks_file_copy, spec_tf_options)?
        }
    };
    spec_paste_ctx.builder_paste_report.add_files(n_files, n_bytes);
    Ok(())
}

/// Deepest directories first, after all children were written.
fn apply_directory_metadata(spec_paste_ctx: &SpecPasteContext<'_>) -> TransferResult<()> {
    for (path_dir_src, path_dir_dst) in spec_paste_ctx.l_dirs_metadata.iter().rev() {
        apply_metadata(path_dir_src, path_dir_dst)
            .map_err(TransferError::io("apply directory metadata", path_dir_dst))?;
    }
    Ok(())
}
