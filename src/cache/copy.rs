//! Directory tree copying
//!
//! The store only needs "make `dst` a copy of `src`". `NativeCopier` does it
//! in-process; `RsyncCopier` mirrors with `rsync` and is wrapped in a
//! `FallbackCopier` so a missing binary degrades to the native copy.

use crate::config::CopierKind;
use crate::error::{HoardError, HoardResult};
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Copies a directory tree
pub trait TreeCopier: Send + Sync {
    /// Copy `src` into `dst`, creating `dst` and its parents
    fn copy_tree(&self, src: &Path, dst: &Path) -> HoardResult<()>;

    /// Human-readable copier name for logs
    fn name(&self) -> &'static str;
}

/// Build the copier selected in configuration
pub fn copier_for(kind: CopierKind) -> Box<dyn TreeCopier> {
    match kind {
        CopierKind::Native => Box::new(NativeCopier),
        CopierKind::Rsync => Box::new(FallbackCopier::new(RsyncCopier, NativeCopier)),
    }
}

/// Recursive copy using `walkdir`; symlinks are recreated, not followed
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCopier;

impl TreeCopier for NativeCopier {
    fn copy_tree(&self, src: &Path, dst: &Path) -> HoardResult<()> {
        for entry in WalkDir::new(src).follow_links(false) {
            let entry = entry.map_err(|e| HoardError::Walk {
                path: src.to_path_buf(),
                source: e,
            })?;
            let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
            let target = dst.join(relative);
            let file_type = entry.file_type();

            if file_type.is_dir() {
                fs::create_dir_all(&target).map_err(|e| {
                    HoardError::io(format!("creating directory {}", target.display()), e)
                })?;
            } else if file_type.is_symlink() {
                copy_symlink(entry.path(), &target)?;
            } else {
                fs::copy(entry.path(), &target).map_err(|e| {
                    HoardError::io(
                        format!("copying {} to {}", entry.path().display(), target.display()),
                        e,
                    )
                })?;
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "native"
    }
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> HoardResult<()> {
    let link = fs::read_link(src)
        .map_err(|e| HoardError::io(format!("reading symlink {}", src.display()), e))?;
    std::os::unix::fs::symlink(&link, dst)
        .map_err(|e| HoardError::io(format!("creating symlink {}", dst.display()), e))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> HoardResult<()> {
    // Copy what the link points at; dangling links are dropped.
    if src.is_dir() {
        NativeCopier.copy_tree(&fs::canonicalize(src).map_err(|e| {
            HoardError::io(format!("resolving symlink {}", src.display()), e)
        })?, dst)
    } else if src.exists() {
        fs::copy(src, dst)
            .map(|_| ())
            .map_err(|e| HoardError::io(format!("copying {}", src.display()), e))
    } else {
        debug!("Skipping dangling symlink {}", src.display());
        Ok(())
    }
}

/// Mirror copy via `rsync -a --delete`
#[derive(Debug, Clone, Copy, Default)]
pub struct RsyncCopier;

impl TreeCopier for RsyncCopier {
    fn copy_tree(&self, src: &Path, dst: &Path) -> HoardResult<()> {
        fs::create_dir_all(dst)
            .map_err(|e| HoardError::io(format!("creating directory {}", dst.display()), e))?;

        // Trailing slash on the source copies its contents, not the directory.
        let src_arg = format!("{}/", src.display());
        let dst_arg = format!("{}/", dst.display());
        debug!("Executing: rsync -a --delete {} {}", src_arg, dst_arg);

        let output = Command::new("rsync")
            .args(["-a", "--delete", &src_arg, &dst_arg])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| HoardError::command_failed("rsync", e))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(HoardError::command_exec(
                format!("rsync -a --delete {} {}", src_arg, dst_arg),
                String::from_utf8_lossy(&output.stderr).trim(),
            ))
        }
    }

    fn name(&self) -> &'static str {
        "rsync"
    }
}

/// Try `primary`; on failure clear `dst` and retry with `fallback`
pub struct FallbackCopier<P, F> {
    primary: P,
    fallback: F,
}

impl<P: TreeCopier, F: TreeCopier> FallbackCopier<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P: TreeCopier, F: TreeCopier> TreeCopier for FallbackCopier<P, F> {
    fn copy_tree(&self, src: &Path, dst: &Path) -> HoardResult<()> {
        match self.primary.copy_tree(src, dst) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(
                    "{} copy failed ({}), falling back to {} copy",
                    self.primary.name(),
                    e,
                    self.fallback.name()
                );
                if dst.exists() {
                    fs::remove_dir_all(dst).map_err(|e| {
                        HoardError::io(format!("clearing {}", dst.display()), e)
                    })?;
                }
                self.fallback.copy_tree(src, dst)
            }
        }
    }

    fn name(&self) -> &'static str {
        self.primary.name()
    }
}

/// Total size in bytes of regular files under `path`
pub fn tree_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}

/// Whether `path` is a directory with at least one entry
pub fn is_non_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}
