//! Repair actions and the backends that carry them out.
//!
//! The planner produces the same `RepairAction` values whatever the mode; the
//! backend decides whether they touch the filesystem. Every action is
//! idempotent: once its target state is reached, executing it again is a
//! no-op.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::RepairError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RepairAction {
    /// Move the contents of `nested` up into `disc` and drop `nested`.
    FlattenNested { disc: PathBuf, nested: PathBuf },
    /// Rename a disc folder to its canonical `Disk<N>` name.
    RenameDisc { from: PathBuf, to: PathBuf },
    RemoveSymlink { path: PathBuf },
    CopyCover { from: PathBuf, to: PathBuf },
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl RepairAction {
    pub fn kind(&self) -> &'static str {
        match self {
            RepairAction::FlattenNested { .. } => "flatten_nested",
            RepairAction::RenameDisc { .. } => "rename_disc",
            RepairAction::RemoveSymlink { .. } => "remove_symlink",
            RepairAction::CopyCover { .. } => "copy_cover",
        }
    }

    /// One-line human description, e.g. `Flatten: Carmen/ -> Disk1/`.
    pub fn describe(&self) -> String {
        match self {
            RepairAction::FlattenNested { disc, nested } => {
                format!("Flatten: {}/ -> {}/", file_name(nested), file_name(disc))
            }
            RepairAction::RenameDisc { from, to } => {
                format!("Rename: {} -> {}", file_name(from), file_name(to))
            }
            RepairAction::RemoveSymlink { path } => {
                let target = fs::read_link(path)
                    .map(|t| t.display().to_string())
                    .unwrap_or_else(|_| "unknown".to_string());
                format!("Remove symlink: {} -> {}", file_name(path), target)
            }
            RepairAction::CopyCover { from, to } => {
                format!("Copy cover: {} -> {}", file_name(from), file_name(to))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

pub trait RepairBackend {
    fn execute(&mut self, action: &RepairAction) -> Result<(), RepairError>;

    fn is_dry_run(&self) -> bool;
}

/// Dry-run backend: reports what would happen and touches nothing.
#[derive(Debug, Default)]
pub struct Simulate;

impl RepairBackend for Simulate {
    fn execute(&mut self, action: &RepairAction) -> Result<(), RepairError> {
        tracing::debug!("[DRY-RUN] {}", action.describe());
        Ok(())
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}

/// Backend that performs the filesystem changes.
#[derive(Debug, Default)]
pub struct Apply;

impl RepairBackend for Apply {
    fn execute(&mut self, action: &RepairAction) -> Result<(), RepairError> {
        match action {
            RepairAction::FlattenNested { disc, nested } => flatten_nested(disc, nested),
            RepairAction::RenameDisc { from, to } => rename_disc(from, to),
            RepairAction::RemoveSymlink { path } => remove_symlink(path),
            RepairAction::CopyCover { from, to } => copy_cover(from, to),
        }
    }

    fn is_dry_run(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Filesystem operations
// ---------------------------------------------------------------------------

/// Exists without following a final symlink.
fn entry_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

fn is_real_dir(path: &Path) -> bool {
    fs::symlink_metadata(path).map_or(false, |m| m.is_dir())
}

fn flatten_nested(disc: &Path, nested: &Path) -> Result<(), RepairError> {
    if !is_real_dir(nested) {
        tracing::debug!("Already flattened: {}", nested.display());
        return Ok(());
    }

    let entries = fs::read_dir(nested).map_err(|e| RepairError::io(nested, e))?;
    let mut skipped = 0usize;
    for entry in entries {
        let entry = entry.map_err(|e| RepairError::io(nested, e))?;
        let dest = disc.join(entry.file_name());
        if entry_exists(&dest) {
            tracing::warn!("Destination exists, skipping: {}", dest.display());
            skipped += 1;
            continue;
        }
        fs::rename(entry.path(), &dest).map_err(|e| RepairError::io(entry.path(), e))?;
    }

    if skipped > 0 {
        return Err(RepairError::FlattenIncomplete {
            path: nested.to_path_buf(),
            skipped,
        });
    }
    fs::remove_dir(nested).map_err(|e| RepairError::io(nested, e))
}

/// Same directory entry under two spellings, as on case-insensitive volumes.
fn same_entry(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn rename_disc(from: &Path, to: &Path) -> Result<(), RepairError> {
    if !entry_exists(from) {
        if entry_exists(to) {
            tracing::debug!("Already renamed: {}", to.display());
            return Ok(());
        }
        return Err(RepairError::io(
            from,
            std::io::Error::new(std::io::ErrorKind::NotFound, "disc folder vanished"),
        ));
    }

    if entry_exists(to) {
        if !same_entry(from, to) {
            return Err(RepairError::DestinationExists(to.to_path_buf()));
        }
        // Case-only rename: go through an intermediate name.
        let staging = to.with_file_name(format!(".{}.renaming", file_name(to)));
        fs::rename(from, &staging).map_err(|e| RepairError::io(from, e))?;
        return fs::rename(&staging, to).map_err(|e| RepairError::io(&staging, e));
    }

    fs::rename(from, to).map_err(|e| RepairError::io(from, e))
}

fn remove_symlink(path: &Path) -> Result<(), RepairError> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            fs::remove_file(path).map_err(|e| RepairError::io(path, e))
        }
        _ => {
            tracing::debug!("Symlink already gone: {}", path.display());
            Ok(())
        }
    }
}

/// Copies the bytes and permissions, then carries the modification time over.
fn copy_cover(from: &Path, to: &Path) -> Result<(), RepairError> {
    if entry_exists(to) {
        tracing::debug!("Cover already present: {}", to.display());
        return Ok(());
    }
    fs::copy(from, to).map_err(|e| RepairError::io(from, e))?;

    let modified = fs::metadata(from)
        .and_then(|m| m.modified())
        .map_err(|e| RepairError::io(from, e))?;
    fs::File::options()
        .write(true)
        .open(to)
        .and_then(|f| f.set_modified(modified))
        .map_err(|e| RepairError::io(to, e))
}
