//! Applies mount operations against an app root.

use std::fs::{self, DirBuilder, Metadata, OpenOptions};
use std::io::ErrorKind;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::Path;

use fly_common::{FlyError, FlyResult};

use super::Mounter;
use crate::plan::MountOperation;

/// Mode of directories and files created as mount targets.
const TARGET_MODE: u32 = 0o700;

/// Runs [`MountOperation`]s in order through a [`Mounter`].
#[derive(Debug)]
pub struct MountExecutor<'m, M: Mounter> {
    mounter: &'m M,
}

impl<'m, M: Mounter> MountExecutor<'m, M> {
    /// Create an executor that mounts through `mounter`.
    pub const fn new(mounter: &'m M) -> Self {
        Self { mounter }
    }

    /// Apply `operations` in list order.
    ///
    /// Stops at the first failure. Mounts made before it stay in place.
    ///
    /// # Errors
    ///
    /// Returns the first target preparation or mount failure.
    pub fn apply(&self, operations: &[MountOperation]) -> FlyResult<()> {
        for (idx, op) in operations.iter().enumerate() {
            self.apply_one(op).inspect_err(|e| {
                tracing::error!(step = idx, error = %e, "Mount setup failed");
            })?;
        }
        tracing::debug!(operations = operations.len(), "Mounts applied");
        Ok(())
    }

    /// Prepare the target of one operation and mount it.
    ///
    /// # Errors
    ///
    /// Returns an error if the host path cannot be inspected, the target
    /// cannot be created, the two disagree on being a directory, or the
    /// mount itself fails.
    pub fn apply_one(&self, op: &MountOperation) -> FlyResult<()> {
        let host = op
            .inspectable_host_path()
            .map(|path| {
                fs::metadata(path).map_err(|e| FlyError::syscall("inspecting host path", path, e))
            })
            .transpose()?;

        let target = op.target();
        if target != Path::new("/") {
            prepare_target(host.as_ref(), op, &target)?;
        }

        self.mounter.mount(op.kind, &op.host_path, &target)
    }
}

fn prepare_target(host: Option<&Metadata>, op: &MountOperation, target: &Path) -> FlyResult<()> {
    let existing = match fs::metadata(target) {
        Ok(meta) => Some(meta),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => return Err(FlyError::syscall("inspecting target", target, e)),
    };

    match (existing, host) {
        (None, host) => create_target(target, host.is_none_or(Metadata::is_dir)),
        (Some(target_meta), Some(host_meta)) if host_meta.is_dir() != target_meta.is_dir() => {
            Err(FlyError::TypeMismatch {
                host: op.host_path.clone(),
                target: target.to_path_buf(),
                host_kind: kind_name(host_meta),
                target_kind: kind_name(&target_meta),
            })
        }
        (Some(_), _) => Ok(()),
    }
}

fn create_target(target: &Path, as_dir: bool) -> FlyResult<()> {
    if let Some(parent) = target.parent() {
        DirBuilder::new()
            .recursive(true)
            .mode(TARGET_MODE)
            .create(parent)
            .map_err(|e| FlyError::syscall("creating directory", parent, e))?;
    }

    if as_dir {
        tracing::debug!(target = %target.display(), "Creating target directory");
        DirBuilder::new()
            .mode(TARGET_MODE)
            .create(target)
            .map_err(|e| FlyError::syscall("creating directory", target, e))?;
    } else {
        tracing::debug!(target = %target.display(), "Creating target file");
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .mode(TARGET_MODE)
            .open(target)
            .map_err(|e| FlyError::syscall("creating file", target, e))?;
    }
    Ok(())
}

fn kind_name(meta: &Metadata) -> &'static str {
    if meta.is_dir() {
        "a directory"
    } else {
        "not a directory"
    }
}
