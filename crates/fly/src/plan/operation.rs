//! Concrete mount operations derived from a reconciled plan.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::ReconciledMount;

/// Host directories bound into every app root, in mount order.
pub const SYSTEM_DIRS: [&str; 3] = ["/dev", "/proc", "/sys"];

/// What a [`MountOperation`] does to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MountKind {
    /// Recursively mark the target shared so container-side changes reach
    /// the host.
    MarkShared,
    /// Recursive bind of the host path onto the target.
    BindRecursive,
    /// Remount an existing bind read-only.
    RemountReadOnly,
    /// Fresh tmpfs on the target.
    Tmpfs,
}

impl fmt::Display for MountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MarkShared => write!(f, "making shared (rec)"),
            Self::BindRecursive => write!(f, "bind mounting (rec)"),
            Self::RemountReadOnly => write!(f, "remounting read-only"),
            Self::Tmpfs => write!(f, "mounting tmpfs"),
        }
    }
}

/// One step of mount setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountOperation {
    /// Mount source. Empty when the kind takes none.
    pub host_path: PathBuf,
    /// Root the target is resolved under.
    pub target_root: PathBuf,
    /// Target, relative to `target_root` even when written absolute.
    pub relative_target: PathBuf,
    /// Operation kind.
    pub kind: MountKind,
}

impl MountOperation {
    /// Recursively share `path` in the current namespace.
    #[must_use]
    pub fn mark_shared(path: impl Into<PathBuf>) -> Self {
        Self {
            host_path: PathBuf::new(),
            target_root: PathBuf::from("/"),
            relative_target: path.into(),
            kind: MountKind::MarkShared,
        }
    }

    /// Recursively bind `source` onto `root/target`.
    #[must_use]
    pub fn bind(
        source: impl Into<PathBuf>,
        root: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
    ) -> Self {
        Self {
            host_path: source.into(),
            target_root: root.into(),
            relative_target: target.into(),
            kind: MountKind::BindRecursive,
        }
    }

    /// Remount the bind at `root/target` read-only.
    #[must_use]
    pub fn remount_read_only(root: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            host_path: PathBuf::new(),
            target_root: root.into(),
            relative_target: target.into(),
            kind: MountKind::RemountReadOnly,
        }
    }

    /// Mount a tmpfs at `root/target`.
    #[must_use]
    pub fn tmpfs(root: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            host_path: PathBuf::from("tmpfs"),
            target_root: root.into(),
            relative_target: target.into(),
            kind: MountKind::Tmpfs,
        }
    }

    /// The absolute target: `relative_target` resolved under `target_root`.
    #[must_use]
    pub fn target(&self) -> PathBuf {
        let relative = self
            .relative_target
            .strip_prefix("/")
            .unwrap_or(&self.relative_target);
        if relative.as_os_str().is_empty() {
            self.target_root.clone()
        } else {
            self.target_root.join(relative)
        }
    }

    /// Host path, if the operation has one that can be inspected on the host.
    #[must_use]
    pub fn inspectable_host_path(&self) -> Option<&Path> {
        Some(self.host_path.as_path()).filter(|p| p.is_absolute())
    }
}

/// Operations for one reconciled mount: share the source, bind it, and
/// remount read-only when asked.
#[must_use]
pub fn operations_for(rootfs: &Path, mount: &ReconciledMount) -> Vec<MountOperation> {
    let mut ops = vec![
        MountOperation::mark_shared(&mount.host_source),
        MountOperation::bind(&mount.host_source, rootfs, &mount.container_path),
    ];
    if mount.read_only {
        ops.push(MountOperation::remount_read_only(rootfs, &mount.container_path));
    }
    ops
}

/// `/dev`, `/proc` and `/sys` shared and bound into `rootfs`, then a tmpfs
/// on `/tmp`.
#[must_use]
pub fn system_mounts(rootfs: &Path) -> Vec<MountOperation> {
    let mut ops: Vec<MountOperation> = SYSTEM_DIRS
        .iter()
        .flat_map(|dir| {
            [
                MountOperation::mark_shared(dir),
                MountOperation::bind(dir, rootfs, dir),
            ]
        })
        .collect();
    ops.push(MountOperation::tmpfs(rootfs, "/tmp"));
    ops
}

/// Every operation needed to set up `rootfs`: system mounts first, then the
/// reconciled volumes in plan order.
#[must_use]
pub fn effective_mounts(rootfs: &Path, reconciled: &[ReconciledMount]) -> Vec<MountOperation> {
    let mut ops = system_mounts(rootfs);
    ops.extend(reconciled.iter().flat_map(|m| operations_for(rootfs, m)));
    ops
}
