//! Mount primitives.
//!
//! [`Mounter`] is the seam between mount logic and the kernel. The plan and
//! reaper speak in [`MountKind`]s; only [`LinuxMounter`] knows which flags
//! they turn into.

use std::path::Path;

use fly_common::FlyResult;

use crate::plan::MountKind;

/// Performs mount syscalls.
pub trait Mounter {
    /// Apply `kind` to `target`. `source` is ignored by kinds that take none.
    ///
    /// # Errors
    ///
    /// Returns [`fly_common::FlyError::Syscall`] if the kernel refuses.
    fn mount(&self, kind: MountKind, source: &Path, target: &Path) -> FlyResult<()>;

    /// Recursively mark `target` private so unmounting it cannot propagate.
    ///
    /// # Errors
    ///
    /// Returns [`fly_common::FlyError::Syscall`] if the kernel refuses.
    fn make_private(&self, target: &Path) -> FlyResult<()>;

    /// Unmount `target`.
    ///
    /// # Errors
    ///
    /// Returns [`fly_common::FlyError::Syscall`] if the kernel refuses.
    fn unmount(&self, target: &Path) -> FlyResult<()>;
}

/// [`Mounter`] backed by the real mount syscalls.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxMounter;

#[cfg(target_os = "linux")]
impl Mounter for LinuxMounter {
    fn mount(&self, kind: MountKind, source: &Path, target: &Path) -> FlyResult<()> {
        use fly_common::FlyError;
        use rustix::mount::{
            MountFlags, MountPropagationFlags, mount, mount_bind_recursive, mount_change,
            mount_remount,
        };

        tracing::debug!(
            %kind,
            source = %source.display(),
            target = %target.display(),
            "Mounting"
        );

        let result = match kind {
            MountKind::MarkShared => mount_change(
                target,
                MountPropagationFlags::SHARED | MountPropagationFlags::REC,
            ),
            MountKind::BindRecursive => mount_bind_recursive(source, target),
            MountKind::RemountReadOnly => mount_remount(
                target,
                MountFlags::BIND | MountFlags::REC | MountFlags::RDONLY,
                c"",
            ),
            MountKind::Tmpfs => mount(source, target, c"tmpfs", MountFlags::empty(), c""),
        };

        result.map_err(|e| match kind {
            MountKind::BindRecursive => FlyError::syscall(
                format!("{kind} {} onto", source.display()),
                target,
                e,
            ),
            _ => FlyError::syscall(kind.to_string(), target, e),
        })
    }

    fn make_private(&self, target: &Path) -> FlyResult<()> {
        use rustix::mount::{MountPropagationFlags, mount_change};

        tracing::debug!(target = %target.display(), "Making mount private (rec)");

        mount_change(
            target,
            MountPropagationFlags::PRIVATE | MountPropagationFlags::REC,
        )
        .map_err(|e| fly_common::FlyError::syscall("making private (rec)", target, e))
    }

    fn unmount(&self, target: &Path) -> FlyResult<()> {
        use rustix::mount::{UnmountFlags, unmount};

        tracing::debug!(target = %target.display(), "Unmounting");

        unmount(target, UnmountFlags::empty())
            .map_err(|e| fly_common::FlyError::syscall("unmounting", target, e))
    }
}

#[cfg(not(target_os = "linux"))]
impl Mounter for LinuxMounter {
    fn mount(&self, _kind: MountKind, _source: &Path, _target: &Path) -> FlyResult<()> {
        Err(fly_common::FlyError::Unsupported {
            feature: "mounts".to_string(),
        })
    }

    fn make_private(&self, _target: &Path) -> FlyResult<()> {
        Err(fly_common::FlyError::Unsupported {
            feature: "mount propagation".to_string(),
        })
    }

    fn unmount(&self, _target: &Path) -> FlyResult<()> {
        Err(fly_common::FlyError::Unsupported {
            feature: "unmount".to_string(),
        })
    }
}

/// A [`Mounter`] that records calls instead of making them.
#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};

    use fly_common::{FlyError, FlyResult};

    use super::Mounter;
    use crate::plan::MountKind;

    #[derive(Debug, Default)]
    pub(crate) struct RecordingMounter {
        pub(crate) calls: RefCell<Vec<String>>,
        pub(crate) fail_on: Option<PathBuf>,
    }

    impl RecordingMounter {
        pub(crate) fn failing_on(target: impl Into<PathBuf>) -> Self {
            Self {
                calls: RefCell::default(),
                fail_on: Some(target.into()),
            }
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        fn record(&self, call: String, target: &Path) -> FlyResult<()> {
            if self.fail_on.as_deref() == Some(target) {
                return Err(FlyError::syscall(
                    call,
                    target,
                    std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                ));
            }
            self.calls.borrow_mut().push(call);
            Ok(())
        }
    }

    impl Mounter for RecordingMounter {
        fn mount(&self, kind: MountKind, source: &Path, target: &Path) -> FlyResult<()> {
            let call = if source.as_os_str().is_empty() {
                format!("{kind} {}", target.display())
            } else {
                format!("{kind} {} -> {}", source.display(), target.display())
            };
            self.record(call, target)
        }

        fn make_private(&self, target: &Path) -> FlyResult<()> {
            self.record(format!("private {}", target.display()), target)
        }

        fn unmount(&self, target: &Path) -> FlyResult<()> {
            self.record(format!("unmount {}", target.display()), target)
        }
    }
}
