//! The supervisor's pod lock descriptor.
//!
//! The supervisor holds a lock on the pod directory and passes the
//! descriptor down. It must not leak into helpers spawned during setup, but
//! has to survive into the app so the lock lives as long as the pod.

#![allow(unsafe_code)]

use std::os::fd::{BorrowedFd, RawFd};

use fly_common::{FlyError, FlyResult};
use rustix::io::{FdFlags, fcntl_getfd, fcntl_setfd};

/// A lock descriptor inherited from the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockFd(RawFd);

impl LockFd {
    /// Read the descriptor number from the environment variable `var`.
    ///
    /// # Errors
    ///
    /// Returns [`FlyError::Config`] if the variable is unset or not a
    /// descriptor number.
    pub fn from_env(var: &str) -> FlyResult<Self> {
        let value = std::env::var(var).map_err(|_| FlyError::Config {
            message: format!("{var} is not set"),
        })?;
        Self::parse(&value).map_err(|e| match e {
            FlyError::Config { message } => FlyError::Config {
                message: format!("{var}: {message}"),
            },
            other => other,
        })
    }

    /// Parse a descriptor number.
    ///
    /// # Errors
    ///
    /// Returns [`FlyError::Config`] if `value` is not a non-negative integer.
    pub fn parse(value: &str) -> FlyResult<Self> {
        value
            .trim()
            .parse::<RawFd>()
            .ok()
            .filter(|fd| *fd >= 0)
            .map(Self)
            .ok_or_else(|| FlyError::Config {
                message: format!("invalid lock fd {value:?}"),
            })
    }

    /// Wrap a raw descriptor.
    #[must_use]
    pub const fn from_raw(fd: RawFd) -> Self {
        Self(fd)
    }

    /// The raw descriptor number.
    #[must_use]
    pub const fn as_raw(self) -> RawFd {
        self.0
    }

    fn borrow(&self) -> BorrowedFd<'_> {
        // SAFETY: the supervisor keeps the descriptor open for the lifetime
        // of this process and nothing here closes it.
        unsafe { BorrowedFd::borrow_raw(self.0) }
    }

    /// Whether the descriptor is closed on exec.
    ///
    /// # Errors
    ///
    /// Returns [`FlyError::Syscall`] if the descriptor is not open.
    pub fn is_cloexec(&self) -> FlyResult<bool> {
        fcntl_getfd(self.borrow())
            .map(|flags| flags.contains(FdFlags::CLOEXEC))
            .map_err(|e| FlyError::syscall("reading flags of lock fd", self.path(), e))
    }

    /// Set or clear close-on-exec.
    ///
    /// # Errors
    ///
    /// Returns [`FlyError::Syscall`] if the descriptor is not open.
    pub fn set_cloexec(&self, on: bool) -> FlyResult<()> {
        let fd = self.borrow();
        let mut flags = fcntl_getfd(fd)
            .map_err(|e| FlyError::syscall("reading flags of lock fd", self.path(), e))?;
        flags.set(FdFlags::CLOEXEC, on);
        fcntl_setfd(fd, flags)
            .map_err(|e| FlyError::syscall("setting FD_CLOEXEC on lock fd", self.path(), e))?;

        tracing::debug!(fd = self.0, cloexec = on, "Updated lock fd flags");
        Ok(())
    }

    /// Run `f` with close-on-exec cleared, restoring it afterwards.
    ///
    /// A successful exec never returns, so the descriptor stays open in the
    /// new image only.
    ///
    /// # Errors
    ///
    /// Returns the error of clearing the flag, or whatever `f` returns.
    pub fn with_cleared_cloexec<T>(&self, f: impl FnOnce() -> FlyResult<T>) -> FlyResult<T> {
        self.set_cloexec(false)?;
        let result = f();
        if let Err(e) = self.set_cloexec(true) {
            tracing::warn!(fd = self.0, error = %e, "Failed to restore FD_CLOEXEC on lock fd");
        }
        result
    }

    fn path(&self) -> String {
        format!("/proc/self/fd/{}", self.0)
    }
}
