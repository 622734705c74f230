//! Stage1 run phases and their exit codes.

use std::fmt;

use fly_common::FlyError;
use miette::Diagnostic;
use thiserror::Error;

/// Phases of `fly run`, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Validating the pod id.
    PodId,
    /// Reading the pod and image manifests.
    LoadPod,
    /// Taking over the supervisor's lock descriptor.
    LockFd,
    /// Planning and applying mounts.
    Mounts,
    /// Writing the pid marker.
    Ppid,
    /// Entering the app root.
    Chroot,
    /// Replacing this process with the app.
    Exec,
}

impl RunPhase {
    /// Process exit code when this phase fails.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Ppid => 4,
            Self::Exec => 7,
            Self::PodId | Self::LoadPod | Self::LockFd | Self::Mounts | Self::Chroot => 1,
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PodId => write!(f, "pod id"),
            Self::LoadPod => write!(f, "load pod"),
            Self::LockFd => write!(f, "lock fd"),
            Self::Mounts => write!(f, "mounts"),
            Self::Ppid => write!(f, "ppid"),
            Self::Chroot => write!(f, "chroot"),
            Self::Exec => write!(f, "exec"),
        }
    }
}

/// A failure tagged with the phase it happened in.
#[derive(Debug, Error, Diagnostic)]
#[error("fly {phase} failed")]
pub struct PhaseError {
    /// Where it failed.
    pub phase: RunPhase,
    /// What failed.
    #[source]
    #[diagnostic_source]
    pub source: FlyError,
}

impl PhaseError {
    /// Tag `source` with `phase`.
    #[must_use]
    pub const fn new(phase: RunPhase, source: FlyError) -> Self {
        Self { phase, source }
    }

    /// Process exit code for this failure.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.phase.exit_code()
    }
}

/// Attach a [`RunPhase`] to a fallible result.
pub trait InPhase<T> {
    /// Tag the error, if any, with `phase`.
    ///
    /// # Errors
    ///
    /// Returns the original error wrapped in a [`PhaseError`].
    fn in_phase(self, phase: RunPhase) -> Result<T, PhaseError>;
}

impl<T> InPhase<T> for Result<T, FlyError> {
    fn in_phase(self, phase: RunPhase) -> Result<T, PhaseError> {
        self.map_err(|e| PhaseError::new(phase, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(RunPhase::PodId.exit_code(), 1);
        assert_eq!(RunPhase::LoadPod.exit_code(), 1);
        assert_eq!(RunPhase::LockFd.exit_code(), 1);
        assert_eq!(RunPhase::Mounts.exit_code(), 1);
        assert_eq!(RunPhase::Ppid.exit_code(), 4);
        assert_eq!(RunPhase::Chroot.exit_code(), 1);
        assert_eq!(RunPhase::Exec.exit_code(), 7);
    }

    #[test]
    fn phase_error_keeps_source() {
        let err: Result<(), _> = Err(FlyError::Internal {
            message: "boom".to_string(),
        });
        let err = err.in_phase(RunPhase::Ppid).unwrap_err();

        assert_eq!(err.exit_code(), 4);
        assert_eq!(err.to_string(), "fly ppid failed");
        assert!(std::error::Error::source(&err).is_some());
    }
}
