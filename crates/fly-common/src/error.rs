//! Common error types for the fly runtime.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using [`FlyError`].
pub type FlyResult<T> = Result<T, FlyError>;

/// Common errors across the fly runtime.
#[derive(Error, Diagnostic, Debug)]
pub enum FlyError {
    /// A mount table line could not be parsed.
    #[error("Malformed mount table line {line}: {reason}")]
    #[diagnostic(code(fly::mountinfo::parse))]
    Parse {
        /// 1-based line number in the mount table.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// A lookup that requires at least one match found nothing.
    #[error("No mounts found for {what}")]
    #[diagnostic(code(fly::mountinfo::lookup))]
    Lookup {
        /// Description of what was looked up.
        what: String,
    },

    /// The same volume is mounted twice by the pod.
    #[error("Duplicated mount given: {volume:?}")]
    #[diagnostic(
        code(fly::plan::duplicate_mount),
        help("Each volume may be mounted at most once per app")
    )]
    DuplicateMount {
        /// The volume name.
        volume: String,
    },

    /// A pod mount and an image mount point disagree on the path.
    #[error(
        "Conflicting path information from mount and mountpoint {name:?}: {} != {}",
        .mount_path.display(),
        .mount_point_path.display()
    )]
    #[diagnostic(
        code(fly::plan::conflict),
        help("Drop the pod-level mount or make its path match the image mount point")
    )]
    Conflict {
        /// The volume / mount point name.
        name: String,
        /// Path declared by the pod mount.
        mount_path: PathBuf,
        /// Path declared by the image mount point.
        mount_point_path: PathBuf,
    },

    /// A volume is declared but nothing mounts it.
    #[error("Missing mount for volume {volume:?}")]
    #[diagnostic(
        code(fly::plan::missing_mount),
        help("A volume is of no use if it is not mounted anywhere")
    )]
    MissingMount {
        /// The volume name.
        volume: String,
    },

    /// A mount or mount point references a volume that does not exist.
    #[error("Missing volume for mountpoint {name:?}")]
    #[diagnostic(code(fly::plan::missing_volume))]
    MissingVolume {
        /// The referenced volume name.
        name: String,
    },

    /// A plan record tracks a different volume than the one attached to it.
    #[error("Mismatched volume:mount pair: {volume:?} != {tracked:?}")]
    #[diagnostic(code(fly::plan::volume_mismatch))]
    VolumeMismatch {
        /// The volume being attached.
        volume: String,
        /// The volume name the record was created for.
        tracked: String,
    },

    /// A volume has no host path to bind.
    #[error("Volume {volume:?} has no host source")]
    #[diagnostic(
        code(fly::plan::empty_source),
        help("Only host volumes with a non-empty source can be mounted")
    )]
    EmptyVolumeSource {
        /// The volume name.
        volume: String,
    },

    /// A directory would be mounted onto a file or the other way around.
    #[error(
        "Can't mount: {} is {host_kind} while {} is {target_kind}",
        .host.display(),
        .target.display()
    )]
    #[diagnostic(code(fly::mount::type_mismatch))]
    TypeMismatch {
        /// The host path.
        host: PathBuf,
        /// The target path.
        target: PathBuf,
        /// Kind of the host path.
        host_kind: &'static str,
        /// Kind of the target path.
        target_kind: &'static str,
    },

    /// An OS-level operation failed.
    #[error("Error {operation} {}: {source}", .path.display())]
    #[diagnostic(
        code(fly::syscall),
        help("Mount operations require CAP_SYS_ADMIN in the pod's mount namespace")
    )]
    Syscall {
        /// The operation being performed, with its flags.
        operation: String,
        /// The path the operation was applied to.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Invalid pod identifier.
    #[error("UUID is missing or malformed: {id:?}")]
    #[diagnostic(
        code(fly::pod::invalid_id),
        help("Pod identifiers are RFC 4122 UUIDs")
    )]
    InvalidPodId {
        /// The rejected identifier.
        id: String,
    },

    /// The pod or one of its image manifests could not be loaded.
    #[error("Failed to load pod from {}: {message}", .path.display())]
    #[diagnostic(code(fly::pod::load))]
    PodLoad {
        /// The manifest path.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(fly::io))]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    #[diagnostic(code(fly::serialization))]
    Serialization(String),

    /// Feature not supported on this platform.
    #[error("Feature not supported: {feature}")]
    #[diagnostic(code(fly::unsupported), help("fly only runs on Linux"))]
    Unsupported {
        /// The unsupported feature.
        feature: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(fly::config))]
    Config {
        /// The error message.
        message: String,
    },

    /// Internal error (should not happen).
    #[error("Internal error: {message}")]
    #[diagnostic(code(fly::internal), help("This is a bug, please report it"))]
    Internal {
        /// The error message.
        message: String,
    },
}

impl FlyError {
    /// Wrap an OS error with the operation and path it was raised for.
    pub fn syscall(
        operation: impl Into<String>,
        path: impl Into<PathBuf>,
        source: impl Into<std::io::Error>,
    ) -> Self {
        Self::Syscall {
            operation: operation.into(),
            path: path.into(),
            source: source.into(),
        }
    }
}

impl From<serde_json::Error> for FlyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = FlyError::DuplicateMount {
            volume: "data".to_string(),
        };
        assert_eq!(err.to_string(), "Duplicated mount given: \"data\"");
    }

    #[test]
    fn conflict_names_both_paths() {
        let err = FlyError::Conflict {
            name: "data".to_string(),
            mount_path: PathBuf::from("/srv"),
            mount_point_path: PathBuf::from("/data"),
        };
        insta::assert_snapshot!(
            err.to_string(),
            @r#"Conflicting path information from mount and mountpoint "data": /srv != /data"#
        );
    }

    #[test]
    fn syscall_keeps_source() {
        let io_err = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        let err = FlyError::syscall("unmounting", "/a/b", io_err);
        assert!(matches!(err, FlyError::Syscall { .. }));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("Error unmounting /a/b: "));
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FlyError = io_err.into();
        assert!(matches!(err, FlyError::Io(_)));
    }
}
