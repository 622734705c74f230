//! Standard filesystem paths for fly.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;

/// Environment variable carrying the supervisor's lock file descriptor.
pub const LOCK_FD_ENV: &str = "FLY_LOCK_FD";

/// Default pod root: stage1 is started with the pod directory as its cwd.
pub static FLY_POD_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("FLY_POD_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
});

/// Default mount table location.
pub static FLY_MOUNTINFO: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("FLY_MOUNTINFO")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/proc/self/mountinfo"))
});

/// Layout of a pod directory.
#[derive(Debug, Clone)]
pub struct PodPaths {
    /// Pod directory.
    pub root: PathBuf,
}

impl PodPaths {
    /// Create paths with the default pod root.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create paths for a custom pod directory.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The pod root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Pod manifest file.
    #[must_use]
    pub fn pod_manifest(&self) -> PathBuf {
        self.root.join("pod")
    }

    /// Stage1 root filesystem.
    #[must_use]
    pub fn stage1_rootfs(&self) -> PathBuf {
        self.root.join("stage1").join("rootfs")
    }

    /// Directory holding an app's image manifest and root filesystem.
    #[must_use]
    pub fn app(&self, app: &str) -> PathBuf {
        self.stage1_rootfs().join("opt").join("stage2").join(app)
    }

    /// App root filesystem (the chroot target).
    #[must_use]
    pub fn app_rootfs(&self, app: &str) -> PathBuf {
        self.app(app).join("rootfs")
    }

    /// App image manifest.
    #[must_use]
    pub fn image_manifest(&self, app: &str) -> PathBuf {
        self.app(app).join("manifest")
    }

    /// Marker recording the pid of the process that owns the pod's pid 1.
    #[must_use]
    pub fn ppid(&self) -> PathBuf {
        self.root.join("ppid")
    }
}

impl Default for PodPaths {
    fn default() -> Self {
        Self {
            root: FLY_POD_ROOT.clone(),
        }
    }
}
