//! Runtime configuration.

use std::path::PathBuf;

use fly_common::paths::{FLY_MOUNTINFO, LOCK_FD_ENV};
use fly_common::PodPaths;

use crate::gc::PodMatch;

/// Runtime configuration options, built once by the CLI.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Pod directory layout.
    pub paths: PodPaths,
    /// Mount table to read.
    pub mountinfo: PathBuf,
    /// Environment variable carrying the lock descriptor.
    pub lock_fd_env: String,
    /// How the garbage collector matches mounts to pods.
    pub gc_match: PodMatch,
    /// Verbose logging was requested.
    pub debug: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            paths: PodPaths::new(),
            mountinfo: FLY_MOUNTINFO.clone(),
            lock_fd_env: LOCK_FD_ENV.to_string(),
            gc_match: PodMatch::default(),
            debug: false,
        }
    }
}

impl RuntimeConfig {
    /// Set the pod directory.
    #[must_use]
    pub fn with_pod_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.paths = PodPaths::with_root(root);
        self
    }

    /// Set the mount table path.
    #[must_use]
    pub fn with_mountinfo(mut self, path: impl Into<PathBuf>) -> Self {
        self.mountinfo = path.into();
        self
    }

    /// Set the lock descriptor variable.
    #[must_use]
    pub fn with_lock_fd_env(mut self, var: impl Into<String>) -> Self {
        self.lock_fd_env = var.into();
        self
    }

    /// Set the garbage collector's matching mode.
    #[must_use]
    pub const fn with_gc_match(mut self, mode: PodMatch) -> Self {
        self.gc_match = mode;
        self
    }

    /// Enable debug logging.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
