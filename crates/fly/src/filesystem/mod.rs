//! Filesystem operations for app roots.
//!
//! This module handles:
//! - Mount target preparation
//! - Mount syscalls behind the [`Mounter`] seam

mod executor;
mod mounts;

pub use executor::MountExecutor;
pub use mounts::{LinuxMounter, Mounter};

#[cfg(test)]
pub(crate) use mounts::testing;
