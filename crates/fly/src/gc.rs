//! Pod mount garbage collection.
//!
//! After a pod exits its mounts are still attached under the pod directory.
//! The reaper finds them in the mount table by pod id, cuts them off from
//! propagation and unmounts them innermost first, so nothing it does leaks
//! back into the host namespace.

use std::collections::HashSet;
use std::path::{Component, PathBuf};

use clap::ValueEnum;
use fly_common::{FlyResult, PodId};

use crate::filesystem::Mounter;
use crate::mountinfo::{MountEntry, MountTable, unmount_order};

/// How a mount table entry is matched against a pod id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PodMatch {
    /// The id appears anywhere in the entry.
    #[default]
    Line,
    /// The id is a whole path segment of the mount point.
    Segment,
}

impl PodMatch {
    /// Whether `entry` belongs to the pod whose canonical id is `id`.
    #[must_use]
    pub fn matches(self, entry: &MountEntry, id: &str) -> bool {
        match self {
            Self::Line => entry.mentions(id),
            Self::Segment => entry
                .mount_point
                .components()
                .any(|c| matches!(c, Component::Normal(s) if s == id)),
        }
    }
}

/// What a reap did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReapReport {
    /// Mount points made private, in order.
    pub privatized: Vec<PathBuf>,
    /// Mount points unmounted, in order.
    pub unmounted: Vec<PathBuf>,
}

impl ReapReport {
    /// Whether nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.privatized.is_empty() && self.unmounted.is_empty()
    }
}

/// Tears down the mounts of a pod.
#[derive(Debug)]
pub struct Reaper<'m, M: Mounter> {
    mounter: &'m M,
    mode: PodMatch,
}

impl<'m, M: Mounter> Reaper<'m, M> {
    /// Create a reaper with the default [`PodMatch::Line`] matching.
    pub const fn new(mounter: &'m M) -> Self {
        Self {
            mounter,
            mode: PodMatch::Line,
        }
    }

    /// Use a different matching mode.
    #[must_use]
    pub const fn with_match(mut self, mode: PodMatch) -> Self {
        self.mode = mode;
        self
    }

    /// Mount points in `table` that belong to `pod`, in unmount order.
    #[must_use]
    pub fn pod_mounts(&self, table: &MountTable, pod: &PodId) -> Vec<PathBuf> {
        let id = pod.to_canonical();
        let mut seen = HashSet::new();
        let matched: Vec<&MountEntry> = table
            .iter()
            .filter(|entry| self.mode.matches(entry, &id))
            .filter(|entry| seen.insert(entry.mount_point.clone()))
            .collect();

        unmount_order(matched)
            .into_iter()
            .map(|entry| entry.mount_point.clone())
            .collect()
    }

    /// Unmount every mount of `pod`.
    ///
    /// All mounts are made private first, outermost first, then unmounted
    /// innermost first. Nothing matching is not an error.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first failing syscall.
    pub fn reap(&self, table: &MountTable, pod: &PodId) -> FlyResult<ReapReport> {
        let unmount = self.pod_mounts(table, pod);
        if unmount.is_empty() {
            tracing::debug!(pod = %pod, "No mounts to collect");
            return Ok(ReapReport::default());
        }

        let mut report = ReapReport::default();
        for target in unmount.iter().rev() {
            tracing::debug!(pod = %pod, target = %target.display(), "Remounting private");
            self.mounter.make_private(target)?;
            report.privatized.push(target.clone());
        }

        for target in &unmount {
            tracing::debug!(pod = %pod, target = %target.display(), "Unmounting");
            self.mounter.unmount(target)?;
            report.unmounted.push(target.clone());
        }

        tracing::info!(pod = %pod, mounts = report.unmounted.len(), "Collected pod mounts");
        Ok(report)
    }
}
