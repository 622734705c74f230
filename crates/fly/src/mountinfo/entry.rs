//! A single parsed mount table record.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Mount propagation type, derived from the optional fields of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Propagation {
    /// Member of a peer group (`shared:N`). Mounts that are both shared
    /// and a slave report as shared; [`MountEntry::master`] tells them apart.
    Shared,
    /// Receives events from a master peer group (`master:N`).
    Slave,
    /// No propagation.
    Private,
    /// Private and refuses to be bind mounted (`unbindable`).
    Unbindable,
}

impl Propagation {
    pub(crate) fn from_optional_fields(fields: &[String]) -> Self {
        if fields.iter().any(|f| f == "unbindable") {
            Self::Unbindable
        } else if fields.iter().any(|f| f.starts_with("shared:")) {
            Self::Shared
        } else if fields.iter().any(|f| f.starts_with("master:")) {
            Self::Slave
        } else {
            Self::Private
        }
    }
}

impl fmt::Display for Propagation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared => write!(f, "shared"),
            Self::Slave => write!(f, "slave"),
            Self::Private => write!(f, "private"),
            Self::Unbindable => write!(f, "unbindable"),
        }
    }
}

/// One line of the kernel mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// Unique mount id.
    pub id: u32,
    /// Id of the mount this one is attached to.
    pub parent_id: u32,
    /// Major number of the backing device.
    pub major: u32,
    /// Minor number of the backing device.
    pub minor: u32,
    /// Path inside the filesystem forming the root of this mount.
    pub root: PathBuf,
    /// Where the mount appears in this namespace.
    pub mount_point: PathBuf,
    /// Per-mount options (`rw`, `nosuid`, ...).
    pub options: BTreeSet<String>,
    /// Raw optional fields (`shared:N`, `master:N`, ...).
    pub optional_fields: Vec<String>,
    /// Propagation type.
    pub propagation: Propagation,
    /// Filesystem type, empty if the table omits it.
    pub fs_type: String,
    /// Filesystem-specific source, empty if the table omits it.
    pub mount_source: String,
    /// Per-superblock options, empty if the table omits them.
    pub super_options: String,
}

impl MountEntry {
    /// Device id in `major:minor` form.
    #[must_use]
    pub fn device(&self) -> String {
        format!("{}:{}", self.major, self.minor)
    }

    /// Peer group id if the mount is shared.
    #[must_use]
    pub fn peer_group(&self) -> Option<u32> {
        self.tagged("shared:")
    }

    /// Master peer group id if the mount is a slave.
    #[must_use]
    pub fn master(&self) -> Option<u32> {
        self.tagged("master:")
    }

    /// Whether the mount is read-only.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.options.contains("ro")
    }

    /// Whether `needle` occurs in any textual field of the record.
    #[must_use]
    pub fn mentions(&self, needle: &str) -> bool {
        self.mount_point.to_string_lossy().contains(needle)
            || self.root.to_string_lossy().contains(needle)
            || self.mount_source.contains(needle)
            || self.super_options.contains(needle)
            || self.fs_type.contains(needle)
            || self.optional_fields.iter().any(|f| f.contains(needle))
            || self.options.iter().any(|o| o.contains(needle))
    }

    fn tagged(&self, tag: &str) -> Option<u32> {
        self.optional_fields
            .iter()
            .find_map(|f| f.strip_prefix(tag))
            .and_then(|n| n.parse().ok())
    }
}
