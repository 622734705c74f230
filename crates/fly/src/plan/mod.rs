//! Mount planning.
//!
//! Turns an app's declared mounts into the ordered list of operations the
//! executor applies against the app's root filesystem.

mod operation;
mod reconcile;

pub use operation::{
    MountKind, MountOperation, SYSTEM_DIRS, effective_mounts, operations_for, system_mounts,
};
pub use reconcile::{ReconciledMount, build_plan};
