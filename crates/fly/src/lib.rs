//! # fly
//!
//! fly is a stage1 for running a single-app pod without any isolation
//! beyond a chroot. Its job is mostly mount bookkeeping.
//!
//! ## Features
//!
//! - **Mount table parsing**: `/proc/self/mountinfo` into typed records
//! - **Unmount ordering**: mounts under a prefix, children before parents
//! - **Mount planning**: pod mounts, image mount points and volumes merged
//!   into one conflict-free plan
//! - **Mount setup**: targets created and type-checked, then bound
//! - **Garbage collection**: a dead pod's mounts found and torn down
//!
//! ## Usage
//!
//! ```no_run
//! use fly::filesystem::LinuxMounter;
//! use fly::gc::Reaper;
//! use fly::mountinfo::MountTable;
//! use fly_common::PodId;
//!
//! # fn example() -> fly_common::FlyResult<()> {
//! let pod: PodId = "6a9d3b4e-3c0f-4f38-9d5e-0f8b6f3e2a11".parse()?;
//! let table = MountTable::from_path("/proc/self/mountinfo")?;
//!
//! let report = Reaper::new(&LinuxMounter).reap(&table, &pod)?;
//! println!("unmounted {} mounts", report.unmounted.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod cli;
pub mod exec;
pub mod filesystem;
pub mod gc;
pub mod mountinfo;
pub mod plan;
pub mod pod;
pub mod runtime;

pub use runtime::RuntimeConfig;
