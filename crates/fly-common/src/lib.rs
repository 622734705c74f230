//! # fly-common
//!
//! Shared utilities and types for the fly stage1 runtime.
//!
//! This crate provides common functionality used across all fly crates:
//! - Pod identifier parsing and validation
//! - The on-disk layout of a pod directory
//! - The common error taxonomy

#![warn(missing_docs)]

pub mod error;
pub mod id;
pub mod paths;

pub use error::{FlyError, FlyResult};
pub use id::PodId;
pub use paths::PodPaths;
