//! # fly-schema
//!
//! Manifest types consumed by the fly stage1 runtime.
//!
//! This crate provides Rust types for:
//! - The pod manifest (apps, pod-level mounts and volumes)
//! - The image manifest (entrypoint, environment and mount points)

#![warn(missing_docs)]

pub mod image;
pub mod pod;

pub use image::{App, EnvironmentVariable, ImageManifest, MountPoint};
pub use pod::{Mount, PodManifest, RuntimeApp, Volume, VolumeKind};
