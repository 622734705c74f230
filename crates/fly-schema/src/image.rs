//! Image manifest types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Image manifest, as stored next to an app's root filesystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    /// Manifest kind, `ImageManifest`.
    #[serde(default = "default_image_kind")]
    pub ac_kind: String,
    /// Schema version.
    #[serde(default)]
    pub ac_version: String,
    /// Image name.
    pub name: String,
    /// How to run the image, if it is runnable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<App>,
}

fn default_image_kind() -> String {
    "ImageManifest".to_string()
}

/// Runnable app description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    /// Entrypoint and arguments.
    #[serde(default)]
    pub exec: Vec<String>,
    /// User to run as.
    #[serde(default)]
    pub user: String,
    /// Group to run as.
    #[serde(default)]
    pub group: String,
    /// Environment variables.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<EnvironmentVariable>,
    /// Paths inside the image where volumes are expected.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mount_points: Vec<MountPoint>,
}

/// A single environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    /// Variable name.
    pub name: String,
    /// Variable value.
    pub value: String,
}

/// Image-declared mount point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountPoint {
    /// Name of the volume expected here.
    pub name: String,
    /// Absolute path inside the container.
    pub path: PathBuf,
    /// Whether the image wants the mount read-only.
    #[serde(default)]
    pub read_only: bool,
}

impl MountPoint {
    /// Create a read-write mount point.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            read_only: false,
        }
    }

    /// Mark the mount point read-only.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}
