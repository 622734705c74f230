//! Pod manifest types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::image::App;

/// Pod manifest, written by the supervisor into the pod directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodManifest {
    /// Manifest kind, `PodManifest`.
    #[serde(default = "default_pod_kind")]
    pub ac_kind: String,
    /// Schema version.
    #[serde(default)]
    pub ac_version: String,
    /// Apps in the pod.
    #[serde(default)]
    pub apps: Vec<RuntimeApp>,
    /// Pod-level volume definitions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
}

fn default_pod_kind() -> String {
    "PodManifest".to_string()
}

/// An app instance within a pod.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeApp {
    /// App name, unique within the pod.
    pub name: String,
    /// Image reference.
    #[serde(default)]
    pub image: RuntimeImage,
    /// Overrides for the image's app section.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<App>,
    /// Pod-level mounts for this app.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<Mount>,
}

/// Image reference of a runtime app.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeImage {
    /// Image name.
    #[serde(default)]
    pub name: String,
    /// Image id (content hash).
    #[serde(default)]
    pub id: String,
}

/// Pod-level mount: puts a volume at a path inside the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    /// Name of the volume to mount.
    pub volume: String,
    /// Absolute path inside the container.
    pub path: PathBuf,
}

impl Mount {
    /// Create a mount.
    #[must_use]
    pub fn new(volume: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            volume: volume.into(),
            path: path.into(),
        }
    }
}

/// Volume kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeKind {
    /// Bind a host directory or file.
    #[default]
    Host,
    /// Fresh empty directory. Accepted in manifests, but fly only binds
    /// host volumes and rejects this kind when planning mounts.
    Empty,
}

/// Pod-level volume definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    /// Symbolic name, unique within the pod.
    pub name: String,
    /// Volume kind.
    #[serde(default)]
    pub kind: VolumeKind,
    /// Host path.
    #[serde(default)]
    pub source: PathBuf,
    /// Read-only; unset lets the image mount point decide.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
}

impl Volume {
    /// Create a host volume with no read-only preference.
    #[must_use]
    pub fn host(name: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind: VolumeKind::Host,
            source: source.into(),
            read_only: None,
        }
    }

    /// Set the read-only preference.
    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = Some(read_only);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pod_manifest_parsing() {
        let json = r#"{
            "acKind": "PodManifest",
            "acVersion": "0.7.0",
            "apps": [{
                "name": "redis",
                "image": {"name": "example.com/redis", "id": "sha512-abc"},
                "mounts": [{"volume": "data", "path": "/var/lib/redis"}]
            }],
            "volumes": [
                {"name": "data", "kind": "host", "source": "/srv/redis"},
                {"name": "conf", "kind": "host", "source": "/etc/redis", "readOnly": true}
            ]
        }"#;

        let pod: PodManifest = serde_json::from_str(json).unwrap();
        assert_eq!(pod.apps.len(), 1);
        assert_eq!(pod.apps[0].mounts, vec![Mount::new("data", "/var/lib/redis")]);
        assert_eq!(pod.volumes[0], Volume::host("data", "/srv/redis"));
        assert_eq!(pod.volumes[1].read_only, Some(true));
    }

    #[test]
    fn volume_read_only_is_tri_state() {
        let unset: Volume = serde_json::from_str(r#"{"name":"v","source":"/v"}"#).unwrap();
        let off: Volume =
            serde_json::from_str(r#"{"name":"v","source":"/v","readOnly":false}"#).unwrap();
        assert_eq!(unset.read_only, None);
        assert_eq!(off.read_only, Some(false));
    }

    #[test]
    fn volume_kind_serialization() {
        let vol = Volume::host("v", "/v").with_read_only(true);
        let json = serde_json::to_string(&vol).unwrap();
        assert!(json.contains("\"kind\":\"host\""));
        assert!(json.contains("\"readOnly\":true"));
    }
}
