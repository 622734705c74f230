//! Loading a pod from its directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use fly_common::{FlyError, FlyResult, PodId, PodPaths};
use fly_schema::{App, ImageManifest, MountPoint, PodManifest, RuntimeApp};
use serde::de::DeserializeOwned;

/// A pod as laid out by the supervisor: its manifest plus one image
/// manifest per app.
#[derive(Debug, Clone)]
pub struct Pod {
    /// Pod identifier.
    pub id: PodId,
    /// Pod directory layout.
    pub paths: PodPaths,
    /// The pod manifest.
    pub manifest: PodManifest,
    /// Image manifests keyed by app name.
    pub images: BTreeMap<String, ImageManifest>,
}

impl Pod {
    /// Read the pod manifest and every app's image manifest.
    ///
    /// # Errors
    ///
    /// Returns [`FlyError::PodLoad`] if a manifest is missing or invalid.
    pub fn load(paths: &PodPaths, id: PodId) -> FlyResult<Self> {
        let manifest: PodManifest = read_manifest(&paths.pod_manifest())?;

        let images = manifest
            .apps
            .iter()
            .map(|app| {
                let image = read_manifest(&paths.image_manifest(&app.name))?;
                Ok((app.name.clone(), image))
            })
            .collect::<FlyResult<BTreeMap<_, _>>>()?;

        tracing::debug!(
            pod = %id,
            root = %paths.root().display(),
            apps = manifest.apps.len(),
            "Loaded pod"
        );

        Ok(Self {
            id,
            paths: paths.clone(),
            manifest,
            images,
        })
    }

    /// The pod's only app.
    ///
    /// # Errors
    ///
    /// Returns [`FlyError::Config`] unless the pod has exactly one app.
    pub fn single_app(&self) -> FlyResult<&RuntimeApp> {
        match self.manifest.apps.as_slice() {
            [app] => Ok(app),
            apps => Err(FlyError::Config {
                message: format!(
                    "fly only supports 1 application per pod, found {}",
                    apps.len()
                ),
            }),
        }
    }

    /// How to run `app`: the pod's override if present, else the image's.
    ///
    /// # Errors
    ///
    /// Returns [`FlyError::Config`] if neither declares one.
    pub fn app_spec<'a>(&'a self, app: &'a RuntimeApp) -> FlyResult<&'a App> {
        app.app
            .as_ref()
            .or_else(|| self.images.get(&app.name).and_then(|i| i.app.as_ref()))
            .ok_or_else(|| FlyError::Config {
                message: format!("app {:?} has nothing to run", app.name),
            })
    }

    /// Mount points the image of `app` declares.
    #[must_use]
    pub fn mount_points(&self, app: &RuntimeApp) -> &[MountPoint] {
        self.images
            .get(&app.name)
            .and_then(|image| image.app.as_ref())
            .map(|a| a.mount_points.as_slice())
            .unwrap_or_default()
    }
}

fn read_manifest<T: DeserializeOwned>(path: &Path) -> FlyResult<T> {
    let load_error = |message: String| FlyError::PodLoad {
        path: path.to_path_buf(),
        message,
    };
    let contents = fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
    serde_json::from_str(&contents).map_err(|e| load_error(e.to_string()))
}
