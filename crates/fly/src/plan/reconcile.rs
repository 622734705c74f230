//! Reconciliation of pod mounts, image mount points and volumes.

use std::collections::BTreeMap;
use std::path::PathBuf;

use fly_common::{FlyError, FlyResult};
use fly_schema::{Mount, MountPoint, Volume, VolumeKind};
use serde::Serialize;

/// A volume resolved to a concrete host source and container path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciledMount {
    /// Name of the volume.
    pub volume_name: String,
    /// Host path bound into the container.
    pub host_source: PathBuf,
    /// Absolute path inside the container.
    pub container_path: PathBuf,
    /// Whether the bind is remounted read-only.
    pub read_only: bool,
}

/// Volume attached to a record.
#[derive(Debug)]
struct Attached {
    source: PathBuf,
    read_only: Option<bool>,
}

/// Working state for one volume name while the inputs are merged.
#[derive(Debug)]
struct Record {
    /// Volume name the record was created for.
    tracked: String,
    path: PathBuf,
    volume: Option<Attached>,
}

impl Record {
    fn new(tracked: &str, path: &std::path::Path) -> Self {
        Self {
            tracked: tracked.to_string(),
            path: path.to_path_buf(),
            volume: None,
        }
    }
}

/// Merge the app's pod-level mounts, the pod's volumes and the image's
/// mount points into one list of mounts.
///
/// Pod mounts win over image mount points with the same name as long as
/// both agree on the path. A volume without a read-only preference takes
/// the image mount point's. The result is sorted by container path, so a
/// mount always precedes the mounts nested inside it.
///
/// # Errors
///
/// Fails before touching anything on duplicate pod mounts, path conflicts,
/// volumes nobody mounts, mounts without a volume, volumes without a
/// source and volumes that are not host volumes.
pub fn build_plan(
    pod_mounts: &[Mount],
    volumes: &[Volume],
    mount_points: &[MountPoint],
) -> FlyResult<Vec<ReconciledMount>> {
    let mut records: BTreeMap<&str, Record> = BTreeMap::new();

    for mount in pod_mounts {
        if records.contains_key(mount.volume.as_str()) {
            return Err(FlyError::DuplicateMount {
                volume: mount.volume.clone(),
            });
        }
        tracing::debug!(
            volume = %mount.volume,
            path = %mount.path.display(),
            "Adding pod mount"
        );
        records.insert(&mount.volume, Record::new(&mount.volume, &mount.path));
    }

    for mp in mount_points {
        match records.get(mp.name.as_str()) {
            Some(record) if record.path != mp.path => {
                return Err(FlyError::Conflict {
                    name: mp.name.clone(),
                    mount_path: record.path.clone(),
                    mount_point_path: mp.path.clone(),
                });
            }
            Some(_) => {}
            None => {
                tracing::debug!(
                    volume = %mp.name,
                    path = %mp.path.display(),
                    "Adding image mount point"
                );
                records.insert(&mp.name, Record::new(&mp.name, &mp.path));
            }
        }
    }

    for volume in volumes {
        if volume.kind != VolumeKind::Host {
            return Err(FlyError::Config {
                message: format!("volume {:?} is not a host volume", volume.name),
            });
        }
        let record = records
            .get_mut(volume.name.as_str())
            .ok_or_else(|| FlyError::MissingMount {
                volume: volume.name.clone(),
            })?;
        if record.tracked != volume.name {
            return Err(FlyError::VolumeMismatch {
                volume: volume.name.clone(),
                tracked: record.tracked.clone(),
            });
        }
        record.volume = Some(Attached {
            source: volume.source.clone(),
            read_only: volume.read_only,
        });
    }

    for mp in mount_points {
        let attached = records
            .get_mut(mp.name.as_str())
            .and_then(|record| record.volume.as_mut())
            .ok_or_else(|| FlyError::MissingVolume {
                name: mp.name.clone(),
            })?;
        attached.read_only.get_or_insert(mp.read_only);
    }

    let mut plan = records
        .into_values()
        .map(|record| {
            let Some(attached) = record.volume else {
                return Err(FlyError::MissingVolume {
                    name: record.tracked,
                });
            };
            if attached.source.as_os_str().is_empty() {
                return Err(FlyError::EmptyVolumeSource {
                    volume: record.tracked,
                });
            }
            if record.path.as_os_str().is_empty() {
                return Err(FlyError::Config {
                    message: format!("mount for volume {:?} has no path", record.tracked),
                });
            }
            Ok(ReconciledMount {
                volume_name: record.tracked,
                host_source: attached.source,
                container_path: record.path,
                read_only: attached.read_only.unwrap_or(false),
            })
        })
        .collect::<FlyResult<Vec<_>>>()?;

    plan.sort_by(|a, b| {
        a.container_path
            .cmp(&b.container_path)
            .then_with(|| a.volume_name.cmp(&b.volume_name))
    });

    tracing::debug!(mounts = plan.len(), "Reconciled mount plan");
    Ok(plan)
}
