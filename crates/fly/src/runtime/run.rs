//! The `run` and `gc` entry points.

use std::path::{Path, PathBuf};

use fly_common::{FlyError, FlyResult, PodId, PodPaths};
use fly_schema::RuntimeApp;

use super::lifecycle::{InPhase, PhaseError, RunPhase};
use super::RuntimeConfig;
use crate::exec::{LockFd, enter_root, exec_app, write_ppid};
use crate::filesystem::{MountExecutor, Mounter};
use crate::gc::{ReapReport, Reaper};
use crate::mountinfo::MountTable;
use crate::plan::{build_plan, effective_mounts};
use crate::pod::Pod;

/// Set up the pod's mounts and replace this process with its app.
///
/// Returns only on failure, or if exec somehow returned without one.
///
/// # Errors
///
/// Returns the failure together with the phase it happened in, which
/// decides the exit code.
pub fn run<M: Mounter>(config: &RuntimeConfig, uuid: &str, mounter: &M) -> Result<(), PhaseError> {
    let id = PodId::new(uuid).in_phase(RunPhase::PodId)?;
    tracing::debug!(pod = %id, "Starting stage1");

    let paths = absolute_paths(&config.paths).in_phase(RunPhase::LoadPod)?;
    let pod = Pod::load(&paths, id).in_phase(RunPhase::LoadPod)?;
    let app = pod.single_app().in_phase(RunPhase::LoadPod)?;
    let spec = pod.app_spec(app).in_phase(RunPhase::LoadPod)?;

    let lock = LockFd::from_env(&config.lock_fd_env).in_phase(RunPhase::LockFd)?;
    lock.set_cloexec(true).in_phase(RunPhase::LockFd)?;

    let rootfs = setup_mounts(&pod, app, mounter).in_phase(RunPhase::Mounts)?;
    verify_mounts(&config.mountinfo, &rootfs).in_phase(RunPhase::Mounts)?;

    write_ppid(&paths.ppid(), std::process::id()).in_phase(RunPhase::Ppid)?;
    enter_root(&rootfs).in_phase(RunPhase::Chroot)?;

    tracing::debug!(pod = %id, exec = ?spec.exec, rootfs = %rootfs.display(), "Execing app");
    lock.with_cleared_cloexec(|| exec_app(&spec.exec, &spec.environment))
        .in_phase(RunPhase::Exec)
}

/// Plan and apply every mount of `app`. Returns the app's root.
///
/// # Errors
///
/// Returns the first planning or mount failure.
pub fn setup_mounts<M: Mounter>(pod: &Pod, app: &RuntimeApp, mounter: &M) -> FlyResult<PathBuf> {
    let plan = build_plan(&app.mounts, &pod.manifest.volumes, pod.mount_points(app))?;
    let rootfs = pod.paths.app_rootfs(&app.name);
    let operations = effective_mounts(&rootfs, &plan);

    tracing::debug!(
        app = %app.name,
        rootfs = %rootfs.display(),
        volumes = plan.len(),
        operations = operations.len(),
        "Applying mounts"
    );
    MountExecutor::new(mounter).apply(&operations)?;
    Ok(rootfs)
}

/// Check that the mount table shows mounts beneath `rootfs`. Returns how
/// many there are.
///
/// # Errors
///
/// Returns [`FlyError::Lookup`] if nothing is mounted there, or the error of
/// resolving `rootfs` or reading the table.
pub fn verify_mounts(mountinfo: &Path, rootfs: &Path) -> FlyResult<usize> {
    // The kernel reports resolved paths
    let resolved = rootfs
        .canonicalize()
        .map_err(|e| FlyError::syscall("resolving app rootfs", rootfs, e))?;
    let table = MountTable::from_path(mountinfo)?;
    let attached = table.require_mounts_for_prefix(&resolved)?.len();

    tracing::debug!(rootfs = %resolved.display(), attached, "Verified app mounts");
    Ok(attached)
}

/// Unmount everything the pod left behind.
///
/// # Errors
///
/// Fails on a malformed pod id, an unreadable mount table or a failing
/// syscall. Finding nothing to unmount is not an error.
pub fn gc<M: Mounter>(
    config: &RuntimeConfig,
    uuid: &str,
    mounter: &M,
) -> Result<ReapReport, PhaseError> {
    let id = PodId::new(uuid).in_phase(RunPhase::PodId)?;
    tracing::debug!(pod = %id, mountinfo = %config.mountinfo.display(), "Collecting pod mounts");

    let table = MountTable::from_path(&config.mountinfo).in_phase(RunPhase::Mounts)?;
    Reaper::new(mounter)
        .with_match(config.gc_match)
        .reap(&table, &id)
        .in_phase(RunPhase::Mounts)
}

fn absolute_paths(paths: &PodPaths) -> FlyResult<PodPaths> {
    std::path::absolute(paths.root())
        .map(PodPaths::with_root)
        .map_err(|e| FlyError::syscall("resolving pod root", paths.root(), e))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::filesystem::testing::RecordingMounter;

    const POD: &str = "6a9d3b4e-3c0f-4f38-9d5e-0f8b6f3e2a11";

    fn pod_dir(volume_source: &std::path::Path) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let paths = PodPaths::with_root(dir.path());
        let pod = format!(
            r#"{{
                "apps": [{{"name": "web", "mounts": [{{"volume": "data", "path": "/data"}}]}}],
                "volumes": [{{"name": "data", "source": "{}"}}]
            }}"#,
            volume_source.display()
        );
        fs::write(paths.pod_manifest(), pod).unwrap();
        fs::create_dir_all(paths.app_rootfs("web")).unwrap();
        fs::write(
            paths.image_manifest("web"),
            r#"{"name":"web","app":{"exec":["/bin/web"],"mountPoints":[{"name":"data","path":"/data","readOnly":true}]}}"#,
        )
        .unwrap();
        dir
    }

    fn config(dir: &tempfile::TempDir) -> RuntimeConfig {
        RuntimeConfig::default()
            .with_pod_root(dir.path())
            .with_lock_fd_env("FLY_TEST_LOCK_FD_NEVER_SET")
    }

    #[test]
    fn malformed_uuid_fails_first() {
        let mounter = RecordingMounter::default();
        let err = run(&RuntimeConfig::default(), "not-a-uuid", &mounter).unwrap_err();
        assert_eq!(err.phase, RunPhase::PodId);
        assert_eq!(err.exit_code(), 1);
        assert!(matches!(err.source, FlyError::InvalidPodId { .. }));
    }

    #[test]
    fn missing_pod_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mounter = RecordingMounter::default();
        let config = RuntimeConfig::default().with_pod_root(dir.path());
        let err = run(&config, POD, &mounter).unwrap_err();
        assert_eq!(err.phase, RunPhase::LoadPod);
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn missing_lock_fd_stops_before_mounting() {
        let host = tempfile::tempdir().unwrap();
        let dir = pod_dir(host.path());
        let mounter = RecordingMounter::default();

        let err = run(&config(&dir), POD, &mounter).unwrap_err();
        assert_eq!(err.phase, RunPhase::LockFd);
        assert!(mounter.calls().is_empty());
    }

    #[test]
    fn mounts_for_single_app() {
        let host = tempfile::tempdir().unwrap();
        let dir = pod_dir(host.path());
        let pod = Pod::load(&PodPaths::with_root(dir.path()), POD.parse().unwrap()).unwrap();
        let app = pod.single_app().unwrap();
        let mounter = RecordingMounter::default();

        let rootfs = setup_mounts(&pod, app, &mounter).unwrap();

        assert_eq!(rootfs, pod.paths.app_rootfs("web"));
        assert!(rootfs.join("data").is_dir());
        assert!(rootfs.join("tmp").is_dir());
        let calls = mounter.calls();
        assert_eq!(calls.len(), 10);
        assert_eq!(
            calls.last().unwrap(),
            &format!("remounting read-only {}", rootfs.join("data").display())
        );
    }

    #[test]
    fn verify_counts_mounts_under_rootfs() {
        let dir = tempfile::tempdir().unwrap();
        let rootfs = dir.path().join("rootfs");
        fs::create_dir_all(&rootfs).unwrap();
        let resolved = rootfs.canonicalize().unwrap();
        let mountinfo = dir.path().join("mountinfo");
        fs::write(
            &mountinfo,
            format!(
                "22 1 8:1 / / rw shared:1 - ext4 /dev/sda1 rw\n\
                 40 22 0:5 / {root}/proc rw shared:2 - proc proc rw\n\
                 41 22 0:6 / {root}/tmp rw shared:3 - tmpfs tmpfs rw\n",
                root = resolved.display()
            ),
        )
        .unwrap();

        assert_eq!(verify_mounts(&mountinfo, &rootfs).unwrap(), 2);
    }

    #[test]
    fn verify_without_mounts_is_lookup_error() {
        let dir = tempfile::tempdir().unwrap();
        let rootfs = dir.path().join("rootfs");
        fs::create_dir_all(&rootfs).unwrap();
        let mountinfo = dir.path().join("mountinfo");
        fs::write(&mountinfo, "22 1 8:1 / / rw shared:1 - ext4 /dev/sda1 rw\n").unwrap();

        let err = verify_mounts(&mountinfo, &rootfs).unwrap_err();
        assert!(matches!(err, FlyError::Lookup { .. }));
    }

    #[test]
    fn gc_without_matches_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mountinfo = dir.path().join("mountinfo");
        fs::write(&mountinfo, "22 1 8:1 / / rw shared:1 - ext4 /dev/sda1 rw\n").unwrap();
        let config = RuntimeConfig::default().with_mountinfo(&mountinfo);
        let mounter = RecordingMounter::default();

        let report = gc(&config, POD, &mounter).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn gc_with_unreadable_table_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = RuntimeConfig::default().with_mountinfo(dir.path().join("missing"));
        let mounter = RecordingMounter::default();

        let err = gc(&config, POD, &mounter).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }
}
