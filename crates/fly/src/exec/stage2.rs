//! Hand-off to the app: pid marker, chroot and exec.

use std::fs::{self, Permissions};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Command;

use fly_common::{FlyError, FlyResult};
use fly_schema::EnvironmentVariable;

/// `PATH` every app starts with.
pub const DEFAULT_PATH: &str = "/bin:/sbin:/usr/bin:/usr/local/bin";

/// Mode of the pid marker.
const PPID_MODE: u32 = 0o644;

/// Record `pid` as the parent of the pod's pid 1.
///
/// # Errors
///
/// Returns [`FlyError::Syscall`] if the file cannot be written.
pub fn write_ppid(path: &Path, pid: u32) -> FlyResult<()> {
    let mut file =
        fs::File::create(path).map_err(|e| FlyError::syscall("creating ppid file", path, e))?;
    writeln!(file, "{pid}").map_err(|e| FlyError::syscall("writing ppid file", path, e))?;
    fs::set_permissions(path, Permissions::from_mode(PPID_MODE))
        .map_err(|e| FlyError::syscall("setting mode of ppid file", path, e))?;

    tracing::debug!(path = %path.display(), pid, "Wrote ppid");
    Ok(())
}

/// Make `rootfs` the root directory and move into it.
///
/// # Errors
///
/// Returns [`FlyError::Syscall`] if either step fails.
#[cfg(target_os = "linux")]
pub fn enter_root(rootfs: &Path) -> FlyResult<()> {
    tracing::debug!(rootfs = %rootfs.display(), "Chroot");

    rustix::process::chroot(rootfs).map_err(|e| FlyError::syscall("chrooting to", rootfs, e))?;
    std::env::set_current_dir("/").map_err(|e| FlyError::syscall("changing directory to", "/", e))
}

/// Make `rootfs` the root directory and move into it.
///
/// # Errors
///
/// Always fails off Linux.
#[cfg(not(target_os = "linux"))]
pub fn enter_root(_rootfs: &Path) -> FlyResult<()> {
    Err(FlyError::Unsupported {
        feature: "chroot".to_string(),
    })
}

/// Build the command that replaces this process with the app.
///
/// The environment is exactly [`DEFAULT_PATH`] plus the app's own
/// variables, which may override it.
///
/// # Errors
///
/// Returns [`FlyError::Config`] if `args` is empty.
pub fn app_command(args: &[String], environment: &[EnvironmentVariable]) -> FlyResult<Command> {
    let (program, rest) = args.split_first().ok_or_else(|| FlyError::Config {
        message: "app has no exec command".to_string(),
    })?;

    let mut cmd = Command::new(program);
    cmd.args(rest).env_clear().env("PATH", DEFAULT_PATH);
    for var in environment {
        cmd.env(&var.name, &var.value);
    }
    Ok(cmd)
}

/// Replace this process with the app. Only returns on failure.
///
/// # Errors
///
/// Returns [`FlyError::Syscall`] when exec fails, or [`FlyError::Config`]
/// when `args` is empty.
pub fn exec_app(args: &[String], environment: &[EnvironmentVariable]) -> FlyResult<()> {
    let mut cmd = app_command(args, environment)?;
    tracing::debug!(args = ?args, "Execing app");

    let err = cmd.exec();
    Err(FlyError::syscall("executing", &args[0], err))
}
