//! CLI command definitions and handlers.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::filesystem::LinuxMounter;
use crate::gc::PodMatch;
use crate::runtime::{self, PhaseError, RuntimeConfig};

/// fly - chroot-based stage1 for running a single-app pod
#[derive(Parser, Debug)]
#[command(name = "fly")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Pod directory (defaults to the current directory)
    #[arg(long, global = true, env = "FLY_POD_ROOT")]
    pub pod_root: Option<PathBuf>,

    /// Mount table to read
    #[arg(long, global = true, env = "FLY_MOUNTINFO")]
    pub mountinfo: Option<PathBuf>,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Stage1 entry points.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Set up the pod's mounts and exec its app
    Run {
        /// Pod UUID
        uuid: Option<String>,
    },

    /// Unmount everything a terminated pod left behind
    Gc {
        /// Pod UUID
        uuid: Option<String>,

        /// How mounts are matched to the pod
        #[arg(long = "match", value_enum, default_value_t = PodMatch::Line)]
        match_mode: PodMatch,
    },
}

impl Cli {
    /// Build the runtime configuration from the parsed flags.
    #[must_use]
    pub fn config(&self) -> RuntimeConfig {
        let mut config = RuntimeConfig::default().with_debug(self.debug);
        if let Some(root) = &self.pod_root {
            config = config.with_pod_root(root);
        }
        if let Some(mountinfo) = &self.mountinfo {
            config = config.with_mountinfo(mountinfo);
        }
        if let Commands::Gc { match_mode, .. } = &self.command {
            config = config.with_gc_match(*match_mode);
        }
        config
    }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns the failing phase; its exit code is the process exit code.
    pub fn execute(self) -> Result<(), PhaseError> {
        let config = self.config();
        let mounter = LinuxMounter;

        match self.command {
            Commands::Run { uuid } => {
                runtime::run(&config, uuid.as_deref().unwrap_or_default(), &mounter)
            }
            Commands::Gc { uuid, .. } => {
                let report = runtime::gc(&config, uuid.as_deref().unwrap_or_default(), &mounter)?;
                tracing::debug!(
                    privatized = report.privatized.len(),
                    unmounted = report.unmounted.len(),
                    "Garbage collection finished"
                );
                Ok(())
            }
        }
    }
}
