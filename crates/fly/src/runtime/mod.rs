//! Stage1 runtime core.
//!
//! This module wires the pieces together for the `run` and `gc` commands.

mod config;
mod lifecycle;
mod run;

pub use config::RuntimeConfig;
pub use lifecycle::{InPhase, PhaseError, RunPhase};
pub use run::{gc, run, setup_mounts, verify_mounts};
