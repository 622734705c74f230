//! Process hand-off.

mod lock;
mod stage2;

pub use lock::LockFd;
pub use stage2::{DEFAULT_PATH, app_command, enter_root, exec_app, write_ppid};
