//! CLI command implementations

mod troubleshoot;

pub use troubleshoot::run_troubleshoot;
