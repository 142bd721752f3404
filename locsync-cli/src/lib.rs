//! CLI library for testing purposes

pub mod config;
pub mod path_glob;
pub mod sync;
pub mod validation;

pub use config::FileConfig;
pub use sync::{SyncArgs, SyncSettings, run_sync_command};
