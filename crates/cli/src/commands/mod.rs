//! CLI commands for the ORB strategy.

pub mod check_config;
pub mod replay;

pub use check_config::{run_check_config, CheckConfigArgs};
pub use replay::{run_replay, ReplayArgs};

use anyhow::Result;
use orb_core::{AppConfig, ConfigLoader};

/// Loads `path`, layering `<stem>.<profile>.toml` and `ORB_*` env vars on top.
pub(crate) fn load_config(path: &str, profile: Option<&str>) -> Result<AppConfig> {
    match profile {
        Some(profile) => ConfigLoader::load_with_profile(path, profile),
        None => ConfigLoader::load(path),
    }
}
