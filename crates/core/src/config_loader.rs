use crate::config::AppConfig;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from a TOML file, overridden by `ORB_*` environment variables.
    ///
    /// Nested keys use `__`, e.g. `ORB_STRATEGY__LOT_SIZE=25`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<AppConfig> {
        Self::figment(path, None)
            .extract()
            .with_context(|| format!("Failed to load config from {path}"))
    }

    /// Loads configuration with a profile overlay (`Orb.toml` + `Orb.<profile>.toml`).
    ///
    /// # Errors
    ///
    /// Returns an error if the files cannot be read or parsed.
    pub fn load_with_profile(path: &str, profile: &str) -> Result<AppConfig> {
        Self::figment(path, Some(profile))
            .extract()
            .with_context(|| format!("Failed to load config from {path} (profile {profile})"))
    }

    fn figment(path: &str, profile: Option<&str>) -> Figment {
        let mut figment = Figment::new().merge(Toml::file(path));
        if let Some(profile) = profile {
            figment = figment.merge(Toml::file(profile_path(path, profile)));
        }
        figment.merge(Env::prefixed("ORB_").split("__"))
    }
}

fn profile_path(path: &str, profile: &str) -> String {
    let path = Path::new(path);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Orb");
    let file = format!("{stem}.{profile}.toml");
    path.with_file_name(file).to_string_lossy().into_owned()
}
