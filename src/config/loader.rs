use crate::config::Config;
use crate::utils::warn;
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const CONFIG_ENV: &str = "POSH_LINE_CONFIG";
pub const SEGMENT_TIMEOUT_ENV: &str = "POSH_LINE_SEGMENT_TIMEOUT_MS";

/// Load configuration with priority: CLI args > Env vars > Config files > Defaults
pub async fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let mut config = match config_path {
        Some(path) => load_config_file(&path).await?,
        None => load_config_from_default_locations().await,
    };

    apply_env_overrides(&mut config);

    Ok(config)
}

/// Like [`load_config`], but an unusable file only costs a warning.
pub async fn load_config_or_default(config_path: Option<PathBuf>) -> Config {
    match load_config(config_path).await {
        Ok(config) => config,
        Err(e) => {
            warn(&format!("{:#}; using the built-in configuration", e));
            let mut config = Config::default();
            apply_env_overrides(&mut config);
            config
        }
    }
}

async fn load_config_from_default_locations() -> Config {
    for path in get_config_search_paths() {
        if !path.exists() {
            continue;
        }
        match load_config_file(&path).await {
            Ok(config) => return config,
            Err(e) => warn(&format!("Failed to load config from {}: {:#}", path.display(), e)),
        }
    }

    Config::default()
}

/// Get list of paths to search for configuration files
pub fn get_config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(path) = env::var_os(CONFIG_ENV).filter(|path| !path.is_empty()) {
        paths.push(PathBuf::from(path));
    }

    paths.push(PathBuf::from(".posh-line.json"));

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".config").join("posh-line").join("config.json"));
    }

    paths
}

pub async fn load_config_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(timeout) = env::var(SEGMENT_TIMEOUT_ENV) {
        match timeout.trim().parse::<u64>() {
            Ok(ms) => config.segment_timeout_ms = ms,
            Err(_) => warn(&format!("Ignoring {}={}: not a number of milliseconds", SEGMENT_TIMEOUT_ENV, timeout)),
        }
    }
}
