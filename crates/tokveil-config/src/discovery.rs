//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/tokveil/config.toml` (XDG user config)
//! 2. `./tokveil.toml` (project-local)
//! 3. CLI arguments and environment (handled externally)

use std::path::{Path, PathBuf};

use crate::{ConfigError, Result, TokveilConfig};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "tokveil.toml";

/// Default config filename within XDG config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for XDG directory resolution.
const APP_NAME: &str = "tokveil";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "TOKVEIL_CONFIG_DIR";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Path to the config file.
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: TokveilConfig,
    /// Sources that were checked, in order of precedence (lowest first).
    pub sources: Vec<ConfigSource>,
}

impl LoadedConfig {
    /// Get paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Load configuration.
///
/// With an explicit path only that file is read and it must exist. Otherwise
/// the user config and `./tokveil.toml` are merged key by key, missing files
/// are skipped, and anything unset falls back to the built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let table = read_table(path)?;
        return Ok(LoadedConfig {
            config: into_config(table)?,
            sources: vec![ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            }],
        });
    }

    let mut candidates = Vec::new();
    if let Some(path) = xdg_config_path() {
        candidates.push(path);
    }
    candidates.push(PathBuf::from(PROJECT_CONFIG_FILE));

    load_layers(&candidates)
}

/// Load and merge the given files in order; later files win.
pub fn load_layers(paths: &[PathBuf]) -> Result<LoadedConfig> {
    let mut merged = toml::Table::new();
    let mut sources = Vec::new();

    for path in paths {
        if !path.is_file() {
            sources.push(ConfigSource {
                path: path.clone(),
                loaded: false,
            });
            continue;
        }

        merge_tables(&mut merged, read_table(path)?);
        sources.push(ConfigSource {
            path: path.clone(),
            loaded: true,
        });
    }

    Ok(LoadedConfig {
        config: into_config(merged)?,
        sources,
    })
}

/// Load config from a specific file path (no discovery, no layering).
pub fn load_config_file(path: &Path) -> Result<TokveilConfig> {
    into_config(read_table(path)?)
}

/// Get the XDG config file path for tokveil.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// Get the XDG config directory for tokveil.
///
/// Checks `TOKVEIL_CONFIG_DIR` env var first, then falls back to platform default.
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

fn read_table(path: &Path) -> Result<toml::Table> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(contents.parse::<toml::Table>()?)
}

fn into_config(table: toml::Table) -> Result<TokveilConfig> {
    Ok(toml::Value::Table(table).try_into()?)
}

/// Recursively merge `overlay` into `base`; tables merge, everything else replaces.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
