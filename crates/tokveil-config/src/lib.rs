//! Configuration for the tokveil proxy.
//!
//! Provides TOML-based configuration with:
//! - Config file layering (XDG user config + project-local overrides)
//! - CLI / environment overrides applied last
//! - Startup validation, including the empty allow-list check

pub mod discovery;
pub mod error;
pub mod list;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, load_config, load_config_file, xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use list::split_list;
pub use types::*;
