//! Configuration loading for linkhound.
//!
//! TOML file + environment merging via figment, structural validation,
//! and wiring into `linkhound_core::ConfigHandle` so `update()` re-reads
//! the same sources. The domain types themselves live in
//! `linkhound_core::config`; this crate only knows how to produce them.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use thiserror::Error;

use linkhound_core::{ConfigHandle, CoreError, DiscoveryConfig};

/// Environment prefix: `LINKHOUND_SCHEDULER__SNMP_COMMUNITY` overrides
/// `[scheduler] snmp_community`, and so on.
const ENV_PREFIX: &str = "LINKHOUND_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("invalid configuration: {message}")]
    Validation { message: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<CoreError> for ConfigError {
    fn from(err: CoreError) -> Self {
        Self::Validation {
            message: err.to_string(),
        }
    }
}

// ── Loading ─────────────────────────────────────────────────────────

fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(DiscoveryConfig::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load and validate a `DiscoveryConfig` from a TOML file plus
/// `LINKHOUND_*` environment overrides. A missing file yields the
/// defaults (figment treats it as an empty provider).
pub fn load_file(path: &Path) -> Result<DiscoveryConfig, ConfigError> {
    let config: DiscoveryConfig = figment_for(path).extract()?;
    config.validate()?;
    Ok(config)
}

/// Load and validate from a TOML string (tests, embedded defaults).
pub fn load_str(toml_str: &str) -> Result<DiscoveryConfig, ConfigError> {
    let config: DiscoveryConfig = Figment::new()
        .merge(Serialized::defaults(DiscoveryConfig::default()))
        .merge(Toml::string(toml_str))
        .extract()?;
    config.validate()?;
    Ok(config)
}

/// Build a [`ConfigHandle`] whose `update()` re-reads `path` (and the
/// environment), so configuration edits land on the next discovery run.
pub fn reloadable(path: PathBuf) -> Result<ConfigHandle, ConfigError> {
    let initial = load_file(&path)?;
    Ok(ConfigHandle::with_loader(
        initial,
        Box::new(move || {
            load_file(&path).map_err(|e| CoreError::Config {
                message: e.to_string(),
            })
        }),
    ))
}

// ── Saving ──────────────────────────────────────────────────────────

/// Serialize a config to pretty TOML at `path`.
pub fn save_file(config: &DiscoveryConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(config)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}
