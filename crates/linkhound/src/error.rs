use std::path::PathBuf;

use thiserror::Error;

/// CLI-level errors with process exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] linkhound_config::ConfigError),

    #[error("invalid inventory {path}: {reason}")]
    Inventory { path: PathBuf, reason: String },

    #[error(transparent)]
    Snmp(#[from] linkhound_snmp::SnmpError),

    #[error(transparent)]
    Core(#[from] linkhound_core::CoreError),

    #[error("discovery failed for package {package}")]
    DiscoveryFailed { package: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        1
    }
}
