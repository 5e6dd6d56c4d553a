//! CLI error types with miette diagnostics.

use miette::Diagnostic;
use thiserror::Error;

use casparlink_config::ConfigError;
use casparlink_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const STORAGE: i32 = 4;
    pub const NETWORK: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(
        code(casparlink::validation),
        help("Fix the value in the config file, or override it with CASPARLINK_* variables.")
    )]
    Validation { field: String, reason: String },

    #[error("Could not load configuration")]
    #[diagnostic(
        code(casparlink::config),
        help("Run: casparlink config path   to see which file is read")
    )]
    Config(#[source] ConfigError),

    #[error("Config file already exists at {path}")]
    #[diagnostic(
        code(casparlink::config_exists),
        help("Use --force (-f) to overwrite it.")
    )]
    ConfigExists { path: String },

    // ── Routing store ────────────────────────────────────────────────

    #[error("Routing config is unusable: {message}")]
    #[diagnostic(
        code(casparlink::storage),
        help(
            "Check the file's permissions and JSON syntax, point store.path elsewhere,\n\
             or start with --ephemeral to keep inputs and outputs in memory."
        )
    )]
    Storage { message: String },

    // ── Network ──────────────────────────────────────────────────────

    #[error("Could not listen on {addr}")]
    #[diagnostic(
        code(casparlink::bind),
        help("Is another process using the port? Try: casparlink serve --bind 127.0.0.1:3001")
    )]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // ── Other ────────────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(casparlink::core))]
    Core(CoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } | Self::Config(_) => exit_code::CONFIG,
            Self::ConfigExists { .. } => exit_code::USAGE,
            Self::Storage { .. } => exit_code::STORAGE,
            Self::Bind { .. } => exit_code::NETWORK,
            Self::Core(_) | Self::Io(_) => exit_code::GENERAL,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Storage { message } => Self::Storage { message },
            other => Self::Core(other),
        }
    }
}
