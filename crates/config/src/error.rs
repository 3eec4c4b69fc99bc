// SPDX-License-Identifier: MIT
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("unsupported config file extension: {0:?}")]
    UnsupportedExtension(Option<String>),
    #[error("invalid toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid .dev.vars file: {0}")]
    DevVars(String),
    #[error("unknown environment {0:?}")]
    UnknownEnvironment(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
