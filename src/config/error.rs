use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("required config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to parse inline config: {0}")]
    InlineParseError(#[source] toml::de::Error),

    #[error("failed to deserialize config: {0}")]
    DeserializeError(#[from] toml::de::Error),

    #[error("environment separator for prefix '{0}' must not be empty")]
    EmptyEnvSeparator(String),

    #[error("config sub-section not found: {0}")]
    SubSectionNotFound(String),

    #[error("config sub-section is not a table: {0}")]
    NotATable(String),

    #[error("reload interval must be greater than zero")]
    ZeroReloadInterval,

    #[error("failed to start config watcher: {0}")]
    Watch(#[source] std::io::Error),
}
