use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("home directory not found")]
    ConfigDirNotFound,

    #[error(
        "config file not found. Looked in:\n\
        - ./config.yaml, ./config/config.yaml\n\
        - ~/.aplcli/config.yaml\n\
        Pass --config or set APLCTL_CONFIG to use another path"
    )]
    ConfigFileNotFound,

    #[error("config file does not exist: {0}")]
    ExplicitPathNotFound(PathBuf),

    #[error("platform \"{0}\" not found in config")]
    PlatformNotFound(String),

    #[error("pulumiOrg is not set in config")]
    MissingPulumiOrg,

    #[error("YAML error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
