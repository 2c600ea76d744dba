use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    #[error(
        "Resource file not found. Looked in:\n\
        - current directory: settle.local.kdl, .settle.local.kdl, settle.kdl, .settle.kdl\n\
        - ./.settleflow/ directory\n\
        - ~/.config/settleflow/settle.kdl\n\
        Set SETTLE_CONFIG_PATH to point at a file directly"
    )]
    SettleFileNotFound,

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid settings file {path}: {message}")]
    InvalidSettings { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
