use thiserror::Error;

use crate::core::types::Phase;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("No game in progress")]
    NoGame,

    #[error("Invalid phase for this request: {0:?}")]
    InvalidPhase(Phase),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Another phase advance is already in flight")]
    Busy,

    #[error("Unknown map type: {0}")]
    UnknownMap(String),

    #[error("Oracle error: {0}")]
    OracleError(String),

    #[error("Invalid config: {0}")]
    ConfigError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl GridError {
    /// HTTP-style status code for the boundary layer.
    pub fn status(&self) -> u16 {
        match self {
            GridError::NoGame => 404,
            GridError::InvalidPhase(_) | GridError::Busy => 409,
            GridError::MissingField(_)
            | GridError::BadRequest(_)
            | GridError::UnknownMap(_)
            | GridError::ConfigError(_)
            | GridError::SerdeError(_)
            | GridError::TomlError(_) => 400,
            GridError::OracleError(_) | GridError::HttpError(_) => 502,
            GridError::IoError(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, GridError>;
