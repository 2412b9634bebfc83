use std::io;

use thiserror::Error;

use crate::compose::LaunchError;
use crate::readiness::ReadinessError;
use crate::runner::ExecutionError;
use crate::sonar::ApiError;
use crate::token_store::TokenError;

/// Application-wide error type for the sonarctl CLI.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Readiness(#[from] ReadinessError),

    #[error("Failed to launch editor: {0}")]
    Editor(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to write configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

impl AppError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        AppError::Config(msg.into())
    }
}
