use sentinel_core::{BootstrapError, ConfigError, PredictionError};

/// Errors surfaced by the command-line front end
#[derive(Debug)]
pub enum CliError {
    Config(ConfigError),
    Io(std::io::Error),
    /// Request body could not be parsed
    Input(String),
    Prediction(PredictionError),
    Bootstrap(BootstrapError),
    /// A shard worker could not be started or died mid-batch
    Worker(String),
    Output(serde_json::Error),
    Metrics(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "{}", e),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Input(e) => write!(f, "Invalid request: {}", e),
            Self::Prediction(e) => write!(f, "{}", e),
            Self::Bootstrap(e) => write!(f, "{}", e),
            Self::Worker(e) => write!(f, "Worker failure: {}", e),
            Self::Output(e) => write!(f, "Cannot encode response: {}", e),
            Self::Metrics(e) => write!(f, "Cannot export metrics: {}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<PredictionError> for CliError {
    fn from(e: PredictionError) -> Self {
        Self::Prediction(e)
    }
}

impl From<BootstrapError> for CliError {
    fn from(e: BootstrapError) -> Self {
        Self::Bootstrap(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::Output(e)
    }
}
