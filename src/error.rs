use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobLensError {
    #[error("API request failed: {0}")]
    Api(String),

    #[error("API returned status {status} after {retries} retries")]
    ApiErrorAfterRetries { status: u16, retries: u32 },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Missing input: {0}")]
    Input(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, JobLensError>;
