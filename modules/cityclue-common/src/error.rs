use thiserror::Error;

#[derive(Error, Debug)]
pub enum CityClueError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("State codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
