use thiserror::Error;

#[derive(Error, Debug)]
pub enum PainpointError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No reviews could be fetched for '{0}'")]
    NoData(String),

    #[error("Could not find review text column in {available:?}")]
    NoTextColumn { available: Vec<String> },

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
