use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppStoreError>;

#[derive(Debug, Error)]
pub enum AppStoreError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Client configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for AppStoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppStoreError::Parse(err.to_string())
        } else {
            AppStoreError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppStoreError {
    fn from(err: serde_json::Error) -> Self {
        AppStoreError::Parse(err.to_string())
    }
}
