use legitrack_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[cfg(feature = "http")]
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Other(String),
}
