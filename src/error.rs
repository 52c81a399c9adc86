// src/error.rs
use reqwest::StatusCode;
use thiserror::Error;

/// Why a call to the metadata provider produced nothing usable.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("upstream returned HTTP {0}")]
    Status(StatusCode),

    #[error("could not decode response: {0}")]
    Decode(#[source] reqwest::Error),
}

impl FetchError {
    /// Upstream said no (rate limit, unknown id, bad key) as opposed to the
    /// request never completing.
    pub fn is_status(&self) -> bool {
        matches!(self, FetchError::Status(_))
    }
}
