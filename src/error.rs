use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("The requested URL is invalid: {0}")]
    InvalidRequest(String),

    #[error("Unable to decode the server response: {0}")]
    DecodingFailed(String),

    #[error("Server returned status code {0}.")]
    HttpStatus(u16),

    #[error("Network request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ApiError::DecodingFailed(err.to_string());
        }
        if err.is_builder() {
            return ApiError::InvalidRequest(err.to_string());
        }
        if let Some(status) = err.status() {
            return ApiError::HttpStatus(status.as_u16());
        }
        ApiError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::DecodingFailed(err.to_string())
    }
}
