use thiserror::Error;

/// Failures while turning an HTTP request into [`RequestParts`](crate::pipeline::RequestParts)
///
/// These surface through the pipeline's exception envelope, so clients see
/// the configured exception message with status 400 whatever the cause.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("payload invalid: {0}")]
    InvalidPayload(String),
    #[error("payload too large: limit is {0} bytes")]
    PayloadTooLarge(usize),
    #[error("unsupported content type: {0}")]
    UnsupportedMediaType(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        ApiError::InvalidPayload(value.to_string())
    }
}
