use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiErrorKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Encode,
    Decode,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::InvalidUrl => write!(f, "invalid url"),
            ApiErrorKind::HttpStatus(code) => write!(f, "http status {code}"),
            ApiErrorKind::Timeout => write!(f, "timeout"),
            ApiErrorKind::Network => write!(f, "network error"),
            ApiErrorKind::Encode => write!(f, "request encoding error"),
            ApiErrorKind::Decode => write!(f, "response decoding error"),
        }
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(ApiErrorKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return ApiError::new(ApiErrorKind::InvalidUrl, err.to_string());
    }
    ApiError::new(ApiErrorKind::Network, err.to_string())
}
