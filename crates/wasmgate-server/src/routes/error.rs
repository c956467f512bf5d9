use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use wasmgate::ErrorKind;

use crate::modules::ResolveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidRequest,
    NotFound,
    BadModule,
    GuestFailure,
    Timeout,
    Cancelled,
    Internal,
}

#[derive(Debug)]
pub struct HttpApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl HttpApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    pub const fn status(&self) -> StatusCode {
        match self.code {
            ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::BadModule => StatusCode::BAD_GATEWAY,
            ErrorCode::GuestFailure | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for HttpApiError {
    fn into_response(self) -> Response {
        (self.status(), self.message).into_response()
    }
}

impl From<ResolveError> for HttpApiError {
    fn from(err: ResolveError) -> Self {
        let code = match err {
            ResolveError::InvalidName(_) => ErrorCode::InvalidRequest,
            ResolveError::NotFound(_) => ErrorCode::NotFound,
            ResolveError::Io { .. } => ErrorCode::Internal,
        };
        Self::new(code, err.to_string())
    }
}

impl From<wasmgate::Error> for HttpApiError {
    fn from(err: wasmgate::Error) -> Self {
        let code = match err.kind() {
            ErrorKind::MalformedModule => ErrorCode::BadModule,
            ErrorKind::Instantiation => ErrorCode::GuestFailure,
            ErrorKind::Timeout => ErrorCode::Timeout,
            ErrorKind::Cancelled => ErrorCode::Cancelled,
        };
        Self::new(code, err.to_string())
    }
}

impl std::fmt::Display for HttpApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for HttpApiError {}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, time::Duration};

    use super::*;

    #[test]
    fn resolution_failures_map_to_client_statuses() {
        let not_found = HttpApiError::from(ResolveError::NotFound(PathBuf::from("m/x.wasm")));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.message, "unable to find module m/x.wasm");

        let invalid = HttpApiError::from(ResolveError::InvalidName("..".into()));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn engine_failures_map_by_kind() {
        let cases = [
            (
                wasmgate::Error::ModuleTooLarge { size: 2, limit: 1 },
                StatusCode::BAD_GATEWAY,
            ),
            (wasmgate::Error::Exit(1), StatusCode::INTERNAL_SERVER_ERROR),
            (
                wasmgate::Error::Timeout(Duration::from_secs(1)),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (wasmgate::Error::Cancelled, StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(HttpApiError::from(err).status(), status);
        }
    }
}
