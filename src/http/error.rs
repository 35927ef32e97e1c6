//! Error bodies returned by the API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::ErrorKind;
use crate::exchange::ExchangeError;

/// `{kind, message, engine_initiated}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
    pub engine_initiated: bool,
}

#[derive(Debug)]
pub struct ApiError(pub ExchangeError);

impl From<ExchangeError> for ApiError {
    fn from(err: ExchangeError) -> Self {
        Self(err)
    }
}

/// HTTP status for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NoProviderAvailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::UserRejected => StatusCode::FORBIDDEN,
        ErrorKind::ConnectFailed | ErrorKind::ReadError | ErrorKind::SubmitError => {
            StatusCode::BAD_GATEWAY
        }
        ErrorKind::RevertedError => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::TimeoutError => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::InvalidAmount | ErrorKind::InsufficientBalance => StatusCode::BAD_REQUEST,
        ErrorKind::NotConnected => StatusCode::UNAUTHORIZED,
        ErrorKind::SessionInvalidated | ErrorKind::ExchangeInFlight => StatusCode::CONFLICT,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let body = ErrorBody {
            kind,
            message: self.0.to_string(),
            engine_initiated: kind.is_engine_initiated(),
        };
        (status_for(kind), Json(body)).into_response()
    }
}
