use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use presence::data::MessageResponse;
use presence::errors::SessionError;
use presence::log;

use super::body::PayloadRejection;

pub const INVALID_BODY: &str = "El cuerpo de la petición no es válido";
pub const INTERNAL_ERROR: &str = "Error interno del servidor";

/// A failed request: a status code and the message shown to the client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Maps a registry error onto a response. Validation and not-found
    /// failures use `message`; internal failures get a generic one and their
    /// detail only goes to the log.
    pub fn from_session(err: SessionError, message: &str) -> Self {
        match err {
            SessionError::Validation(detail) => {
                log::debug!("Rejected request: {}", detail);
                Self::new(StatusCode::BAD_REQUEST, message)
            }
            SessionError::NotFound(detail) => {
                log::debug!("Lookup missed: {}", detail);
                Self::not_found(message)
            }
            SessionError::Internal(detail) => {
                log::error!("Internal error: {}", detail);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
            }
        }
    }

    /// A body that could not be read carries no session id, so routes keyed
    /// by one answer as if it were missing.
    pub fn unreadable_session_body(rejection: PayloadRejection, message: &str) -> Self {
        log::debug!("Rejected body: {}", rejection.body_text());
        Self::not_found(message)
    }
}

impl From<PayloadRejection> for ApiError {
    fn from(rejection: PayloadRejection) -> Self {
        log::debug!("Rejected body: {}", rejection.body_text());
        Self::new(StatusCode::BAD_REQUEST, INVALID_BODY)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(MessageResponse::new(self.message))).into_response()
    }
}
