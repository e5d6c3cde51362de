//! Error types for the authentication service
//!
//! Every failure is terminal for the request and is rendered as a JSON body
//! of the form `{"error": "<code>", "message": "<text>"}`.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

/// Authentication and session errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    /// HTTP method not accepted on this endpoint
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// A required request field is absent or empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// The request body could not be parsed
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    /// Password exceeds what bcrypt can hash without truncation
    #[error("Password must be at most 72 bytes")]
    PasswordTooLong,

    /// Username is already registered
    #[error("A user with that username already exists")]
    DuplicateUser,

    /// Unknown user or wrong password
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Token is unknown, revoked or expired
    #[error("Invalid token")]
    InvalidToken,

    /// Authorization header absent or malformed
    #[error("Authentication credentials were not provided")]
    Unauthenticated,

    /// Unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable code used in the response body
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MethodNotAllowed => "method_not_allowed",
            AuthError::MissingField(_) => "missing_field",
            AuthError::MalformedBody(_) => "malformed_body",
            AuthError::PasswordTooLong => "password_too_long",
            AuthError::DuplicateUser => "duplicate_user",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::InvalidToken => "invalid_token",
            AuthError::Unauthenticated => "unauthenticated",
            AuthError::Internal(_) => "internal",
        }
    }

    /// Re-tag a token failure raised by the access guard.
    ///
    /// `InvalidToken` is a 400 when it comes from a request body (refresh) but a
    /// 401 when it comes from the `Authorization` header.
    pub fn into_guard_error(self) -> GuardError {
        GuardError(self)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

fn json_error(err: &AuthError, status: StatusCode) -> HttpResponse {
    HttpResponse::build(status).json(ErrorBody {
        error: err.code(),
        message: err.to_string(),
    })
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::MissingField(_)
            | AuthError::MalformedBody(_)
            | AuthError::PasswordTooLong
            | AuthError::DuplicateUser
            | AuthError::InvalidCredentials
            | AuthError::InvalidToken => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        json_error(self, self.status_code())
    }
}

/// An [`AuthError`] raised while checking the `Authorization` header.
///
/// Token failures here always answer 401.
#[derive(Debug, Error, Clone, PartialEq)]
#[error(transparent)]
pub struct GuardError(pub AuthError);

impl ResponseError for GuardError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            AuthError::InvalidToken | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ref other => other.status_code(),
        }
    }

    fn error_response(&self) -> HttpResponse {
        json_error(&self.0, self.status_code())
    }
}

impl From<actix_web::error::BlockingError> for AuthError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<bcrypt::BcryptError> for AuthError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AuthError::Internal(err.to_string())
    }
}
