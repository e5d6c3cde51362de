//! Access guard for protected resources.
//!
//! Credentials arrive as `Authorization: Token <t>` (or `Bearer <t>`). The
//! header is parsed by the [`SessionToken`] scheme, extracted as
//! [`TokenAuth`], and checked against the session registry by [`validator`],
//! which `HttpAuthentication::with_fn` runs in front of guarded resources.

use std::fmt;
use std::future::{ready, Ready};

use actix_web::dev::{Payload, ServiceRequest};
use actix_web::http::header::{Header, HeaderValue, InvalidHeaderValue, TryIntoHeaderValue};
use actix_web::{web, Error, FromRequest, HttpMessage, HttpRequest};
use actix_web_httpauth::headers::authorization::{Authorization, ParseError, Scheme};
use tracing::debug;

use crate::error::{AuthError, GuardError};
use crate::service::TokenService;

const SCHEMES: [&str; 2] = ["Token", "Bearer"];

/// Credentials of the `Token` authorization scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    token: String,
}

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Scheme for SessionToken {
    fn parse(header: &HeaderValue) -> Result<Self, ParseError> {
        let value = header.to_str().map_err(ParseError::ToStrError)?;
        let value = value.trim_start();
        let (scheme, rest) = value.split_once(' ').unwrap_or((value.trim_end(), ""));

        if !SCHEMES.iter().any(|s| s.eq_ignore_ascii_case(scheme)) {
            return Err(ParseError::MissingScheme);
        }

        let token = rest.trim();
        if token.is_empty() {
            return Err(ParseError::MissingField("token"));
        }
        if token.contains(char::is_whitespace) {
            return Err(ParseError::Invalid);
        }

        Ok(SessionToken::new(token))
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token {}", self.token)
    }
}

impl TryIntoHeaderValue for SessionToken {
    type Error = InvalidHeaderValue;

    fn try_into_value(self) -> Result<HeaderValue, Self::Error> {
        HeaderValue::from_str(&self.to_string())
    }
}

/// Extractor for the presented session token.
///
/// Fails with `Unauthenticated` when the header is absent or malformed.
#[derive(Debug, Clone)]
pub struct TokenAuth(SessionToken);

impl TokenAuth {
    pub fn token(&self) -> &str {
        self.0.token()
    }
}

impl FromRequest for TokenAuth {
    type Error = GuardError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            Authorization::<SessionToken>::parse(req)
                .map(|auth| TokenAuth(auth.into_scheme()))
                .map_err(|err| {
                    debug!(error = %err, "Rejected missing or malformed authorization header");
                    AuthError::Unauthenticated.into_guard_error()
                }),
        )
    }
}

/// Check the token against the registry and attach the resulting
/// [`Identity`](crate::models::Identity) to the request.
pub async fn validator(
    req: ServiceRequest,
    credentials: TokenAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    let Some(service) = req.app_data::<web::Data<TokenService>>().cloned() else {
        let err = AuthError::Internal("token service is not configured".into());
        return Err((err.into_guard_error().into(), req));
    };

    match service.authorize(credentials.token()).await {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            Ok(req)
        }
        Err(err) => {
            debug!(path = %req.path(), "Rejected unknown or expired token");
            Err((err.into_guard_error().into(), req))
        }
    }
}
