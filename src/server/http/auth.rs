//! HTTP Basic authentication.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use tracing::{debug, error};

use super::AppState;
use crate::access::Caller;

/// Realm announced in `WWW-Authenticate`.
pub const REALM: &str = "helpdesk";

/// Caller resolved from the request's credentials.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Caller);

/// Why a request could not be authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No usable `Authorization: Basic` header.
    MissingCredentials,
    /// The directory refused the credentials.
    InvalidCredentials,
    /// The directory could not be consulted.
    DirectoryUnavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::MissingCredentials | Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, format!("Basic realm=\"{REALM}\""))],
                "authentication required",
            )
                .into_response(),
            Self::DirectoryUnavailable => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}

/// Decode `Authorization: Basic base64(user:password)`.
pub(super) fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (user, password) = text.split_once(':')?;
    if user.is_empty() {
        return None;
    }
    Some((user.to_owned(), password.to_owned()))
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let (user, password) =
            basic_credentials(&parts.headers).ok_or(AuthRejection::MissingCredentials)?;
        match state.directory.authenticate(&user, &password).await {
            Ok(Some(caller)) => Ok(Self(caller)),
            Ok(None) => {
                debug!(user = %user, "rejected credentials");
                Err(AuthRejection::InvalidCredentials)
            }
            Err(err) => {
                error!(error = %err, "directory lookup failed");
                Err(AuthRejection::DirectoryUnavailable)
            }
        }
    }
}
