use crate::server::{Result, ServerError, ServerState, policy::SESSION_COOKIE};
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use postboard_common::model::user::Email;

/// The verified session attached by the session gate.
///
/// Extracting it in a handler whose route is not gated is a 401, never a
/// silent pass.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Session {
    email: Email,
}

impl Session {
    #[must_use]
    pub fn new(email: Email) -> Self {
        Self { email }
    }

    #[must_use]
    pub fn email(&self) -> &Email {
        &self.email
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(ServerError::MissingSessionToken)
    }
}

/// Issues a session token for `email` and adds it to the jar as the
/// HTTP-only session cookie.
pub fn start_session(jar: CookieJar, state: &ServerState, email: &Email) -> Result<CookieJar> {
    let token = state
        .tokens
        .issue(email)
        .map_err(ServerError::IssueSessionToken)?;

    let cookie = Cookie::build((SESSION_COOKIE, token.into_inner()))
        .http_only(true)
        .secure(state.config.cookie_secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(state.config.session_lifetime.get());

    Ok(jar.add(cookie))
}
