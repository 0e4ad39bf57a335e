//! Route access policy and the session gate that enforces it.
//!
//! Which routes need a session is declared once, in
//! [`routes::ROUTE_POLICIES`](super::routes::ROUTE_POLICIES), instead of being
//! left to each handler.

use crate::server::{Result, ServerError, routes::ROUTE_POLICIES, session::Session};
use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use postboard_common::auth::token::TokenService;
use std::sync::Arc;
use tracing::{trace, warn};

pub const SESSION_COOKIE: &str = "token";

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Access {
    Public,
    Session,
}

#[derive(Clone, Debug)]
pub struct RoutePolicy {
    pub method: Method,
    pub path: &'static str,
    pub access: Access,
}

/// Routes without a declared policy require a session. `HEAD` is answered by
/// the `GET` handler, so it shares the `GET` policy.
pub fn access_for(method: &Method, path: &str) -> Access {
    let lookup = if *method == Method::HEAD {
        Method::GET
    } else {
        method.clone()
    };

    ROUTE_POLICIES
        .iter()
        .find(|policy| policy.method == lookup && policy.path == path)
        .map_or_else(
            || {
                warn!(%method, path, "Route has no declared access policy");
                Access::Session
            },
            |policy| policy.access,
        )
}

pub async fn session_gate(
    State(tokens): State<Arc<dyn TokenService>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let access = access_for(request.method(), request.uri().path());
    trace!(?access, uri = %request.uri(), "Checking route access");

    if access == Access::Session {
        let token = jar
            .get(SESSION_COOKIE)
            .ok_or(ServerError::MissingSessionToken)?;

        let claims = tokens
            .verify(token.value())
            .map_err(ServerError::InvalidSessionToken)?;

        request.extensions_mut().insert(Session::new(claims.email));
    }

    Ok(next.run(request).await)
}
