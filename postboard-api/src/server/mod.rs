use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, QueryRejection},
    },
    handler::HandlerWithoutStateExt,
    http::{StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
};
use json::Json;
use postboard_common::{
    auth::{
        password::{Hasher, PasswordHashError},
        token::{TokenError, TokenService},
    },
    model::{Id, post::PostMarker, user::Email},
    util::PositiveDuration,
};
use postboard_db::store::{DbError, PostStore, UserStore};
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, path::PathBuf, sync::Arc};
use thiserror::Error;
use tokio::task::JoinError;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{debug, error};

mod json;
mod policy;
mod routes;
mod session;
#[cfg(test)]
mod tests;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub users: Arc<dyn UserStore>,
    pub posts: Arc<dyn PostStore>,
    pub hasher: Arc<dyn Hasher>,
    pub tokens: Arc<dyn TokenService>,
    pub config: Arc<ServerConfig>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ServerConfig {
    /// Lifetime of the session cookie. Should match the token service.
    pub session_lifetime: PositiveDuration,
    pub cookie_secure: bool,
    pub static_dir: PathBuf,
}

/// The full application: API routes behind the session gate, static files
/// for everything else.
pub fn app(state: ServerState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(fallback.into_service());

    routes::routes()
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            policy::session_gate,
        ))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("Query string rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("No session token was provided")]
    MissingSessionToken,
    #[error("Session token was invalid: {0}")]
    InvalidSessionToken(TokenError),
    #[error("Session token could not be issued: {0}")]
    IssueSessionToken(TokenError),
    #[error("No user with the provided email exists")]
    IncorrectEmail,
    #[error("The provided password did not match")]
    IncorrectPassword,
    #[error(transparent)]
    PasswordHash(#[from] PasswordHashError),
    #[error("Blocking task failed: {0}")]
    BlockingTask(#[from] JoinError),
    #[error("Registering user failed: {0}")]
    Registration(DbError),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("User with email {0} was not found.")]
    UserByEmailNotFound(Email),
    #[error("Post with id {0} belongs to another user.")]
    NotPostOwner(Id<PostMarker>),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::UserByEmailNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::JsonRejection(_) | ServerError::QueryRejection(_) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::MissingSessionToken
            | ServerError::InvalidSessionToken(_)
            | ServerError::IncorrectEmail
            | ServerError::IncorrectPassword => StatusCode::UNAUTHORIZED,
            ServerError::NotPostOwner(_) => StatusCode::FORBIDDEN,
            ServerError::JsonResponse(_)
            | ServerError::IssueSessionToken(_)
            | ServerError::PasswordHash(_)
            | ServerError::BlockingTask(_)
            | ServerError::Registration(_)
            | ServerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// What the client gets to see. Internal details stay in the logs.
    pub fn public_message(&self) -> Cow<'static, str> {
        match self {
            ServerError::UnknownRoute(_) => "Not found".into(),
            ServerError::JsonRejection(rejection) => rejection.body_text().into(),
            ServerError::QueryRejection(rejection) => rejection.body_text().into(),
            ServerError::MissingSessionToken => "Unauthorized: No token provided".into(),
            ServerError::InvalidSessionToken(_) => "Unauthorized: Invalid token".into(),
            ServerError::IncorrectEmail => "Incorrect email".into(),
            ServerError::IncorrectPassword => "Incorrect password".into(),
            ServerError::Registration(_) => "Error registering new user please try again.".into(),
            ServerError::PostByIdNotFound(_)
            | ServerError::UserByEmailNotFound(_)
            | ServerError::NotPostOwner(_) => self.to_string().into(),
            ServerError::JsonResponse(_)
            | ServerError::IssueSessionToken(_)
            | ServerError::PasswordHash(_)
            | ServerError::BlockingTask(_)
            | ServerError::Database(_) => "Internal error please try again".into(),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
    error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(error = %self, %status, "Replying with error");
        } else {
            debug!(error = %self, %status, "Replying with error");
        }

        let error_response = ErrorResponse {
            status: status.as_u16(),
            error: self.public_message().into_owned(),
        };
        (status, Json(error_response)).into_response()
    }
}
