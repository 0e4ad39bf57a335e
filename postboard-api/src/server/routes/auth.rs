use crate::server::{
    Result, ServerError, ServerRouter, ServerState, json::Json, session::start_session,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::{
    extract::CookieJar,
    routing::{RouterExt, TypedPath},
};
use postboard_common::{
    auth::password::{HashedPassword, Hasher, Password},
    model::user::{CreateUser, Credentials, RegisterUser, UserProfile},
};
use std::sync::Arc;
use tokio::task;
use tracing::{info, warn};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(check_token)
        .typed_post(register)
        .typed_post(authenticate)
}

#[derive(TypedPath)]
#[typed_path("/checkToken")]
pub(super) struct CheckTokenPath;

/// Only reachable through the session gate, so getting here means the token is good.
async fn check_token(_: CheckTokenPath) -> StatusCode {
    StatusCode::OK
}

#[derive(TypedPath)]
#[typed_path("/api/register")]
pub(super) struct RegisterPath;

async fn register(
    _: RegisterPath,
    State(state): State<ServerState>,
    jar: CookieJar,
    Json(registration): Json<RegisterUser>,
) -> Result<(CookieJar, Json<UserProfile>)> {
    let password = hash_password(Arc::clone(&state.hasher), registration.password).await?;

    let user = state
        .users
        .create_user(&CreateUser {
            email: registration.email,
            password,
            name: registration.name,
            image: registration.image,
        })
        .await
        .map_err(ServerError::Registration)?;

    info!(email = %user.email, "Registered user");

    let jar = start_session(jar, &state, &user.email)?;
    Ok((jar, Json(user.into())))
}

#[derive(TypedPath)]
#[typed_path("/api/authenticate")]
pub(super) struct AuthenticatePath;

async fn authenticate(
    _: AuthenticatePath,
    State(state): State<ServerState>,
    jar: CookieJar,
    Json(credentials): Json<Credentials>,
) -> Result<(CookieJar, StatusCode)> {
    let Some(user) = state.users.fetch_user(&credentials.email).await? else {
        warn!(email = %credentials.email, "Authentication for unknown email");
        return Err(ServerError::IncorrectEmail);
    };

    let matches = verify_password(
        Arc::clone(&state.hasher),
        credentials.password,
        user.password,
    )
    .await?;

    if !matches {
        warn!(email = %user.email, "Authentication with incorrect password");
        return Err(ServerError::IncorrectPassword);
    }

    info!(email = %user.email, "Authenticated user");

    let jar = start_session(jar, &state, &user.email)?;
    Ok((jar, StatusCode::OK))
}

async fn hash_password(hasher: Arc<dyn Hasher>, password: Password) -> Result<HashedPassword> {
    let hashed = task::spawn_blocking(move || hasher.hash(&password)).await??;
    Ok(hashed)
}

async fn verify_password(
    hasher: Arc<dyn Hasher>,
    password: Password,
    hash: HashedPassword,
) -> Result<bool> {
    let matches = task::spawn_blocking(move || hasher.verify(&password, &hash)).await??;
    Ok(matches)
}
