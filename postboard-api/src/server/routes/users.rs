use crate::server::{Result, ServerError, ServerRouter, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use postboard_common::model::user::{UserLookup, UserProfile};
use postboard_db::store::UserStore;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_post(get_user)
}

#[derive(TypedPath)]
#[typed_path("/api/getUser")]
pub(super) struct GetUserPath;

async fn get_user(
    _: GetUserPath,
    State(users): State<Arc<dyn UserStore>>,
    Json(UserLookup { email }): Json<UserLookup>,
) -> Result<Json<UserProfile>> {
    let user = users
        .fetch_user(&email)
        .await?
        .ok_or(ServerError::UserByEmailNotFound(email))?;

    Ok(Json(user.into()))
}
