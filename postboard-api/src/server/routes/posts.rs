use crate::server::{
    Result, ServerError, ServerRouter,
    json::{Json, Query},
    session::Session,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use postboard_common::model::{
    Id,
    post::{Post, PostContent, PostIdQuery, PostMarker, PostUpdate},
};
use postboard_db::store::PostStore;
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_posts)
        .typed_get(get_post_by_id)
        .typed_post(create_post)
        .typed_put(update_post)
        .typed_delete(delete_post)
}

#[derive(TypedPath)]
#[typed_path("/api/getPosts")]
pub(super) struct GetPostsPath;

async fn get_posts(
    _: GetPostsPath,
    State(posts): State<Arc<dyn PostStore>>,
) -> Result<Json<Vec<Post>>> {
    Ok(Json(posts.fetch_posts().await?))
}

#[derive(TypedPath)]
#[typed_path("/api/getPostsById")]
pub(super) struct GetPostByIdPath;

async fn get_post_by_id(
    _: GetPostByIdPath,
    State(posts): State<Arc<dyn PostStore>>,
    Query(PostIdQuery { id }): Query<PostIdQuery>,
) -> Result<Json<Post>> {
    let post = posts
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

#[derive(TypedPath)]
#[typed_path("/api/createPost")]
pub(super) struct CreatePostPath;

async fn create_post(
    _: CreatePostPath,
    State(posts): State<Arc<dyn PostStore>>,
    session: Session,
    Json(content): Json<PostContent>,
) -> Result<(StatusCode, Json<Post>)> {
    let post = posts.create_post(session.email(), &content).await?;

    info!(id = %post.id, owner = %post.owner, "Created post");
    Ok((StatusCode::CREATED, Json(post)))
}

#[derive(TypedPath)]
#[typed_path("/api/updatePostsById")]
pub(super) struct UpdatePostPath;

async fn update_post(
    _: UpdatePostPath,
    State(posts): State<Arc<dyn PostStore>>,
    session: Session,
    Query(PostIdQuery { id }): Query<PostIdQuery>,
    Json(update): Json<PostUpdate>,
) -> Result<Json<Post>> {
    let Some(post) = posts.update_post(id, session.email(), &update).await? else {
        return Err(missing_or_foreign(posts.as_ref(), id).await);
    };

    info!(%id, owner = %post.owner, "Updated post");
    Ok(Json(post))
}

#[derive(TypedPath)]
#[typed_path("/api/deletePostsById")]
pub(super) struct DeletePostPath;

async fn delete_post(
    _: DeletePostPath,
    State(posts): State<Arc<dyn PostStore>>,
    session: Session,
    Query(PostIdQuery { id }): Query<PostIdQuery>,
) -> Result<Json<Post>> {
    let Some(post) = posts.delete_post(id, session.email()).await? else {
        return Err(missing_or_foreign(posts.as_ref(), id).await);
    };

    info!(%id, owner = %post.owner, "Deleted post");
    Ok(Json(post))
}

/// Explains why an owner-scoped mutation touched nothing: 404 for a missing
/// post, 403 for one owned by somebody else.
async fn missing_or_foreign(posts: &dyn PostStore, id: Id<PostMarker>) -> ServerError {
    match posts.fetch_post_owner(id).await {
        Ok(Some(_)) => ServerError::NotPostOwner(id),
        Ok(None) => ServerError::PostByIdNotFound(id),
        Err(err) => err.into(),
    }
}
