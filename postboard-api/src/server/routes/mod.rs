use crate::server::{
    ServerRouter,
    policy::{Access, RoutePolicy},
};
use axum::{Router, http::Method};
use axum_extra::routing::TypedPath;

mod auth;
mod posts;
mod users;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(auth::routes())
        .merge(users::routes())
        .merge(posts::routes())
}

/// Access policy of every API route. The session gate denies anything that
/// is routed but missing here.
pub const ROUTE_POLICIES: &[RoutePolicy] = &[
    RoutePolicy {
        method: Method::GET,
        path: auth::CheckTokenPath::PATH,
        access: Access::Session,
    },
    RoutePolicy {
        method: Method::POST,
        path: auth::RegisterPath::PATH,
        access: Access::Public,
    },
    RoutePolicy {
        method: Method::POST,
        path: auth::AuthenticatePath::PATH,
        access: Access::Public,
    },
    RoutePolicy {
        method: Method::POST,
        path: users::GetUserPath::PATH,
        access: Access::Session,
    },
    RoutePolicy {
        method: Method::GET,
        path: posts::GetPostsPath::PATH,
        access: Access::Session,
    },
    RoutePolicy {
        method: Method::GET,
        path: posts::GetPostByIdPath::PATH,
        access: Access::Public,
    },
    RoutePolicy {
        method: Method::POST,
        path: posts::CreatePostPath::PATH,
        access: Access::Session,
    },
    RoutePolicy {
        method: Method::PUT,
        path: posts::UpdatePostPath::PATH,
        access: Access::Session,
    },
    RoutePolicy {
        method: Method::DELETE,
        path: posts::DeletePostPath::PATH,
        access: Access::Session,
    },
];
