use crate::server::{
    ServerConfig, ServerState, app,
    policy::{Access, access_for},
    routes::ROUTE_POLICIES,
};
use argon2::Params;
use axum::{
    Router,
    body::Body,
    http::{
        Method, Request, Response, StatusCode,
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
    },
};
use http_body_util::BodyExt;
use postboard_common::{
    auth::{password::Argon2Hasher, token::JwtTokenService},
    model::user::Email,
    util::PositiveDuration,
};
use postboard_db::{
    memory::{MemoryPostStore, MemoryUserStore},
    store::UserStore,
};
use serde_json::{Value, json};
use std::{fs, path::PathBuf, sync::Arc};
use time::{Duration, UtcDateTime};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    users: Arc<MemoryUserStore>,
    tokens: Arc<JwtTokenService>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_settings(PathBuf::from("does-not-exist"), PositiveDuration::ONE_HOUR)
    }

    fn with_settings(static_dir: PathBuf, session_lifetime: PositiveDuration) -> Self {
        let users = Arc::new(MemoryUserStore::default());
        let tokens = Arc::new(JwtTokenService::new(b"test secret", session_lifetime));

        let state = ServerState {
            users: users.clone(),
            posts: Arc::new(MemoryPostStore::default()),
            hasher: Arc::new(Argon2Hasher::new(
                Params::new(Params::MIN_M_COST, 1, 1, None).unwrap(),
            )),
            tokens: tokens.clone(),
            config: Arc::new(ServerConfig {
                session_lifetime,
                cookie_secure: false,
                static_dir,
            }),
        };

        Self {
            router: app(state),
            users,
            tokens,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(COOKIE, format!("token={token}"));
        }

        let request = match body {
            Some(body) => request
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn register(&self, email: &str, password: &str, name: Option<&str>) -> String {
        let response = self
            .send(
                Method::POST,
                "/api/register",
                None,
                Some(json!({ "email": email, "password": password, "name": name })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        session_token(&response).unwrap()
    }

    async fn create_post(&self, token: &str, title: &str) -> Value {
        let response = self
            .send(
                Method::POST,
                "/api/createPost",
                Some(token),
                Some(json!({ "title": title, "description": "words" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        body_json(response).await
    }
}

fn session_token(response: &Response<Body>) -> Option<String> {
    let cookie = response.headers().get(SET_COOKIE)?.to_str().ok()?;
    let pair = cookie.split(';').next()?;
    pair.strip_prefix("token=").map(str::to_owned)
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn assert_error(response: Response<Body>, status: StatusCode, message: &str) {
    assert_eq!(response.status(), status);
    assert!(response.headers().get(SET_COOKIE).is_none());
    assert_eq!(
        body_json(response).await,
        json!({ "status": status.as_u16(), "error": message })
    );
}

fn email(email: &str) -> Email {
    Email::new(email.to_owned()).unwrap()
}

#[tokio::test]
async fn register_then_authenticate() {
    let app = TestApp::new();

    let response = app
        .send(
            Method::POST,
            "/api/register",
            None,
            Some(json!({ "email": "ada@example.com", "password": "hunter22", "name": "ada" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Max-Age=3600"));

    assert_eq!(
        body_json(response).await,
        json!({ "email": "ada@example.com", "name": "ada", "image": null })
    );

    let response = app
        .send(
            Method::POST,
            "/api/authenticate",
            None,
            Some(json!({ "email": "ada@example.com", "password": "hunter22" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = session_token(&response).unwrap();

    let response = app
        .send(Method::GET, "/checkToken", Some(&token), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn duplicate_registration_keeps_first_user() {
    let app = TestApp::new();
    app.register("ada@example.com", "first", Some("first"))
        .await;

    let response = app
        .send(
            Method::POST,
            "/api/register",
            None,
            Some(json!({ "email": "ada@example.com", "password": "second", "name": "second" })),
        )
        .await;
    assert_error(
        response,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Error registering new user please try again.",
    )
    .await;

    let stored = app
        .users
        .fetch_user(&email("ada@example.com"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.name.unwrap().get(), "first");

    let response = app
        .send(
            Method::POST,
            "/api/authenticate",
            None,
            Some(json!({ "email": "ada@example.com", "password": "first" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn stored_password_is_hashed() {
    let app = TestApp::new();
    app.register("ada@example.com", "hunter22", None).await;

    let stored = app
        .users
        .fetch_user(&email("ada@example.com"))
        .await
        .unwrap()
        .unwrap();

    let phc = stored.password.as_phc_string();
    assert_ne!(phc, "hunter22");
    assert!(!phc.contains("hunter22"));
    assert!(phc.starts_with("$argon2id$"));
}

#[tokio::test]
async fn failed_authentication_sets_no_cookie() {
    let app = TestApp::new();
    app.register("ada@example.com", "hunter22", None).await;

    let response = app
        .send(
            Method::POST,
            "/api/authenticate",
            None,
            Some(json!({ "email": "ada@example.com", "password": "hunter23" })),
        )
        .await;
    assert_error(response, StatusCode::UNAUTHORIZED, "Incorrect password").await;

    let response = app
        .send(
            Method::POST,
            "/api/authenticate",
            None,
            Some(json!({ "email": "bob@example.com", "password": "hunter22" })),
        )
        .await;
    assert_error(response, StatusCode::UNAUTHORIZED, "Incorrect email").await;
}

#[tokio::test]
async fn invalid_registration_is_rejected() {
    let app = TestApp::new();

    let response = app
        .send(
            Method::POST,
            "/api/register",
            None,
            Some(json!({ "email": "not an email", "password": "hunter22" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(SET_COOKIE).is_none());

    let response = app
        .send(
            Method::POST,
            "/api/register",
            None,
            Some(json!({ "email": "ada@example.com", "password": "" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn session_gate_checks_tokens() {
    let app = TestApp::new();
    let ada = app.register("ada@example.com", "hunter22", None).await;
    let bob = app.register("bob@example.com", "hunter22", None).await;

    let response = app.send(Method::GET, "/checkToken", None, None).await;
    assert_error(
        response,
        StatusCode::UNAUTHORIZED,
        "Unauthorized: No token provided",
    )
    .await;

    // Bob's claims under Ada's signature.
    let ada_parts = ada.split('.').collect::<Vec<_>>();
    let bob_parts = bob.split('.').collect::<Vec<_>>();
    let tampered = format!("{}.{}.{}", ada_parts[0], bob_parts[1], ada_parts[2]);

    let expired = app
        .tokens
        .issue_at(
            &email("ada@example.com"),
            UtcDateTime::now() - Duration::hours(2),
        )
        .unwrap();

    for token in [tampered.as_str(), expired.get(), "garbage"] {
        let response = app
            .send(Method::GET, "/checkToken", Some(token), None)
            .await;
        assert_error(response, StatusCode::UNAUTHORIZED, "Unauthorized: Invalid token").await;
    }

    let response = app.send(Method::GET, "/checkToken", Some(&ada), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn mutating_routes_require_a_session() {
    let public = ["/api/register", "/api/authenticate"];

    for policy in ROUTE_POLICIES {
        if policy.method != Method::GET && !public.contains(&policy.path) {
            assert_eq!(policy.access, Access::Session, "{} {}", policy.method, policy.path);
        }
    }
    assert_eq!(access_for(&Method::GET, "/api/undeclared"), Access::Session);

    let app = TestApp::new();
    let requests = [
        (Method::POST, "/api/createPost", Some(json!({ "title": "t" }))),
        (Method::PUT, "/api/updatePostsById?id=1", Some(json!({ "title": "t" }))),
        (Method::DELETE, "/api/deletePostsById?id=1", None),
        (Method::GET, "/api/getPosts", None),
        (Method::POST, "/api/getUser", Some(json!({ "email": "ada@example.com" }))),
    ];

    for (method, uri, body) in requests {
        let response = app.send(method, uri, None, body).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn post_lifecycle() {
    let app = TestApp::new();
    let token = app.register("ada@example.com", "hunter22", None).await;

    let created = app.create_post(&token, "first").await;
    assert_eq!(created["owner"], "ada@example.com");
    assert_eq!(created["title"], "first");
    assert_eq!(created["description"], "words");
    let id = created["id"].as_i64().unwrap();

    let response = app.send(Method::GET, "/api/getPosts", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([created.clone()]));

    let by_id = format!("/api/getPostsById?id={id}");
    let response = app.send(Method::GET, &by_id, None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, created);

    let response = app
        .send(
            Method::PUT,
            &format!("/api/updatePostsById?id={id}"),
            Some(&token),
            Some(json!({ "description": "changed" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["title"], "first");
    assert_eq!(updated["description"], "changed");

    let response = app
        .send(
            Method::DELETE,
            &format!("/api/deletePostsById?id={id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, updated);

    let response = app.send(Method::GET, &by_id, None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.send(Method::GET, "/api/getPosts", Some(&token), None).await;
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn only_owner_mutates_post() {
    let app = TestApp::new();
    let ada = app.register("ada@example.com", "hunter22", None).await;
    let bob = app.register("bob@example.com", "hunter22", None).await;

    let created = app.create_post(&ada, "mine").await;
    let id = created["id"].as_i64().unwrap();

    let response = app
        .send(
            Method::PUT,
            &format!("/api/updatePostsById?id={id}"),
            Some(&bob),
            Some(json!({ "title": "yours" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(
            Method::DELETE,
            &format!("/api/deletePostsById?id={id}"),
            Some(&bob),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(Method::GET, &format!("/api/getPostsById?id={id}"), None, None)
        .await;
    assert_eq!(body_json(response).await, created);
}

#[tokio::test]
async fn missing_post_is_not_found() {
    let app = TestApp::new();
    let token = app.register("ada@example.com", "hunter22", None).await;

    let response = app
        .send(
            Method::PUT,
            "/api/updatePostsById?id=404",
            Some(&token),
            Some(json!({ "title": "t" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .send(Method::DELETE, "/api/deletePostsById?id=404", Some(&token), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_post_id_is_bad_request() {
    let app = TestApp::new();

    for uri in ["/api/getPostsById?id=abc", "/api/getPostsById"] {
        let response = app.send(Method::GET, uri, None, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn get_user_returns_profile_only() {
    let app = TestApp::new();
    let token = app.register("ada@example.com", "hunter22", Some("ada")).await;

    let response = app
        .send(
            Method::POST,
            "/api/getUser",
            Some(&token),
            Some(json!({ "email": "ada@example.com" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let profile = body_json(response).await;
    assert_eq!(
        profile,
        json!({ "email": "ada@example.com", "name": "ada", "image": null })
    );
    assert!(profile.get("password").is_none());

    let response = app
        .send(
            Method::POST,
            "/api/getUser",
            Some(&token),
            Some(json!({ "email": "bob@example.com" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = TestApp::new();

    let response = app.send(Method::GET, "/api/unknown", None, None).await;
    assert_error(response, StatusCode::NOT_FOUND, "Not found").await;
}

#[tokio::test]
async fn static_files_are_served() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "<h1>postboard</h1>").unwrap();
    let app = TestApp::with_settings(dir.path().to_owned(), PositiveDuration::ONE_HOUR);

    let response = app.send(Method::GET, "/", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"<h1>postboard</h1>");

    let response = app.send(Method::GET, "/missing.js", None, None).await;
    assert_error(response, StatusCode::NOT_FOUND, "Not found").await;

    let response = app.send(Method::POST, "/missing.js", None, None).await;
    assert_error(response, StatusCode::NOT_FOUND, "Not found").await;
}

#[tokio::test]
async fn head_shares_get_policy() {
    assert_eq!(access_for(&Method::HEAD, "/api/getPostsById"), Access::Public);
    assert_eq!(access_for(&Method::HEAD, "/api/getPosts"), Access::Session);

    let app = TestApp::new();
    let token = app.register("ada@example.com", "hunter22", None).await;
    let id = app.create_post(&token, "first").await["id"].as_i64().unwrap();

    let response = app
        .send(Method::HEAD, &format!("/api/getPostsById?id={id}"), None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.send(Method::HEAD, "/api/getPosts", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unrepresentable_session_lifetime_is_an_internal_error() {
    let lifetime = PositiveDuration::from_seconds(i64::MAX / 2).unwrap();
    let app = TestApp::with_settings(PathBuf::from("does-not-exist"), lifetime);

    let response = app
        .send(
            Method::POST,
            "/api/register",
            None,
            Some(json!({ "email": "ada@example.com", "password": "hunter22" })),
        )
        .await;
    assert_error(
        response,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal error please try again",
    )
    .await;
}
