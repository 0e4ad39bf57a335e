use postboard_common::{
    auth::{password::Argon2Hasher, token::JwtTokenService},
    util::{NonPositiveDurationError, PositiveDuration},
};
use postboard_db::{
    client::{self, PostClient, UserClient},
    store::DbError,
};
use serde::Deserialize;
use server::{ServerConfig, ServerState};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};
use thiserror::Error;
use tokio::signal;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod server;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Invalid session lifetime: {0}")]
    SessionLifetime(#[from] NonPositiveDurationError),
    #[error("Error setting up database: {0}")]
    Database(#[from] DbError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

/// Holds the database URLs and the signing secret, so no `Debug`.
#[derive(Deserialize)]
struct Env {
    user_database_url: String,
    post_database_url: String,
    jwt_secret: String,
    #[serde(default = "default_server_address")]
    server_address: IpAddr,
    #[serde(default = "default_server_port")]
    server_port: u16,
    #[serde(default = "default_static_dir")]
    static_dir: PathBuf,
    #[serde(default = "default_session_lifetime_seconds")]
    session_lifetime_seconds: i64,
    #[serde(default)]
    cookie_secure: bool,
    #[serde(default = "default_database_max_connections")]
    database_max_connections: u32,
}

fn default_server_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_server_port() -> u16 {
    5000
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_session_lifetime_seconds() -> i64 {
    PositiveDuration::ONE_HOUR.get().whole_seconds()
}

fn default_database_max_connections() -> u32 {
    5
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "postboard_api=debug,\
                postboard_common=debug,\
                postboard_db=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(%err, "Could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(err) => {
                error!(%err, "Could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let session_lifetime = PositiveDuration::from_seconds(env.session_lifetime_seconds)?;

    let users = UserClient::new(
        client::connect(&env.user_database_url, env.database_max_connections).await?,
    );
    users.migrate().await?;

    let posts = PostClient::new(
        client::connect(&env.post_database_url, env.database_max_connections).await?,
    );
    posts.migrate().await?;

    let state = ServerState {
        users: Arc::new(users),
        posts: Arc::new(posts),
        hasher: Arc::new(Argon2Hasher::default()),
        tokens: Arc::new(JwtTokenService::new(
            env.jwt_secret.as_bytes(),
            session_lifetime,
        )),
        config: Arc::new(ServerConfig {
            session_lifetime,
            cookie_secure: env.cookie_secure,
            static_dir: env.static_dir,
        }),
    };

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");

    axum::serve(listener, server::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
