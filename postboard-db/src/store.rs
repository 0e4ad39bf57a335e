//! The two persistence seams: users live in the credential store, posts in
//! the content store. Neither knows about the other.

use async_trait::async_trait;
use postboard_common::model::{
    Id, ModelValidationError,
    post::{Post, PostContent, PostMarker, PostUpdate},
    user::{CreateUser, Email, User},
};
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Unique constraint {constraint} was violated")]
    UniqueViolation { constraint: String },
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(err) if err.is_unique_violation() => DbError::UniqueViolation {
                constraint: err.constraint().unwrap_or("unknown").to_owned(),
            },
            err => DbError::Sqlx(err),
        }
    }
}

/// Credential store.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`DbError::UniqueViolation`] when the email or name is taken.
    async fn create_user(&self, user: &CreateUser) -> Result<User>;

    async fn fetch_user(&self, email: &Email) -> Result<Option<User>>;
}

/// Content store.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create_post(&self, owner: &Email, content: &PostContent) -> Result<Post>;

    /// Every post, ordered by id.
    async fn fetch_posts(&self) -> Result<Vec<Post>>;

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>>;

    async fn fetch_post_owner(&self, post_id: Id<PostMarker>) -> Result<Option<Email>>;

    /// Only touches the post if `owner` owns it; `None` otherwise.
    async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        owner: &Email,
        update: &PostUpdate,
    ) -> Result<Option<Post>>;

    /// Returns the removed post, if there was one owned by `owner`.
    async fn delete_post(&self, post_id: Id<PostMarker>, owner: &Email) -> Result<Option<Post>>;
}
