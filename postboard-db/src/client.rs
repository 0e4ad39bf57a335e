//! Postgres-backed stores. The credential store and the content store each
//! own a separate pool, usually pointing at separate databases.

use crate::{
    record::{PostRecord, UserRecord, image_to_columns},
    store::{PostStore, Result, UserStore},
};
use async_trait::async_trait;
use postboard_common::model::{
    Id, ModelValidationError,
    post::{Post, PostContent, PostMarker, PostUpdate},
    user::{CreateUser, Email, User},
};
use sqlx::{PgPool, postgres::PgPoolOptions, query_as, query_scalar};
use tracing::debug;

pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await?;

    Ok(pool)
}

#[derive(Clone, Debug)]
pub struct UserClient {
    pool: PgPool,
}

impl UserClient {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        let mut migrator = sqlx::migrate!("./migrations/users");
        migrator.set_ignore_missing(true);
        migrator.run(&self.pool).await?;

        debug!("Credential store schema is up to date");
        Ok(())
    }
}

#[async_trait]
impl UserStore for UserClient {
    async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let (image_data, image_content_type) = image_to_columns(user.image.as_ref());

        let record = query_as::<_, UserRecord>(
            "
            INSERT INTO users.users (email, password_hash, name, image_data, image_content_type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING
                users.email,
                users.password_hash,
                users.name,
                users.image_data,
                users.image_content_type
            ",
        )
        .bind(user.email.get())
        .bind(user.password.as_phc_string())
        .bind(user.name.as_ref().map(|name| name.get()))
        .bind(image_data)
        .bind(image_content_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(User::try_from(record)?)
    }

    async fn fetch_user(&self, email: &Email) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.email,
                users.password_hash,
                users.name,
                users.image_data,
                users.image_content_type
            FROM
                users.users
            WHERE
                users.email = $1
            ",
        )
        .bind(email.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }
}

#[derive(Clone, Debug)]
pub struct PostClient {
    pool: PgPool,
}

impl PostClient {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        let mut migrator = sqlx::migrate!("./migrations/posts");
        migrator.set_ignore_missing(true);
        migrator.run(&self.pool).await?;

        debug!("Content store schema is up to date");
        Ok(())
    }
}

#[async_trait]
impl PostStore for PostClient {
    async fn create_post(&self, owner: &Email, content: &PostContent) -> Result<Post> {
        let (image_data, image_content_type) = image_to_columns(content.image.as_ref());

        let record = query_as::<_, PostRecord>(
            "
            INSERT INTO posts.posts (owner_email, image_data, image_content_type, title, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING
                posts.post_id,
                posts.owner_email,
                posts.image_data,
                posts.image_content_type,
                posts.title,
                posts.description
            ",
        )
        .bind(owner.get())
        .bind(image_data)
        .bind(image_content_type)
        .bind(&content.title)
        .bind(&content.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(Post::try_from(record)?)
    }

    async fn fetch_posts(&self) -> Result<Vec<Post>> {
        let records = query_as::<_, PostRecord>(
            "
            SELECT
                posts.post_id,
                posts.owner_email,
                posts.image_data,
                posts.image_content_type,
                posts.title,
                posts.description
            FROM
                posts.posts
            ORDER BY
                posts.post_id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(
            "
            SELECT
                posts.post_id,
                posts.owner_email,
                posts.image_data,
                posts.image_content_type,
                posts.title,
                posts.description
            FROM
                posts.posts
            WHERE
                posts.post_id = $1
            ",
        )
        .bind(post_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    async fn fetch_post_owner(&self, post_id: Id<PostMarker>) -> Result<Option<Email>> {
        let owner = query_scalar::<_, String>(
            "
            SELECT
                posts.owner_email
            FROM
                posts.posts
            WHERE
                posts.post_id = $1
            ",
        )
        .bind(post_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let owner = owner
            .map(Email::new)
            .transpose()
            .map_err(ModelValidationError::from)?;
        Ok(owner)
    }

    async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        owner: &Email,
        update: &PostUpdate,
    ) -> Result<Option<Post>> {
        let (image_data, image_content_type) = image_to_columns(update.image.as_ref());

        let record = query_as::<_, PostRecord>(
            "
            UPDATE posts.posts
            SET
                image_data = COALESCE($2, posts.image_data),
                image_content_type = COALESCE($3, posts.image_content_type),
                title = COALESCE($4, posts.title),
                description = COALESCE($5, posts.description)
            WHERE
                posts.post_id = $1 AND posts.owner_email = $6
            RETURNING
                posts.post_id,
                posts.owner_email,
                posts.image_data,
                posts.image_content_type,
                posts.title,
                posts.description
            ",
        )
        .bind(post_id.get())
        .bind(image_data)
        .bind(image_content_type)
        .bind(update.title.as_deref())
        .bind(update.description.as_deref())
        .bind(owner.get())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    async fn delete_post(&self, post_id: Id<PostMarker>, owner: &Email) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(
            "
            DELETE FROM posts.posts
            WHERE
                posts.post_id = $1 AND posts.owner_email = $2
            RETURNING
                posts.post_id,
                posts.owner_email,
                posts.image_data,
                posts.image_content_type,
                posts.title,
                posts.description
            ",
        )
        .bind(post_id.get())
        .bind(owner.get())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }
}
