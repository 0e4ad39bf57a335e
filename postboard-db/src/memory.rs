//! In-process stores with the same contracts as the Postgres clients.

use crate::store::{DbError, PostStore, Result, UserStore};
use async_trait::async_trait;
use postboard_common::model::{
    Id,
    post::{Post, PostContent, PostMarker, PostUpdate},
    user::{CreateUser, Email, User},
};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Email, User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let mut users = self.users.write().await;

        if users.contains_key(&user.email) {
            return Err(DbError::UniqueViolation {
                constraint: "users_pkey".to_owned(),
            });
        }
        if let Some(name) = &user.name
            && users.values().any(|other| other.name.as_ref() == Some(name))
        {
            return Err(DbError::UniqueViolation {
                constraint: "users_name_key".to_owned(),
            });
        }

        let created = User::from(user.clone());
        users.insert(created.email.clone(), created.clone());
        Ok(created)
    }

    async fn fetch_user(&self, email: &Email) -> Result<Option<User>> {
        Ok(self.users.read().await.get(email).cloned())
    }
}

#[derive(Debug, Default)]
pub struct MemoryPostStore {
    state: RwLock<PostState>,
}

#[derive(Debug, Default)]
struct PostState {
    last_id: i64,
    posts: BTreeMap<Id<PostMarker>, Post>,
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn create_post(&self, owner: &Email, content: &PostContent) -> Result<Post> {
        let mut state = self.state.write().await;
        state.last_id += 1;

        let post = Post {
            id: Id::new(state.last_id),
            owner: owner.clone(),
            content: content.clone(),
        };
        state.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn fetch_posts(&self) -> Result<Vec<Post>> {
        Ok(self.state.read().await.posts.values().cloned().collect())
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        Ok(self.state.read().await.posts.get(&post_id).cloned())
    }

    async fn fetch_post_owner(&self, post_id: Id<PostMarker>) -> Result<Option<Email>> {
        let state = self.state.read().await;
        Ok(state.posts.get(&post_id).map(|post| post.owner.clone()))
    }

    async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        owner: &Email,
        update: &PostUpdate,
    ) -> Result<Option<Post>> {
        let mut state = self.state.write().await;

        Ok(state
            .posts
            .get_mut(&post_id)
            .filter(|post| post.owner == *owner)
            .map(|post| {
                post.content.apply(update.clone());
                post.clone()
            }))
    }

    async fn delete_post(&self, post_id: Id<PostMarker>, owner: &Email) -> Result<Option<Post>> {
        let mut state = self.state.write().await;

        if state.posts.get(&post_id).is_some_and(|post| post.owner == *owner) {
            Ok(state.posts.remove(&post_id))
        } else {
            Ok(None)
        }
    }
}
