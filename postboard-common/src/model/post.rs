use crate::model::{Id, image::Image, user::Email};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub owner: Email,
    #[serde(flatten)]
    pub content: PostContent,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct PostContent {
    #[serde(default)]
    pub image: Option<Image>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Partial update; `None` leaves the stored field untouched.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct PostUpdate {
    #[serde(default)]
    pub image: Option<Image>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct PostIdQuery {
    pub id: Id<PostMarker>,
}

impl PostContent {
    pub fn apply(&mut self, update: PostUpdate) {
        if let Some(image) = update.image {
            self.image = Some(image);
        }
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
    }
}
