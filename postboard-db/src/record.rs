use postboard_common::{
    auth::password::HashedPassword,
    model::{
        ModelValidationError,
        image::Image,
        post::{Post, PostContent},
        user::{Email, User, UserName},
    },
};
use sqlx::FromRow;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub image_data: Option<Vec<u8>>,
    pub image_content_type: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_id: i64,
    pub owner_email: String,
    pub image_data: Option<Vec<u8>>,
    pub image_content_type: Option<String>,
    pub title: String,
    pub description: String,
}

fn image_from_columns(
    data: Option<Vec<u8>>,
    content_type: Option<String>,
) -> Result<Option<Image>, ModelValidationError> {
    match (data, content_type) {
        (Some(data), Some(content_type)) => Ok(Some(Image { data, content_type })),
        (None, None) => Ok(None),
        _ => Err(ModelValidationError::IncompleteImage),
    }
}

pub(crate) fn image_to_columns(image: Option<&Image>) -> (Option<&[u8]>, Option<&str>) {
    match image {
        Some(image) => (Some(image.data.as_slice()), Some(image.content_type.as_str())),
        None => (None, None),
    }
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            email: Email::new(value.email)?,
            password: HashedPassword::from_phc_string(value.password_hash)?,
            name: value.name.map(UserName::new).transpose()?,
            image: image_from_columns(value.image_data, value.image_content_type)?,
        })
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_id.into(),
            owner: Email::new(value.owner_email)?,
            content: PostContent {
                image: image_from_columns(value.image_data, value.image_content_type)?,
                title: value.title,
                description: value.description,
            },
        })
    }
}
