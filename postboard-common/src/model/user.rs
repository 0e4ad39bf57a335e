use crate::{
    auth::password::{HashedPassword, Password},
    model::image::Image,
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub const EMAIL_MIN_LEN: usize = 3;
pub const EMAIL_MAX_LEN: usize = 254;
pub const USER_NAME_MAX_LEN: usize = 50;

/// A user as held by the credential store.
///
/// Not `Serialize`. Responses carry a [`UserProfile`] instead.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct User {
    pub email: Email,
    pub password: HashedPassword,
    pub name: Option<UserName>,
    pub image: Option<Image>,
}

/// The public projection of a [`User`], without the credential.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub email: Email,
    pub name: Option<UserName>,
    pub image: Option<Image>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUser {
    pub email: Email,
    pub password: Password,
    #[serde(default)]
    pub name: Option<UserName>,
    #[serde(default)]
    pub image: Option<Image>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateUser {
    pub email: Email,
    pub password: HashedPassword,
    pub name: Option<UserName>,
    pub image: Option<Image>,
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: Email,
    pub password: Password,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct UserLookup {
    pub email: Email,
}

impl User {
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            email: self.email.clone(),
            name: self.name.clone(),
            image: self.image.clone(),
        }
    }
}

impl From<User> for UserProfile {
    fn from(value: User) -> Self {
        Self {
            email: value.email,
            name: value.name,
            image: value.image,
        }
    }
}

impl From<CreateUser> for User {
    fn from(value: CreateUser) -> Self {
        Self {
            email: value.email,
            password: value.password,
            name: value.name,
            image: value.image,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct Email(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The email address is invalid: {0}")]
pub struct InvalidEmailError(String);

impl Email {
    pub fn new(email: String) -> Result<Self, InvalidEmailError> {
        let len = email.chars().count();
        let well_formed = (EMAIL_MIN_LEN..=EMAIL_MAX_LEN).contains(&len)
            && !email.chars().any(char::is_whitespace)
            && email
                .split_once('@')
                .is_some_and(|(local, domain)| {
                    !local.is_empty() && !domain.is_empty() && !domain.contains('@')
                });

        if well_formed {
            Ok(Email(email))
        } else {
            Err(InvalidEmailError(email))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Email {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Email::new(inner).map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"Email"))
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct UserName(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The user name is invalid: {0}")]
pub struct InvalidUserNameError(String);

impl UserName {
    pub fn new(name: String) -> Result<Self, InvalidUserNameError> {
        if (1..=USER_NAME_MAX_LEN).contains(&name.chars().count()) {
            Ok(UserName(name))
        } else {
            Err(InvalidUserNameError(name))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for UserName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        UserName::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"UserName"))
    }
}
