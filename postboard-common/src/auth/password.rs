use argon2::{
    Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use serde::{
    Deserialize, Deserializer,
    de::{Error as _, Unexpected},
};
use std::fmt::{Debug, Formatter};
use thiserror::Error;

pub const PASSWORD_MAX_LEN: usize = 128;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum PasswordHashError {
    #[error("Hashing password failed: {0}")]
    Hash(argon2::password_hash::Error),
    #[error("Stored password hash is not a valid PHC string: {0}")]
    InvalidHash(argon2::password_hash::Error),
    #[error("Verifying password failed: {0}")]
    Verify(argon2::password_hash::Error),
}

/// One-way password hashing.
pub trait Hasher: Send + Sync {
    fn hash(&self, password: &Password) -> Result<HashedPassword, PasswordHashError>;

    /// `Ok(false)` on mismatch. Errors are reserved for unusable hashes.
    fn verify(&self, password: &Password, hash: &HashedPassword)
    -> Result<bool, PasswordHashError>;
}

/// Argon2id with a fresh random salt per password.
#[derive(Clone, Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Debug for Argon2Hasher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Argon2Hasher")
            .field("params", self.argon2.params())
            .finish()
    }
}

impl Argon2Hasher {
    #[must_use]
    pub fn new(params: Params) -> Self {
        Self {
            argon2: Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params),
        }
    }
}

impl Hasher for Argon2Hasher {
    fn hash(&self, password: &Password) -> Result<HashedPassword, PasswordHashError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2
            .hash_password(password.get().as_bytes(), &salt)
            .map_err(PasswordHashError::Hash)?;

        Ok(HashedPassword(hash.to_string()))
    }

    fn verify(
        &self,
        password: &Password,
        hash: &HashedPassword,
    ) -> Result<bool, PasswordHashError> {
        let parsed = PasswordHash::new(&hash.0).map_err(PasswordHashError::InvalidHash)?;

        match self.argon2.verify_password(password.get().as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(err) => Err(PasswordHashError::Verify(err)),
        }
    }
}

/// A plaintext password as received from a client.
#[derive(Clone, Eq, PartialEq)]
pub struct Password(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The password must be between 1 and 128 characters")]
pub struct InvalidPasswordError;

impl Password {
    pub fn new(password: String) -> Result<Self, InvalidPasswordError> {
        if (1..=PASSWORD_MAX_LEN).contains(&password.chars().count()) {
            Ok(Self(password))
        } else {
            Err(InvalidPasswordError)
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl Debug for Password {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Password").field(&"[redacted]").finish()
    }
}

impl<'de> Deserialize<'de> for Password {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Password::new(inner).map_err(|_| {
            D::Error::invalid_value(Unexpected::Other("unacceptable password"), &"Password")
        })
    }
}

/// PHC string produced by a [`Hasher`]; the only form a password is stored in.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct HashedPassword(String);

impl HashedPassword {
    /// Wraps a PHC string loaded from a store, rejecting anything unparsable.
    pub fn from_phc_string(phc: String) -> Result<Self, PasswordHashError> {
        PasswordHash::new(&phc).map_err(PasswordHashError::InvalidHash)?;
        Ok(Self(phc))
    }

    #[must_use]
    pub fn as_phc_string(&self) -> &str {
        &self.0
    }
}

impl Debug for HashedPassword {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("HashedPassword").field(&"[redacted]").finish()
    }
}
