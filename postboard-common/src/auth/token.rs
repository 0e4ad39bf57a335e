use crate::{model::user::Email, util::PositiveDuration};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use thiserror::Error;
use time::UtcDateTime;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Signing session token failed: {0}")]
    Sign(jsonwebtoken::errors::Error),
    #[error("Session token was rejected: {0}")]
    Rejected(jsonwebtoken::errors::Error),
    #[error("Session token expiry is out of range")]
    ExpiryOutOfRange,
}

/// Payload of a session token.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Claims {
    pub email: Email,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and checks signed, time-bounded session tokens.
pub trait TokenService: Send + Sync {
    fn issue(&self, email: &Email) -> Result<SessionToken, TokenError>;

    /// Checks signature and expiry and returns the claims on success.
    fn verify(&self, token: &str) -> Result<Claims, TokenError>;
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Debug for SessionToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionToken").field(&"[redacted]").finish()
    }
}

/// HS256 JSON Web Tokens over a shared secret.
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: PositiveDuration,
}

impl JwtTokenService {
    #[must_use]
    pub fn new(secret: &[u8], lifetime: PositiveDuration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            lifetime,
        }
    }

    #[must_use]
    pub fn lifetime(&self) -> PositiveDuration {
        self.lifetime
    }

    pub fn issue_at(
        &self,
        email: &Email,
        issued_at: UtcDateTime,
    ) -> Result<SessionToken, TokenError> {
        let expires_at = issued_at
            .checked_add(self.lifetime.get())
            .ok_or(TokenError::ExpiryOutOfRange)?;

        let claims = Claims {
            email: email.clone(),
            iat: issued_at.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map(SessionToken)
            .map_err(TokenError::Sign)
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, email: &Email) -> Result<SessionToken, TokenError> {
        self.issue_at(email, UtcDateTime::now())
    }

    fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::Rejected)
    }
}

impl Debug for JwtTokenService {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtTokenService")
            .field("keys", &"[redacted]")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}
