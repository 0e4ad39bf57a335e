//! Credential hashing and session tokens.
//!
//! Both are capabilities behind traits so the server only ever sees
//! [`password::Hasher`] and [`token::TokenService`].

pub mod password;
pub mod token;
