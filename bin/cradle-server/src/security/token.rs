//! HS256 bearer tokens.
//!
//! The token identity is the user's email; every handler re-resolves the
//! user row from it, so a token for a deleted account fails with 404 at the
//! handler rather than here.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Access-token lifetime in seconds.
const TOKEN_TTL_SECS: u64 = 3600;

#[derive(Debug, Error, PartialEq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token invalid: {0}")]
    Invalid(String),
}

/// JWT claim set carried by every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The authenticated user's email address.
    pub sub: String,
    /// Expiry as a unix timestamp.
    pub exp: usize,
}

/// Sign a fresh access token for `email`.
pub fn issue_token(email: &str, secret: &str) -> Result<String, TokenError> {
    let exp = now_unix() + TOKEN_TTL_SECS as usize;
    let claims = Claims {
        sub: email.to_owned(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| TokenError::Invalid(e.to_string()))
}

/// Verify `token` and return its claims.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let validation = Validation::new(Algorithm::HS256);
    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => Ok(data.claims),
        Err(e) => match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(TokenError::Expired),
            _ => Err(TokenError::Invalid(e.to_string())),
        },
    }
}

fn now_unix() -> usize {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or(0)
}

#[cfg(test)]
mod test {
    use super::*;

    const SECRET: &str = "super_secret_key";

    #[test]
    fn issue_then_verify_roundtrips() {
        let token = issue_token("test@example.com", SECRET).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "test@example.com");
        assert!(claims.exp > now_unix());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token("test@example.com", SECRET).unwrap();
        let err = verify_token(&token, "another_secret").unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims {
            sub: "test@example.com".into(),
            exp: now_unix().saturating_sub(10_000),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert_eq!(verify_token(&token, SECRET).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(verify_token("not-a-token", SECRET).is_err());
    }
}
