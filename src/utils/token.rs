// The session token only names the user. Role and profile are re-read from
// the database on every request, so a demoted user loses access immediately.
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorMessage, HttpError};

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String, // user id
    pub iat: usize,
    pub exp: usize,
}

pub fn create_token(
    user_id: i64,
    secret: &[u8],
    expires_in_seconds: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let iat = now.timestamp() as usize;
    let exp = (now + Duration::seconds(expires_in_seconds)).timestamp() as usize;
    let claims = TokenClaims {
        sub: user_id.to_string(),
        iat,
        exp,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
}

/// Returns the user id carried by a valid, unexpired token.
pub fn decode_token<T: Into<String>>(token: T, secret: &[u8]) -> Result<i64, HttpError> {
    let decoded = decode::<TokenClaims>(
        &token.into(),
        &DecodingKey::from_secret(secret),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    decoded
        .claims
        .sub
        .parse::<i64>()
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn token_carries_user_id() {
        let token = create_token(42, SECRET, 60).unwrap();
        assert_eq!(decode_token(token, SECRET).unwrap(), 42);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_token(7, SECRET, 60).unwrap();
        let err = decode_token(token, b"other-secret").unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn expired_token_is_rejected() {
        // jsonwebtoken allows 60s of leeway by default
        let token = create_token(7, SECRET, -3600).unwrap();
        assert!(decode_token(token, SECRET).is_err());
    }
}
