//! services/api/src/adapters/jwt.rs
//!
//! HS256 JSON Web Token implementation of the `TokenService` port.

use chrono::{Duration, Utc};
use docsum_core::ports::{PortError, PortResult, TokenError, TokenService};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User ID.
    sub: Uuid,
    /// Issued at (Unix timestamp).
    iat: i64,
    /// Expiration time (Unix timestamp).
    exp: i64,
}

pub struct JwtTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtTokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, user_id: Uuid) -> PortResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| PortError::Unexpected(format!("Failed to sign token: {}", e)))
    }

    fn verify(&self, token: &str) -> Result<Uuid, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Ok(data.claims.sub),
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => Err(TokenError::Expired),
            Err(_) => Err(TokenError::Invalid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_to_same_user() {
        let service = JwtTokenService::new("secret", Duration::days(7));
        let user_id = Uuid::new_v4();
        let token = service.issue(user_id).unwrap();
        assert_eq!(service.verify(&token), Ok(user_id));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = JwtTokenService::new("secret", Duration::days(7))
            .issue(Uuid::new_v4())
            .unwrap();
        let other = JwtTokenService::new("wrong-secret", Duration::days(7));
        assert_eq!(other.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let service = JwtTokenService::new("secret", Duration::hours(-1));
        let token = service.issue(Uuid::new_v4()).unwrap();
        assert_eq!(service.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn garbage_is_invalid() {
        let service = JwtTokenService::new("secret", Duration::days(7));
        assert_eq!(service.verify("not.a.jwt"), Err(TokenError::Invalid));
        assert_eq!(service.verify(""), Err(TokenError::Invalid));
    }
}
