//! Token service: issuing and verifying signed bearer tokens.
//!
//! Tokens are HS256 JWTs carrying the subject id, username, issued-at and
//! expiry. They are stateless: validity is signature + expiry, checked on
//! every request, with nothing stored server-side and no revocation before
//! natural expiry.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TokenError {
    /// Uniform verification failure: malformed, bad signature, or expired.
    #[error("invalid token")]
    Invalid,

    #[error("token issuance failed: {0}")]
    Issue(String),
}

/// Signed token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id
    pub sub: String,
    pub username: String,
    /// Issued at (unix seconds)
    pub iat: u64,
    /// Expiry (unix seconds)
    pub exp: u64,
}

/// Issues and verifies bearer tokens with a shared secret and fixed TTL.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: u64,
}

impl TokenService {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        let mut validation = Validation::default();
        // No leeway: `now >= exp` is invalid, exactly.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs,
        }
    }

    /// Encode a token for the given identity. Pure function of the input,
    /// the clock and the secret.
    pub fn issue(&self, user_id: Uuid, username: &str) -> Result<String, TokenError> {
        let iat = unix_now();
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            iat,
            exp: iat + self.ttl_secs,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| TokenError::Issue(e.to_string()))
    }

    /// Validate signature and expiry. Garbage input, a signature mismatch
    /// and an elapsed expiry all collapse into [`TokenError::Invalid`];
    /// this never panics.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::Invalid)?;

        // jsonwebtoken keeps a token alive through its expiry second; the
        // contract here is strict: valid only while now < exp.
        if claims.exp <= unix_now() {
            return Err(TokenError::Invalid);
        }

        Ok(claims)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_verify_roundtrip_preserves_subject() {
        let service = TokenService::new("test-secret", 1200);
        let user_id = Uuid::new_v4();

        let token = service.issue(user_id, "alice").unwrap();
        let claims = service.verify(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp, claims.iat + 1200);
    }

    #[test]
    fn expired_token_is_invalid_despite_good_signature() {
        let service = TokenService::new("test-secret", 0);
        let token = service.issue(Uuid::new_v4(), "alice").unwrap();

        assert!(matches!(service.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn foreign_secret_is_invalid() {
        let issuer = TokenService::new("secret-a", 1200);
        let verifier = TokenService::new("secret-b", 1200);

        let token = issuer.issue(Uuid::new_v4(), "alice").unwrap();
        assert!(matches!(verifier.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn malformed_input_is_invalid_not_a_panic() {
        let service = TokenService::new("test-secret", 1200);
        for garbage in ["", "garbage", "a.b", "a.b.c.d", "Bearer x"] {
            assert!(matches!(service.verify(garbage), Err(TokenError::Invalid)));
        }
    }
}
