use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::Claims;
use crate::config::JwtConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,
    #[error("token expired")]
    Expired,
    #[error("token signing failed: {0}")]
    Sign(String),
}

/// Signing and verification keys, built once at startup.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            ttl: Duration::minutes(cfg.ttl_minutes),
        }
    }

    pub fn sign(&self, user_id: Uuid, email: &str) -> Result<String, TokenError> {
        self.sign_at(user_id, email, OffsetDateTime::now_utc())
    }

    pub fn sign_at(
        &self,
        user_id: Uuid,
        email: &str,
        now: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let iat = now.unix_timestamp();
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat,
            exp: iat + self.ttl.whole_seconds(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Sign(e.to_string()))?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// Valid on `[iat, exp)`; expiry is checked here rather than by
    /// `jsonwebtoken`, which accepts `now == exp` and applies leeway.
    pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            TokenError::Invalid
        })?;

        if now.unix_timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn make_keys(secret: &str, ttl_minutes: i64) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            ttl_minutes,
        })
    }

    #[test]
    fn sign_and_verify_carries_subject_and_email() {
        let keys = make_keys("dev-secret", 5);
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id, "alice@example.com").expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.exp - claims.iat, 5 * 60);
    }

    #[test]
    fn token_is_valid_until_exactly_expiry() {
        let keys = make_keys("dev-secret", 30);
        let t0 = datetime!(2026-03-01 12:00:00 UTC);
        let token = keys.sign_at(Uuid::new_v4(), "a@b.io", t0).unwrap();

        assert!(keys.verify_at(&token, t0).is_ok());
        assert!(keys
            .verify_at(&token, t0 + Duration::minutes(30) - Duration::seconds(1))
            .is_ok());
        assert_eq!(
            keys.verify_at(&token, t0 + Duration::minutes(30)),
            Err(TokenError::Expired)
        );
        assert_eq!(
            keys.verify_at(&token, t0 + Duration::days(2)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn verify_rejects_foreign_secret() {
        let good = make_keys("secret-one", 5);
        let bad = make_keys("secret-two", 5);
        let token = good.sign(Uuid::new_v4(), "a@b.io").unwrap();
        assert_eq!(bad.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn verify_rejects_tampered_signature() {
        let keys = make_keys("dev-secret", 5);
        let token = keys.sign(Uuid::new_v4(), "a@b.io").unwrap();
        let sig_start = token.rfind('.').unwrap() + 1;
        let mut bytes = token.into_bytes();
        bytes[sig_start] = if bytes[sig_start] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();
        assert_eq!(keys.verify(&tampered), Err(TokenError::Invalid));
    }

    #[test]
    fn verify_rejects_garbage() {
        let keys = make_keys("dev-secret", 5);
        assert_eq!(keys.verify("not.a.jwt"), Err(TokenError::Invalid));
        assert_eq!(keys.verify(""), Err(TokenError::Invalid));
    }
}
