//! Bearer token verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use thiserror::Error;

use crate::{JwtClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("malformed or unsigned token: {0}")]
    Decode(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Verifies a raw token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError>;
}

/// HMAC-SHA256 validator backed by a shared secret.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: Vec<u8>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time window lives in `issued_at`/`expires_at`, checked by `validate_claims`.
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        Self {
            key: DecodingKey::from_secret(&secret),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.key, &self.validation)?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header};

    use super::*;
    use crate::{PrincipalId, Role};

    fn mint(secret: &str, expires_in: Duration) -> (String, JwtClaims) {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: PrincipalId::new(),
            roles: vec![Role::ADMIN],
            issued_at: now - Duration::seconds(1),
            expires_at: now + expires_in,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();
        (token, claims)
    }

    #[test]
    fn round_trips_valid_token() {
        let v = Hs256JwtValidator::new(b"s3cret".to_vec());
        let (token, claims) = mint("s3cret", Duration::minutes(5));
        assert_eq!(v.validate(&token, Utc::now()).unwrap(), claims);
    }

    #[test]
    fn rejects_wrong_secret() {
        let v = Hs256JwtValidator::new(b"s3cret".to_vec());
        let (token, _) = mint("other", Duration::minutes(5));
        assert!(matches!(v.validate(&token, Utc::now()), Err(JwtError::Decode(_))));
    }

    #[test]
    fn rejects_expired_token() {
        let v = Hs256JwtValidator::new(b"s3cret".to_vec());
        let (token, _) = mint("s3cret", Duration::minutes(5));
        let later = Utc::now() + Duration::minutes(10);
        assert!(matches!(
            v.validate(&token, later),
            Err(JwtError::Claims(TokenValidationError::Expired))
        ));
    }

    #[test]
    fn rejects_garbage() {
        let v = Hs256JwtValidator::new(b"s3cret".to_vec());
        assert!(v.validate("not-a-token", Utc::now()).is_err());
    }
}
