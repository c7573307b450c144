use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use thiserror::Error;

use stockroom_core::EmployeeId;

use crate::{Claims, Role, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed or tampered token: {0}")]
    Invalid(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("could not sign token: {0}")]
    Signing(String),
}

/// A freshly signed token and when it stops being accepted.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// HS256 token issuer/validator sharing one secret.
#[derive(Clone)]
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl core::fmt::Debug for Hs256Jwt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256Jwt").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl Hs256Jwt {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // The time window is checked by `validate_claims` against the caller's clock.
        validation.validate_exp = false;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(
        &self,
        employee_id: EmployeeId,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let claims = Claims::new(employee_id, role, now, self.ttl);
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok(IssuedToken {
            token,
            expires_at: now + self.ttl,
        })
    }

    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt() -> Hs256Jwt {
        Hs256Jwt::new(b"test-secret", Duration::minutes(60))
    }

    #[test]
    fn issued_tokens_validate() {
        let now = Utc::now();
        let id = EmployeeId::new();
        let issued = jwt().issue(id, Role::Manager, now).unwrap();
        let claims = jwt().validate(&issued.token, now).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, Role::Manager);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let now = Utc::now();
        let issued = jwt().issue(EmployeeId::new(), Role::Staff, now).unwrap();
        let err = jwt().validate(&issued.token, now + Duration::hours(2)).unwrap_err();
        assert_eq!(err, TokenError::Claims(TokenValidationError::Expired));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = Utc::now();
        let issued = jwt().issue(EmployeeId::new(), Role::Staff, now).unwrap();
        let other = Hs256Jwt::new(b"another-secret", Duration::minutes(60));
        assert!(matches!(other.validate(&issued.token, now), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(jwt().validate("not.a.token", Utc::now()), Err(TokenError::Invalid(_))));
    }
}
