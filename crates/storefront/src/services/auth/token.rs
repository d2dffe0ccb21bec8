//! Session tokens.
//!
//! A session token is an HS256 JWT carrying the user id (`sub`), email and
//! admin flag. Tokens are stateless: validation checks the signature and
//! `exp` only, so a role change takes effect on the next login.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use cakeshop_core::UserId;

use super::AuthError;
use crate::models::User;

/// Claims embedded in a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id, encoded as a string per RFC 7519.
    #[serde(with = "user_id_string")]
    pub sub: UserId,
    pub email: String,
    pub is_admin: bool,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

impl Claims {
    /// The authenticated user's id.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.sub
    }
}

/// Issues and validates session tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    /// Create a token service signing with `secret`.
    #[must_use]
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation,
            ttl,
        }
    }

    /// Issue a token for `user`, valid for the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if encoding fails.
    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        self.issue_at(user.id, user.email.as_str(), user.is_admin, Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now` (seconds since the epoch).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if encoding fails.
    pub fn issue_at(
        &self,
        user_id: UserId,
        email: &str,
        is_admin: bool,
        now: i64,
    ) -> Result<String, AuthError> {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: user_id,
            email: email.to_owned(),
            is_admin,
            iat: now,
            exp: now.saturating_add(ttl),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(AuthError::TokenSigning)
    }

    /// Validate a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is malformed, expired,
    /// or signed with a different key or algorithm.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected session token");
                AuthError::InvalidToken
            })
    }
}

mod user_id_string {
    use serde::{Deserialize, Deserializer, Serializer};

    use cakeshop_core::UserId;

    pub fn serialize<S: Serializer>(id: &UserId, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<UserId, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const DAY: i64 = 24 * 3600;

    fn service(secret: &str) -> TokenService {
        TokenService::new(
            &SecretString::from(secret),
            Duration::from_secs(24 * 3600),
        )
    }

    #[test]
    fn test_issue_then_validate() {
        let tokens = service("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6");
        let now = Utc::now().timestamp();
        let token = tokens
            .issue_at(UserId::new(7), "ann@x.com", false, now)
            .unwrap();

        let claims = tokens.validate(&token).unwrap();
        assert_eq!(claims.user_id(), UserId::new(7));
        assert_eq!(claims.email, "ann@x.com");
        assert!(!claims.is_admin);
        assert_eq!(claims.exp - claims.iat, DAY);
    }

    #[test]
    fn test_sub_is_a_string() {
        let claims = Claims {
            sub: UserId::new(42),
            email: "ann@x.com".to_string(),
            is_admin: true,
            iat: 0,
            exp: 1,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["sub"], "42");
        assert_eq!(serde_json::from_value::<Claims>(json).unwrap(), claims);
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = service("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6");
        let two_days_ago = Utc::now().timestamp() - 2 * DAY;
        let token = tokens
            .issue_at(UserId::new(1), "ann@x.com", false, two_days_ago)
            .unwrap();
        assert!(matches!(
            tokens.validate(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let issuer = service("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6");
        let other = service("Zq8#Lm4!Tr6@Wx1$Ky3%Np5^Vb7&Hd9*");
        let token = issuer
            .issue_at(UserId::new(1), "ann@x.com", true, Utc::now().timestamp())
            .unwrap();
        assert!(other.validate(&token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let tokens = service("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6");
        assert!(tokens.validate("").is_err());
        assert!(tokens.validate("not.a.jwt").is_err());
    }

    #[test]
    fn test_tampered_admin_flag_rejected() {
        let tokens = service("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6");
        let attacker = service("Zq8#Lm4!Tr6@Wx1$Ky3%Np5^Vb7&Hd9*");
        let now = Utc::now().timestamp();
        let genuine = tokens
            .issue_at(UserId::new(1), "ann@x.com", false, now)
            .unwrap();
        let elevated = attacker
            .issue_at(UserId::new(1), "ann@x.com", true, now)
            .unwrap();

        // Admin payload spliced under the genuine header and signature.
        let genuine_parts: Vec<&str> = genuine.split('.').collect();
        let elevated_parts: Vec<&str> = elevated.split('.').collect();
        let forged = format!(
            "{}.{}.{}",
            genuine_parts[0], elevated_parts[1], genuine_parts[2]
        );
        assert!(tokens.validate(&forged).is_err());
    }
}
