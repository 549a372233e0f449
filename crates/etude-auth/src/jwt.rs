//! Stateless access tokens (JWT, HS256)

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Access token claims (RFC 7519 registered claims only)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessClaims {
    /// Issuer
    pub iss: String,
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (epoch seconds)
    pub exp: i64,
    /// Issued at (epoch seconds)
    pub iat: i64,
}

impl AccessClaims {
    pub fn new(user_id: String, issuer: String, validity: Duration) -> Self {
        let now = Utc::now();
        let exp = now + validity;

        Self {
            iss: issuer,
            sub: user_id,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// A freshly minted access token together with its claims, so callers
/// can report the expiry without decoding the token again.
#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    pub claims: AccessClaims,
}

/// JWT errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT encoding error: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Token expired")]
    TokenExpired,
}

/// Issues and verifies HS256 access tokens for a single deployment.
///
/// Verification checks the signature, the issuer claim, and expiration.
/// There is no revocation list: a token stays valid until `exp` passes.
pub struct AccessTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    validity: Duration,
}

impl AccessTokenIssuer {
    pub fn new(secret: &[u8], issuer: String, validity_secs: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.validate_nbf = false;
        validation.set_issuer(&[issuer.clone()]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            issuer,
            validity: Duration::seconds(validity_secs),
        }
    }

    /// Mint a token for the given user. No storage write happens here.
    pub fn issue(&self, user_id: String) -> Result<IssuedAccessToken, JwtError> {
        let claims = AccessClaims::new(user_id, self.issuer.clone(), self.validity);

        let header = Header::new(Algorithm::HS256);
        let token = encode(&header, &claims, &self.encoding_key)?;

        Ok(IssuedAccessToken { token, claims })
    }

    /// Verify signature, issuer and expiration, returning the claims.
    ///
    /// The library validation tolerates clock leeway, so expiration is
    /// re-checked against the wall clock to keep the cutoff sharp.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let token_data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation)?;

        if token_data.claims.is_expired() {
            return Err(JwtError::TokenExpired);
        }

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &[u8] = b"test_secret_key_1234567890";

    fn test_issuer(validity_secs: i64) -> AccessTokenIssuer {
        AccessTokenIssuer::new(TEST_SECRET, "etude-test".to_string(), validity_secs)
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = test_issuer(3600);

        let issued = issuer.issue("user-123".to_string()).unwrap();
        let claims = issuer.verify(&issued.token).unwrap();

        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.iss, "etude-test");
        assert_eq!(claims, issued.claims);
    }

    #[test]
    fn test_expiry_is_issued_at_plus_validity() {
        let issuer = test_issuer(3600);

        let issued = issuer.issue("user-456".to_string()).unwrap();

        assert_eq!(issued.claims.exp, issued.claims.iat + 3600);
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = test_issuer(-10);

        let issued = issuer.issue("user-789".to_string()).unwrap();
        assert!(issued.claims.is_expired());

        let result = issuer.verify(&issued.token);
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = test_issuer(3600);
        let other = AccessTokenIssuer::new(b"different-secret", "etude-test".to_string(), 3600);

        let issued = other.issue("user-123".to_string()).unwrap();

        assert!(issuer.verify(&issued.token).is_err());
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let issuer = test_issuer(3600);
        let other = AccessTokenIssuer::new(TEST_SECRET, "someone-else".to_string(), 3600);

        let issued = other.issue("user-123".to_string()).unwrap();

        assert!(issuer.verify(&issued.token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let issuer = test_issuer(3600);

        assert!(issuer.verify("not-a-jwt").is_err());
        assert!(issuer.verify("").is_err());
    }

    #[test]
    fn test_claims_serialize_registered_names() {
        let claims = AccessClaims::new(
            "user-1".to_string(),
            "etude-test".to_string(),
            Duration::hours(1),
        );

        let json = serde_json::to_value(&claims).unwrap();

        assert!(json.get("iss").is_some());
        assert!(json.get("sub").is_some());
        assert!(json.get("exp").is_some());
        assert!(json.get("iat").is_some());
    }
}
