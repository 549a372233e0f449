//! Opaque refresh token generation and validation

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

/// Bytes of OS randomness per token (256 bits of entropy)
pub const TOKEN_BYTES: usize = 32;

/// Opaque refresh token value
#[derive(Debug, Clone, PartialEq)]
pub struct OpaqueToken(String);

impl OpaqueToken {
    pub fn new(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for OpaqueToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<OpaqueToken> for String {
    fn from(token: OpaqueToken) -> Self {
        token.0
    }
}

/// Token errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid token format")]
    InvalidFormat,

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),
}

/// Refresh token generator
pub struct RefreshTokenGenerator;

impl RefreshTokenGenerator {
    /// Generate a token from 32 bytes of OS randomness, URL-safe encoded.
    pub fn generate() -> OpaqueToken {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);

        OpaqueToken(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Validate token format (basic check)
    pub fn validate_format(token: &OpaqueToken) -> Result<(), TokenError> {
        if token.0.is_empty() {
            return Err(TokenError::InvalidFormat);
        }

        let decoded = URL_SAFE_NO_PAD
            .decode(&token.0)
            .map_err(TokenError::Base64Error)?;

        if decoded.len() != TOKEN_BYTES {
            return Err(TokenError::InvalidFormat);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_generation_unique() {
        let token1 = RefreshTokenGenerator::generate();
        let token2 = RefreshTokenGenerator::generate();

        assert_ne!(token1, token2);
        assert!(RefreshTokenGenerator::validate_format(&token1).is_ok());
    }

    #[test]
    fn test_token_length_and_charset() {
        let token = RefreshTokenGenerator::generate();

        // 32 bytes base64-encoded without padding is 43 characters
        assert_eq!(token.as_str().len(), 43);
        assert!(token
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_token_validation() {
        let valid_token = RefreshTokenGenerator::generate();
        assert!(RefreshTokenGenerator::validate_format(&valid_token).is_ok());

        let invalid_token = OpaqueToken::new("not-valid-base64!@#$".to_string());
        assert!(RefreshTokenGenerator::validate_format(&invalid_token).is_err());

        let empty_token = OpaqueToken::new(String::new());
        assert!(RefreshTokenGenerator::validate_format(&empty_token).is_err());

        // Well-formed base64 but too short to hold 32 bytes
        let short_token = OpaqueToken::new(URL_SAFE_NO_PAD.encode(b"short"));
        assert!(RefreshTokenGenerator::validate_format(&short_token).is_err());
    }

    #[test]
    fn test_token_conversion() {
        let token_str = "abc123".to_string();
        let token: OpaqueToken = token_str.clone().into();

        assert_eq!(token.as_str(), token_str);
        assert_eq!(token.into_string(), token_str);
    }
}
