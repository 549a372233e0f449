//! Authentication primitives for the Etude backend

pub mod jwt;
pub mod password;
pub mod token;

pub use jwt::{AccessClaims, AccessTokenIssuer, IssuedAccessToken, JwtError};
pub use password::{PasswordError, PasswordHasher, DEFAULT_COST};
pub use token::{OpaqueToken, RefreshTokenGenerator, TokenError, TOKEN_BYTES};
